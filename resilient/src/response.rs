use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::errors::ResilientError;

/// A completed attempt. The body is parsed as JSON up front so that the
/// normalizer can reshape it before callers decode it.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    path: String,
    body: Bytes,
    pub data: Option<JsonValue>,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, path: String, body: Bytes) -> Self {
        let data = serde_json::from_slice(&body).ok();
        Response {
            status,
            headers,
            path,
            body,
            data,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Path the request was sent to, including the base path.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Decodes the (possibly normalized) JSON payload.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ResilientError> {
        match self.data {
            Some(data) => Ok(serde_json::from_value(data)?),
            // Surfaces the parse error of the raw body
            None => Ok(serde_json::from_slice(&self.body)?),
        }
    }
}
