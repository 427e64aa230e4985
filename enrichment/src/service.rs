use http_body_util::{BodyExt, Limited};
use hyper::body::{Body, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::http::{ResponseBody, make_json_response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::enricher::Enricher;
use crate::errors::{EnrichError, EnrichmentError};
use crate::types::{Listing, Vehicle};

pub const ENRICH_PATH: &str = "/api/vehicles/enrich";

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// The record shapes accepted by the enrich endpoint.
#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Listing(Listing<Vehicle>),
    Many(Vec<Vehicle>),
    One(Vehicle),
}

pub struct EnrichmentService {
    enricher: Arc<Enricher>,
}

impl EnrichmentService {
    pub fn new(enricher: Arc<Enricher>) -> Self {
        EnrichmentService { enricher }
    }
}

impl Service<Request<Incoming>> for EnrichmentService {
    type Response = Response<ResponseBody>;
    type Error = EnrichmentError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let enricher = self.enricher.clone();
        Box::pin(async move { Ok(handle(&enricher, req).await) })
    }
}

pub(crate) async fn handle<B>(enricher: &Enricher, req: Request<B>) -> Response<ResponseBody>
where
    B: Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    if req.uri().path() != ENRICH_PATH {
        return error_response(StatusCode::NOT_FOUND, "resource not found");
    }
    if req.method() != Method::POST {
        return error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
    }

    let body = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            tracing::debug!(error = %err, "could not read request body");
            return error_response(StatusCode::BAD_REQUEST, "invalid request body");
        }
    };

    let payload: Payload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::debug!(error = %err, "could not decode request body");
            return error_response(StatusCode::BAD_REQUEST, "invalid request body");
        }
    };

    let encoded = match payload {
        Payload::One(vehicle) => encode(enricher.enrich_one(vehicle).await),
        Payload::Many(vehicles) => encode(enricher.enrich_many(vehicles).await),
        Payload::Listing(listing) => encode(enricher.enrich_listing(listing).await),
    };

    match encoded {
        Ok(body) => make_json_response(StatusCode::OK, body),
        // The causes were logged by the enricher, callers only see a generic answer
        Err(Some(_)) => error_response(StatusCode::NOT_FOUND, "resource not found"),
        Err(None) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
    }
}

fn encode<T: Serialize>(result: Result<T, EnrichError>) -> Result<Vec<u8>, Option<EnrichError>> {
    let value = result.map_err(Some)?;
    serde_json::to_vec(&value).map_err(|err| {
        tracing::error!(error = %err, "could not encode enriched records");
        None
    })
}

fn error_response(status: StatusCode, message: &str) -> Response<ResponseBody> {
    let body = json!({"message": message, "error": true}).to_string();
    make_json_response(status, body.into_bytes())
}
