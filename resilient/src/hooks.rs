//! Pluggable classification and normalization of responses.

use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::response::Response;

/// Returns true when a response that did arrive must be treated as a failed attempt.
pub type FailPredicate = Arc<dyn Fn(&Response) -> bool + Send + Sync>;

/// Reshapes a response in place. Runs on every attempt that produced a response.
pub type ResponseNormalizer = Arc<dyn Fn(&mut Response) + Send + Sync>;

#[derive(Clone)]
pub struct ClientHooks {
    pub fail_predicate: FailPredicate,
    pub normalizer: ResponseNormalizer,
}

impl Default for ClientHooks {
    fn default() -> Self {
        ClientHooks {
            fail_predicate: Arc::new(status_at_least_300),
            normalizer: unwrap_embedded("users", "usersList"),
        }
    }
}

/// Redirects, client errors and server errors are all failures.
pub fn status_at_least_300(response: &Response) -> bool {
    response.status().as_u16() >= 300
}

/// Leaves every response untouched.
pub fn identity() -> ResponseNormalizer {
    Arc::new(|_: &mut Response| {})
}

/// Replaces a HAL envelope `{"_embedded": {"<field>": [...]}}` with the embedded
/// list when the request path targets `collection`.
pub fn unwrap_embedded(collection: &'static str, field: &'static str) -> ResponseNormalizer {
    Arc::new(move |response: &mut Response| {
        if !response.path().split('/').any(|segment| segment == collection) {
            return;
        }

        let Some(JsonValue::Object(map)) = response.data.as_mut() else {
            return;
        };

        let Some(embedded) = map.remove("_embedded") else {
            return;
        };

        let list = match embedded {
            JsonValue::Object(mut embedded) => embedded
                .remove(field)
                .unwrap_or_else(|| JsonValue::Array(Vec::new())),
            _ => JsonValue::Array(Vec::new()),
        };

        response.data = Some(list);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use reqwest::StatusCode;
    use reqwest::header::HeaderMap;
    use serde_json::json;

    fn response(status: u16, path: &str, body: JsonValue) -> Response {
        Response::new(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            path.into(),
            Bytes::from(serde_json::to_vec(&body).unwrap()),
        )
    }

    #[test]
    fn test_default_fail_predicate() {
        assert!(!status_at_least_300(&response(200, "/", json!({}))));
        assert!(!status_at_least_300(&response(204, "/", json!({}))));
        assert!(status_at_least_300(&response(301, "/", json!({}))));
        assert!(status_at_least_300(&response(404, "/", json!({}))));
        assert!(status_at_least_300(&response(503, "/", json!({}))));
    }

    #[test]
    fn test_unwrap_embedded() {
        let normalize = unwrap_embedded("users", "usersList");

        let mut res = response(
            200,
            "/api/users/join/id",
            json!({"_embedded": {"usersList": [{"id": 42}]}, "_links": {}}),
        );
        normalize(&mut res);
        assert_eq!(res.data, Some(json!([{"id": 42}])));

        // Envelope without the list
        let mut res = response(200, "/api/users", json!({"_embedded": {}}));
        normalize(&mut res);
        assert_eq!(res.data, Some(json!([])));

        // Other collections are left alone
        let body = json!({"_embedded": {"usersList": [{"id": 42}]}});
        let mut res = response(200, "/api/vehicles", body.clone());
        normalize(&mut res);
        assert_eq!(res.data, Some(body));

        // A plain array is left alone
        let mut res = response(200, "/api/users/join/id", json!([{"id": 42}]));
        normalize(&mut res);
        assert_eq!(res.data, Some(json!([{"id": 42}])));

        // "users" must be a whole path segment
        let body = json!({"_embedded": {"usersList": []}});
        let mut res = response(200, "/api/superusers", body.clone());
        normalize(&mut res);
        assert_eq!(res.data, Some(body));
    }
}
