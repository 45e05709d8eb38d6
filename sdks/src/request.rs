// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tollgate_core::{ApiError, Credential, HttpMethod};

/// Header that marks a call as exempt from the renewal-and-retry path.
pub const SKIP_AUTH_REFRESH_HEADER: &str = "x-skip-auth-refresh";

/// One logical API call as it travels through the pipeline.
///
/// A request is cloned once at most: when a 401 is recovered, the clone carries
/// the renewed credential and is tagged as retried so it can never recover again.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path relative to the configured base URL, e.g. `/api/v1/jobs`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Set when the body handed to `with_json` could not be serialized.
    pub(crate) body_error: Option<String>,
    pub(crate) skip_auth_refresh: bool,
    pub(crate) retried: bool,
    pub(crate) bearer_override: Option<Credential>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            body_error: None,
            skip_auth_refresh: false,
            retried: false,
            bearer_override: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Attach a JSON body. A serialization failure is reported when the request is sent.
    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => {
                self.body = Some(value);
                self.body_error = None;
            }
            Err(e) => {
                self.body = None;
                self.body_error = Some(e.to_string());
            }
        }
        self
    }

    /// Error for a body that could not be serialized, if any.
    pub(crate) fn body_error(&self) -> Option<ApiError> {
        self.body_error
            .as_ref()
            .map(|message| ApiError::decode(None, format!("Request body is not valid JSON: {}", message)))
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Exempt this call from renewal. A 401 is then returned to the caller as-is.
    pub fn skip_auth_refresh(mut self) -> Self {
        self.skip_auth_refresh = true;
        self
    }

    pub fn is_retry(&self) -> bool {
        self.retried
    }

    pub fn skips_auth_refresh(&self) -> bool {
        self.skip_auth_refresh
            || self
                .headers
                .iter()
                .any(|(name, value)| name.eq_ignore_ascii_case(SKIP_AUTH_REFRESH_HEADER) && value == "true")
    }

    /// Clone of this request carrying `credential`, tagged as already retried.
    pub(crate) fn retry_with(&self, credential: Credential) -> Self {
        let mut retry = self.clone();
        retry.retried = true;
        retry.bearer_override = Some(credential);
        retry
    }

    /// The path without query string or fragment, used to recognise auth endpoints.
    pub fn route(&self) -> &str {
        let end = self.path.find(['?', '#']).unwrap_or(self.path.len());
        let route = &self.path[..end];
        if route.len() > 1 {
            route.trim_end_matches('/')
        } else {
            route
        }
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body; `Value::Null` for an empty body, a JSON string for a non-JSON body.
    pub data: Value,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| ApiError::decode(Some(self.status), e.to_string()))
    }

    /// Value at a JSON pointer inside the body.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.data.pointer(pointer)
    }
}

pub(crate) fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Options => reqwest::Method::OPTIONS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_route_strips_query_and_trailing_slash() {
        assert_eq!(ApiRequest::get("/auth/login?next=/home").route(), "/auth/login");
        assert_eq!(ApiRequest::get("/auth/refresh/").route(), "/auth/refresh");
        assert_eq!(ApiRequest::get("/").route(), "/");
    }

    #[test]
    fn test_retry_is_tagged_and_carries_credential() {
        let original = ApiRequest::post("/api/v1/jobs").with_json(&json!({"name": "Rust dev"}));
        assert!(!original.is_retry());

        let retry = original.retry_with(Credential::new("fresh"));
        assert!(retry.is_retry());
        assert_eq!(retry.bearer_override.as_ref().map(Credential::expose), Some("fresh"));
        assert_eq!(retry.body, original.body);
    }

    #[test]
    fn test_skip_marker_from_builder_or_header() {
        assert!(ApiRequest::get("/x").skip_auth_refresh().skips_auth_refresh());
        assert!(ApiRequest::get("/x")
            .with_header("X-Skip-Auth-Refresh", "true")
            .skips_auth_refresh());
        assert!(!ApiRequest::get("/x").skips_auth_refresh());
    }

    #[test]
    fn test_unserializable_body_is_kept_as_an_error() {
        use std::collections::BTreeMap;

        // JSON object keys must be strings
        let body: BTreeMap<(i32, i32), i32> = BTreeMap::from([((1, 2), 3)]);
        let request = ApiRequest::post("/api/v1/jobs").with_json(&body);

        assert!(request.body.is_none());
        let err = request.body_error().unwrap();
        assert_eq!(err.kind, tollgate_core::FailureKind::Decode);
        assert_eq!(err.status, None);

        // A later valid body replaces the failure
        let request = request.with_json(&json!({"name": "Rust dev"}));
        assert!(request.body_error().is_none());
        assert_eq!(request.body, Some(json!({"name": "Rust dev"})));
    }

    #[test]
    fn test_response_json_decode_error() {
        #[derive(Debug, Deserialize)]
        struct Job {
            #[allow(dead_code)]
            name: String,
        }

        let response = ApiResponse {
            status: 200,
            data: json!({"title": "no name"}),
        };
        let err = tokio_test::assert_err!(response.json::<Job>());
        assert_eq!(err.kind, tollgate_core::FailureKind::Decode);
        assert_eq!(err.status, Some(200));
    }
}
