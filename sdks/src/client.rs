// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use tollgate_core::{
    ApiError, AuthConfig, ClientConfig, Credential, CredentialStore, FailureKind, SessionProfile,
};
use tracing::{debug, info, warn};

use crate::credential_store::InMemoryCredentialStore;
use crate::pipeline::{classify, Disposition};
use crate::refresh::RefreshCoordinator;
use crate::request::{to_reqwest_method, ApiRequest, ApiResponse};
use crate::session_events::{
    ExpiryReason, LoggingExpiryHandler, SessionExpired, SessionExpiryHandler,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Builder for [`ApiClient`].
///
/// The credential store and the expiry handler are wired here, once; the client
/// never reaches out to application state on its own.
pub struct ApiClientBuilder {
    config: ClientConfig,
    store: Option<Arc<dyn CredentialStore>>,
    handler: Option<Arc<dyn SessionExpiryHandler>>,
}

impl ApiClientBuilder {
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Handler invoked once per call that ends in terminal session expiry.
    pub fn on_session_expired(mut self, handler: Arc<dyn SessionExpiryHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<ApiClient, ClientBuildError> {
        self.config
            .validate()
            .map_err(|e| ClientBuildError::InvalidConfig(format!("{:#}", e)))?;

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(self.config.api.timeout_seconds))
            .user_agent(concat!("tollgate-sdk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url = self.config.api.base_url.trim().trim_end_matches('/').to_string();
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryCredentialStore::new()));
        let handler = self
            .handler
            .unwrap_or_else(|| Arc::new(LoggingExpiryHandler));

        let coordinator = RefreshCoordinator::new(
            http.clone(),
            join_url(&base_url, &self.config.auth.refresh_path),
            self.config.auth.token_pointer.clone(),
            Arc::clone(&store),
        );

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                auth: self.config.auth,
                store,
                handler,
                coordinator,
            }),
        })
    }
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    auth: AuthConfig,
    store: Arc<dyn CredentialStore>,
    handler: Arc<dyn SessionExpiryHandler>,
    coordinator: RefreshCoordinator,
}

/// Authenticated API client.
///
/// Every call goes through the same pipeline: attach the bearer credential,
/// dispatch, classify the response, and on a recoverable 401 renew once and
/// retry once. Cloning is cheap and clones share the credential store, cookie
/// jar and renewal coordinator.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder {
            config,
            store: None,
            handler: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    /// Send a request through the pipeline.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        if let Some(error) = request.body_error() {
            return Err(error);
        }
        let mut request = request;

        loop {
            let sent_with = match &request.bearer_override {
                Some(credential) => Some(credential.clone()),
                None => self.inner.store.get(),
            };
            let (status, data) = self.dispatch(&request, sent_with.as_ref()).await?;

            match classify(&request, status, &self.inner.auth) {
                Disposition::Success => return Ok(ApiResponse { status, data }),
                Disposition::PassThrough => {
                    return Err(with_reason_phrase(ApiError::from_status(status, data)));
                }
                Disposition::InvalidCredentials => {
                    debug!(path = %request.route(), "Credential-issuing endpoint rejected the secrets");
                    return Err(with_reason_phrase(ApiError::from_response(
                        FailureKind::InvalidCredentials,
                        status,
                        data,
                    )));
                }
                Disposition::TerminalSessionExpiry => {
                    let error = ApiError::from_status(status, data)
                        .into_session_expired("renewal secret rejected");
                    return Err(self.expire(&request, ExpiryReason::RenewalSecretRejected, error));
                }
                Disposition::TransientAuthExpiry => {
                    debug!(method = %request.method, path = %request.route(), "Credential expired, renewing");
                    match self.inner.coordinator.refresh(sent_with.as_ref()).await {
                        Ok(credential) => {
                            request = request.retry_with(credential);
                        }
                        Err(failure) => {
                            let error = ApiError::from_status(status, data)
                                .into_session_expired(failure.to_string());
                            return Err(self.expire(
                                &request,
                                ExpiryReason::RenewalFailed { failure },
                                error,
                            ));
                        }
                    }
                }
            }
        }
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::post(path).with_json(body)).await
    }

    pub async fn put<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::put(path).with_json(body)).await
    }

    pub async fn patch<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::patch(path).with_json(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::delete(path)).await
    }

    /// Log in and store the issued credential.
    pub async fn login<T: Serialize + ?Sized>(&self, secrets: &T) -> Result<Credential, ApiError> {
        let path = self.inner.auth.login_path.clone();
        self.issue(&path, secrets).await
    }

    /// Register a new identity and store the issued credential.
    pub async fn register<T: Serialize + ?Sized>(&self, details: &T) -> Result<Credential, ApiError> {
        let path = self.inner.auth.register_path.clone();
        self.issue(&path, details).await
    }

    /// Tell the backend to end the session. The local credential is cleared
    /// whatever the backend answers.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let request = ApiRequest::post(self.inner.auth.logout_path.as_str()).skip_auth_refresh();
        let result = self.send(request).await;
        self.inner.store.clear();
        info!("Logged out");
        result.map(|_| ())
    }

    /// Fetch the signed-in identity's profile and granted capabilities.
    pub async fn fetch_account(&self) -> Result<SessionProfile, ApiError> {
        let response = self.get(&self.inner.auth.account_path).await?;
        SessionProfile::from_account(&response.data, &self.inner.auth.account_pointer)
            .map_err(|e| ApiError::decode(Some(response.status), e.to_string()))
    }

    async fn issue<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Credential, ApiError> {
        let response = self.send(ApiRequest::post(path).with_json(body)).await?;
        let pointer = &self.inner.auth.token_pointer;
        let token = response
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ApiError::decode(
                    Some(response.status),
                    format!("No access token at '{}'", pointer),
                )
            })?;

        let credential = Credential::new(token);
        self.inner.store.set(credential.clone());
        self.inner.coordinator.forget_failure();
        info!(path = %path, "Credential issued");
        Ok(credential)
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        credential: Option<&Credential>,
    ) -> Result<(u16, Value), ApiError> {
        let url = join_url(&self.inner.base_url, &request.path);
        let headers = header_map(&request.headers)?;
        let mut builder = self
            .inner
            .http
            .request(to_reqwest_method(request.method), &url)
            .headers(headers);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(credential) = credential.filter(|c| !c.is_empty()) {
            builder = builder.bearer_auth(credential.expose());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(
            method = %request.method,
            url = %url,
            retry = request.is_retry(),
            authenticated = credential.is_some(),
            "Dispatching request"
        );

        let response = builder.send().await.map_err(network_error)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(network_error)?;

        Ok((status, parse_body(&bytes)))
    }

    fn expire(&self, request: &ApiRequest, reason: ExpiryReason, error: ApiError) -> ApiError {
        warn!(
            method = %request.method,
            path = %request.route(),
            "Session expired: {}",
            error
        );
        self.inner.store.clear();
        self.inner
            .handler
            .session_expired(&SessionExpired::new(request.method, request.route(), reason));
        error
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("authenticated", &self.inner.store.is_authenticated())
            .finish()
    }
}

fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{}/{}", base, path.trim_start_matches('/'))
}

fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Fill in the canonical reason phrase when the body carried no message.
fn with_reason_phrase(mut error: ApiError) -> ApiError {
    if error.message.is_none() {
        error.message = error
            .status
            .and_then(|status| reqwest::StatusCode::from_u16(status).ok())
            .and_then(|code| code.canonical_reason())
            .map(str::to_string);
    }
    error
}

/// Caller headers, checked before anything goes on the wire.
fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, ApiError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::decode(None, format!("Invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::decode(None, format!("Invalid value for header '{}': {}", name, e)))?;
        map.append(header, value);
    }
    Ok(map)
}

fn network_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::network(format!("Request timed out: {}", error))
    } else if error.is_connect() {
        ApiError::network(format!("Connection failed: {}", error))
    } else {
        ApiError::network(error.to_string())
    }
}
