//! REST API client for the TrendSense server.
//!
//! DESIGN
//! ======
//! `AuthApi` is the seam the session store depends on; `HttpApi` is the only
//! production implementation and tests substitute mocks. Non-auth endpoints go
//! through [`HttpApi::send`] from the `services` module.
//!
//! ERROR HANDLING
//! ==============
//! Every call is a single attempt. HTTP 401 maps to `ApiError::Unauthorized`
//! so callers can expire the session; other failures carry the server's
//! message when the payload has one.

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;

use super::error::{ApiError, extract_message};
use super::types::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, Role, ValidateResponse};
use crate::config::ClientConfig;

/// Auth endpoints consumed by the session store.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError>;

    /// `POST /auth/register`.
    async fn register(&self, username: &str, password: &str, role: Role) -> Result<RegisterResponse, ApiError>;

    /// `GET /auth/validate` with the given bearer token.
    async fn validate(&self, token: &str) -> Result<ValidateResponse, ApiError>;
}

/// Request body variants.
pub enum Payload {
    Empty,
    Json(serde_json::Value),
    Multipart(reqwest::multipart::Form),
}

impl Payload {
    /// Serialize a typed body into a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Parse` if the value cannot be represented as JSON.
    pub fn json<T: serde::Serialize>(body: &T) -> Result<Self, ApiError> {
        serde_json::to_value(body)
            .map(Self::Json)
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// reqwest-backed client rooted at the configured API base URL.
#[derive(Debug, Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    /// Build a client from config.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.api_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Issue one request and decode a JSON response.
    ///
    /// # Errors
    ///
    /// Transport failures, non-success statuses, and undecodable bodies.
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        query: &[(&str, &str)],
        payload: Payload,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!(%method, %url, authed = token.is_some(), "api request");

        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        request = match payload {
            Payload::Empty => request,
            Payload::Json(body) => request.json(&body),
            Payload::Multipart(form) => request.multipart(form),
        };

        let response = request.send().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| ApiError::Transport(e.to_string()))?;

        decode_response(status, &text).inspect_err(|e| {
            tracing::debug!(%method, %url, status, error = %e, "api request failed");
        })
    }
}

/// Map a status and body to a typed result.
pub(crate) fn decode_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ApiError> {
    match status {
        200..=299 => serde_json::from_str(body).map_err(|e| ApiError::Parse(e.to_string())),
        401 => Err(ApiError::Unauthorized { message: extract_message(body) }),
        _ => Err(ApiError::Rejected { status, message: extract_message(body) }),
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpApi {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = Payload::json(&LoginRequest { username, password })?;
        self.send(Method::POST, "/auth/login", None, &[], body).await
    }

    async fn register(&self, username: &str, password: &str, role: Role) -> Result<RegisterResponse, ApiError> {
        let body = Payload::json(&RegisterRequest { username, password, role })?;
        self.send(Method::POST, "/auth/register", None, &[], body).await
    }

    async fn validate(&self, token: &str) -> Result<ValidateResponse, ApiError> {
        self.send(Method::GET, "/auth/validate", Some(token), &[], Payload::Empty)
            .await
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
