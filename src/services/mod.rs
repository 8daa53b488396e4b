//! Typed wrappers for the dashboard's REST endpoints.
//!
//! DESIGN
//! ======
//! Each role area (`admin`, `manager`, `owner`, `trends`) adds methods to
//! [`Dashboard`]. Payloads are pass-through DTOs; no transformation happens
//! client-side. Every call carries the session's bearer token, and an HTTP
//! 401 signs the session out before the error is returned, unless the
//! session has moved on to a different token while the request was in flight.

pub mod admin;
pub mod manager;
pub mod owner;
pub mod trends;

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::net::api::{HttpApi, Payload};
use crate::net::error::ApiError;
use crate::state::session::{AuthError, SessionStore};

/// `{ "msg": ... }` acknowledgement returned by delete-style endpoints.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub msg: String,
}

/// Authorized access to the dashboard endpoints.
pub struct Dashboard {
    api: HttpApi,
    session: Arc<SessionStore>,
}

impl Dashboard {
    #[must_use]
    pub fn new(api: HttpApi, session: Arc<SessionStore>) -> Self {
        Self { api, session }
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        payload: Payload,
    ) -> Result<T, AuthError> {
        let token = self.session.token().ok_or(AuthError::NotAuthenticated)?;
        match self.api.send(method, path, Some(&token), query, payload).await {
            Err(ApiError::Unauthorized { message }) => {
                self.session.expire_if(&token);
                Err(AuthError::Api(ApiError::Unauthorized { message }))
            }
            result => result.map_err(AuthError::from),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, AuthError> {
        self.call(Method::GET, path, query, Payload::Empty).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &impl serde::Serialize) -> Result<T, AuthError> {
        self.call(Method::POST, path, &[], Payload::json(body)?).await
    }
}

/// Build a query list from optional filters, skipping absent values.
fn optional_query<'a>(pairs: &[(&'a str, Option<&'a str>)]) -> Vec<(&'a str, &'a str)> {
    pairs
        .iter()
        .filter_map(|(key, value)| value.map(|v| (*key, v)))
        .collect()
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
