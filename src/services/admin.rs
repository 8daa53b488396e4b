//! Admin endpoints: user management, CSV upload, system stats.

use std::path::Path;

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use super::{Dashboard, MessageResponse, optional_query};
use crate::net::api::Payload;
use crate::net::error::ApiError;
use crate::net::types::{Role, User};
use crate::state::session::AuthError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UsersResponse {
    pub users: Vec<User>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserResponse {
    #[serde(default)]
    pub msg: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub role: Role,
}

/// Partial update; absent fields are left unchanged server-side.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateUserRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'a str>,
}

impl UpdateUserRequest<'_> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.is_active.is_none() && self.password.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DataSummary {
    #[serde(default)]
    pub total_records: Option<u64>,
    #[serde(default)]
    pub regions: Option<Vec<String>>,
    #[serde(default)]
    pub seasons: Option<Vec<String>>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UploadCsvResponse {
    #[serde(default)]
    pub msg: String,
    /// `success`, `partial_success`, or `processing_failed`.
    pub status: String,
    #[serde(default)]
    pub data_summary: Option<DataSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserCounts {
    pub total: u64,
    pub admins: u64,
    pub managers: u64,
    pub owners: u64,
    pub active: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PredictionCounts {
    pub total_batches: u64,
    pub total_items: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AdminStats {
    pub users: UserCounts,
    pub predictions: PredictionCounts,
    #[serde(default)]
    pub data: DataSummary,
}

impl Dashboard {
    /// `GET /admin/users`, optionally filtered by role.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn list_users(&self, role: Option<Role>) -> Result<UsersResponse, AuthError> {
        let query = optional_query(&[("role", role.map(Role::as_str))]);
        self.get("/admin/users", &query).await
    }

    /// `GET /admin/users/{id}`.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn get_user(&self, user_id: i64) -> Result<User, AuthError> {
        self.get(&format!("/admin/users/{user_id}"), &[]).await
    }

    /// `POST /admin/users`.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn create_user(&self, request: &CreateUserRequest<'_>) -> Result<UserResponse, AuthError> {
        self.post("/admin/users", request).await
    }

    /// `PUT /admin/users/{id}`.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn update_user(&self, user_id: i64, request: &UpdateUserRequest<'_>) -> Result<UserResponse, AuthError> {
        let path = format!("/admin/users/{user_id}");
        self.call(Method::PUT, &path, &[], Payload::json(request)?).await
    }

    /// `DELETE /admin/users/{id}`.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn delete_user(&self, user_id: i64) -> Result<MessageResponse, AuthError> {
        let path = format!("/admin/users/{user_id}");
        self.call(Method::DELETE, &path, &[], Payload::Empty).await
    }

    /// `POST /admin/upload_csv` with the file as multipart field `file`.
    ///
    /// # Errors
    ///
    /// The file cannot be read, not signed in, or the request failed.
    pub async fn upload_csv(&self, path: &Path) -> Result<UploadCsvResponse, AuthError> {
        let bytes = tokio::fs::read(path).await.map_err(ApiError::from)?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload.csv".to_owned(), |name| name.to_string_lossy().into_owned());
        tracing::info!(file = %file_name, bytes = bytes.len(), "uploading csv");

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("text/csv")
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        let form = Form::new().part("file", part);
        self.call(Method::POST, "/admin/upload_csv", &[], Payload::Multipart(form))
            .await
    }

    /// `GET /admin/stats`.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn admin_stats(&self) -> Result<AdminStats, AuthError> {
        self.get("/admin/stats", &[]).await
    }
}
