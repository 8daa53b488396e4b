//! Manager endpoints: generate, preview, and manage prediction batches.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{Dashboard, MessageResponse, optional_query};
use crate::net::api::Payload;
use crate::state::session::AuthError;

/// Filters sent when generating or previewing predictions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PredictionFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PredictionItem {
    pub id: i64,
    pub uni_id: String,
    pub product: String,
    pub color: Option<String>,
    pub fabric: Option<String>,
    pub style: Option<String>,
    /// `pending`, `approved`, or `rejected`.
    pub status: String,
    #[serde(default)]
    pub reviewed_at: Option<String>,
    #[serde(default)]
    pub reviewed_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PredictionBatch {
    pub uni_id: String,
    pub created_by: i64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age_group: Option<String>,
    #[serde(default)]
    pub items_count: u64,
    #[serde(default)]
    pub items: Option<Vec<PredictionItem>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeneratePredictionResponse {
    #[serde(default)]
    pub msg: String,
    pub batch_id: String,
    pub items_count: u64,
    #[serde(default)]
    pub filters: PredictionFilters,
    #[serde(default)]
    pub items: Vec<PredictionItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PreviewRow {
    pub product: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub fabric: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PreviewPredictionResponse {
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub filters: PredictionFilters,
    #[serde(default)]
    pub results: Vec<PreviewRow>,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PredictionsResponse {
    pub predictions: Vec<PredictionBatch>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ManagerStats {
    pub total_batches: u64,
    pub total_items: u64,
    pub items_by_status: StatusCounts,
    pub approval_rate: f64,
}

impl Dashboard {
    /// `POST /manager/generate_prediction`: generate and store a batch.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn generate_prediction(&self, filters: &PredictionFilters) -> Result<GeneratePredictionResponse, AuthError> {
        self.post("/manager/generate_prediction", filters).await
    }

    /// `POST /manager/preview_prediction`: same as generate without saving.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn preview_prediction(&self, filters: &PredictionFilters) -> Result<PreviewPredictionResponse, AuthError> {
        self.post("/manager/preview_prediction", filters).await
    }

    /// `GET /manager/predictions`, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn list_predictions(&self, status: Option<&str>) -> Result<PredictionsResponse, AuthError> {
        let query = optional_query(&[("status", status)]);
        self.get("/manager/predictions", &query).await
    }

    /// `GET /manager/predictions/{batch_id}`.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn prediction_details(&self, batch_id: &str) -> Result<PredictionBatch, AuthError> {
        self.get(&format!("/manager/predictions/{batch_id}"), &[]).await
    }

    /// `DELETE /manager/predictions/{batch_id}`.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn delete_prediction(&self, batch_id: &str) -> Result<MessageResponse, AuthError> {
        let path = format!("/manager/predictions/{batch_id}");
        self.call(Method::DELETE, &path, &[], Payload::Empty).await
    }

    /// `GET /manager/stats`.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn manager_stats(&self) -> Result<ManagerStats, AuthError> {
        self.get("/manager/stats", &[]).await
    }
}
