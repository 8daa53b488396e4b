//! Owner endpoints: review pending prediction items.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::manager::StatusCounts;
use super::{Dashboard, optional_query};
use crate::state::session::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        })
    }
}

/// Batch parameters echoed with pending items and batches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReviewContext {
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age_group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PendingItem {
    pub item_id: i64,
    pub batch_id: String,
    pub product: String,
    pub color: Option<String>,
    pub fabric: Option<String>,
    pub style: Option<String>,
    pub status: String,
    #[serde(default)]
    pub context: ReviewContext,
    pub created_by: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PendingBatch {
    pub batch_id: String,
    pub created_by: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub parameters: ReviewContext,
    pub pending_count: u64,
    pub total_items: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PendingItemsResponse {
    pub pending_items: Vec<PendingItem>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PendingBatchesResponse {
    pub pending_batches: Vec<PendingBatch>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateStatusRequest {
    pub item_id: i64,
    pub action: ReviewAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchUpdateStatusRequest<'a> {
    pub item_ids: &'a [i64],
    pub action: ReviewAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ItemStatus {
    pub id: i64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UpdateStatusResponse {
    #[serde(default)]
    pub msg: String,
    pub item: ItemStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BatchUpdateResponse {
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub updated: Vec<i64>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApproveBatchResponse {
    #[serde(default)]
    pub msg: String,
    pub batch_id: String,
    pub items_approved: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReviewHistoryItem {
    pub item_id: i64,
    pub batch_id: String,
    pub product: String,
    pub color: Option<String>,
    pub fabric: Option<String>,
    pub style: Option<String>,
    pub status: String,
    #[serde(default)]
    pub reviewed_at: Option<String>,
    pub reviewed_by: String,
    pub created_by: String,
    #[serde(default)]
    pub context: ReviewContext,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReviewHistoryResponse {
    pub review_history: Vec<ReviewHistoryItem>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OwnerStats {
    pub total_items: u64,
    pub items_by_status: StatusCounts,
    pub approval_rate: f64,
    pub rejection_rate: f64,
}

impl Dashboard {
    /// `GET /owner/pending_items`, optionally for one batch.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn pending_items(&self, batch_id: Option<&str>) -> Result<PendingItemsResponse, AuthError> {
        let query = optional_query(&[("batch_id", batch_id)]);
        self.get("/owner/pending_items", &query).await
    }

    /// `GET /owner/pending_batches`.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn pending_batches(&self) -> Result<PendingBatchesResponse, AuthError> {
        self.get("/owner/pending_batches", &[]).await
    }

    /// `POST /owner/update_status` for a single item.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn update_status(&self, item_id: i64, action: ReviewAction) -> Result<UpdateStatusResponse, AuthError> {
        self.post("/owner/update_status", &UpdateStatusRequest { item_id, action })
            .await
    }

    /// `POST /owner/batch_update_status` for several items.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn batch_update_status(
        &self,
        item_ids: &[i64],
        action: ReviewAction,
    ) -> Result<BatchUpdateResponse, AuthError> {
        self.post("/owner/batch_update_status", &BatchUpdateStatusRequest { item_ids, action })
            .await
    }

    /// `POST /owner/approve_batch/{batch_id}`: approve every pending item.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn approve_batch(&self, batch_id: &str) -> Result<ApproveBatchResponse, AuthError> {
        let path = format!("/owner/approve_batch/{batch_id}");
        self.post(&path, &serde_json::json!({})).await
    }

    /// `GET /owner/review_history`, optionally filtered by outcome.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn review_history(&self, status: Option<&str>) -> Result<ReviewHistoryResponse, AuthError> {
        let query = optional_query(&[("status", status)]);
        self.get("/owner/review_history", &query).await
    }

    /// `GET /owner/stats`.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn owner_stats(&self) -> Result<OwnerStats, AuthError> {
        self.get("/owner/stats", &[]).await
    }
}
