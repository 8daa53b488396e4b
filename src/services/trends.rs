//! Trend and analysis endpoints shared by every role.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Dashboard;
use crate::state::session::AuthError;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Trend {
    pub name: String,
    pub product: String,
    pub score: f64,
    pub volume: f64,
    pub top_region: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TrendsResponse {
    pub hot_trends: Vec<Trend>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub msg: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TaxonomyResponse {
    pub taxonomy: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub velocity: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CategoryBreakdownResponse {
    pub categories: Vec<CategoryBreakdown>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub msg: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchResult {
    pub name: String,
    pub product: String,
    pub color: String,
    pub style: String,
    pub velocity: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AvailableFilters {
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub seasons: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub genders: Vec<String>,
    #[serde(default)]
    pub age_groups: Vec<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Filters for `POST /analyze`. All optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnalysisFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_group: Option<String>,
}

impl Dashboard {
    /// `GET /hot_trends`.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn hot_trends(&self) -> Result<TrendsResponse, AuthError> {
        self.get("/hot_trends", &[]).await
    }

    /// `GET /taxonomy`.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn taxonomy(&self) -> Result<TaxonomyResponse, AuthError> {
        self.get("/taxonomy", &[]).await
    }

    /// `POST /analyze`. The analysis payload is server-defined and returned as
    /// raw JSON.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn analyze_trends(&self, filters: &AnalysisFilters) -> Result<serde_json::Value, AuthError> {
        self.post("/analyze", filters).await
    }

    /// `GET /category_breakdown`.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn category_breakdown(&self) -> Result<CategoryBreakdownResponse, AuthError> {
        self.get("/category_breakdown", &[]).await
    }

    /// `GET /search?q=`.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn search_trends(&self, query: &str) -> Result<SearchResponse, AuthError> {
        self.get("/search", &[("q", query)]).await
    }

    /// `GET /available_filters`.
    ///
    /// # Errors
    ///
    /// Not signed in, or the request failed.
    pub async fn available_filters(&self) -> Result<AvailableFilters, AuthError> {
        self.get("/available_filters", &[]).await
    }
}
