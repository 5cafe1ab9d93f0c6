use serde::{Deserialize, Serialize};

use leadgen_core::models::{DEFAULT_RESULTS, ResultRecord, SearchQuery};

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SearchRequest {
    /// Site filter, e.g. "example.com"
    pub site: String,
    /// Free-text location, e.g. "NY"
    pub location: String,
    /// Business category, e.g. "bakery"
    pub category: String,
    /// Number of results to request (clamped to 0..=1000, default 10)
    pub num: Option<i64>,
}

impl From<SearchRequest> for SearchQuery {
    fn from(req: SearchRequest) -> Self {
        SearchQuery::new(
            req.site,
            req.location,
            req.category,
            req.num.unwrap_or(i64::from(DEFAULT_RESULTS)),
        )
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ResultRecordResponse {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub emails: Vec<String>,
    pub website: String,
    pub location: String,
}

impl From<ResultRecord> for ResultRecordResponse {
    fn from(r: ResultRecord) -> Self {
        Self {
            title: r.title,
            link: r.link,
            snippet: r.snippet,
            emails: r.emails,
            website: r.website,
            location: r.location,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub search_configured: bool,
    pub sync_configured: bool,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
