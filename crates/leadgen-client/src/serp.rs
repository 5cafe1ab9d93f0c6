use std::time::Duration;

use leadgen_core::config::DEFAULT_SERP_API_BASE_URL;
use leadgen_core::error::AppError;
use leadgen_core::models::OrganicResult;
use leadgen_core::traits::SearchProvider;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::fetcher::classify;

const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(60);
const SEARCH_ENGINE: &str = "google";

/// SerpAPI client for Google web search.
///
/// Issues a single GET per query; provider errors and timeouts are not retried.
#[derive(Clone)]
pub struct SerpApiClient {
    client: Client,
    base_url: Url,
    api_key: String,
    timeout_secs: u64,
}

impl SerpApiClient {
    pub fn new(api_key: &str) -> Result<Self, AppError> {
        let base_url = Url::parse(DEFAULT_SERP_API_BASE_URL)
            .map_err(|e| AppError::ConfigError(e.to_string()))?;
        Self::with_base_url(api_key, base_url)
    }

    pub fn with_base_url(api_key: &str, base_url: Url) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(DEFAULT_SEARCH_TIMEOUT)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            timeout_secs: DEFAULT_SEARCH_TIMEOUT.as_secs(),
        })
    }
}

// ---- SerpAPI response types ----

#[derive(Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Option<Vec<OrganicResult>>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse a successful SerpAPI body. A body without `organic_results`
/// (including SerpAPI's "no results" error) yields an empty list.
fn parse_results(body: &str) -> Result<Vec<OrganicResult>, AppError> {
    let parsed: SerpResponse = serde_json::from_str(body).map_err(|e| {
        AppError::SearchProviderError(format!("Unexpected search response: {e}"))
    })?;

    match parsed.organic_results {
        Some(results) => Ok(results),
        None => {
            if let Some(error) = parsed.error {
                tracing::warn!(%error, "Search provider returned no organic results");
            }
            Ok(Vec::new())
        }
    }
}

/// Best-effort error message from a failed SerpAPI body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<SerpResponse>(body)
        .ok()
        .and_then(|r| r.error)
        .unwrap_or_else(|| body.chars().take(200).collect())
}

impl SearchProvider for SerpApiClient {
    async fn search(&self, query: &str, num: u32) -> Result<Vec<OrganicResult>, AppError> {
        let num = num.to_string();
        let response = self
            .client
            .get(self.base_url.clone())
            .query(&[
                ("engine", SEARCH_ENGINE),
                ("q", query),
                ("num", num.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| classify(e, self.timeout_secs))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::SearchProviderError(format!("Failed to read search response: {e}"))
        })?;

        if !status.is_success() {
            return Err(AppError::SearchProviderError(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_message(&body)
            )));
        }

        tracing::debug!(bytes = body.len(), "Raw search response received");
        parse_results(&body)
    }
}
