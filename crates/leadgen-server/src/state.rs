use leadgen_client::{ReqwestFetcher, SerpApiClient};
use leadgen_core::{ResultStore, ScraperConfig};

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub config: ScraperConfig,
    pub store: ResultStore,
    pub fetcher: ReqwestFetcher,
    /// Search provider client (None = `SERP_API` not configured, `/search` disabled).
    pub provider: Option<SerpApiClient>,
}

impl AppState {
    /// Build the HTTP clients described by `config`.
    pub fn from_config(config: ScraperConfig) -> Result<Self, leadgen_core::AppError> {
        let fetcher = ReqwestFetcher::with_timeout(config.fetch_timeout)?;
        let provider = config
            .serp_api_key
            .as_deref()
            .map(|key| SerpApiClient::with_base_url(key, config.serp_api_base_url.clone()))
            .transpose()?;

        Ok(Self {
            store: ResultStore::new(&config.data_dir),
            config,
            fetcher,
            provider,
        })
    }
}
