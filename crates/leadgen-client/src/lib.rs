pub mod fetcher;
pub mod serp;
pub mod sheets;

pub use fetcher::ReqwestFetcher;
pub use serp::SerpApiClient;
pub use sheets::AppsScriptSink;
