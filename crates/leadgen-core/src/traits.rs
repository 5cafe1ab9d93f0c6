use std::future::Future;

use crate::error::AppError;
use crate::models::OrganicResult;

/// Fetches the raw body of a single page.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Runs one query against a web search provider.
pub trait SearchProvider: Send + Sync + Clone {
    /// Returns the organic results in provider order. A response without
    /// organic results is an empty list, not an error.
    fn search(
        &self,
        query: &str,
        num: u32,
    ) -> impl Future<Output = Result<Vec<OrganicResult>, AppError>> + Send;
}

/// Receives the content of one result file, e.g. a spreadsheet web app.
pub trait SheetSink: Send + Sync + Clone {
    /// Forward `data` under `sheet_name`. `Ok` means the endpoint confirmed receipt.
    fn forward(
        &self,
        sheet_name: &str,
        data: &serde_json::Value,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}
