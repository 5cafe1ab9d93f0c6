use futures::stream::{self, StreamExt};

use crate::email::extract_emails;
use crate::error::AppError;
use crate::models::{OrganicResult, ResultRecord, SearchQuery};
use crate::store::ResultStore;
use crate::traits::{Fetcher, SearchProvider};

/// Default number of page fetches in flight per search.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 10;

/// Orchestrates one lead search: query → fetch every organic link → extract emails → save.
///
/// Generic over the provider and the page fetcher so tests can run it
/// without network access.
#[derive(Clone)]
pub struct SearchFanout<P, F>
where
    P: SearchProvider,
    F: Fetcher,
{
    provider: P,
    fetcher: F,
    store: Option<ResultStore>,
    concurrency: usize,
}

impl<P, F> SearchFanout<P, F>
where
    P: SearchProvider,
    F: Fetcher,
{
    /// Create a fan-out that does not persist its results.
    pub fn new(provider: P, fetcher: F) -> Self {
        Self {
            provider,
            fetcher,
            store: None,
            concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }

    /// Create a fan-out that writes each run to a result file.
    pub fn with_store(provider: P, fetcher: F, store: ResultStore) -> Self {
        Self {
            provider,
            fetcher,
            store: Some(store),
            concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }

    /// Cap the number of concurrent page fetches (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Run the search and scrape every organic result.
    ///
    /// Only a provider failure is returned as an error. Page failures yield
    /// records with no emails, and a failed save is logged; in both cases
    /// the records are still returned in provider order.
    pub async fn run(&self, query: &SearchQuery) -> Result<Vec<ResultRecord>, AppError> {
        let query_string = query.query_string();
        tracing::info!(query = %query_string, num = query.count, "Searching");

        let organic = self.provider.search(&query_string, query.count).await?;
        tracing::info!(query = %query_string, results = organic.len(), "Search returned");

        let records: Vec<ResultRecord> = stream::iter(organic)
            .map(|result| scrape_result(&self.fetcher, result))
            .buffered(self.concurrency)
            .collect()
            .await;

        let with_emails = records.iter().filter(|r| !r.emails.is_empty()).count();
        tracing::info!(
            query = %query_string,
            records = records.len(),
            with_emails,
            "Fan-out complete"
        );

        if let Some(store) = &self.store {
            match store.save(&query_string, &records).await {
                Ok(path) => tracing::info!(path = %path.display(), "Results saved"),
                Err(e) => tracing::error!(error = %e, "Failed to save results locally"),
            }
        }

        Ok(records)
    }
}

/// Build the record for one organic result. Fetch failures are logged and
/// leave `emails` empty.
async fn scrape_result<F: Fetcher>(fetcher: &F, result: OrganicResult) -> ResultRecord {
    let mut record = ResultRecord::from_organic(result);
    if record.link.is_empty() {
        tracing::debug!(title = %record.title, "Organic result has no link");
        return record;
    }

    match fetcher.fetch(&record.link).await {
        Ok(body) => {
            record.emails = extract_emails(&body);
            tracing::debug!(url = %record.link, emails = record.emails.len(), "Scraped page");
        }
        Err(e) => {
            tracing::warn!(url = %record.link, error = %e, "Failed to scrape");
        }
    }
    record
}
