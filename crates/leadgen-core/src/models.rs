use serde::{Deserialize, Serialize};

/// Upper bound on the number of results requested from the search provider.
pub const MAX_RESULTS: u32 = 1000;

/// Result count used when a request does not specify one.
pub const DEFAULT_RESULTS: u32 = 10;

/// One lead-search request: a site filter, a location and a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub site: String,
    pub location: String,
    pub category: String,
    /// Number of organic results to ask for, always within `0..=MAX_RESULTS`.
    pub count: u32,
}

impl SearchQuery {
    /// Build a query, clamping `count` into `0..=MAX_RESULTS`.
    pub fn new(
        site: impl Into<String>,
        location: impl Into<String>,
        category: impl Into<String>,
        count: i64,
    ) -> Self {
        Self {
            site: site.into(),
            location: location.into(),
            category: category.into(),
            count: count.clamp(0, i64::from(MAX_RESULTS)) as u32,
        }
    }

    /// The query string sent to the provider: `site:{site} {location} {category}`.
    pub fn query_string(&self) -> String {
        format!("site:{} {} {}", self.site, self.location, self.category)
    }
}

/// A single organic result as returned by the search provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// One scraped lead, created per organic result during a fan-out.
///
/// `website` and `location` are placeholders kept in the file format for
/// later enrichment; they are always empty today.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub title: String,
    pub link: String,
    pub snippet: String,
    /// Emails in page order. Duplicates are kept.
    pub emails: Vec<String>,
    pub website: String,
    pub location: String,
}

impl ResultRecord {
    /// Start a record from a provider result, with no emails yet.
    pub fn from_organic(result: OrganicResult) -> Self {
        Self {
            title: result.title.unwrap_or_default(),
            link: result.link.unwrap_or_default(),
            snippet: result.snippet.unwrap_or_default(),
            ..Self::default()
        }
    }
}

/// The durable record of which result files have been forwarded.
///
/// Serialized as `{"sentFiles": [...]}`. Insertion order is kept and a
/// name appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedSet {
    #[serde(rename = "sentFiles", default)]
    sent_files: Vec<String>,
}

impl ProcessedSet {
    pub fn contains(&self, file_name: &str) -> bool {
        self.sent_files.iter().any(|f| f == file_name)
    }

    /// Add a filename. Returns false if it was already present.
    pub fn insert(&mut self, file_name: &str) -> bool {
        if self.contains(file_name) {
            return false;
        }
        self.sent_files.push(file_name.to_string());
        true
    }

    /// Drop repeated entries left behind by hand edits, keeping first occurrences.
    pub fn dedup(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.sent_files.retain(|f| seen.insert(f.clone()));
    }

    pub fn files(&self) -> &[String] {
        &self.sent_files
    }

    pub fn len(&self) -> usize {
        self.sent_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent_files.is_empty()
    }
}

/// Counts produced by one sync cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Files posted and marked processed during this cycle.
    pub forwarded: usize,
    /// Files already present in the processed set.
    pub already_processed: usize,
    /// Files whose content was not valid JSON.
    pub unparsable: usize,
    /// Files the endpoint did not accept; retried next cycle.
    pub failed: usize,
}
