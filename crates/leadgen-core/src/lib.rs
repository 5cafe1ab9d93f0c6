pub mod config;
pub mod email;
pub mod error;
pub mod fanout;
pub mod models;
pub mod scheduler;
pub mod store;
pub mod sync;
pub mod tracker;
pub mod traits;
pub mod watcher;


pub use config::ScraperConfig;
pub use email::extract_emails;
pub use error::AppError;
pub use fanout::SearchFanout;
pub use models::{OrganicResult, ProcessedSet, ResultRecord, SearchQuery, SyncReport};
pub use scheduler::{SyncScheduler, SyncTrigger};
pub use store::ResultStore;
pub use sync::{SheetSync, SyncEvent, SyncReporter, TracingSyncReporter};
pub use tracker::ProcessedTracker;
pub use traits::{Fetcher, SearchProvider, SheetSink};
pub use watcher::DirWatcher;
