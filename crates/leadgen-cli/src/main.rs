use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use leadgen_client::{AppsScriptSink, ReqwestFetcher, SerpApiClient};
use leadgen_core::models::{DEFAULT_RESULTS, SearchQuery};
use leadgen_core::{
    ProcessedTracker, ResultStore, ScraperConfig, SearchFanout, SheetSync, TracingSyncReporter,
};

#[derive(Parser)]
#[command(name = "leadgen", version, about = "Search-driven email lead scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search, scrape every organic result for emails, and save a result file
    Search {
        /// Site filter (e.g., "example.com")
        #[arg(short, long)]
        site: String,

        /// Free-text location (e.g., "NY")
        #[arg(short, long)]
        location: String,

        /// Business category (e.g., "bakery")
        #[arg(short, long)]
        category: String,

        /// Number of results to request (clamped to 0..=1000)
        #[arg(short, long, default_value_t = i64::from(DEFAULT_RESULTS))]
        num: i64,

        /// Print records without writing a result file
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },

    /// Forward every unsent result file to the spreadsheet endpoint once
    Sync,

    /// List stored result files
    Files,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays pipeable JSON.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("leadgen=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ScraperConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Search {
            site,
            location,
            category,
            num,
            no_save,
        } => {
            let query = SearchQuery::new(site, location, category, num);
            cmd_search(&config, &query, !no_save).await?;
        }
        Commands::Sync => cmd_sync(&config).await?,
        Commands::Files => cmd_files(&config).await?,
    }

    Ok(())
}

async fn cmd_search(config: &ScraperConfig, query: &SearchQuery, save: bool) -> Result<()> {
    let key = config
        .serp_api_key
        .as_deref()
        .context("SERP_API not set. Required for the search command.")?;

    let provider = SerpApiClient::with_base_url(key, config.serp_api_base_url.clone())
        .context("Failed to create search client")?;
    let fetcher =
        ReqwestFetcher::with_timeout(config.fetch_timeout).context("Failed to create HTTP client")?;

    let fanout = if save {
        SearchFanout::with_store(provider, fetcher, ResultStore::new(&config.data_dir))
    } else {
        SearchFanout::new(provider, fetcher)
    }
    .with_concurrency(config.fetch_concurrency);

    let records = fanout.run(query).await?;

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

async fn cmd_sync(config: &ScraperConfig) -> Result<()> {
    let url = config
        .google_script_url
        .clone()
        .context("GOOGLE_SCRIPT_URL not set. Required for the sync command.")?;

    let sink = AppsScriptSink::new(url).context("Failed to create sheet client")?;
    let tracker = Arc::new(ProcessedTracker::new(&config.processed_file));
    let sync = SheetSync::new(ResultStore::new(&config.data_dir), tracker, sink);

    let report = sync.run_cycle(&TracingSyncReporter).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn cmd_files(config: &ScraperConfig) -> Result<()> {
    let store = ResultStore::new(&config.data_dir);
    let files = store.list_json().await?;

    if files.is_empty() {
        println!("No result files in {}", store.data_dir().display());
        return Ok(());
    }

    for name in &files {
        println!("{name}");
    }
    println!("\nTotal: {} files", files.len());

    Ok(())
}
