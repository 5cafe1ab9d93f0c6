use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::connect_info::MockConnectInfo;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tempfile::TempDir;
use url::Url;

use leadgen_core::ScraperConfig;
use leadgen_server::routes;
use leadgen_server::state::AppState;

pub const ALLOWED_PEER: &str = "127.0.0.1:40000";
pub const BLOCKED_PEER: &str = "203.0.113.7:40000";

/// A category that makes the upstream add one slow page to the results.
pub const SLOW_CATEGORY: &str = "slowpoke";
const SLOW_PAGE_DELAY: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Upstream: search provider, target pages, and sheet endpoint in one server
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct UpstreamLog {
    pub search_calls: Mutex<Vec<HashMap<String, String>>>,
    pub sheet_posts: Mutex<Vec<serde_json::Value>>,
}

pub struct Upstream {
    pub base: String,
    pub log: Arc<UpstreamLog>,
}

impl Upstream {
    pub fn search_url(&self) -> Url {
        Url::parse(&format!("{}/search.json", self.base)).unwrap()
    }

    pub fn failing_search_url(&self) -> Url {
        Url::parse(&format!("{}/broken.json", self.base)).unwrap()
    }

    pub fn sheet_url(&self) -> Url {
        Url::parse(&format!("{}/exec", self.base)).unwrap()
    }
}

#[derive(Clone)]
struct UpstreamState {
    base: String,
    log: Arc<UpstreamLog>,
}

async fn search_json(
    State(state): State<UpstreamState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let base = &state.base;
    let mut organic = vec![
        serde_json::json!({"position": 1, "title": "Sunrise Bakery", "link": format!("{base}/page/sunrise"), "snippet": "Fresh bread"}),
        serde_json::json!({"position": 2, "title": "Gone Bakery", "link": format!("{base}/page/gone"), "snippet": "Closed"}),
        serde_json::json!({"position": 3, "title": "Corner Cakes", "link": format!("{base}/page/corner"), "snippet": "Cakes"}),
    ];
    if params.get("q").is_some_and(|q| q.contains(SLOW_CATEGORY)) {
        organic.push(serde_json::json!({"position": 4, "title": "Slow Oven", "link": format!("{base}/page/slow"), "snippet": "Eventually"}));
    }
    state.log.search_calls.lock().unwrap().push(params);

    axum::Json(serde_json::json!({
        "search_metadata": {"status": "Success"},
        "organic_results": organic
    }))
}

async fn broken_json() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(serde_json::json!({"error": "Upstream exploded"})),
    )
}

async fn page(Path(name): Path<String>) -> impl IntoResponse {
    match name.as_str() {
        "sunrise" => (
            StatusCode::OK,
            "<p>Write to <a href=\"mailto:hello@sunrise.com\">hello@sunrise.com</a></p>",
        ),
        "corner" => (StatusCode::OK, "<footer>orders@cornercakes.io</footer>"),
        "slow" => {
            tokio::time::sleep(SLOW_PAGE_DELAY).await;
            (StatusCode::OK, "late@slowoven.com")
        }
        _ => (StatusCode::NOT_FOUND, "not here"),
    }
}

async fn sheet_exec(
    State(state): State<UpstreamState>,
    axum::Json(body): axum::Json<serde_json::Value>,
) -> impl IntoResponse {
    state.log.sheet_posts.lock().unwrap().push(body);
    "Success"
}

pub async fn start_upstream() -> Upstream {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let log = Arc::new(UpstreamLog::default());

    let app = Router::new()
        .route("/search.json", get(search_json))
        .route("/broken.json", get(broken_json))
        .route("/page/{name}", get(page))
        .route("/exec", post(sheet_exec))
        .with_state(UpstreamState {
            base: base.clone(),
            log: log.clone(),
        });
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    Upstream { base, log }
}

// ---------------------------------------------------------------------------
// App under test
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub data_dir: PathBuf,
    pub processed_file: PathBuf,
    pub config: ScraperConfig,
    _tmp: TempDir,
}

pub fn test_config(tmp: &TempDir, upstream: Option<&Upstream>) -> ScraperConfig {
    let mut config = ScraperConfig {
        data_dir: tmp.path().join("data"),
        processed_file: tmp.path().join("processed.json"),
        ..ScraperConfig::default()
    };
    if let Some(upstream) = upstream {
        config.serp_api_key = Some("test-key".to_string());
        config.serp_api_base_url = upstream.search_url();
        config.google_script_url = Some(upstream.sheet_url());
    }
    config
}

/// Build the router for `config`, seen from `peer`.
pub fn build_app(config: ScraperConfig, tmp: TempDir, peer: &str) -> TestApp {
    let data_dir = config.data_dir.clone();
    let processed_file = config.processed_file.clone();
    let state = Arc::new(AppState::from_config(config.clone()).unwrap());
    let peer: SocketAddr = peer.parse().unwrap();

    TestApp {
        router: routes::router(state).layer(MockConnectInfo(peer)),
        data_dir,
        processed_file,
        config,
        _tmp: tmp,
    }
}

pub fn setup_test_app(upstream: Option<&Upstream>) -> TestApp {
    setup_test_app_from(upstream, ALLOWED_PEER)
}

pub fn setup_test_app_from(upstream: Option<&Upstream>, peer: &str) -> TestApp {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(&tmp, upstream);
    build_app(config, tmp, peer)
}
