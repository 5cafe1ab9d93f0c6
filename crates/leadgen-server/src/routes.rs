use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use leadgen_core::{AppError, SearchFanout, SearchQuery};

use crate::archive::{ARCHIVE_NAME, stream_json_files};
use crate::auth::require_allowed_ip;
use crate::dto::{HealthResponse, ResultRecordResponse, SearchRequest};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

const MAX_SEARCH_BODY_BYTES: usize = 64 * 1024;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/search", post(search))
        .layer(RequestBodyLimitLayer::new(MAX_SEARCH_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_allowed_ip,
        ));

    let public = Router::new()
        .route("/health", get(health))
        .route("/api/files", get(list_files))
        .route("/api/data/{filename}", get(get_file))
        .route("/api/download-all", get(download_all))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(protected).with_state(state)
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "One record per organic result", body = [ResultRecordResponse]),
        (status = 403, description = "Source address not allow-listed", body = crate::dto::ErrorResponse),
        (status = 502, description = "Search provider failed", body = crate::dto::ErrorResponse),
    ),
    tag = "search"
)]
pub async fn search(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let provider = state.provider.clone().ok_or_else(|| {
        AppError::ConfigError("SERP_API must be set for the search endpoint".to_string())
    })?;

    let query = SearchQuery::from(body);
    let fanout = SearchFanout::with_store(provider, state.fetcher.clone(), state.store.clone())
        .with_concurrency(state.config.fetch_concurrency);

    // Own task: a disconnecting caller must not abort the fetches or the save.
    let records = tokio::spawn(async move { fanout.run(&query).await })
        .await
        .map_err(|e| AppError::Generic(format!("Search task failed: {e}")))??;

    let response: Vec<ResultRecordResponse> =
        records.into_iter().map(ResultRecordResponse::from).collect();

    Ok(axum::Json(response))
}

// ---------------------------------------------------------------------------
// Result files
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/files",
    responses(
        (status = 200, description = "Names of stored result files", body = [String]),
    ),
    tag = "files"
)]
pub async fn list_files(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let files = state.store.list_json().await?;
    Ok(axum::Json(files))
}

#[utoipa::path(
    get,
    path = "/api/data/{filename}",
    params(
        ("filename" = String, Path, description = "Result file name")
    ),
    responses(
        (status = 200, description = "Raw file content", content_type = "application/json"),
        (status = 400, description = "Invalid filename", body = crate::dto::ErrorResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "files"
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let content = state.store.read(&filename).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], content))
}

#[utoipa::path(
    get,
    path = "/api/download-all",
    responses(
        (status = 200, description = "Zip archive of every result file", content_type = "application/zip"),
    ),
    tag = "files"
)]
pub async fn download_all(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let stream = stream_json_files(&state.store).await?;
    let disposition = format!("attachment; filename=\"{ARCHIVE_NAME}\"");

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(stream),
    ))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy",
        search_configured: state.provider.is_some(),
        sync_configured: state.config.google_script_url.is_some(),
    };

    (StatusCode::OK, axum::Json(response))
}
