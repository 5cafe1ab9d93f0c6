use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "leadgen API",
        version = "0.1.0",
        description = "Search-driven lead scraper: emails from organic results, stored as JSON and synced to a spreadsheet."
    ),
    paths(
        crate::routes::search,
        crate::routes::list_files,
        crate::routes::get_file,
        crate::routes::download_all,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::SearchRequest,
        crate::dto::ResultRecordResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "search", description = "Search and scrape (allow-listed addresses only)"),
        (name = "files", description = "Stored result files"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
