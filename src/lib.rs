use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod json;
pub mod models;
pub mod repository;
pub mod routes;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{PostgresRepository, Repository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every blog and comment endpoint, served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_blogs, handlers::create_blog, handlers::delete_blogs,
        handlers::get_blog, handlers::update_blog, handlers::delete_blog,
        handlers::get_comments, handlers::add_comment, handlers::delete_comments,
        handlers::get_comment, handlers::update_comment, handlers::delete_comment
    ),
    components(
        schemas(
            models::Blog, models::Comment, models::User, models::CreateBlogRequest,
            models::UpdateBlogRequest, models::CreateCommentRequest,
            models::UpdateCommentRequest, models::DeleteSummary,
        )
    ),
    tags(
        (name = "blogs", description = "Blog posts and their comments")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, cloneable container of everything a request needs. The
/// repository is injected here rather than registered globally.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routes, the documentation UI, the tracing/request-id stack
/// and the CORS layer, and binds the application state.
pub fn create_router(state: AppState) -> Router {
    // CORS: whitelist from config, or any origin when none is configured.
    let cors = cors_layer(&state.config);

    // Header used to correlate a request across log lines and the response.
    let x_request_id = HeaderName::from_static("x-request-id");

    // Documentation UI plus the API routes, all sharing one AppState.
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(routes::api_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // 1. Assign a UUID request id if the client sent none.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 2. One span per request, response logged at INFO with latency.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3. Echo the request id back on the response.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // Outermost, so preflights are answered before tracing and routing.
        .layer(cors)
}

/// cors_layer
///
/// Any origin when no whitelist is configured; otherwise only the listed
/// origins. Unparseable origins are skipped with a warning.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.cors_allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

/// trace_span_logger
///
/// Span per request carrying method, URI and the `x-request-id`, so every log
/// line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
