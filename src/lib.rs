use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser; // The resolved authenticated user identity.
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry
// point (main.rs) and to integration tests.
pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the
/// application by aggregating all annotated paths and schemas. The resulting
/// JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_events, handlers::get_home_events, handlers::get_event_details,
        handlers::search_events, handlers::create_event_request, handlers::get_my_events,
        handlers::delete_my_event, handlers::get_me, handlers::get_admin_events,
        handlers::update_event_status, handlers::admin_delete_event, handlers::get_admin_stats,
        handlers::register_user, handlers::get_presigned_url
    ),
    components(
        schemas(
            models::Event, models::HomeEvent, models::EventStatus, models::CreateEventRequest,
            models::UpdateEventStatusRequest, models::EventListPage, models::AdminEventPage,
            models::AdminDashboardStats, models::RegisterUserRequest, models::User,
            models::UserProfile, models::PresignedUrlRequest, models::PresignedUrlResponse,
        )
    ),
    tags(
        (name = "campus-connect", description = "Campus Connect Events API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe, immutable container holding all essential
/// application services and configuration, shared across all incoming
/// requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository layer: abstracts database access via the PgPool connection.
    pub repo: RepositoryState,
    /// Storage layer: abstracts the image bucket and presigned URL generation.
    pub storage: StorageState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These allow handlers and extractors to selectively pull components from the
// shared AppState (the AuthUser extractor needs the repository and config).

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the `authenticated_routes`.
///
/// *Mechanism*: it attempts to extract `AuthUser` from the request. Since
/// `AuthUser` implements `FromRequestParts`, a failed authentication (JWT
/// validation, DB lookup) rejects with 401 before the handler ever runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base router assembly
    let base_router = Router::new()
        // Documentation: serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: no middleware applied.
        .merge(public::public_routes())
        // Authenticated routes: protected by the `auth_middleware`.
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        // Admin routes: the '/events/admin' moderation surface. The admin
        // capability check is performed inside the handlers after
        // authentication.
        .merge(admin::admin_routes())
        // Apply the unified state to all routes.
        .with_state(state);

    // 3. Observability and correlation layers (applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request id generation: a unique UUID per request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: wraps the request/response lifecycle in
                // a span carrying the generated request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request id propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS layer
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes `TraceLayer` span creation: extracts the `x-request-id` header
/// and includes it in the structured logging metadata alongside the HTTP
/// method and URI, so every log line for a request is correlated.
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
