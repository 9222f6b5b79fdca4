use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use std::sync::Arc;
use tokio::sync::Mutex;
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
pub mod resolver;
pub mod session;
pub mod store;

// Module for routing segregation (Public, Auth, Admin).
pub mod routes;
use auth::AuthUser; // The resolved authenticated identity.
use routes::{admin, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the application entry point.
pub use config::AppConfig;
pub use store::{AirtableStore, MockRecordStore, RecordStore, StoreState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation for the application from the
/// `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]` decorations. The
/// resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_projects, handlers::get_project, handlers::like_project,
        handlers::login, handlers::admin_list_projects, handlers::set_publish_state,
        handlers::create_project, handlers::delete_project
    ),
    components(
        schemas(
            models::Record, models::Attachment, models::ProjectSummary,
            models::LoginRequest, models::LoginResponse, models::CreateProjectRequest,
            models::PublishRequest, models::PublishResponse, models::LikeResponse,
        )
    ),
    tags(
        (name = "vitrine", description = "Portfolio showcase API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, thread-safe container holding all application services and
/// configuration, shared across every incoming request.
#[derive(Clone)]
pub struct AppState {
    /// Record store access, behind the `RecordStore` contract.
    pub store: StoreState,
    /// Serializes like-counter read-modify-write cycles within this process.
    pub like_lock: Arc<Mutex<()>>,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    pub fn new(store: StoreState, config: AppConfig) -> Self {
        Self {
            store,
            like_lock: Arc::new(Mutex::new(())),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// These implementations let extractors pull individual components out of the
// shared AppState.

impl FromRef<AppState> for StoreState {
    fn from_ref(app_state: &AppState) -> StoreState {
        app_state.store.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces authentication for the admin routes. `AuthUser` implements
/// `FromRequestParts`, so a request with a missing, malformed, expired, or
/// tampered token is rejected with a bodyless 401 before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public routes: no middleware applied.
        .merge(public::public_routes())
        // Login: public by nature, kept in its own module.
        .merge(routes::auth::auth_routes())
        // Admin routes: nested under '/admin' and wrapped in the guard, so the
        // token check runs before any moderation handler.
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    // 3. Observability and Correlation Layers (applied outermost)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID generation: a unique UUID per incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request tracing: wraps the request/response lifecycle in a
                // span correlated by the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS layer (applied last).
        .layer(cors)
}

/// trace_span_logger
///
/// Customizes span creation for `TraceLayer`: the `x-request-id` header (when
/// present) joins the HTTP method and URI in the span metadata, so every log
/// line of a request is correlated by one ID.
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
