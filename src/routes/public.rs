use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that are unauthenticated and accessible to any client. The only
/// write among them is the like action, which the original site exposes to
/// anonymous visitors as well.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Monitoring and load-balancer probe. Returns "ok" immediately.
        .route("/health", get(|| async { "ok" }))
        // GET /projects
        // Lists published projects with linked records resolved to names.
        .route("/projects", get(handlers::list_projects))
        // GET /projects/{id}
        // Raw record detail for a single project.
        .route("/projects/{id}", get(handlers::get_project))
        // POST /projects/{id}/like
        // Bumps the like counter. Counters never go down.
        .route("/projects/{id}/like", post(handlers::like_project))
}
