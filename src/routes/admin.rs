use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, patch},
};

/// Admin Router Module
///
/// Defines the moderation surface: full listing, publish toggling, project
/// creation, and deletion. The router is nested under `/admin` behind the
/// guard middleware; a request only reaches these handlers with a token that
/// passed signature and expiry checks.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET  /admin/projects: every record, publish flag included.
        // POST /admin/projects: create from display-name input.
        .route(
            "/projects",
            get(handlers::admin_list_projects).post(handlers::create_project),
        )
        // PATCH /admin/projects/{id}/publish
        // Publishes or hides a project. The core moderation endpoint.
        .route("/projects/{id}/publish", patch(handlers::set_publish_state))
        // DELETE /admin/projects/{id}
        .route("/projects/{id}", delete(handlers::delete_project))
}
