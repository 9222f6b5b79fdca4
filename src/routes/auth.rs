use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Auth Router Module
///
/// The credential exchange. Users exist only as records in the Users table;
/// there is no registration endpoint, so login is the whole surface.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        // POST /auth/login
        // Exchanges {email, password} for a one-hour bearer token.
        .route("/auth/login", post(handlers::login))
}
