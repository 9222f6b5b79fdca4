/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// Access control is applied explicitly at the module level (via Axum layers),
/// so no protected endpoint can be exposed by accident.

/// Routes accessible to all users (anonymous, read-only plus the like action).
/// The listing handler enforces the publish filter at the store query.
pub mod public;

/// The credential exchange: login only. No signup flow exists.
pub mod auth;

/// Routes restricted to holders of a valid bearer token, wrapped in the
/// guard middleware when nested into the application router.
pub mod admin;
