use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client
/// (anonymous renters or logged-in owners): browsing and filtering listings,
/// and the one-time-code login flow itself.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated endpoint used for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/code
        // Asks the external auth provider to email a one-time login code.
        .route("/auth/code", post(handlers::request_login_code))
        // POST /auth/verify
        // Exchanges the emailed code for a session and mirrors the identity locally.
        .route("/auth/verify", post(handlers::verify_login_code))
        // GET /rooms?location=&min_rent=&max_rent=&property_type=&tenant_preference=
        // Lists published rooms with conjunctive filtering, newest first.
        .route("/rooms", get(handlers::list_rooms))
        // GET /rooms/{id}
        // Single-listing detail view; a miss is a 404, never an empty success.
        .route("/rooms/{id}", get(handlers::get_room))
}
