use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Defines the owner-only routes: listing management, image upload, and
/// session teardown. Every handler here relies on the route guard middleware
/// wrapped around this module — requests without a resolvable session are
/// rejected with 401 before any handler runs, and the resolved `AuthUser`
/// drives every owner-scoped check (create stamps owner_id, update/delete are
/// scoped to it in SQL).
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The current session's mirrored identity.
        .route("/me", get(handlers::get_me))
        // GET /me/rooms
        // The owner's listing-management view, newest first.
        .route("/me/rooms", get(handlers::get_my_rooms))
        // POST /rooms
        // Publishes a new listing; owner_id comes from the session.
        .route("/rooms", post(handlers::create_room))
        // PUT/DELETE /rooms/{id}
        // Full-field replace or removal of the caller's own listing.
        // Owner scoping is enforced in the repository query.
        .route(
            "/rooms/{id}",
            put(handlers::update_room).delete(handlers::delete_room),
        )
        // POST /images
        // Multipart image batch; files upload independently and partial
        // failure is reported per file.
        .route("/images", post(handlers::upload_images))
        // POST /auth/logout
        // Invalidates the remote session behind the presented bearer token.
        .route("/auth/logout", post(handlers::sign_out))
}
