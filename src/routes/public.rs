use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that are **unauthenticated** and accessible to any client.
/// These routes handle read-only access to the published event set, plus the
/// registration gateway.
///
/// Security Mandate:
/// Every event-retrieval handler here must enforce `status = 'APPROVED'` at
/// the Repository level. Pending and rejected submissions are never visible
/// to anonymous clients, on any route, under any parameter combination.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // New user creation: signup via the external identity provider, then
        // a mirrored local profile row.
        .route("/register", post(handlers::register_user))
        // GET /events?page=...&limit=...&category=...&sort=...
        // One page of approved events with category filter and sort key,
        // plus the category chip list and filtered total.
        .route("/events", get(handlers::get_events))
        // GET /events/home
        // The full approved set as a minimal card projection, id ascending.
        .route("/events/home", get(handlers::get_home_events))
        // GET /events/search?q=...
        // Bounded substring search across approved events.
        .route("/events/search", get(handlers::search_events))
        // GET /events/{id}
        // Detail view of a single approved event, images included.
        .route("/events/{id}", get(handlers::get_event_details))
}
