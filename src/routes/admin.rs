use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, patch},
};

/// Admin Router Module
///
/// The moderation surface under `/events/admin`. Every handler resolves the
/// caller through the `AuthUser` extractor (401 when absent) and then
/// performs the admin capability check (403 otherwise) before touching the
/// store. The static `admin` segment takes priority over the public
/// `/events/{id}` parameter route.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /events/admin?search=...&status=...&sortBy=...&pageNumber=...&pageSize=...
        // The moderation queue: all statuses unless filtered, searchable,
        // with the admin sort keys.
        .route("/events/admin", get(handlers::get_admin_events))
        // GET /events/admin/stats
        // Dashboard counters (totals and per-status review counts).
        .route("/events/admin/stats", get(handlers::get_admin_stats))
        // PATCH /events/admin/{id}/status
        // The core moderation action: assign APPROVED or REJECTED. Any
        // direction of reassignment is allowed and idempotent.
        .route(
            "/events/admin/{id}/status",
            patch(handlers::update_event_status),
        )
        // DELETE /events/admin/{id}
        // Force-delete any event regardless of owner.
        .route("/events/admin/{id}", delete(handlers::admin_delete_event))
}
