use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Authenticated Router Module
///
/// Routes available to any user who has passed the authentication layer:
/// event submission, the "my events" view, owner deletion, profile, and the
/// image upload pipeline.
///
/// Access Control Strategy:
/// Every handler here relies on the `AuthUser` extractor middleware applied
/// on the router layer above this module, so each handler receives a
/// validated identity. Resource-scoped decisions (e.g. owner deletion) then
/// go through the capability check against the fetched record.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /uploads/presigned
        // Issues a short-lived presigned PUT URL so the client uploads event
        // images directly to the object store before submitting the event.
        .route("/uploads/presigned", post(handlers::get_presigned_url))
        // GET /me
        // The authenticated user's profile projection.
        .route("/me", get(handlers::get_me))
        // POST /events/request
        // Submits a new event for moderation. Validation reports the full
        // field-error map in one response; success lands in PENDING.
        .route("/events/request", post(handlers::create_event_request))
        // GET /events/me
        // Everything the user has submitted, any status, creation order.
        .route("/events/me", get(handlers::get_my_events))
        // DELETE /events/me/{id}
        // Owner deletion, any status. The ownership check runs before the
        // mutation; images cascade with the event.
        .route("/events/me/{id}", delete(handlers::delete_my_event))
}
