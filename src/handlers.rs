use crate::{
    AppState,
    auth::{self, Action, AuthUser, ROLE_USER},
    error::ApiError,
    models::{
        self, AdminDashboardStats, AdminEventPage, AdminListing, AdminSort, CreateEventRequest,
        Event, EventListPage, EventStatus, FieldErrors, HomeEvent, PublicListing, PublicSort,
        RegisterUserRequest, UpdateEventStatusRequest, User, UserProfile,
        normalize_pagination,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// EventFilter
///
/// Query parameters accepted by the public listing endpoint (GET /events).
/// All fields are optional; malformed values are coerced to safe defaults
/// rather than rejected.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct EventFilter {
    /// 1-indexed page number.
    pub page: Option<i64>,
    /// Page size.
    pub limit: Option<i64>,
    /// Exact category filter; "all" or absent means no filter.
    pub category: Option<String>,
    /// One of "recent", "location", "date". Unknown values fall back to "recent".
    pub sort: Option<String>,
}

/// AdminEventFilter
///
/// Query parameters accepted by the moderation queue endpoint
/// (GET /events/admin). Parameter names follow the mobile client's casing.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct AdminEventFilter {
    /// Case-insensitive substring over title and location.
    pub search: Option<String>,
    /// "PENDING" | "APPROVED" | "REJECTED"; "all" or unknown means no filter.
    pub status: Option<String>,
    /// One of "recent", "oldest", "upcoming", "past", "az".
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(rename = "pageNumber")]
    pub page_number: Option<i64>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<i64>,
}

/// SearchFilter
///
/// Query parameter for the public search endpoint (GET /events/search).
#[derive(Deserialize, utoipa::IntoParams)]
pub struct SearchFilter {
    pub q: Option<String>,
}

/// AuthProviderResponse
///
/// Minimal struct to deserialize the identity provider's signup response,
/// capturing the newly created user's UUID.
#[derive(Deserialize)]
struct AuthProviderResponse {
    id: Uuid,
}

// --- Public Listing Handlers ---

/// get_events
///
/// [Public Route] One page of approved events with filtering and sorting.
///
/// *Security*: the repository applies `status = 'APPROVED'` unconditionally;
/// no parameter combination can surface pending or rejected submissions.
#[utoipa::path(
    get,
    path = "/events",
    params(EventFilter),
    responses((status = 200, description = "Approved events page", body = EventListPage))
)]
pub async fn get_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Result<Json<EventListPage>, ApiError> {
    let (page, page_size) = normalize_pagination(filter.page, filter.limit);
    let category = filter
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"));

    let listing = PublicListing {
        page,
        page_size,
        category,
        sort: PublicSort::from_param(filter.sort.as_deref()),
    };

    Ok(Json(state.repo.list_public(listing).await?))
}

/// get_home_events
///
/// [Public Route] The full approved set as a minimal projection for the home
/// feed, ordered ascending by id. No pagination.
#[utoipa::path(
    get,
    path = "/events/home",
    responses((status = 200, description = "Home feed", body = [HomeEvent]))
)]
pub async fn get_home_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<HomeEvent>>, ApiError> {
    Ok(Json(state.repo.list_home().await?))
}

/// get_event_details
///
/// [Public Route] Single event fetch including images. Only approved events
/// resolve here; a pending or rejected id behaves like a missing one.
#[utoipa::path(
    get,
    path = "/events/{id}",
    params(("id" = i64, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Found", body = Event),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_event_details(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Event>, ApiError> {
    state
        .repo
        .get_approved_event(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// search_events
///
/// [Public Route] Case-insensitive substring search over title, location and
/// description of approved events. A missing or blank query returns an empty
/// result instead of an error.
#[utoipa::path(
    get,
    path = "/events/search",
    params(SearchFilter),
    responses((status = 200, description = "Matches", body = [Event]))
)]
pub async fn search_events(
    State(state): State<AppState>,
    Query(filter): Query<SearchFilter>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let query = filter.q.unwrap_or_default();
    let query = query.trim();
    if query.is_empty() {
        return Ok(Json(vec![]));
    }

    Ok(Json(state.repo.search_public(query).await?))
}

// --- Authenticated Handlers ---

/// create_event_request
///
/// [Authenticated Route] Submits a new event for moderation. The payload is
/// validated as a whole and every violation is reported in one field-error
/// map; nothing is persisted unless validation passes. The created record is
/// always PENDING and owned by the submitting user.
#[utoipa::path(
    post,
    path = "/events/request",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Created", body = Event),
        (status = 400, description = "Validation errors as a field → message map")
    )
)]
pub async fn create_event_request(
    actor: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    auth::authorize(&actor, Action::SubmitEvent, None)?;

    let new_event = payload.validate().map_err(ApiError::Validation)?;
    let event = state.repo.create_event(new_event, actor.id).await?;

    Ok((StatusCode::CREATED, Json(event)))
}

/// get_my_events
///
/// [Authenticated Route] Every event the requesting user has submitted,
/// including pending and rejected ones, ordered by creation.
#[utoipa::path(
    get,
    path = "/events/me",
    responses((status = 200, description = "My events", body = [Event]))
)]
pub async fn get_my_events(
    actor: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Event>>, ApiError> {
    auth::authorize(&actor, Action::ViewOwnEvents, None)?;
    Ok(Json(state.repo.list_by_owner(actor.id).await?))
}

/// delete_my_event
///
/// [Authenticated Route] Removes one of the user's own events, in any
/// status. The capability check runs against the fetched record before any
/// mutation, so a non-owner gets 403 with the record untouched.
#[utoipa::path(
    delete,
    path = "/events/me/{id}",
    params(("id" = i64, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_my_event(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let event = state.repo.get_event(id).await?.ok_or(ApiError::NotFound)?;
    auth::authorize(&actor, Action::DeleteEvent, Some(event.created_by))?;

    state.repo.delete_event(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// get_me
///
/// [Authenticated Route] The authenticated user's profile projection.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or(ApiError::Authentication)?;

    Ok(Json(UserProfile {
        id: user.id,
        email: user.email,
        role: user.role,
        // DiceBear gives a stable, unique avatar per user id.
        avatar_url: Some(format!(
            "https://api.dicebear.com/7.x/avataaars/svg?seed={}",
            id
        )),
    }))
}

// --- Admin Handlers ---

/// get_admin_events
///
/// [Admin Route] The moderation queue: every status unless filtered, with
/// search and the admin sort keys. `upcoming`/`past` choose a sort direction
/// only; they never filter rows by date.
#[utoipa::path(
    get,
    path = "/events/admin",
    params(AdminEventFilter),
    responses(
        (status = 200, description = "Moderation queue page", body = AdminEventPage),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_events(
    actor: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<AdminEventFilter>,
) -> Result<Json<AdminEventPage>, ApiError> {
    auth::authorize(&actor, Action::ViewModerationQueue, None)?;

    let (page, page_size) = normalize_pagination(filter.page_number, filter.page_size);
    let listing = AdminListing {
        page,
        page_size,
        search: filter
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        status: filter
            .status
            .as_deref()
            .and_then(EventStatus::parse_filter),
        sort: AdminSort::from_param(filter.sort_by.as_deref()),
    };

    Ok(Json(state.repo.list_admin(listing).await?))
}

/// update_event_status
///
/// [Admin Route] Assigns APPROVED or REJECTED to an event. Reassignment is
/// allowed in any direction and is idempotent; only the status field moves.
/// The capability check resolves before the store is touched.
#[utoipa::path(
    patch,
    path = "/events/admin/{id}/status",
    params(("id" = i64, Path, description = "Event ID")),
    request_body = UpdateEventStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Event),
        (status = 400, description = "Status outside APPROVED/REJECTED"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_event_status(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEventStatusRequest>,
) -> Result<Json<Event>, ApiError> {
    auth::authorize(&actor, Action::ModerateEvents, None)?;

    let status =
        EventStatus::moderation_target(&payload.status).ok_or(ApiError::InvalidStatus)?;

    state
        .repo
        .set_event_status(id, status)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// admin_delete_event
///
/// [Admin Route] Force-removes any event regardless of owner.
#[utoipa::path(
    delete,
    path = "/events/admin/{id}",
    params(("id" = i64, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn admin_delete_event(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    auth::authorize(&actor, Action::ModerateEvents, None)?;

    if state.repo.delete_event(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// get_admin_stats
///
/// [Admin Route] Dashboard counters for the moderation overview.
#[utoipa::path(
    get,
    path = "/events/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminDashboardStats),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_stats(
    actor: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>, ApiError> {
    auth::authorize(&actor, Action::ViewModerationQueue, None)?;
    Ok(Json(state.repo.get_stats().await?))
}

// --- Identity & Upload Glue ---

/// register_user
///
/// [Public Route] Signup via the external identity provider, then mirror the
/// resulting user id into the local `profiles` table so ownership and role
/// checks have a row to resolve against. Self-registration always yields the
/// 'user' role.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "Registered", body = User),
        (status = 400, description = "Rejected by the identity provider")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<Json<User>, StatusCode> {
    let client = reqwest::Client::new();
    let signup_url = format!("{}/auth/v1/signup", state.config.auth_url);

    let response = client
        .post(signup_url)
        .header("apikey", &state.config.auth_api_key)
        .header("Content-Type", "application/json")
        .json(&serde_json::json!({ "email": payload.email, "password": payload.password }))
        .send()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !response.status().is_success() {
        // The provider rejected the signup (duplicate email, weak password).
        return Err(StatusCode::BAD_REQUEST);
    }

    let provider_user = response
        .json::<AuthProviderResponse>()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let new_user = User {
        id: provider_user.id,
        email: payload.email,
        role: ROLE_USER.to_string(),
    };

    let created_user = state
        .repo
        .create_user(new_user)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(created_user))
}

/// get_presigned_url
///
/// [Authenticated Route] Issues a short-lived URL for uploading one event
/// image directly to the object store, before the event itself is submitted.
/// Only image content types are accepted; the URL is constrained to the
/// declared type and a 10-minute window.
#[utoipa::path(
    post,
    path = "/uploads/presigned",
    request_body = models::PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = models::PresignedUrlResponse),
        (status = 400, description = "Non-image content type")
    )
)]
pub async fn get_presigned_url(
    AuthUser { .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<models::PresignedUrlRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !payload.file_type.starts_with("image/") {
        let mut errors = FieldErrors::new();
        errors.insert("file_type".into(), "Only image uploads are supported".into());
        return Err(ApiError::Validation(errors));
    }

    // Unique, structured object key: 'events/UUID.ext'.
    let extension = std::path::Path::new(&payload.filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("bin");
    let object_key = format!("events/{}.{}", Uuid::new_v4(), extension);

    match state
        .storage
        .get_presigned_upload_url(&object_key, &payload.file_type)
        .await
    {
        Ok(url) => Ok(Json(models::PresignedUrlResponse {
            upload_url: url,
            resource_key: object_key,
        })),
        Err(e) => Err(ApiError::Storage(e)),
    }
}
