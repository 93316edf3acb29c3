use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The user's canonical identity record stored in the `profiles` table.
/// Account credentials live in the external identity provider; this row only
/// carries what the API needs for ownership and role checks.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    // Primary key, mirrored from the identity provider's user id.
    pub id: Uuid,
    pub email: String,
    // The RBAC field: 'user' or 'admin'.
    pub role: String,
}

/// EventStatus
///
/// The three moderation states of an event request. New submissions always
/// start `PENDING`; only admin action moves a record to `APPROVED` or
/// `REJECTED`, and either of those may be reassigned later. Deletion is the
/// only exit from the lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[ts(export)]
#[sqlx(type_name = "event_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl EventStatus {
    /// Parses an admin-assigned moderation target. `PENDING` is not
    /// assignable: a record can only re-enter review by being resubmitted.
    pub fn moderation_target(raw: &str) -> Option<Self> {
        match raw {
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Parses an admin listing filter. All three states are valid here;
    /// anything else (including "all") means no filter.
    pub fn parse_filter(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// EventRecord
///
/// A row of the `events` table, without its images. Repository-internal;
/// the API surface always exposes the assembled [`Event`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct EventRecord {
    pub id: i64,
    // FK to profiles.id (owner). Immutable after insert.
    pub created_by: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub subcategories: Vec<String>,
    // Optional at submission; feeds the 'date' sort but is never re-checked
    // at approval time.
    pub event_date: Option<NaiveDate>,
    pub event_time: String,
    pub location: String,
    pub host_name: String,
    pub contact: Option<String>,
    pub email: String,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// EventImage
///
/// A single hosted image URL attached to an event. `position` preserves the
/// order the client submitted the URLs in. The set is fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct EventImage {
    pub id: i64,
    pub event_id: i64,
    pub url: String,
    pub position: i32,
}

/// Event
///
/// The full API representation of an event request: the record plus its
/// image URLs in submission order. This is the primary response schema.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Event {
    pub id: i64,
    pub created_by: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub subcategories: Vec<String>,
    #[ts(type = "string | null")]
    pub date: Option<NaiveDate>,
    pub time: String,
    pub location: String,
    pub host_name: String,
    pub contact: Option<String>,
    pub email: String,
    pub status: EventStatus,
    pub images: Vec<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Joins a database record with its ordered image URLs.
    pub fn assemble(record: EventRecord, images: Vec<String>) -> Self {
        Self {
            id: record.id,
            created_by: record.created_by,
            title: record.title,
            description: record.description,
            category: record.category,
            subcategories: record.subcategories,
            date: record.event_date,
            time: record.event_time,
            location: record.location,
            host_name: record.host_name,
            contact: record.contact,
            email: record.email,
            status: record.status,
            images,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// HomeEvent
///
/// Minimal projection served by the home feed: just enough for the mobile
/// client's card view.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct HomeEvent {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[ts(type = "string | null")]
    pub date: Option<NaiveDate>,
    pub category: String,
    pub images: Vec<String>,
}

/// --- Request Payloads (Input Schemas) ---

// Validation patterns, compiled once at first use.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern compiles"));
static CONTACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("contact pattern compiles"));

/// An event must carry at least this many images to be submittable.
pub const MIN_EVENT_IMAGES: usize = 4;

/// Field name → human-readable message, accumulated across the whole payload
/// so the client can render every problem at once. BTreeMap keeps the JSON
/// key order stable.
pub type FieldErrors = BTreeMap<String, String>;

/// CreateEventRequest
///
/// Input payload for submitting a new event (POST /events/request).
/// Image URLs are provided here after the client completes the
/// direct-to-cloud upload; the server never handles the binary data.
///
/// Every field is defaulted so a missing key reaches `validate` as an empty
/// value and is reported in the field-error map instead of failing JSON
/// deserialization with an opaque 422.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(default)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub subcategories: Vec<String>,
    /// Calendar date as "YYYY-MM-DD"; optional at submission.
    pub date: Option<String>,
    pub time: String,
    pub location: String,
    pub host_name: String,
    pub contact: Option<String>,
    pub email: String,
    /// Already-hosted image URLs, in display order.
    pub images: Vec<String>,
}

impl CreateEventRequest {
    /// Validates the payload, reporting the complete set of violations in one
    /// pass rather than failing on the first. On success returns the cleaned
    /// [`NewEvent`] the repository persists.
    pub fn validate(&self) -> Result<NewEvent, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.insert("title".into(), "Title is required".into());
        }

        let description = self.description.trim();
        if description.is_empty() {
            errors.insert("description".into(), "Description is required".into());
        }

        let category = self.category.trim();
        if category.is_empty() {
            errors.insert("category".into(), "Category is required".into());
        }

        let time = self.time.trim();
        if time.is_empty() {
            errors.insert("time".into(), "Time is required".into());
        }

        let email = self.email.trim();
        if !EMAIL_RE.is_match(email) {
            errors.insert("email".into(), "Enter valid email".into());
        }

        // An empty contact string is treated as "not provided".
        let contact = self
            .contact
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        if let Some(c) = contact {
            if !CONTACT_RE.is_match(c) {
                errors.insert("contact".into(), "Contact must be 10 digits".into());
            }
        }

        let event_date = match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            None => None,
            Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(d) => Some(d),
                Err(_) => {
                    errors.insert("date".into(), "Enter a valid date (YYYY-MM-DD)".into());
                    None
                }
            },
        };

        if self.images.len() < MIN_EVENT_IMAGES {
            errors.insert(
                "images".into(),
                format!("At least {} images are required", MIN_EVENT_IMAGES),
            );
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        // Sub-categories are an ordered set: drop duplicates, keep first
        // occurrence order.
        let mut subcategories: Vec<String> = Vec::new();
        for sub in &self.subcategories {
            let sub = sub.trim();
            if !sub.is_empty() && !subcategories.iter().any(|s| s == sub) {
                subcategories.push(sub.to_string());
            }
        }

        Ok(NewEvent {
            title: title.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            subcategories,
            event_date,
            event_time: time.to_string(),
            location: self.location.trim().to_string(),
            host_name: self.host_name.trim().to_string(),
            contact: contact.map(str::to_string),
            email: email.to_string(),
            images: self.images.clone(),
        })
    }
}

/// NewEvent
///
/// A creation payload that has passed validation. Field values are trimmed
/// and the date is parsed; this is what the repository inserts.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub category: String,
    pub subcategories: Vec<String>,
    pub event_date: Option<NaiveDate>,
    pub event_time: String,
    pub location: String,
    pub host_name: String,
    pub contact: Option<String>,
    pub email: String,
    pub images: Vec<String>,
}

/// RegisterUserRequest
///
/// Input payload for the public registration endpoint (POST /register).
/// The password is only passed through to the external identity provider and
/// never persisted or logged by this application. All self-registered
/// accounts get the 'user' role; admins are provisioned out of band.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterUserRequest {
    pub email: String,
    pub password: String,
}

/// UpdateEventStatusRequest
///
/// Body of the admin moderation endpoint (PATCH /events/admin/{id}/status).
/// Kept as a raw string so an out-of-enum value maps to the InvalidStatus
/// error instead of a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateEventStatusRequest {
    pub status: String,
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived upload URL for an event image
/// (POST /uploads/presigned).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    /// The original filename, used to derive the file extension.
    #[schema(example = "poster.jpg")]
    pub filename: String,
    /// The MIME type; must be an image type, and constrains the upload.
    #[schema(example = "image/jpeg")]
    pub file_type: String,
}

/// PresignedUrlResponse
///
/// The secure, temporary URL for client-to-cloud image transfer, plus the
/// object key to reference in the subsequent event submission.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
    /// The object key where the image will live.
    pub resource_key: String,
}

/// --- Listing Parameters (Query Engine Contract) ---

/// Default page size used whenever the client omits or mangles pagination
/// parameters. Listing endpoints coerce bad input, they never reject it.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Public search results are a single bounded page.
pub const SEARCH_RESULT_CAP: i64 = 50;

/// Normalizes 1-indexed pagination input: non-positive or missing values fall
/// back to page 1 with the default size.
pub fn normalize_pagination(page: Option<i64>, page_size: Option<i64>) -> (i64, i64) {
    let page = match page {
        Some(p) if p >= 1 => p,
        _ => 1,
    };
    let page_size = match page_size {
        Some(s) if s >= 1 => s,
        _ => DEFAULT_PAGE_SIZE,
    };
    (page, page_size)
}

/// Sort keys accepted by the public listing. Unknown input falls back to
/// `Recent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublicSort {
    /// Newest first, by id (proxy for creation order).
    #[default]
    Recent,
    /// Alphabetical by location.
    Location,
    /// Chronological by event date.
    Date,
}

impl PublicSort {
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw {
            Some("location") => Self::Location,
            Some("date") => Self::Date,
            _ => Self::Recent,
        }
    }
}

/// Sort keys accepted by the admin listing. `Upcoming` and `Past` select a
/// date sort direction only; they do not filter rows relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminSort {
    #[default]
    Recent,
    Oldest,
    Upcoming,
    Past,
    Az,
}

impl AdminSort {
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw {
            Some("oldest") => Self::Oldest,
            Some("upcoming") => Self::Upcoming,
            Some("past") => Self::Past,
            Some("az") => Self::Az,
            _ => Self::Recent,
        }
    }
}

/// Normalized parameters for the public listing query.
#[derive(Debug, Clone, Default)]
pub struct PublicListing {
    pub page: i64,
    pub page_size: i64,
    /// Exact category match; `None` means no filter ("all").
    pub category: Option<String>,
    pub sort: PublicSort,
}

/// Normalized parameters for the admin listing query.
#[derive(Debug, Clone, Default)]
pub struct AdminListing {
    pub page: i64,
    pub page_size: i64,
    /// Case-insensitive substring match over title and location.
    pub search: Option<String>,
    /// `None` means every status.
    pub status: Option<EventStatus>,
    pub sort: AdminSort,
}

/// --- Listing Responses (Output Schemas) ---

/// EventListPage
///
/// One page of the public listing, together with the distinct categories
/// present among approved events (for the client's filter chips) and the
/// total row count under the current category filter (for "has more").
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct EventListPage {
    pub events: Vec<Event>,
    pub categories: Vec<String>,
    pub total: i64,
}

/// AdminEventPage
///
/// One page of the moderation queue with the total matching the same
/// search/status filter, ignoring pagination.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminEventPage {
    pub events: Vec<Event>,
    pub total: i64,
}

/// --- Dashboard & Profile Schemas (Output) ---

/// AdminDashboardStats
///
/// Counters for the administrative dashboard (GET /events/admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_events: i64,
    pub total_users: i64,
    pub pending_review: i64,
    pub approved: i64,
    pub rejected: i64,
}

/// UserProfile
///
/// Output schema for the authenticated user's profile (GET /me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub avatar_url: Option<String>,
}
