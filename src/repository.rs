use crate::models::{
    AdminDashboardStats, AdminEventPage, AdminListing, AdminSort, Event, EventImage,
    EventListPage, EventRecord, EventStatus, HomeEvent, NewEvent, PublicListing, PublicSort,
    SEARCH_RESULT_CAP, User,
};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Every column of the `events` table, in the order [`EventRecord`] expects.
const EVENT_COLUMNS: &str = "id, created_by, title, description, category, subcategories, \
     event_date, event_time, location, host_name, contact, email, status, \
     created_at, updated_at";

/// Repository Trait
///
/// The abstract contract for all persistence operations, keeping handlers
/// ignorant of the concrete store (Postgres in production, mocks in tests).
///
/// Methods return `Result` so store failures propagate to the single
/// error-mapping point instead of silently degrading to empty results.
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across
/// Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Event Lifecycle ---
    /// Persists a validated submission and its images atomically, in
    /// PENDING status, owned by `created_by`.
    async fn create_event(&self, event: NewEvent, created_by: Uuid) -> Result<Event, sqlx::Error>;
    /// Assigns a new moderation status. Returns the updated event, or `None`
    /// when the id does not exist. Touches only status and updated_at.
    async fn set_event_status(
        &self,
        id: i64,
        status: EventStatus,
    ) -> Result<Option<Event>, sqlx::Error>;
    /// Unconditional delete; the caller performs the capability check first.
    /// Images go with the event via the FK cascade.
    async fn delete_event(&self, id: i64) -> Result<bool, sqlx::Error>;

    // --- Event Retrieval ---
    /// Any-status fetch, for authorization decisions and admin use.
    async fn get_event(&self, id: i64) -> Result<Option<Event>, sqlx::Error>;
    /// Public detail fetch: resolves only APPROVED events.
    async fn get_approved_event(&self, id: i64) -> Result<Option<Event>, sqlx::Error>;

    // --- Listings ---
    /// Public page: APPROVED only, optional exact category filter, selected
    /// sort, plus the distinct category list and the filtered total.
    async fn list_public(&self, listing: PublicListing) -> Result<EventListPage, sqlx::Error>;
    /// The full approved set as a minimal projection, id ascending.
    async fn list_home(&self) -> Result<Vec<HomeEvent>, sqlx::Error>;
    /// APPROVED events matching a case-insensitive substring of
    /// title/location/description, capped to a single bounded page.
    async fn search_public(&self, query: &str) -> Result<Vec<Event>, sqlx::Error>;
    /// Everything the owner has submitted, any status, id ascending.
    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Event>, sqlx::Error>;
    /// Moderation queue page: optional status filter and title/location
    /// search, admin sort keys, with the unpaginated filtered total.
    async fn list_admin(&self, listing: AdminListing) -> Result<AdminEventPage, sqlx::Error>;

    // --- User/Auth ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error>;
    async fn create_user(&self, user: User) -> Result<User, sqlx::Error>;
    async fn get_stats(&self) -> Result<AdminDashboardStats, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the ordered image URLs for a set of events and joins them onto
    /// the records, preserving the records' order.
    async fn attach_images(&self, records: Vec<EventRecord>) -> Result<Vec<Event>, sqlx::Error> {
        if records.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        let rows = sqlx::query_as::<_, EventImage>(
            "SELECT id, event_id, url, position FROM event_images \
             WHERE event_id = ANY($1) ORDER BY event_id, position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_event: HashMap<i64, Vec<String>> = HashMap::new();
        for row in rows {
            by_event.entry(row.event_id).or_default().push(row.url);
        }

        Ok(records
            .into_iter()
            .map(|record| {
                let images = by_event.remove(&record.id).unwrap_or_default();
                Event::assemble(record, images)
            })
            .collect())
    }

    async fn attach_images_one(&self, record: EventRecord) -> Result<Event, sqlx::Error> {
        let mut events = self.attach_images(vec![record]).await?;
        // attach_images returns exactly one event per input record.
        Ok(events.remove(0))
    }
}

/// Appends the admin listing's WHERE clauses (status filter + search) to a
/// query builder. Shared between the page query and its count.
fn push_admin_filters(builder: &mut QueryBuilder<'_, sqlx::Postgres>, listing: &AdminListing) {
    if let Some(status) = listing.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
    if let Some(search) = &listing.search {
        let pattern = format!("%{}%", search);
        builder.push(" AND (title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR location ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// create_event
    ///
    /// Inserts the event row and its images in one transaction: either the
    /// whole submission becomes visible or none of it does. New events are
    /// always PENDING regardless of anything in the payload.
    async fn create_event(&self, event: NewEvent, created_by: Uuid) -> Result<Event, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, EventRecord>(&format!(
            "INSERT INTO events \
                 (created_by, title, description, category, subcategories, event_date, \
                  event_time, location, host_name, contact, email, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'PENDING') \
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(created_by)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.category)
        .bind(&event.subcategories)
        .bind(event.event_date)
        .bind(&event.event_time)
        .bind(&event.location)
        .bind(&event.host_name)
        .bind(&event.contact)
        .bind(&event.email)
        .fetch_one(&mut *tx)
        .await?;

        for (position, url) in event.images.iter().enumerate() {
            sqlx::query("INSERT INTO event_images (event_id, url, position) VALUES ($1, $2, $3)")
                .bind(record.id)
                .bind(url)
                .bind(position as i32)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Event::assemble(record, event.images))
    }

    /// set_event_status
    ///
    /// The moderation write. Deliberately a single-row UPDATE touching only
    /// the status column, so concurrent admin actions stay last-write-wins
    /// with each write atomic at the store.
    async fn set_event_status(
        &self,
        id: i64,
        status: EventStatus,
    ) -> Result<Option<Event>, sqlx::Error> {
        let record = sqlx::query_as::<_, EventRecord>(&format!(
            "UPDATE events SET status = $1, updated_at = NOW() WHERE id = $2 \
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some(record) => Ok(Some(self.attach_images_one(record).await?)),
            None => Ok(None),
        }
    }

    /// delete_event
    ///
    /// Removes the event; the images table cascades. Returns whether a row
    /// was actually deleted.
    async fn delete_event(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_event(&self, id: i64) -> Result<Option<Event>, sqlx::Error> {
        let record = sqlx::query_as::<_, EventRecord>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some(record) => Ok(Some(self.attach_images_one(record).await?)),
            None => Ok(None),
        }
    }

    /// get_approved_event
    ///
    /// The public detail fetch. A pending or rejected id behaves exactly
    /// like a missing one, so the route leaks nothing about unpublished
    /// submissions.
    async fn get_approved_event(&self, id: i64) -> Result<Option<Event>, sqlx::Error> {
        let record = sqlx::query_as::<_, EventRecord>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 AND status = 'APPROVED'"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some(record) => Ok(Some(self.attach_images_one(record).await?)),
            None => Ok(None),
        }
    }

    /// list_public
    ///
    /// Implements the public page with QueryBuilder for safe
    /// parameterization. `WHERE status = 'APPROVED'` is part of the base
    /// query and cannot be filtered away. The id tiebreaker on every sort
    /// keeps sequential pages a disjoint, complete cover of the filtered set.
    async fn list_public(&self, listing: PublicListing) -> Result<EventListPage, sqlx::Error> {
        let offset = (listing.page - 1) * listing.page_size;

        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE status = 'APPROVED'"
        ));
        if let Some(category) = &listing.category {
            builder.push(" AND category = ");
            builder.push_bind(category.clone());
        }
        builder.push(match listing.sort {
            PublicSort::Recent => " ORDER BY id DESC",
            PublicSort::Location => " ORDER BY location ASC, id DESC",
            PublicSort::Date => " ORDER BY event_date ASC NULLS LAST, id DESC",
        });
        builder.push(" LIMIT ");
        builder.push_bind(listing.page_size);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let records = builder
            .build_query_as::<EventRecord>()
            .fetch_all(&self.pool)
            .await?;
        let events = self.attach_images(records).await?;

        // The total honors the same category filter as the page.
        let mut count_builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM events WHERE status = 'APPROVED'");
        if let Some(category) = &listing.category {
            count_builder.push(" AND category = ");
            count_builder.push_bind(category.clone());
        }
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        // Category chips always span the whole approved set, unfiltered.
        let categories: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT category FROM events WHERE status = 'APPROVED' ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(EventListPage {
            events,
            categories,
            total,
        })
    }

    /// list_home
    ///
    /// The unpaginated home feed, id ascending, trimmed to the card
    /// projection.
    async fn list_home(&self) -> Result<Vec<HomeEvent>, sqlx::Error> {
        let records = sqlx::query_as::<_, EventRecord>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE status = 'APPROVED' ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let events = self.attach_images(records).await?;
        Ok(events
            .into_iter()
            .map(|e| HomeEvent {
                id: e.id,
                title: e.title,
                description: e.description,
                date: e.date,
                category: e.category,
                images: e.images,
            })
            .collect())
    }

    /// search_public
    ///
    /// Case-insensitive substring search across title, location and
    /// description, approved events only.
    async fn search_public(&self, query: &str) -> Result<Vec<Event>, sqlx::Error> {
        let pattern = format!("%{}%", query);
        let records = sqlx::query_as::<_, EventRecord>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE status = 'APPROVED' \
               AND (title ILIKE $1 OR location ILIKE $1 OR description ILIKE $1) \
             ORDER BY id DESC LIMIT $2"
        ))
        .bind(pattern)
        .bind(SEARCH_RESULT_CAP)
        .fetch_all(&self.pool)
        .await?;

        self.attach_images(records).await
    }

    /// list_by_owner
    ///
    /// Everything the user has submitted, including pending and rejected
    /// records. Bounded by "my events" cardinality, so no pagination.
    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Event>, sqlx::Error> {
        let records = sqlx::query_as::<_, EventRecord>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE created_by = $1 ORDER BY id ASC"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        self.attach_images(records).await
    }

    /// list_admin
    ///
    /// The moderation queue. No status restriction unless the filter names
    /// one; `upcoming`/`past` pick a date sort direction without filtering
    /// rows relative to today.
    async fn list_admin(&self, listing: AdminListing) -> Result<AdminEventPage, sqlx::Error> {
        let offset = (listing.page - 1) * listing.page_size;

        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE TRUE"));
        push_admin_filters(&mut builder, &listing);
        builder.push(match listing.sort {
            AdminSort::Recent => " ORDER BY id DESC",
            AdminSort::Oldest => " ORDER BY id ASC",
            AdminSort::Upcoming => " ORDER BY event_date ASC NULLS LAST, id DESC",
            AdminSort::Past => " ORDER BY event_date DESC NULLS LAST, id DESC",
            AdminSort::Az => " ORDER BY title ASC, id DESC",
        });
        builder.push(" LIMIT ");
        builder.push_bind(listing.page_size);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let records = builder
            .build_query_as::<EventRecord>()
            .fetch_all(&self.pool)
            .await?;
        let events = self.attach_images(records).await?;

        let mut count_builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM events WHERE TRUE");
        push_admin_filters(&mut count_builder, &listing);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok(AdminEventPage { events, total })
    }

    /// get_user
    ///
    /// Profile data (id, email, role) needed for authentication and
    /// authorization.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT id, email, role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// create_user
    ///
    /// Mirrors a profile row after the external identity provider accepts a
    /// signup.
    async fn create_user(&self, user: User) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "INSERT INTO profiles (id, email, role) VALUES ($1, $2, $3) \
             RETURNING id, email, role",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.role)
        .fetch_one(&self.pool)
        .await
    }

    /// get_stats
    ///
    /// Compiles the dashboard counters in one round trip.
    async fn get_stats(&self) -> Result<AdminDashboardStats, sqlx::Error> {
        let row: (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), \
                    COUNT(*) FILTER (WHERE status = 'PENDING'), \
                    COUNT(*) FILTER (WHERE status = 'APPROVED'), \
                    COUNT(*) FILTER (WHERE status = 'REJECTED') \
             FROM events",
        )
        .fetch_one(&self.pool)
        .await?;

        let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
            .fetch_one(&self.pool)
            .await?;

        Ok(AdminDashboardStats {
            total_events: row.0,
            total_users,
            pending_review: row.1,
            approved: row.2,
            rejected: row.3,
        })
    }
}
