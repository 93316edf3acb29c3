use async_trait::async_trait;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use campus_connect::{
    AppState,
    auth::AuthUser,
    config::AppConfig,
    error::ApiError,
    handlers::{self, AdminEventFilter, EventFilter, SearchFilter},
    models::{
        AdminDashboardStats, AdminEventPage, AdminListing, AdminSort, CreateEventRequest, Event,
        EventListPage, EventStatus, HomeEvent, NewEvent, PresignedUrlRequest, PublicListing,
        PublicSort, UpdateEventStatusRequest, User,
    },
    repository::Repository,
    storage::MockStorageService,
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use uuid::Uuid;

// --- MOCK REPOSITORY IMPLEMENTATION ---

// Central control point for handler tests. Handlers depend on the Repository
// trait, so the mock provides pre-canned outputs plus counters/recorders that
// let tests assert what the handler actually asked the store to do.
pub struct MockRepoControl {
    // Pre-canned outputs
    pub event_to_return: Option<Event>,
    pub approved_event_to_return: Option<Event>,
    pub events_to_return: Vec<Event>,
    pub page_to_return: EventListPage,
    pub admin_page_to_return: AdminEventPage,
    pub delete_result: bool,
    pub stats_to_return: AdminDashboardStats,
    pub user_to_return: Option<User>,

    // Mutation counters: prove that a rejected request never reached a write.
    pub set_status_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,

    // Recorded listing parameters, for coercion assertions.
    pub last_public_listing: Mutex<Option<PublicListing>>,
    pub last_admin_listing: Mutex<Option<AdminListing>>,
}

impl Default for MockRepoControl {
    fn default() -> Self {
        MockRepoControl {
            event_to_return: Some(Event::default()),
            approved_event_to_return: Some(Event::default()),
            events_to_return: vec![],
            page_to_return: EventListPage::default(),
            admin_page_to_return: AdminEventPage::default(),
            delete_result: true,
            stats_to_return: AdminDashboardStats::default(),
            user_to_return: Some(User::default()),
            set_status_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            last_public_listing: Mutex::new(None),
            last_admin_listing: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Repository for MockRepoControl {
    async fn create_event(&self, event: NewEvent, created_by: Uuid) -> Result<Event, sqlx::Error> {
        // Echo the submission back the way the real store would: PENDING,
        // owned by the submitter, images in order.
        Ok(Event {
            id: 1,
            created_by,
            title: event.title,
            description: event.description,
            category: event.category,
            subcategories: event.subcategories,
            date: event.event_date,
            time: event.event_time,
            location: event.location,
            host_name: event.host_name,
            contact: event.contact,
            email: event.email,
            status: EventStatus::Pending,
            images: event.images,
            ..Event::default()
        })
    }

    async fn set_event_status(
        &self,
        _id: i64,
        status: EventStatus,
    ) -> Result<Option<Event>, sqlx::Error> {
        self.set_status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.event_to_return.clone().map(|mut e| {
            e.status = status;
            e
        }))
    }

    async fn delete_event(&self, _id: i64) -> Result<bool, sqlx::Error> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.delete_result)
    }

    async fn get_event(&self, _id: i64) -> Result<Option<Event>, sqlx::Error> {
        Ok(self.event_to_return.clone())
    }

    async fn get_approved_event(&self, _id: i64) -> Result<Option<Event>, sqlx::Error> {
        Ok(self.approved_event_to_return.clone())
    }

    async fn list_public(&self, listing: PublicListing) -> Result<EventListPage, sqlx::Error> {
        *self.last_public_listing.lock().unwrap() = Some(listing);
        Ok(self.page_to_return.clone())
    }

    async fn list_home(&self) -> Result<Vec<HomeEvent>, sqlx::Error> {
        Ok(vec![])
    }

    async fn search_public(&self, _query: &str) -> Result<Vec<Event>, sqlx::Error> {
        Ok(self.events_to_return.clone())
    }

    async fn list_by_owner(&self, _owner: Uuid) -> Result<Vec<Event>, sqlx::Error> {
        Ok(self.events_to_return.clone())
    }

    async fn list_admin(&self, listing: AdminListing) -> Result<AdminEventPage, sqlx::Error> {
        *self.last_admin_listing.lock().unwrap() = Some(listing);
        Ok(self.admin_page_to_return.clone())
    }

    async fn get_user(&self, _id: Uuid) -> Result<Option<User>, sqlx::Error> {
        Ok(self.user_to_return.clone())
    }

    async fn create_user(&self, user: User) -> Result<User, sqlx::Error> {
        Ok(user)
    }

    async fn get_stats(&self) -> Result<AdminDashboardStats, sqlx::Error> {
        Ok(self.stats_to_return.clone())
    }
}

// --- TEST UTILITIES ---

const TEST_ID: Uuid = Uuid::from_u128(123);
const TEST_ADMIN_ID: Uuid = Uuid::from_u128(456);
const OTHER_USER_ID: Uuid = Uuid::from_u128(789);

fn create_test_state(repo: Arc<MockRepoControl>) -> AppState {
    AppState {
        repo: repo as campus_connect::RepositoryState,
        storage: Arc::new(MockStorageService::new()) as campus_connect::StorageState,
        config: AppConfig::default(),
    }
}

fn admin_user() -> AuthUser {
    AuthUser {
        id: TEST_ADMIN_ID,
        role: "admin".to_string(),
    }
}
fn regular_user() -> AuthUser {
    AuthUser {
        id: TEST_ID,
        role: "user".to_string(),
    }
}

fn valid_create_payload() -> CreateEventRequest {
    CreateEventRequest {
        title: "Open Mic Night".to_string(),
        description: "Bring your own poems".to_string(),
        category: "Music".to_string(),
        time: "19:30".to_string(),
        email: "soc@campus.edu".to_string(),
        images: (0..4).map(|i| format!("https://cdn.test/{i}.jpg")).collect(),
        ..CreateEventRequest::default()
    }
}

// --- CREATE ---

#[tokio::test]
async fn test_create_event_success_is_pending_and_owned() {
    let repo = Arc::new(MockRepoControl::default());
    let state = create_test_state(repo);

    let result =
        handlers::create_event_request(regular_user(), State(state), Json(valid_create_payload()))
            .await;

    let (status, Json(event)) = result.expect("valid submission succeeds");
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(event.status, EventStatus::Pending);
    assert_eq!(event.created_by, TEST_ID);
    assert_eq!(event.images.len(), 4);
}

#[tokio::test]
async fn test_create_event_reports_field_errors() {
    let repo = Arc::new(MockRepoControl::default());
    let state = create_test_state(repo);

    let mut payload = valid_create_payload();
    payload.email = "nope".to_string();
    payload.images.truncate(2);

    let result = handlers::create_event_request(regular_user(), State(state), Json(payload)).await;

    match result {
        Err(ApiError::Validation(errors)) => {
            assert_eq!(errors.get("email").map(String::as_str), Some("Enter valid email"));
            assert!(errors.contains_key("images"));
        }
        other => panic!("expected validation error, got {:?}", other.map(|_| ())),
    }
}

// --- STATUS TRANSITIONS ---

#[tokio::test]
async fn test_update_status_forbidden_for_regular_user() {
    let repo = Arc::new(MockRepoControl::default());
    let state = create_test_state(repo.clone());

    let result = handlers::update_event_status(
        regular_user(),
        State(state),
        Path(5),
        Json(UpdateEventStatusRequest {
            status: "REJECTED".to_string(),
        }),
    )
    .await;

    assert!(matches!(result, Err(ApiError::Authorization)));
    // Authorization failed closed: the store never saw a write.
    assert_eq!(repo.set_status_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_update_status_rejects_out_of_enum_value() {
    let repo = Arc::new(MockRepoControl::default());
    let state = create_test_state(repo.clone());

    for bad in ["PENDING", "DELETED", "approved", ""] {
        let result = handlers::update_event_status(
            admin_user(),
            State(state.clone()),
            Path(5),
            Json(UpdateEventStatusRequest {
                status: bad.to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::InvalidStatus)), "accepted {:?}", bad);
    }
    assert_eq!(repo.set_status_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_update_status_not_found() {
    let repo = Arc::new(MockRepoControl {
        event_to_return: None,
        ..MockRepoControl::default()
    });
    let state = create_test_state(repo);

    let result = handlers::update_event_status(
        admin_user(),
        State(state),
        Path(404),
        Json(UpdateEventStatusRequest {
            status: "APPROVED".to_string(),
        }),
    )
    .await;

    assert!(matches!(result, Err(ApiError::NotFound)));
}

#[tokio::test]
async fn test_update_status_idempotent_reassignment() {
    let repo = Arc::new(MockRepoControl::default());
    let state = create_test_state(repo.clone());

    // Approving twice in a row lands on the same final status both times.
    for _ in 0..2 {
        let Json(event) = handlers::update_event_status(
            admin_user(),
            State(state.clone()),
            Path(5),
            Json(UpdateEventStatusRequest {
                status: "APPROVED".to_string(),
            }),
        )
        .await
        .expect("admin approval succeeds");
        assert_eq!(event.status, EventStatus::Approved);
    }
    assert_eq!(repo.set_status_calls.load(Ordering::SeqCst), 2);
}

// --- DELETE ---

#[tokio::test]
async fn test_delete_forbidden_for_non_owner() {
    let repo = Arc::new(MockRepoControl {
        event_to_return: Some(Event {
            created_by: OTHER_USER_ID,
            ..Event::default()
        }),
        ..MockRepoControl::default()
    });
    let state = create_test_state(repo.clone());

    let result = handlers::delete_my_event(regular_user(), State(state), Path(9)).await;

    assert!(matches!(result, Err(ApiError::Authorization)));
    assert_eq!(repo.delete_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_delete_allowed_for_owner() {
    let repo = Arc::new(MockRepoControl {
        event_to_return: Some(Event {
            created_by: TEST_ID,
            status: EventStatus::Rejected,
            ..Event::default()
        }),
        ..MockRepoControl::default()
    });
    let state = create_test_state(repo.clone());

    // Owner may delete regardless of the record's status.
    let status = handlers::delete_my_event(regular_user(), State(state), Path(9))
        .await
        .expect("owner delete succeeds");
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(repo.delete_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_delete_not_found() {
    let repo = Arc::new(MockRepoControl {
        event_to_return: None,
        ..MockRepoControl::default()
    });
    let state = create_test_state(repo.clone());

    let result = handlers::delete_my_event(regular_user(), State(state), Path(9)).await;
    assert!(matches!(result, Err(ApiError::NotFound)));
    assert_eq!(repo.delete_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_admin_force_delete_any_owner() {
    let repo = Arc::new(MockRepoControl::default());
    let state = create_test_state(repo.clone());

    let status = handlers::admin_delete_event(admin_user(), State(state), Path(9))
        .await
        .expect("admin delete succeeds");
    assert_eq!(status, StatusCode::NO_CONTENT);

    let repo2 = Arc::new(MockRepoControl::default());
    let state2 = create_test_state(repo2.clone());
    let result = handlers::admin_delete_event(regular_user(), State(state2), Path(9)).await;
    assert!(matches!(result, Err(ApiError::Authorization)));
    assert_eq!(repo2.delete_calls.load(Ordering::SeqCst), 0);
}

// --- LISTINGS ---

#[tokio::test]
async fn test_admin_listing_forbidden_for_regular_user() {
    let repo = Arc::new(MockRepoControl::default());
    let state = create_test_state(repo);

    let result = handlers::get_admin_events(
        regular_user(),
        State(state),
        Query(AdminEventFilter {
            search: None,
            status: None,
            sort_by: None,
            page_number: None,
            page_size: None,
        }),
    )
    .await;

    assert!(matches!(result, Err(ApiError::Authorization)));
}

#[tokio::test]
async fn test_public_listing_coerces_adversarial_parameters() {
    let repo = Arc::new(MockRepoControl::default());
    let state = create_test_state(repo.clone());

    handlers::get_events(
        State(state),
        Query(EventFilter {
            page: Some(-5),
            limit: Some(0),
            category: Some("all".to_string()),
            sort: Some("bogus".to_string()),
        }),
    )
    .await
    .expect("listing never errors on bad parameters");

    let listing = repo.last_public_listing.lock().unwrap().clone().unwrap();
    assert_eq!(listing.page, 1);
    assert_eq!(listing.page_size, 10);
    assert_eq!(listing.category, None);
    assert_eq!(listing.sort, PublicSort::Recent);
}

#[tokio::test]
async fn test_admin_listing_parameter_mapping() {
    let repo = Arc::new(MockRepoControl::default());
    let state = create_test_state(repo.clone());

    handlers::get_admin_events(
        admin_user(),
        State(state.clone()),
        Query(AdminEventFilter {
            search: Some("  gala ".to_string()),
            status: Some("PENDING".to_string()),
            sort_by: Some("upcoming".to_string()),
            page_number: Some(2),
            page_size: Some(25),
        }),
    )
    .await
    .unwrap();

    let listing = repo.last_admin_listing.lock().unwrap().clone().unwrap();
    assert_eq!(listing.search.as_deref(), Some("gala"));
    assert_eq!(listing.status, Some(EventStatus::Pending));
    assert_eq!(listing.sort, AdminSort::Upcoming);
    assert_eq!(listing.page, 2);
    assert_eq!(listing.page_size, 25);

    // Unknown status strings mean "no filter", they never error.
    handlers::get_admin_events(
        admin_user(),
        State(state),
        Query(AdminEventFilter {
            search: None,
            status: Some("nonsense".to_string()),
            sort_by: None,
            page_number: None,
            page_size: None,
        }),
    )
    .await
    .unwrap();
    let listing = repo.last_admin_listing.lock().unwrap().clone().unwrap();
    assert_eq!(listing.status, None);
}

#[tokio::test]
async fn test_event_details_hides_unapproved() {
    // The repository's approved-only fetch returned nothing for this id,
    // so the public route answers 404 whether the record is pending,
    // rejected, or absent.
    let repo = Arc::new(MockRepoControl {
        approved_event_to_return: None,
        ..MockRepoControl::default()
    });
    let state = create_test_state(repo);

    let result = handlers::get_event_details(State(state), Path(3)).await;
    assert!(matches!(result, Err(ApiError::NotFound)));
}

#[tokio::test]
async fn test_search_blank_query_returns_empty() {
    let repo = Arc::new(MockRepoControl {
        events_to_return: vec![Event::default()],
        ..MockRepoControl::default()
    });
    let state = create_test_state(repo);

    let Json(results) = handlers::search_events(
        State(state),
        Query(SearchFilter {
            q: Some("   ".to_string()),
        }),
    )
    .await
    .unwrap();

    assert!(results.is_empty());
}

// --- UPLOADS ---

#[tokio::test]
async fn test_presigned_url_rejects_non_image() {
    let repo = Arc::new(MockRepoControl::default());
    let state = create_test_state(repo);

    let result = handlers::get_presigned_url(
        regular_user(),
        State(state),
        Json(PresignedUrlRequest {
            filename: "malware.exe".to_string(),
            file_type: "application/octet-stream".to_string(),
        }),
    )
    .await;

    match result {
        Err(ApiError::Validation(errors)) => assert!(errors.contains_key("file_type")),
        _ => panic!("expected validation error"),
    }
}
