#![allow(dead_code)]

use axum::response::Response;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use guildhall_backend::{
    config::Config,
    models::{
        facility::Facility,
        occupancy::OccupancySnapshot,
        user::{User, UserRole},
    },
    repositories::{facilities, occupancy, users},
    state::AppState,
};

/// Connects to the integration database named by `TEST_DATABASE_URL` and
/// applies migrations. Returns `None` when the variable is unset so the
/// suite degrades to a no-op instead of failing on machines without
/// Postgres.
pub async fn test_pool() -> Option<PgPool> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping integration test");
            return None;
        }
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    Some(pool)
}

pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        jwt_secret: "test-secret".to_string(),
        jwt_expiration_hours: 1,
        gate_api_key: "test-gate-key".to_string(),
        time_zone: chrono_tz::UTC,
        port: 0,
    }
}

pub fn test_state(pool: PgPool) -> AppState {
    AppState::new(pool, test_config())
}

/// Inserts a user with a unique handle. `card` attaches an RFID credential.
pub async fn seed_user(
    pool: &PgPool,
    role: UserRole,
    email_verified: bool,
    card: Option<&str>,
) -> User {
    let tag = Uuid::new_v4().simple().to_string();
    let mut user = User::new(
        format!("user_{}", &tag[..12]),
        format!("{}@example.org", &tag[..12]),
        role,
        Utc::now(),
    );
    user.email_verified = email_verified;
    user.rfid_card_id = card.map(|c| c.to_string());
    users::insert_user(pool, &user).await.expect("seed user");
    user
}

/// Inserts a facility (with its zeroed snapshot) under a unique name.
pub async fn seed_facility(pool: &PgPool, capacity: Option<i32>) -> Facility {
    let tag = Uuid::new_v4().simple().to_string();
    let now = Utc::now();
    let facility = Facility::new(
        format!("Facility {}", &tag[..8]),
        None,
        None,
        capacity,
        now,
    );
    facilities::insert_facility(pool, &facility)
        .await
        .expect("seed facility");
    let snapshot = OccupancySnapshot::empty(facility.id.clone(), capacity, now);
    occupancy::upsert_snapshot(pool, &snapshot)
        .await
        .expect("seed snapshot");
    facility
}

/// Fresh credential string unique to this test run.
pub fn unique_card() -> String {
    format!("CARD-{}", Uuid::new_v4().simple())
}

pub async fn response_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Snapshot occupancy as stored, for invariant assertions.
pub async fn snapshot_occupancy(pool: &PgPool, facility_id: &str) -> i64 {
    occupancy::find_snapshot_by_facility(pool, facility_id)
        .await
        .expect("read snapshot")
        .map(|s| s.current_occupancy)
        .unwrap_or(0)
}

/// Count of active ledger rows, the source of truth the snapshot mirrors.
pub async fn active_session_count(pool: &PgPool, facility_id: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM usage_sessions WHERE facility_id = $1 AND is_active = TRUE",
    )
    .bind(facility_id)
    .fetch_one(pool)
    .await
    .expect("count sessions")
}
