use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;

use guildhall_backend::{handlers, models::user::UserRole, state::AppState};

mod support;

use support::{response_json, seed_facility, seed_user, test_state, unique_card};

async fn integration_guard() -> tokio::sync::MutexGuard<'static, ()> {
    static GUARD: std::sync::OnceLock<tokio::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD
        .get_or_init(|| tokio::sync::Mutex::new(()))
        .lock()
        .await
}

fn gate_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/access/toggle",
            axum::routing::post(handlers::access::toggle_access),
        )
        .with_state(state)
}

fn toggle_request(credential_id: &str, facility_id: &str, gate_key: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/access/toggle")
        .header("Content-Type", "application/json")
        .header("X-Gate-Key", gate_key)
        .body(Body::from(
            json!({
                "credential_id": credential_id,
                "facility_id": facility_id,
            })
            .to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn toggle_checks_in_then_out_and_restores_occupancy() {
    let _guard = integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };

    let card = unique_card();
    let user = seed_user(&pool, UserRole::Member, true, Some(&card)).await;
    let facility = seed_facility(&pool, Some(5)).await;
    let app = gate_router(test_state(pool.clone()));

    // first presentation: check-in
    let response = app
        .clone()
        .oneshot(toggle_request(&card, &facility.id, "test-gate-key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["action"], "checkin");
    assert_eq!(body["user"]["id"], user.id);
    assert_eq!(body["facility"]["name"], facility.name);
    assert!(body["duration_minutes"].is_null() || body.get("duration_minutes").is_none());

    assert_eq!(support::snapshot_occupancy(&pool, &facility.id).await, 1);
    assert_eq!(support::active_session_count(&pool, &facility.id).await, 1);

    // second presentation: check-out with computed duration
    let response = app
        .oneshot(toggle_request(&card, &facility.id, "test-gate-key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["action"], "checkout");
    assert!(body["duration_minutes"].is_i64());

    // occupancy returns to its pre-check-in value
    assert_eq!(support::snapshot_occupancy(&pool, &facility.id).await, 0);
    assert_eq!(support::active_session_count(&pool, &facility.id).await, 0);

    // snapshot mirrors the ledger after every toggle
    let closed: (bool, Option<i64>) = sqlx::query_as(
        "SELECT is_active, duration_seconds FROM usage_sessions WHERE id = $1",
    )
    .bind(body["session_id"].as_str().unwrap())
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(!closed.0);
    assert!(closed.1.is_some());
}

#[tokio::test]
async fn full_facility_denies_with_capacity_exceeded() {
    let _guard = integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };

    let card_a = unique_card();
    let card_b = unique_card();
    seed_user(&pool, UserRole::Member, true, Some(&card_a)).await;
    seed_user(&pool, UserRole::Member, true, Some(&card_b)).await;
    let facility = seed_facility(&pool, Some(1)).await;
    let app = gate_router(test_state(pool.clone()));

    let response = app
        .clone()
        .oneshot(toggle_request(&card_a, &facility.id, "test-gate-key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(support::snapshot_occupancy(&pool, &facility.id).await, 1);

    let response = app
        .oneshot(toggle_request(&card_b, &facility.id, "test-gate-key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response).await;
    assert_eq!(body["code"], "ACCESS_DENIED");
    assert_eq!(body["details"]["reason"], "capacity_exceeded");

    // the denial was audited even though the call failed
    let denied: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM access_log \
         WHERE facility_id = $1 AND denied_reason = 'capacity_exceeded' AND success = FALSE",
    )
    .bind(&facility.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(denied, 1);
}

#[tokio::test]
async fn checked_in_elsewhere_denial_names_other_facility() {
    let _guard = integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };

    let card = unique_card();
    seed_user(&pool, UserRole::Member, true, Some(&card)).await;
    let facility_x = seed_facility(&pool, None).await;
    let facility_y = seed_facility(&pool, None).await;
    let app = gate_router(test_state(pool.clone()));

    let response = app
        .clone()
        .oneshot(toggle_request(&card, &facility_x.id, "test-gate-key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(toggle_request(&card, &facility_y.id, "test-gate-key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response).await;
    assert_eq!(body["details"]["reason"], "already_checked_in");
    assert_eq!(
        body["error"],
        format!("Already checked in at {}", facility_x.name)
    );

    // the denial did not disturb either ledger
    assert_eq!(support::active_session_count(&pool, &facility_x.id).await, 1);
    assert_eq!(support::active_session_count(&pool, &facility_y.id).await, 0);
}

#[tokio::test]
async fn unknown_credential_is_audited_without_user() {
    let _guard = integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };

    let facility = seed_facility(&pool, None).await;
    let app = gate_router(test_state(pool.clone()));
    let ghost_card = unique_card();

    let response = app
        .oneshot(toggle_request(&ghost_card, &facility.id, "test-gate-key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response).await;
    assert_eq!(body["details"]["reason"], "invalid_card");

    let (user_id, success): (Option<String>, bool) = sqlx::query_as(
        "SELECT user_id, success FROM access_log WHERE credential_id = $1",
    )
    .bind(&ghost_card)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(user_id.is_none());
    assert!(!success);
}

#[tokio::test]
async fn unverified_email_is_denied() {
    let _guard = integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };

    let card = unique_card();
    seed_user(&pool, UserRole::Member, false, Some(&card)).await;
    let facility = seed_facility(&pool, None).await;
    let app = gate_router(test_state(pool.clone()));

    let response = app
        .oneshot(toggle_request(&card, &facility.id, "test-gate-key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = response_json(response).await;
    assert_eq!(body["details"]["reason"], "email_not_verified");
}

#[tokio::test]
async fn gate_rejects_missing_or_wrong_device_key() {
    let _guard = integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };

    let facility = seed_facility(&pool, None).await;
    let app = gate_router(test_state(pool.clone()));

    let response = app
        .clone()
        .oneshot(toggle_request("CARD-X", &facility.id, "wrong-key"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("POST")
        .uri("/api/access/toggle")
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({"credential_id": "CARD-X", "facility_id": facility.id}).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
