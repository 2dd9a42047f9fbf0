use axum::{
    body::Body,
    http::{Request, StatusCode},
    Extension, Router,
};
use serde_json::json;
use tower::ServiceExt;

use guildhall_backend::{
    handlers,
    models::user::{User, UserRole},
    state::AppState,
};

mod support;

use support::{response_json, seed_facility, seed_user, test_state};

async fn integration_guard() -> tokio::sync::MutexGuard<'static, ()> {
    static GUARD: std::sync::OnceLock<tokio::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD
        .get_or_init(|| tokio::sync::Mutex::new(()))
        .lock()
        .await
}

fn session_router(state: AppState, caller: User) -> Router {
    Router::new()
        .route(
            "/api/facilities/{id}/sessions",
            axum::routing::post(handlers::sessions::start_session),
        )
        .route(
            "/api/facilities/{id}/sessions/active",
            axum::routing::get(handlers::sessions::get_active_sessions),
        )
        .route(
            "/api/sessions/{id}/end",
            axum::routing::put(handlers::sessions::end_session),
        )
        .route(
            "/api/admin/facilities/{id}/history",
            axum::routing::get(handlers::sessions::get_usage_history),
        )
        .layer(Extension(caller))
        .with_state(state)
}

fn start_request(facility_id: &str, target_user_id: Option<&str>) -> Request<Body> {
    let body = match target_user_id {
        Some(id) => json!({ "target_user_id": id }),
        None => json!({}),
    };
    Request::builder()
        .method("POST")
        .uri(format!("/api/facilities/{}/sessions", facility_id))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn end_request(session_id: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(format!("/api/sessions/{}/end", session_id))
        .header("Content-Type", "application/json")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn start_and_end_session_round_trip() {
    let _guard = integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };

    let user = seed_user(&pool, UserRole::Member, true, None).await;
    let facility = seed_facility(&pool, Some(3)).await;
    let app = session_router(test_state(pool.clone()), user.clone());

    let response = app
        .clone()
        .oneshot(start_request(&facility.id, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["user_id"], user.id);
    assert_eq!(body["facility_id"], facility.id);
    let session_id = body["session_id"].as_str().unwrap().to_string();

    assert_eq!(support::snapshot_occupancy(&pool, &facility.id).await, 1);

    let response = app.oneshot(end_request(&session_id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["session_id"], session_id);
    assert!(body["duration_minutes"].is_i64());
    assert!(body["time_out"].is_string());

    assert_eq!(support::snapshot_occupancy(&pool, &facility.id).await, 0);
}

#[tokio::test]
async fn ending_a_session_twice_fails() {
    let _guard = integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };

    let user = seed_user(&pool, UserRole::Member, true, None).await;
    let facility = seed_facility(&pool, None).await;
    let app = session_router(test_state(pool.clone()), user.clone());

    let response = app
        .clone()
        .oneshot(start_request(&facility.id, None))
        .await
        .unwrap();
    let body = response_json(response).await;
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let response = app.clone().oneshot(end_request(&session_id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(end_request(&session_id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Session already ended");
}

#[tokio::test]
async fn duplicate_start_in_same_facility_conflicts() {
    let _guard = integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };

    let user = seed_user(&pool, UserRole::Member, true, None).await;
    let facility = seed_facility(&pool, None).await;
    let app = session_router(test_state(pool.clone()), user.clone());

    let response = app
        .clone()
        .oneshot(start_request(&facility.id, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(start_request(&facility.id, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(support::active_session_count(&pool, &facility.id).await, 1);
}

#[tokio::test]
async fn member_cannot_start_session_for_someone_else() {
    let _guard = integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };

    let caller = seed_user(&pool, UserRole::Member, true, None).await;
    let target = seed_user(&pool, UserRole::Member, true, None).await;
    let facility = seed_facility(&pool, None).await;
    let app = session_router(test_state(pool.clone()), caller);

    let response = app
        .oneshot(start_request(&facility.id, Some(&target.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn staff_can_start_and_end_on_behalf() {
    let _guard = integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };

    let staff = seed_user(&pool, UserRole::Staff, true, None).await;
    let target = seed_user(&pool, UserRole::Member, true, None).await;
    let facility = seed_facility(&pool, None).await;
    let app = session_router(test_state(pool.clone()), staff);

    let response = app
        .clone()
        .oneshot(start_request(&facility.id, Some(&target.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["user_id"], target.id);
    let session_id = body["session_id"].as_str().unwrap().to_string();

    // staff may close a session they do not own
    let response = app.oneshot(end_request(&session_id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn start_rejects_inactive_facility() {
    let _guard = integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };

    let user = seed_user(&pool, UserRole::Member, true, None).await;
    let facility = seed_facility(&pool, None).await;
    sqlx::query("UPDATE facilities SET is_active = FALSE WHERE id = $1")
        .bind(&facility.id)
        .execute(&pool)
        .await
        .unwrap();
    let app = session_router(test_state(pool.clone()), user);

    let response = app
        .oneshot(start_request(&facility.id, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Facility is not active");
}

#[tokio::test]
async fn active_sessions_endpoint_embeds_users() {
    let _guard = integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };

    let user = seed_user(&pool, UserRole::Member, true, None).await;
    let facility = seed_facility(&pool, None).await;
    let app = session_router(test_state(pool.clone()), user.clone());

    let response = app
        .clone()
        .oneshot(start_request(&facility.id, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .method("GET")
        .uri(format!("/api/facilities/{}/sessions/active", facility.id))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let sessions = body.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["user"]["username"], user.username);
    assert!(sessions[0]["time_in"].is_string());
}

#[tokio::test]
async fn usage_history_paginates_closed_sessions() {
    let _guard = integration_guard().await;
    let Some(pool) = support::test_pool().await else {
        return;
    };

    let user = seed_user(&pool, UserRole::Member, true, None).await;
    let facility = seed_facility(&pool, None).await;
    let app = session_router(test_state(pool.clone()), user.clone());

    // three closed sessions and one left open
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(start_request(&facility.id, None))
            .await
            .unwrap();
        let body = response_json(response).await;
        let session_id = body["session_id"].as_str().unwrap().to_string();
        let response = app.clone().oneshot(end_request(&session_id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app
        .clone()
        .oneshot(start_request(&facility.id, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .method("GET")
        .uri(format!(
            "/api/admin/facilities/{}/history?page=1&limit=2",
            facility.id
        ))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["sessions"].as_array().unwrap().len(), 2);

    // include_active folds the open session in
    let request = Request::builder()
        .method("GET")
        .uri(format!(
            "/api/admin/facilities/{}/history?include_active=true&limit=10",
            facility.id
        ))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let body = response_json(response).await;
    assert_eq!(body["total"], 4);
}
