use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use apocalypse_academy::catalog::StaticCatalog;
use apocalypse_academy::config::Config;
use apocalypse_academy::store::{Latency, MemoryKeyValueStore};
use apocalypse_academy::{app, AppState};

async fn test_app() -> Router {
    let catalog = Arc::new(StaticCatalog::bundled(Latency::NONE).unwrap());
    let kv = Arc::new(MemoryKeyValueStore::new());
    let state = AppState::assemble(catalog, kv, &Config::default(), Latency::NONE)
        .await
        .unwrap();
    app(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_is_ok() {
    let app = test_app().await;
    let res = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn course_search_is_case_insensitive() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/api/courses?search=DANIEL", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body.as_array().unwrap().iter().map(|c| c["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["course-001"]);

    let (_, all) = send(&app, "GET", "/api/courses", None).await;
    assert_eq!(all.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn watching_half_the_lessons_reaches_fifty_percent() {
    let app = test_app().await;
    let base = "/api/progress/u1/course-001";

    let (status, fresh) = send(&app, "GET", base, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fresh["overall_progress"], json!(0.0));

    for (lesson, secs) in [("lesson-001", 1500), ("lesson-002", 1800), ("lesson-003", 2400)] {
        let (status, _) = send(
            &app,
            "POST",
            &format!("{base}/lessons/{lesson}"),
            Some(json!({ "watch_time": secs })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, record) = send(&app, "GET", base, None).await;
    assert_eq!(record["overall_progress"], json!(50.0));
    assert_eq!(record["completed_lessons"].as_array().unwrap().len(), 3);

    let (status, body) = send(&app, "POST", &format!("{base}/certificate"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unknown_lesson_and_course_are_not_found() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/progress/u1/course-001/lessons/lesson-999",
        Some(json!({ "watch_time": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = send(&app, "GET", "/api/progress/u1/course-404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn negative_watch_time_is_rejected() {
    let app = test_app().await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/progress/u1/course-001/lessons/lesson-001",
        Some(json!({ "watch_time": -5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn payment_validation_statuses() {
    let app = test_app().await;
    let good = json!({
        "method": "credit-card",
        "card_number": "4111 1111 1111 1111",
        "card_expiry": "12/29",
        "card_cvv": "123",
        "card_holder": "Maria Silva"
    });
    let (status, body) = send(&app, "POST", "/api/payments/validate", Some(good)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);

    let bad = json!({ "method": "pix", "document_number": "111.111.111-11" });
    let (status, body) = send(&app, "POST", "/api/payments/validate", Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn access_follows_the_session() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/api/access/premium-exclusive", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], false);

    let (status, _) = send(&app, "GET", "/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, user) = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({ "email": "ana@example.com", "password": "secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["subscription_tier"], "premium");

    let (_, body) = send(&app, "GET", "/api/access/premium-exclusive", None).await;
    assert_eq!(body["allowed"], true);
    let (_, body) = send(&app, "GET", "/api/access/vip-lounge", None).await;
    assert_eq!(body["allowed"], true);

    let (status, user) = send(
        &app,
        "POST",
        "/api/auth/register",
        Some(json!({ "email": "rui@example.com", "password": "secret", "name": "Rui" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["subscription_tier"], "basic");
    let (_, body) = send(&app, "GET", "/api/access/vip-lounge", None).await;
    assert_eq!(body["allowed"], false);
    let (_, body) = send(&app, "GET", "/api/access/basic", None).await;
    assert_eq!(body["allowed"], true);

    send(&app, "POST", "/api/auth/logout", None).await;
    let (_, body) = send(&app, "GET", "/api/access/free", None).await;
    assert_eq!(body["allowed"], false);
}

#[tokio::test]
async fn disconnected_integration_conflicts() {
    let app = test_app().await;
    let (status, _) = send(&app, "POST", "/api/integrations/telegram/disconnect", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/api/integrations/telegram/channel", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INTEGRATION_NOT_CONNECTED");

    let (status, _) = send(&app, "POST", "/api/integrations/myspace/connect", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn subscription_lifecycle() {
    let app = test_app().await;
    let (status, receipt) = send(
        &app,
        "POST",
        "/api/subscriptions",
        Some(json!({
            "user_id": "u9",
            "plan_id": "standard",
            "payment": { "method": "pix", "document_number": "123.456.789-01" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let sub_id = receipt["subscription"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "GET", "/api/users/u9/subscription", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, invoices) = send(&app, "GET", "/api/users/u9/invoices", None).await;
    assert_eq!(invoices.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &format!("/api/subscriptions/{sub_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", "/api/subscriptions/sub_missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn video_stream_defaults_to_configured_provider() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/api/videos/video-001/stream?quality=720p", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["url"],
        "https://streaming.apocalypseacademy.com/aws/video-001/720p/stream.m3u8"
    );

    let (_, body) = send(&app, "GET", "/api/videos/recommended-quality?kbps=9000", None).await;
    assert_eq!(body["quality"], "1080p");
}
