//! REST API through the axum router

mod common;

use agricool::services::users::{INVALID_CREDENTIALS_MESSAGE, NO_ACCOUNT_MESSAGE};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::TestHarness;
use pretty_assertions::assert_eq;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_health_reports_database_and_offline_broker() {
    let harness = TestHarness::new().await;

    let (status, body) = harness.request("GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db"], "connected");
    assert_eq!(body["mqtt"], "offline");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_sensor_ingest_and_latest() {
    let harness = TestHarness::new().await;

    let (status, body) = harness.request("GET", "/api/sensors/latest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());

    let (status, body) = harness
        .request(
            "POST",
            "/api/sensors",
            Some(json!({
                "temperature": "30.5",
                "humidity": 66,
                "waterLevel": 81.6,
                "pumpStatus": true
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["reading"]["waterLevel"], 82);
    assert_eq!(body["transition"]["notification"]["type"], "PUMP_ON");

    let (_, latest) = harness.request("GET", "/api/sensors/latest", None).await;
    assert_eq!(latest["temperature"], 30.5);
    assert_eq!(latest["pumpOn"], true);

    let (_, list) = harness.request("GET", "/api/sensors?limit=10", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_manual_control_and_notification_feed() {
    let harness = TestHarness::new().await;

    let (status, body) = harness
        .request("POST", "/api/misting/manual", Some(json!({ "on": true })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);
    assert_eq!(body["mode"], "MANUAL");

    let (_, status_body) = harness.request("GET", "/api/misting/status", None).await;
    assert_eq!(status_body["pumpOn"], true);
    assert!(status_body["openSessionId"].is_i64());

    let (_, count) = harness
        .request("GET", "/api/notifications/unread-count", None)
        .await;
    assert_eq!(count, json!({ "count": 1 }));

    let (_, feed) = harness.request("GET", "/api/notifications?limit=5", None).await;
    let id = feed[0]["id"].as_i64().unwrap();
    assert_eq!(feed[0]["type"], "MANUAL_ON");
    assert_eq!(feed[0]["isRead"], false);

    let (status, _) = harness
        .request("POST", &format!("/api/notifications/mark-read/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, count) = harness
        .request("GET", "/api/notifications/unread-count", None)
        .await;
    assert_eq!(count["count"], 0);

    let (_, auto) = harness.request("POST", "/api/misting/auto", None).await;
    assert_eq!(auto["notification"]["type"], "AUTO_MODE");
    let (_, all) = harness
        .request("POST", "/api/notifications/mark-all-read", None)
        .await;
    assert_eq!(all["updated"], 1);
}

#[tokio::test]
async fn test_unreachable_controller_is_503() {
    let harness = TestHarness::new().await;
    harness.publisher.set_available(false);

    let (status, body) = harness
        .request("POST", "/api/misting/manual", Some(json!({ "on": true })))
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["retryable"], true);
}

#[tokio::test]
async fn test_session_endpoints_and_errors() {
    let harness = TestHarness::new().await;

    let (status, session) = harness
        .request(
            "POST",
            "/api/misting/start",
            Some(json!({ "temperature": 33.0, "humidity": 70.0, "mistingType": "MANUAL" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["mode"], "MANUAL");
    let id = session["id"].as_i64().unwrap();

    let (status, body) = harness
        .request("POST", "/api/misting/start", Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], 1302);

    let (status, ended) = harness
        .request(
            "PUT",
            &format!("/api/misting/end/{id}"),
            Some(json!({ "temperature": 29.5, "waterLevel": 85 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ended["endedAt"].is_string());

    let (status, _) = harness.request("PUT", "/api/misting/end/4242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = harness.request("GET", "/api/misting/not-a-number", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, fetched) = harness
        .request("GET", &format!("/api/misting/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], id);

    for path in ["/api/misting/today", "/api/misting/all", "/api/misting/logs"] {
        let (status, list) = harness.request("GET", path, None).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(list.as_array().unwrap().len(), 1, "{path}");
    }

    let (status, body) = harness
        .request("POST", "/api/notifications/mark-read/999", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["category"], "record");
}

#[tokio::test]
async fn test_signup_login_and_security_update() {
    let harness = TestHarness::new().await;

    let (status, body) = harness
        .request(
            "POST",
            "/signup",
            Some(json!({ "name": "Ana Cruz", "email": "Ana@Farm.ph", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "ana@farm.ph");
    assert!(body["user"].get("passwordHash").is_none());
    let id = body["user"]["id"].as_i64().unwrap();

    let (status, _) = harness
        .request(
            "POST",
            "/signup",
            Some(json!({ "name": "Ana", "email": "ana@farm.ph", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = harness
        .request(
            "POST",
            "/login",
            Some(json!({ "email": "nobody@farm.ph", "password": "secret1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["user"].is_null());
    assert_eq!(body["message"], NO_ACCOUNT_MESSAGE);

    let (_, body) = harness
        .request(
            "POST",
            "/login",
            Some(json!({ "email": "ana@farm.ph", "password": "wrong-pass" })),
        )
        .await;
    assert_eq!(body["message"], INVALID_CREDENTIALS_MESSAGE);

    let (status, _) = harness
        .request(
            "PUT",
            &format!("/api/users/{id}/security"),
            Some(json!({ "currentPassword": "wrong-pass", "newPassword": "secret2" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = harness
        .request(
            "PUT",
            &format!("/api/users/{id}/security"),
            Some(json!({ "currentPassword": "secret1", "newPassword": "secret2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = harness
        .request(
            "POST",
            "/login",
            Some(json!({ "email": "ana@farm.ph", "password": "secret2" })),
        )
        .await;
    assert_eq!(body["user"]["id"], id);

    let (_, profile) = harness
        .request("GET", &format!("/api/users/{id}"), None)
        .await;
    assert_eq!(profile["fullname"], "Ana Cruz");
    assert_eq!(profile["role"], "client");
}

#[tokio::test]
async fn test_thermal_records() {
    let harness = TestHarness::new().await;

    let (status, record) = harness
        .request(
            "POST",
            "/api/records",
            Some(json!({
                "name": "Sow-117",
                "bodyTemp": 40.3,
                "avgTemp": 39.8,
                "minTemp": 39.1,
                "ambientTemp": 30.2
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["healthStatus"], "Fever Alert");

    let (status, _) = harness
        .request("POST", "/api/records/sensor", Some(json!({ "avgTemp": 38.6 })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = harness.request("POST", "/api/simulate-scan", None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, all) = harness.request("GET", "/api/records?month=all&year=all", None).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, found) = harness.request("GET", "/api/records?search=Sow-117", None).await;
    assert_eq!(found[0]["bodyTemp"], "40.3");
    assert_eq!(found[0]["ambientTemp"], "30.2");
    assert_eq!(found[0]["humidity"], "N/A");

    let (status, _) = harness.request("GET", "/api/records?month=13", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reports_json_and_download() {
    let harness = TestHarness::new().await;
    harness
        .request("POST", "/api/misting/start", Some(json!({ "temperature": 33.0 })))
        .await;

    let (status, report) = harness.request("GET", "/api/reports", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["stats"]["totalEvents"], 1);
    assert_eq!(report["stats"]["warningEvents"], 1);

    let (status, _) = harness
        .request("GET", "/api/reports?period=weekly", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/reports/download?period=yearly")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("misting-report-yearly-"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("AGRICOOL MISTING SYSTEM REPORT"));
    assert!(text.contains("DAILY BREAKDOWN"));
    assert!(text.trim_end().ends_with("End of Report"));
}

#[tokio::test]
async fn test_sse_stream_starts_with_connection_event() {
    let harness = TestHarness::new().await;

    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .uri("/api/events")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    use futures::StreamExt;
    let mut body = response.into_body().into_data_stream();
    let first = body.next().await.unwrap().unwrap();
    let text = String::from_utf8_lossy(&first);
    assert!(text.contains("event: connection"));
}

#[tokio::test]
async fn test_session_water_level_is_clamped_for_reports() {
    let harness = TestHarness::new().await;

    let (status, session) = harness
        .request(
            "POST",
            "/api/misting/start",
            Some(json!({ "temperature": 31.0, "waterLevel": i64::MIN })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["startMetrics"]["waterLevel"], 0);
    let id = session["id"].as_i64().unwrap();

    let (status, ended) = harness
        .request(
            "PUT",
            &format!("/api/misting/end/{id}"),
            Some(json!({ "waterLevel": 250 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ended["endMetrics"]["waterLevel"], 100);

    let (status, report) = harness
        .request("GET", "/api/reports?period=daily", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["stats"]["totalEvents"], 1);
}

#[tokio::test]
async fn test_malformed_end_body_is_rejected() {
    let harness = TestHarness::new().await;
    let (_, session) = harness
        .request("POST", "/api/misting/start", Some(json!({ "temperature": 31.0 })))
        .await;
    let id = session["id"].as_i64().unwrap();

    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/misting/end/{id}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"temperature\": 29.0,"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_, fetched) = harness
        .request("GET", &format!("/api/misting/{id}"), None)
        .await;
    assert!(fetched["endedAt"].is_null());

    let (status, ended) = harness
        .request("PUT", &format!("/api/misting/end/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ended["endMetrics"]["temperature"].is_null());
}
