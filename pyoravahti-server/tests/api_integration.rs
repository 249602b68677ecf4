//! API integration tests for pyoravahti-server.
//!
//! These tests drive the full router with realistic JSON and multipart
//! requests: report intake, listing, matching, duplicate search, uploads
//! and the admin routes.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pyoravahti_server::{
    create_router, create_router_with_config, create_router_with_state, AppState, Config,
    Notification, Notifier, NotifyError,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// ============================================================================
// Helpers
// ============================================================================

/// Send a request and decode the JSON response body
async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// JSON POST from a given client address
fn post_from(client: &str, uri: &str, body: &Value) -> Request<Body> {
    let mut request = json_request("POST", uri, body);
    request
        .headers_mut()
        .insert("x-forwarded-for", client.parse().unwrap());
    request
}

fn lost_report(serial: &str) -> Value {
    json!({
        "brand": "Trek",
        "model": "FX 2",
        "color": "Musta",
        "serialNumber": serial,
        "lostDate": "2024-05-17",
        "place": "Kamppi",
        "contact": "040 123 4567",
        "city": "Helsinki",
        "locationLat": "60.1699",
        "locationLng": 24.9384
    })
}

fn found_report(serial: &str) -> Value {
    json!({
        "brand": "Trek",
        "model": "FX 2",
        "serialNumber": serial,
        "description": "Musta hybridi lukittuna telineeseen",
        "foundDate": "2024-05-20",
        "city": "Helsinki"
    })
}

/// Small PNG with a bright left half so it has a stable fingerprint
fn create_test_png() -> Vec<u8> {
    let img = RgbImage::from_fn(64, 64, |x, _| {
        if x < 32 {
            Rgb([240, 240, 240])
        } else {
            Rgb([20, 20, 20])
        }
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Multipart body with one part per `(filename, content type, bytes)`
fn create_image_multipart(files: &[(&str, &str, Vec<u8>)]) -> (String, Vec<u8>) {
    let boundary = "----TestBoundary7MA4YWxkTrZu0gW";
    let mut body = Vec::new();

    for (name, content_type, data) in files {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"images\"; filename=\"{}\"\r\n",
                name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    (format!("multipart/form-data; boundary={}", boundary), body)
}

fn upload_request(bike_id: &str, files: &[(&str, &str, Vec<u8>)]) -> Request<Body> {
    let (content_type, body) = create_image_multipart(files);
    Request::builder()
        .method("POST")
        .uri(format!("/api/bikes/{}/images", bike_id))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap()
}

/// Create a bike through the admin route and return its id
async fn create_bike(app: &Router, body: Value) -> String {
    let (status, json) = send(app, json_request("POST", "/api/bikes", &body)).await;
    assert_eq!(status, StatusCode::OK, "create failed: {json}");
    json["id"].as_str().unwrap().to_string()
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError("smtp down".into()))
    }
}

// ============================================================================
// Health & Readiness Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let app = create_router();

    let (status, json) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["database"], "memory");
    assert_eq!(json["databaseConnected"], true);
    assert_eq!(json["bikeCount"], 0);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint_returns_ok() {
    let app = create_router();

    let (status, json) = get_json(&app, "/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}

// ============================================================================
// Listing Tests
// ============================================================================

#[tokio::test]
async fn test_list_bikes_filters_by_status() {
    let app = create_router();
    create_bike(&app, json!({"brand": "Trek", "status": "LOST"})).await;
    create_bike(&app, json!({"brand": "Jopo", "status": "FOUND"})).await;

    let (status, json) = get_json(&app, "/api/bikes?status=FOUND").await;

    assert_eq!(status, StatusCode::OK);
    let bikes = json.as_array().unwrap();
    assert_eq!(bikes.len(), 1);
    assert_eq!(bikes[0]["brand"], "Jopo");
    assert!(bikes[0]["images"].is_array());
}

#[tokio::test]
async fn test_list_bikes_rejects_unknown_status() {
    let app = create_router();

    let (status, json) = get_json(&app, "/api/bikes?status=lost").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("FOR_SALE_EXTERNAL"));
}

#[tokio::test]
async fn test_list_bikes_near_not_implemented() {
    let app = create_router();

    let (status, json) = get_json(&app, "/api/bikes?near=60.17,24.94,5").await;

    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(json["code"], "NOT_IMPLEMENTED");
}

#[tokio::test]
async fn test_filter_and_text_search() {
    let app = create_router();
    create_bike(
        &app,
        json!({"brand": "Helkama", "color": "Punainen", "city": "Tampere", "status": "FOUND"}),
    )
    .await;
    create_bike(
        &app,
        json!({"brand": "Trek", "color": "Musta", "city": "Helsinki", "status": "FOUND"}),
    )
    .await;

    let (_, filtered) = get_json(&app, "/api/bikes/filter?color=punai").await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["brand"], "Helkama");

    let (_, searched) = get_json(&app, "/api/bikes/search?q=helsinki").await;
    assert_eq!(searched.as_array().unwrap().len(), 1);
    assert_eq!(searched[0]["brand"], "Trek");
}

#[tokio::test]
async fn test_get_unknown_bike_returns_404() {
    let app = create_router();

    let (status, json) = get_json(
        &app,
        "/api/bikes/6f1c2a9e-8d4b-4c3a-9f2e-1a2b3c4d5e6f",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Bike not found");
}

// ============================================================================
// Report Intake Tests
// ============================================================================

#[tokio::test]
async fn test_lost_report_creates_stolen_bike_with_report() {
    let app = create_router();

    let (status, json) = send(
        &app,
        post_from("10.0.0.1", "/api/report/lost", &lost_report("WTU123")),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["bike"]["status"], "STOLEN");
    assert_eq!(json["bike"]["source"], "user");
    assert_eq!(json["bike"]["locationLat"], 60.1699);
    assert_eq!(json["report"]["place"], "Kamppi");
    assert_eq!(json["report"]["userId"], "anonymous");

    let id = json["bike"]["id"].as_str().unwrap();
    let (status, details) = get_json(&app, &format!("/api/bikes/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["reports"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_report_validation_lists_missing_fields() {
    let app = create_router();

    let (status, json) = send(
        &app,
        post_from("10.0.0.2", "/api/report/stolen", &json!({"brand": "Trek"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    let fields = json["fieldErrors"].as_object().unwrap();
    for field in ["model", "color", "lostDate", "place", "contact", "city"] {
        assert!(fields.contains_key(field), "missing error for {field}");
    }
    assert!(!fields.contains_key("brand"));
}

#[tokio::test]
async fn test_report_with_banned_words_rejected() {
    let app = create_router();
    let mut report = lost_report("");
    report["place"] = json!("Perkeleen pyöräparkki");

    let (status, json) = send(&app, post_from("10.0.0.3", "/api/report/lost", &report)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Ilmoitus hylätty:"));
}

#[tokio::test]
async fn test_duplicate_serial_returns_409_with_bike_id() {
    let app = create_router();

    let (_, first) = send(
        &app,
        post_from("10.0.0.4", "/api/report/lost", &lost_report("DUP-42")),
    )
    .await;
    let (status, json) = send(
        &app,
        post_from("10.0.0.4", "/api/report/found", &found_report("DUP-42")),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "DUPLICATE_BIKE");
    assert_eq!(json["bikeId"], first["bike"]["id"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reports_register_serial_once() {
    let app = create_router();

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                send(
                    &app,
                    post_from(
                        &format!("10.1.0.{i}"),
                        "/api/report/lost",
                        &lost_report("RACE-1"),
                    ),
                )
                .await
            })
        })
        .collect();

    let mut winners = Vec::new();
    let mut conflicts = Vec::new();
    for task in tasks {
        let (status, json) = task.await.unwrap();
        match status {
            StatusCode::OK => winners.push(json),
            StatusCode::CONFLICT => conflicts.push(json),
            other => panic!("unexpected status {other}: {json}"),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts.len(), 7);
    let winner_id = &winners[0]["bike"]["id"];
    for json in &conflicts {
        assert_eq!(json["code"], "DUPLICATE_BIKE");
        assert_eq!(&json["bikeId"], winner_id);
    }

    let (_, json) = get_json(&app, "/api/search?serialNumber=RACE-1").await;
    assert_eq!(json["bikes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_report_rate_limit_per_client() {
    let app = create_router();

    for i in 0..5 {
        let (status, json) = send(
            &app,
            post_from("10.0.0.5", "/api/report/found", &found_report(&format!("RL-{i}"))),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "report {i}: {json}");
    }

    let (status, json) = send(
        &app,
        post_from("10.0.0.5", "/api/report/found", &found_report("RL-5")),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["code"], "RATE_LIMITED");

    // Other clients are unaffected
    let (status, _) = send(
        &app,
        post_from("10.0.0.6", "/api/report/found", &found_report("RL-6")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = create_router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/report/found")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_raw_report_for_unknown_bike_returns_404() {
    let app = create_router();

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/reports",
            &json!({"userId": "u1", "bikeId": "6f1c2a9e-8d4b-4c3a-9f2e-1a2b3c4d5e6f"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Matching & Duplicate Search Tests
// ============================================================================

#[tokio::test]
async fn test_found_bike_matches_lost_report_by_serial() {
    let app = create_router();

    let (_, lost) = send(
        &app,
        post_from("10.0.1.1", "/api/report/lost", &lost_report("MATCH-1")),
    )
    .await;
    let listing = create_bike(
        &app,
        json!({
            "brand": "Cannondale",
            "serialNumber": "MATCH-1",
            "city": "Espoo",
            "status": "FOR_SALE_EXTERNAL",
            "sourceUrl": "https://example.com/listing/99"
        }),
    )
    .await;

    let lost_id = lost["bike"]["id"].as_str().unwrap();
    let (status, json) = get_json(&app, &format!("/api/bikes/{}/matches", lost_id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["matches"][0]["matchedBikeId"], listing.as_str());
    assert_eq!(json["matches"][0]["matchType"], "SERIAL_NUMBER");
}

#[tokio::test]
async fn test_matches_for_unknown_bike_returns_404() {
    let app = create_router();

    let (status, json) = get_json(
        &app,
        "/api/bikes/6f1c2a9e-8d4b-4c3a-9f2e-1a2b3c4d5e6f/matches",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "BIKE_NOT_FOUND");
}

#[tokio::test]
async fn test_search_flags_serial_duplicates() {
    let app = create_router();
    let lost = create_bike(
        &app,
        json!({"brand": "Trek", "serialNumber": "SN-77", "status": "LOST"}),
    )
    .await;
    create_bike(
        &app,
        json!({
            "brand": "Trek",
            "serialNumber": "SN-77",
            "status": "FOR_SALE_EXTERNAL",
            "sourceUrl": "https://example.com/listing/77"
        }),
    )
    .await;
    create_bike(&app, json!({"brand": "Jopo", "status": "FOUND"})).await;

    let (status, json) = get_json(&app, "/api/search?status=LOST").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    let bikes = json["bikes"].as_array().unwrap();
    assert_eq!(bikes.len(), 1);
    assert_eq!(bikes[0]["id"], lost.as_str());
    assert_eq!(bikes[0]["isDuplicate"], true);
    assert_eq!(bikes[0]["duplicates"][0]["status"], "FOR_SALE_EXTERNAL");

    let (_, json) = get_json(&app, "/api/search?q=jopo").await;
    assert_eq!(json["bikes"][0]["isDuplicate"], false);
    assert_eq!(json["bikes"][0]["duplicates"], json!([]));
}

#[tokio::test]
async fn test_search_accepts_oversized_limit() {
    let app = create_router();
    create_bike(&app, json!({"brand": "Jopo", "status": "FOUND"})).await;

    let (status, json) = get_json(&app, &format!("/api/search?limit={}", u64::MAX)).await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["bikes"].as_array().unwrap().len(), 1);
}

// ============================================================================
// Image Upload Tests
// ============================================================================

fn upload_app(dir: &tempfile::TempDir) -> Router {
    let config = Config {
        upload_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    create_router_with_config(&config)
}

#[tokio::test]
async fn test_upload_sets_fingerprint_and_serves_file() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app(&dir);
    let id = create_bike(&app, json!({"brand": "Trek", "status": "FOUND"})).await;

    let (status, json) = send(
        &app,
        upload_request(
            &id,
            &[
                ("front.PNG", "image/png", create_test_png()),
                ("side.png", "image/png", create_test_png()),
            ],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["success"], true);
    assert_eq!(json["additionalImages"].as_array().unwrap().len(), 1);
    assert!(json["bike"]["phash"].as_str().is_some_and(|p| !p.is_empty()));

    let url = json["primaryImage"]["url"].as_str().unwrap();
    assert!(url.starts_with("/uploads/") && url.ends_with(".png"));

    let response = app
        .clone()
        .oneshot(Request::builder().uri(url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upload_caps_at_five_images() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app(&dir);
    let id = create_bike(&app, json!({"status": "LOST"})).await;

    let files: Vec<_> = (0..7)
        .map(|_| ("bike.png", "image/png", create_test_png()))
        .collect();
    let (status, json) = send(&app, upload_request(&id, &files)).await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["additionalImages"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_upload_rejects_non_image() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app(&dir);
    let id = create_bike(&app, json!({"status": "LOST"})).await;

    let (status, json) = send(
        &app,
        upload_request(&id, &[("notes.txt", "text/plain", b"hello".to_vec())]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Kuvatyyppi ei ole sallittu");
    assert_eq!(std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
}

#[tokio::test]
async fn test_upload_without_files() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app(&dir);
    let id = create_bike(&app, json!({"status": "LOST"})).await;

    // Only a text part, no file
    let boundary = "----TestBoundary7MA4YWxkTrZu0gW";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nkuvat tulossa\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/bikes/{}/images", id))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No files provided");
}

#[tokio::test]
async fn test_upload_to_unknown_bike_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = upload_app(&dir);

    let (status, _) = send(
        &app,
        upload_request(
            "6f1c2a9e-8d4b-4c3a-9f2e-1a2b3c4d5e6f",
            &[("bike.png", "image/png", create_test_png())],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Admin Tests
// ============================================================================

fn admin_app() -> Router {
    let config = Config {
        admin_token: Some("s3cret".into()),
        ..Config::default()
    };
    create_router_with_config(&config)
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let app = admin_app();

    let (status, json) = send(
        &app,
        json_request("POST", "/api/bikes", &json!({"status": "LOST"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");

    let mut request = json_request("POST", "/api/bikes", &json!({"status": "LOST"}));
    request
        .headers_mut()
        .insert("x-admin-token", "wrong".parse().unwrap());
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut request = json_request("POST", "/api/bikes", &json!({"status": "LOST"}));
    request
        .headers_mut()
        .insert("x-admin-token", "s3cret".parse().unwrap());
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["source"], "api");
}

#[tokio::test]
async fn test_update_archive_and_delete() {
    let app = create_router();
    let id = create_bike(&app, json!({"brand": "Trek", "status": "LOST"})).await;
    let uri = format!("/api/bikes/{}", id);

    let (status, json) = send(
        &app,
        json_request("PUT", &uri, &json!({"color": "Sininen"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["color"], "Sininen");
    assert_eq!(json["brand"], "Trek");

    let (status, json) = send(
        &app,
        json_request("POST", &format!("{}/archive", uri), &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["archived"], true);

    let (status, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(&uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get_json(&app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sync_imports_listings() {
    let app = create_router();

    let (status, summary) = send(
        &app,
        json_request("POST", "/api/external-listings/sync", &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["fetched"], 3);
    assert_eq!(summary["created"], 3);

    let (_, again) = send(
        &app,
        json_request("POST", "/api/external-listings/sync", &json!({})),
    )
    .await;
    assert_eq!(again["created"], 0);
    assert_eq!(again["updated"], 3);

    let (_, list) = get_json(&app, "/api/bikes?status=FOR_SALE_EXTERNAL").await;
    assert_eq!(list.as_array().unwrap().len(), 3);
}

// ============================================================================
// Notifications, Listings & Statistics Tests
// ============================================================================

#[tokio::test]
async fn test_claim_notifies_admin() {
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::in_memory(Config::default()).with_notifier(notifier.clone());
    let app = create_router_with_state(state);
    let id = create_bike(&app, json!({"brand": "Helkama", "model": "Jopo", "status": "FOUND"})).await;

    let (status, json) = send(
        &app,
        json_request("POST", &format!("/api/bikes/{}/claim", id), &json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "admin@pyoravahti.fi");
    assert!(sent[0].subject.contains("Helkama Jopo"));
    assert!(sent[0].subject.contains(&id));
}

#[tokio::test]
async fn test_failed_notification_returns_503() {
    let state = AppState::in_memory(Config::default()).with_notifier(Arc::new(FailingNotifier));
    let app = create_router_with_state(state);
    let id = create_bike(&app, json!({"status": "FOUND"})).await;

    let (status, json) = send(
        &app,
        json_request("POST", &format!("/api/bikes/{}/abuse", id), &json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_abuse_report_for_unknown_bike_returns_404() {
    let app = create_router();

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/bikes/6f1c2a9e-8d4b-4c3a-9f2e-1a2b3c4d5e6f/abuse",
            &json!({}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_external_listings_respect_adapter_switch() {
    let (status, json) = get_json(&create_router(), "/api/external-listings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["listings"].as_array().unwrap().len(), 3);

    let disabled = create_router_with_config(&Config {
        enable_tori_adapter: false,
        ..Config::default()
    });
    let (_, json) = get_json(&disabled, "/api/external-listings").await;
    assert_eq!(json["enabled"], false);
    assert_eq!(json["listings"], json!([]));
}

#[tokio::test]
async fn test_statistics_counts() {
    let app = create_router();
    create_bike(&app, json!({"status": "LOST"})).await;
    create_bike(&app, json!({"status": "STOLEN"})).await;
    create_bike(&app, json!({"status": "FOUND"})).await;

    let (status, json) = get_json(&app, "/api/statistics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["lostStolenCount"], 2);
    assert_eq!(json["foundCount"], 1);
    assert_eq!(json["matchesThisWeek"], 0);
    assert!(json.get("error").is_none());
}

// ============================================================================
// OpenAPI Documentation Tests
// ============================================================================

#[tokio::test]
async fn test_openapi_spec_endpoint() {
    let app = create_router();

    let (status, json) = get_json(&app, "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["info"]["title"], "Pyörävahti API");
    assert!(json["paths"]["/api/report/lost"].is_object());
    assert!(json["components"]["securitySchemes"]["admin_token"].is_object());
}

#[tokio::test]
async fn test_swagger_ui_endpoint() {
    let app = create_router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/swagger-ui/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
