use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use lmi_core::RetryPolicy;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn offline_state() -> AppState {
    AppState {
        pipeline: Arc::new(Pipeline::default()),
        scraper: None,
        insight: None,
    }
}

fn app(state: AppState) -> Router {
    build_app(state, RateLimitState::new(10, Duration::from_mins(1)))
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

fn analyze_body() -> serde_json::Value {
    json!({
        "business_type": "dentist",
        "city": "Toronto",
        "records": [
            { "title": "Acme Dental", "totalScore": 4.7, "reviewsCount": 120, "location": { "lat": 43.65, "lng": -79.38 } },
            { "title": "Bright Smiles", "totalScore": 3.8, "reviewsCount": 12, "location": { "lat": 43.66, "lng": -79.40 } },
            { "title": "Nowhere", "totalScore": 4.2, "reviewsCount": 3000, "location": null }
        ]
    })
}

async fn apify_mock() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/acts/apify~google-maps-scraper/runs"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "id": "run-1", "status": "SUCCEEDED", "defaultDatasetId": "ds-1" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/datasets/ds-1/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "title": "Acme Plumbing", "totalScore": 4.6, "reviewsCount": 80, "location": { "lat": 51.04, "lng": -114.07 } }
        ])))
        .mount(&server)
        .await;
    server
}

fn live_state(apify_uri: &str, insight: Option<GeminiClient>) -> AppState {
    let scraper = ApifyClient::with_base_url("test-token", 30, apify_uri)
        .expect("client")
        .with_retry_policy(RetryPolicy::disabled());
    AppState {
        pipeline: Arc::new(Pipeline::default()),
        scraper: Some(Arc::new(scraper)),
        insight: insight.map(Arc::new),
    }
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("empty_result", StatusCode::NOT_FOUND),
        ("upstream_error", StatusCode::BAD_GATEWAY),
        ("service_unavailable", StatusCode::SERVICE_UNAVAILABLE),
        ("rate_limited", StatusCode::TOO_MANY_REQUESTS),
        ("anything_else", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), status, "code {code}");
    }
}

#[tokio::test]
async fn health_reports_provider_configuration() {
    let response = app(offline_state())
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", "req-health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-health")
    );
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["scraper"], "missing");
    assert_eq!(json["meta"]["request_id"], "req-health");
}

#[tokio::test]
async fn analyze_returns_snapshot_and_map() {
    let response = app(offline_state())
        .oneshot(post_json("/api/v1/analyze", &analyze_body()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["snapshot"]["metrics"]["count"], 2);
    assert_eq!(data["snapshot"]["dropped_records"], 1);
    assert_eq!(data["map"]["zoom"], 12);
    assert_eq!(data["map"]["markers"][0]["color"], "green");
    assert_eq!(data["map"]["markers"][1]["rating_class"], "fair");
    assert_eq!(data["narrative"]["status"], "not_requested");
    assert!(json["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn analyze_rejects_missing_city() {
    let body = json!({ "business_type": "dentist", "city": " ", "records": [] });
    let response = app(offline_state())
        .oneshot(post_json("/api/v1/analyze", &body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("city is required"));
}

#[tokio::test]
async fn analyze_with_omitted_city_is_validation_error() {
    let body = json!({ "business_type": "dentist", "records": [] });
    let response = app(offline_state())
        .oneshot(post_json("/api/v1/analyze", &body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("city is required"));
}

#[tokio::test]
async fn malformed_body_uses_error_envelope() {
    let body = json!({ "business_type": "dentist", "city": "Toronto", "records": {} });
    let response = app(offline_state())
        .oneshot(post_json("/api/v1/export.csv", &body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
    assert!(json["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn non_json_body_uses_error_envelope() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/analyze")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .expect("request");
    let response = app(offline_state())
        .oneshot(request)
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "validation_error");
}

#[tokio::test]
async fn analyze_of_no_records_is_empty_result() {
    let body = json!({ "business_type": "dentist", "city": "Toronto", "records": [] });
    let response = app(offline_state())
        .oneshot(post_json("/api/v1/analyze", &body))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "empty_result");
}

#[tokio::test]
async fn export_csv_returns_sorted_rows() {
    let response = app(offline_state())
        .oneshot(post_json("/api/v1/export.csv", &analyze_body()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("text/csv; charset=utf-8")
    );
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    assert_eq!(
        std::str::from_utf8(&body).unwrap(),
        "Business Name,Address,Stars,Reviews Count\nAcme Dental,,4.7,120\nBright Smiles,,3.8,12\n"
    );
}

#[tokio::test]
async fn search_without_scraper_is_service_unavailable() {
    let body = json!({ "business_type": "plumber", "city": "Calgary, AB" });
    let response = app(offline_state())
        .oneshot(post_json("/api/v1/search", &body))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "service_unavailable"
    );
}

#[tokio::test]
async fn incomplete_search_is_validated_before_scraper_check() {
    let body = json!({ "business_type": "plumber" });
    let response = app(offline_state())
        .oneshot(post_json("/api/v1/search", &body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "validation_error");
}

#[tokio::test]
async fn search_scrapes_and_analyzes() {
    let apify = apify_mock().await;
    let body = json!({ "business_type": "plumber", "city": "Calgary, AB", "max_results": 20 });
    let response = app(live_state(&apify.uri(), None))
        .oneshot(post_json("/api/v1/search", &body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["data"]["snapshot"]["records"][0]["name"],
        "Acme Plumbing"
    );
    assert_eq!(json["data"]["snapshot"]["query"]["max_results"], 20);
    assert_eq!(
        json["data"]["snapshot"]["records"][0]["rating_class"],
        "excellent"
    );
}

#[tokio::test]
async fn search_narrative_failure_still_returns_analysis() {
    let apify = apify_mock().await;
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&gemini)
        .await;
    let insight = GeminiClient::with_base_url("key", 30, &gemini.uri())
        .expect("client")
        .with_retry_policy(RetryPolicy::disabled());

    let body = json!({ "business_type": "plumber", "city": "Calgary, AB", "insights": true });
    let response = app(live_state(&apify.uri(), Some(insight)))
        .oneshot(post_json("/api/v1/search", &body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["narrative"]["status"], "failed");
    assert_eq!(json["data"]["snapshot"]["metrics"]["count"], 1);
}

#[tokio::test]
async fn search_upstream_failure_is_bad_gateway() {
    let apify = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&apify)
        .await;

    let body = json!({ "business_type": "plumber", "city": "Calgary, AB" });
    let response = app(live_state(&apify.uri(), None))
        .oneshot(post_json("/api/v1/search", &body))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "upstream_error");
    assert!(json["error"]["message"].as_str().unwrap().contains("scrape"));
}

#[tokio::test]
async fn search_is_rate_limited() {
    let router = build_app(
        offline_state(),
        RateLimitState::new(1, Duration::from_mins(1)),
    );
    let body = json!({ "business_type": "plumber", "city": "Calgary, AB" });

    let first = router
        .clone()
        .oneshot(post_json("/api/v1/search", &body))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::SERVICE_UNAVAILABLE);

    let second = router
        .oneshot(post_json("/api/v1/search", &body))
        .await
        .expect("response");
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(second).await["error"]["code"], "rate_limited");
}

#[tokio::test]
async fn analyze_is_not_rate_limited() {
    let router = build_app(
        offline_state(),
        RateLimitState::new(0, Duration::from_mins(1)),
    );
    let response = router
        .oneshot(post_json("/api/v1/analyze", &analyze_body()))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}
