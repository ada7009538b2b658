use std::sync::Arc;

use api::profile::default_scorer;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use common::test_helpers::{TestResult, test_utils};
use http_body_util::BodyExt;
use scoring::server::{AppState, build_router};
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_app() -> Router {
    build_router(AppState::new("sentra", Arc::new(default_scorer())))
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_reports_healthy() {
    let app = test_app();

    let request = Request::builder()
        .uri("/health")
        .method("GET")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["service"], json!("sentra"));
}

#[tokio::test]
async fn predict_accepts_direct_json() -> TestResult {
    let app = test_app();

    // Act: the canonical high-risk record
    let payload = json!({
        "amount": 6000,
        "merchant": "cash advance",
        "time": "03:00",
        "location": "nigeria",
        "card_type": "unknown",
    });
    let (parts, body) =
        test_utils::build_request("POST", "/api/predict", Some(payload.to_string()))?.into_parts();
    let response = app
        .oneshot(Request::from_parts(parts, Body::from(body)))
        .await
        .map_err(|e| common::TestError::generic(format!("Request failed: {}", e)))?;

    // Assert
    test_utils::check_status_code(response.status(), StatusCode::OK)?;
    let result = response_json(response).await;
    assert_eq!(result["prediction"], json!("fraud"));
    assert_eq!(result["risk_score"], json!(1.0));
    assert_eq!(result["threshold_used"], json!(0.5));
    assert_eq!(result["features"]["high_amount"], json!(true));

    Ok(())
}

#[tokio::test]
async fn predict_accepts_wrapped_data_field() {
    let app = test_app();

    // Legacy callers send the record as a JSON-encoded string in `data`
    let inner = json!({ "amount": 20, "merchant": "grocery store", "card_type": "credit" });
    let payload = json!({ "data": inner.to_string() });

    let request = Request::builder()
        .uri("/api/predict")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let result = response_json(response).await;
    assert_eq!(result["prediction"], json!("legitimate"));
    assert_eq!(result["risk_score"], json!(0.0));
}

#[tokio::test]
async fn predict_rejects_invalid_nested_json() {
    let app = test_app();

    for payload in [json!({ "data": "{not json" }), json!({ "data": 42 })] {
        let request = Request::builder()
            .uri("/api/predict")
            .method("POST")
            .header("Content-Type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert_eq!(body, json!({ "error": "Invalid JSON format in data field" }));
    }
}

#[tokio::test]
async fn predict_requires_amount() {
    let app = test_app();

    let request = Request::builder()
        .uri("/api/predict")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(json!({ "merchant": "grocery store" }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body, json!({ "error": "Missing required field: amount" }));
}

#[tokio::test]
async fn predict_rejects_malformed_body() {
    let app = test_app();

    let request = Request::builder()
        .uri("/api/predict")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from("{oops"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body, json!({ "error": "Missing transaction data" }));
}

#[tokio::test]
async fn batch_predict_scores_every_record() {
    let app = test_app();

    let payload = json!({
        "transactions": [
            { "amount": 20, "card_type": "credit" },
            { "amount": 6000, "merchant": "cash advance", "time": "03:00", "location": "nigeria" },
            "not a record",
        ]
    });
    let request = Request::builder()
        .uri("/api/batch-predict")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["transaction_id"], json!(0));
    assert_eq!(results[0]["prediction"], json!("legitimate"));
    assert_eq!(results[1]["prediction"], json!("fraud"));
    assert_eq!(results[2]["transaction_id"], json!(2));
    assert!(results[2]["error"].is_string());
}

#[tokio::test]
async fn batch_predict_requires_transactions_key() {
    let app = test_app();

    let request = Request::builder()
        .uri("/api/batch-predict")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(json!({ "records": [] }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body, json!({ "error": "Missing transactions data" }));
}

#[tokio::test]
async fn model_info_reports_static_metadata() {
    let app = test_app();

    let request = Request::builder()
        .uri("/api/model-info")
        .method("GET")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["model_type"], json!("Rule-based Fraud Detection"));
    assert_eq!(body["risk_factors"]["unusual_time"], json!(0.2));
    let features = body["features"].as_array().unwrap();
    assert!(features.contains(&json!("high_risk_location")));
}

fn multipart_request(file_name: &str, content_type: &str, content: &str) -> Request<Body> {
    let boundary = "sentra-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: {content_type}\r\n\r\n\
         {content}\r\n\
         --{boundary}--\r\n"
    );
    Request::builder()
        .uri("/api/upload")
        .method("POST")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn upload_scores_csv_rows() {
    let app = test_app();

    let csv = "amount,merchant,location,time,card_type\n\
               20,grocery store,domestic,14:00,credit\n\
               6000,cash advance,nigeria,03:00,unknown";
    let response = app
        .oneshot(multipart_request("transactions.csv", "text/csv", csv))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["summary"]["total"], json!(2));
    assert_eq!(body["summary"]["fraud"], json!(1));
    assert_eq!(body["summary"]["legitimate"], json!(1));
    assert_eq!(body["summary"]["errors"], json!(0));
    let results = body["results"].as_array().unwrap();
    assert_eq!(results[1]["prediction"], json!("fraud"));
}

#[tokio::test]
async fn upload_scores_json_files() {
    let app = test_app();

    let content = json!({
        "transactions": [
            { "amount": 20, "card_type": "credit" },
            { "amount": 6000, "merchant": "gambling", "time": "02:00", "location": "offshore" },
        ]
    })
    .to_string();
    let response = app
        .oneshot(multipart_request("transactions.json", "application/json", &content))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["summary"]["total"], json!(2));
    assert_eq!(body["summary"]["fraud"], json!(1));
}

#[tokio::test]
async fn upload_rejects_garbage_json() {
    let app = test_app();

    let response = app
        .oneshot(multipart_request("transactions.json", "application/json", "{broken"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("invalid JSON upload"));
}
