//! Scenario A/B/C/F: happy-path submission, validation failure, permission
//! denial, and idempotent retry, driven through the full HTTP pipeline.

use http::{Method, StatusCode};
use serde_json::json;

use crate::{Harness, json_body};

#[tokio::test]
async fn test_should_accept_happy_path_submission_and_read_it_back() {
    let harness = Harness::new().await;
    harness.seed_basic_sop().await;
    let token = harness.token_for("alice").await;

    let body = json!({
        "sop_id": "sop-basic-001",
        "sop_version": "1.0.0",
        "body": {"sample_id": "S000042", "temperature_c": 37},
    });
    let response = harness
        .request(Method::POST, "/api/v1/eln", Some(&token), serde_json::to_vec(&body).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let envelope = json_body(response).await;
    assert_eq!(envelope["ok"], json!(true));
    let object_key = envelope["data"]["object_key"].as_str().unwrap().to_owned();
    assert!(object_key.starts_with("sop-basic-001/alice-S000042-"));
    assert!(object_key.ends_with(".json"));

    let submission_id = envelope["data"]["submission_id"].as_str().unwrap();
    let get_response = harness
        .request(Method::GET, &format!("/api/v1/eln/{submission_id}"), Some(&token), Vec::new())
        .await;
    assert_eq!(get_response.status(), StatusCode::OK);
    let fetched = json_body(get_response).await;
    assert_eq!(fetched["data"]["sop_version"], json!("1.0.0"));
    assert_eq!(fetched["data"]["body"]["sample_id"], json!("S000042"));
    assert!(fetched["data"]["checksum"].is_string());
}

#[tokio::test]
async fn test_should_reject_validation_failure_with_detail_list() {
    let harness = Harness::new().await;
    harness.seed_basic_sop().await;
    let token = harness.token_for("alice").await;

    let body = json!({
        "sop_id": "sop-basic-001",
        "sop_version": "1.0.0",
        "body": {"sample_id": "bad", "temperature_c": 150},
    });
    let response = harness
        .request(Method::POST, "/api/v1/eln", Some(&token), serde_json::to_vec(&body).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let envelope = json_body(response).await;
    assert_eq!(envelope["ok"], json!(false));
    let details = envelope["error"]["details"].as_array().unwrap();
    let codes: Vec<&str> = details.iter().map(|d| d["code"].as_str().unwrap()).collect();
    assert!(codes.contains(&"PATTERN_MISMATCH"));
    assert!(codes.contains(&"OUT_OF_RANGE"));

    let (remaining, _) = harness
        .state
        .submissions
        .list(Some("sop-basic-001"), None, None, None, 10)
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_should_deny_submission_without_permission() {
    let harness = Harness::new().await;
    harness.seed_basic_sop().await;
    let token = harness.token_for("bob").await;

    let body = json!({
        "sop_id": "sop-basic-001",
        "sop_version": "1.0.0",
        "body": {"sample_id": "S000042", "temperature_c": 37},
    });
    let response = harness
        .request(Method::POST, "/api/v1/eln", Some(&token), serde_json::to_vec(&body).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let (remaining, _) = harness
        .state
        .submissions
        .list(Some("sop-basic-001"), None, None, None, 10)
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_should_converge_retry_with_same_idempotency_key() {
    let harness = Harness::new().await;
    harness.seed_basic_sop().await;
    let token = harness.token_for("alice").await;

    let body = json!({
        "sop_id": "sop-basic-001",
        "sop_version": "1.0.0",
        "body": {"sample_id": "S000077", "temperature_c": 20},
        "idempotency_key": "k-77",
    });
    let payload = serde_json::to_vec(&body).unwrap();

    let first = harness.request(Method::POST, "/api/v1/eln", Some(&token), payload.clone()).await;
    let first_key = json_body(first).await["data"]["object_key"].as_str().unwrap().to_owned();

    let second = harness.request(Method::POST, "/api/v1/eln", Some(&token), payload).await;
    assert_eq!(second.status(), StatusCode::OK);
    let second_key = json_body(second).await["data"]["object_key"].as_str().unwrap().to_owned();
    assert_eq!(first_key, second_key);

    let (submissions, _) = harness
        .state
        .submissions
        .list(Some("sop-basic-001"), None, None, None, 10)
        .await
        .unwrap();
    assert_eq!(submissions.len(), 1);
}

#[tokio::test]
async fn test_should_reject_unauthenticated_submission() {
    let harness = Harness::new().await;
    harness.seed_basic_sop().await;

    let body = json!({
        "sop_id": "sop-basic-001",
        "sop_version": "1.0.0",
        "body": {"sample_id": "S000042", "temperature_c": 37},
    });
    let response = harness
        .request(Method::POST, "/api/v1/eln", None, serde_json::to_vec(&body).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
