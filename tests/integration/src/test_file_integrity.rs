//! Scenario D: binary integrity. A 1x1 PNG uploaded inline must come back
//! with a `sha256` that matches the bytes actually stored, and re-reading
//! the object through the storage backend must reproduce it exactly
//! (guards against corruption on a base64-transit path).

use http::StatusCode;
use sha2::{Digest, Sha256};

use crate::{Harness, json_body};

/// A minimal, valid 1x1 PNG, 67 bytes.
const ONE_PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53,
    0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, 0x08, 0xD7, 0x63, 0xF8, 0xCF, 0xC0, 0x00,
    0x00, 0x00, 0x03, 0x00, 0x01, 0x73, 0x75, 0x01, 0x18, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E,
    0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[tokio::test]
async fn test_should_preserve_byte_exact_integrity_for_uploaded_png() {
    assert_eq!(ONE_PIXEL_PNG.len(), 67);

    let harness = Harness::new().await;
    let token = harness.token_for("alice").await;

    let response = harness.upload_file(&token, "pixel.png", "image/png", ONE_PIXEL_PNG).await;
    assert_eq!(response.status(), StatusCode::OK);
    let envelope = json_body(response).await;

    let mut hasher = Sha256::new();
    hasher.update(ONE_PIXEL_PNG);
    let expected_sha256 = hex::encode(hasher.finalize());

    assert_eq!(envelope["data"]["sha256"], serde_json::json!(expected_sha256));
    assert_eq!(envelope["data"]["size"], serde_json::json!(67));

    let file_id = envelope["data"]["file_id"].as_str().unwrap();
    let record = harness.state.files.get_record(file_id).await.unwrap();
    assert_eq!(record.sha256, expected_sha256);
    assert_eq!(record.size_bytes, 67);

    let stored = harness.state.storage.get(claire_storage::Bucket::Eln, &record.storage_key).await.unwrap();
    assert_eq!(stored.bytes.as_ref(), ONE_PIXEL_PNG);
    let mut stored_hasher = Sha256::new();
    stored_hasher.update(&stored.bytes);
    assert_eq!(hex::encode(stored_hasher.finalize()), expected_sha256);
}
