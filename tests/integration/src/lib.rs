//! End-to-end scenario tests for the CLAIRE HTTP surface.
//!
//! Unlike the component crates' unit tests, these drive requests through
//! [`claire_http::dispatch`] exactly as the hyper service would: a real
//! `Authorization` header is verified by a real [`claire_auth::JwtProvider`],
//! a real SOP document is read back from a [`claire_storage::LocalFsBackend`],
//! and the response is the same `{ok, ...}` envelope a client would see.
//! No live socket is needed since `dispatch` takes already-collected parts.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use claire_auth::{AuthProvider, JwtProvider, Session, StaticCredentialStore, UserRecord};
use claire_core::{ClaireConfig, Environment, FilesConfig, GroupConfig};
use claire_drafts::DraftStore;
use claire_files::FileStore;
use claire_http::AppState;
use claire_sop::{Field, FieldType, FilenameComponent, SopDocument, SopMetadata, SopStatus, Task, TaskGroup};
use claire_storage::{Bucket, LocalFsBackend, StorageBackend};
use claire_submissions::SubmissionStore;
use http::{Method, Request};

pub const ORG: &str = "acme";

/// A running stack plus the credential store used to mint bearer tokens.
pub struct Harness {
    pub state: Arc<AppState>,
    _root: tempfile::TempDir,
}

impl Harness {
    /// Build a fresh stack over an empty local filesystem backend, with one
    /// group (`RESEARCHERS`, `submit:*`/`view:group`) and one
    /// (`CLINICIANS`, `view:own`) registered against the JWT provider.
    pub async fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let backend: Arc<dyn StorageBackend> = Arc::new(LocalFsBackend::new(
            root.path(),
            ORG,
            "http://localhost:8080",
            b"integration-test-presign-secret".to_vec(),
        ));

        let mut groups = HashMap::new();
        groups.insert(
            "RESEARCHERS".to_owned(),
            GroupConfig {
                description: "lab staff".to_owned(),
                permissions: vec!["submit:*".to_owned(), "view:group".to_owned()],
            },
        );
        groups.insert(
            "CLINICIANS".to_owned(),
            GroupConfig {
                description: "clinic staff".to_owned(),
                permissions: vec!["view:own".to_owned()],
            },
        );

        let credentials = Arc::new(StaticCredentialStore::new());
        credentials.add_user(
            "hunter2",
            UserRecord {
                subject: "u-alice".to_owned(),
                username: "alice".to_owned(),
                email: None,
                groups: vec!["RESEARCHERS".to_owned()],
            },
        );
        credentials.add_user(
            "hunter2",
            UserRecord {
                subject: "u-bob".to_owned(),
                username: "bob".to_owned(),
                email: None,
                groups: vec!["CLINICIANS".to_owned()],
            },
        );
        credentials.add_user(
            "hunter2",
            UserRecord {
                subject: "u-carol".to_owned(),
                username: "carol".to_owned(),
                email: None,
                groups: vec!["RESEARCHERS".to_owned()],
            },
        );

        let auth: Arc<dyn AuthProvider> = Arc::new(
            JwtProvider::new(
                "integration-test-secret",
                "HS256",
                "claire",
                "claire-clients",
                Environment::Dev,
                groups.clone(),
                credentials,
            )
            .unwrap(),
        );

        let config = Arc::new(ClaireConfig {
            organization: ORG.to_owned(),
            auth: claire_core::AuthConfig {
                groups,
                ..Default::default()
            },
            ..Default::default()
        });

        let sops = Arc::new(claire_sop::SopRegistry::new(Arc::clone(&backend)));
        let files = Arc::new(FileStore::new(Arc::clone(&backend), FilesConfig::default()));
        let drafts = Arc::new(DraftStore::new(Arc::clone(&backend), config.drafts.ttl_seconds, config.drafts.max_per_user).await.unwrap());
        let submissions = Arc::new(SubmissionStore::new(
            Arc::clone(&backend),
            Arc::clone(&sops),
            Arc::clone(&files),
            Some(Arc::clone(&drafts)),
        ));

        let state = Arc::new(AppState {
            config,
            auth,
            storage: backend,
            sops,
            drafts,
            files,
            submissions,
        });

        Self { state, _root: root }
    }

    /// Mint a bearer token for one of the seeded users.
    pub async fn token_for(&self, username: &str) -> String {
        let session: Session = self.state.auth.authenticate(username, "hunter2").await.unwrap();
        session.token
    }

    /// Seed the SOP used by scenario A/B/C/E/F: `sop-basic-001@1.0.0`, two
    /// required fields (`sample_id` pattern-matched, `temperature_c` ranged),
    /// filename keyed on `sample_id`.
    pub async fn seed_basic_sop(&self) {
        let doc = SopDocument {
            sop_id: "sop-basic-001".to_owned(),
            version: "1.0.0".to_owned(),
            metadata: SopMetadata {
                title: "Basic sample intake".to_owned(),
                author: "qa".to_owned(),
                approver: None,
                published_date: None,
                status: SopStatus::Published,
            },
            task_groups: vec![TaskGroup {
                id: "g1".to_owned(),
                title: "Intake".to_owned(),
                tasks: vec![Task {
                    id: "t1".to_owned(),
                    title: "Record sample".to_owned(),
                    fields: vec![
                        Field {
                            path: "sample_id".to_owned(),
                            label: "Sample ID".to_owned(),
                            field_type: FieldType::Text,
                            required: true,
                            pattern: Some(r"^S[0-9]{6}$".to_owned()),
                        },
                        Field {
                            path: "temperature_c".to_owned(),
                            label: "Temperature (C)".to_owned(),
                            field_type: FieldType::Number {
                                min: Some(0.0),
                                max: Some(100.0),
                            },
                            required: true,
                            pattern: None,
                        },
                    ],
                }],
            }],
            cross_field_rules: vec![],
            filename_components: vec![FilenameComponent {
                field_path: "sample_id".to_owned(),
                lowercase: false,
            }],
        };
        let yaml = serde_yaml::to_string(&doc).unwrap();
        self.state
            .storage
            .put(
                Bucket::Forms,
                "sops/sop-basic-001/1.0.0.yaml",
                Bytes::from(yaml.into_bytes()),
                "application/yaml",
            )
            .await
            .unwrap();
    }

    /// Run a request through the full dispatch pipeline.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: impl Into<Bytes>,
    ) -> http::Response<claire_http::ClaireBody> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder.body(()).unwrap();
        let (parts, ()) = request.into_parts();
        claire_http::dispatch(&self.state, parts, body.into()).await
    }

    /// Run a multipart `POST /api/v1/files` request with one file part.
    pub async fn upload_file(
        &self,
        bearer: &str,
        filename: &str,
        media_type: &str,
        bytes: &[u8],
    ) -> http::Response<claire_http::ClaireBody> {
        let boundary = "----claireintegrationboundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                 Content-Type: {media_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/files")
            .header(http::header::AUTHORIZATION, format!("Bearer {bearer}"))
            .header(http::header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();
        claire_http::dispatch(&self.state, parts, Bytes::from(body)).await
    }
}

/// Collect a response body into a parsed JSON envelope.
pub async fn json_body(response: http::Response<claire_http::ClaireBody>) -> serde_json::Value {
    use http_body_util::BodyExt;
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

mod test_submission_flow;
mod test_rbac_view;
mod test_file_integrity;
