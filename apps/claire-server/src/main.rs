//! CLAIRE HTTP server binary.
//!
//! Resolves the process-wide [`claire_core::ClaireConfig`] per §4.1, wires
//! every component crate to the configured storage backend, and serves the
//! §6 wire API over HTTP until a shutdown signal arrives.
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|--------------|
//! | `ENV` | Deployment environment (`dev`, `test`, `stage`, `prod`). |
//! | `ORG` | Organization namespace. |
//! | `CONFIG_S3_BUCKET` / `CONFIG_S3_KEY` | Remote config document location. |
//! | `CONFIG_FILE` | Local config document path, consulted if the remote fetch is unset or fails. |
//! | `FORMS_BUCKET` / `ELN_BUCKET` / `DRAFTS_BUCKET` | Bucket name overrides. |
//! | `COGNITO_REGION` / `COGNITO_USER_POOL_ID` / `COGNITO_CLIENT_ID` | Managed-pool provider settings. |
//! | `LISTEN_ADDR` | Bind address, default `0.0.0.0:8080`. |
//! | `RUST_LOG` | Fine-grained tracing filter. |
//!
//! # Exit Codes
//!
//! `0` normal; `2` config invalid; `3` provider mismatch; `4` storage
//! unreachable at startup.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use claire_auth::{AuthProvider, CognitoProvider, JwtProvider, StaticCredentialStore};
use claire_core::{AuthProviderKind, ClaireConfig, ClaireError, ConfigLoader, StorageBackendKind};
use claire_drafts::DraftStore;
use claire_files::FileStore;
use claire_http::{AppState, ClaireHttpConfig, ClaireHttpService};
use claire_sop::SopRegistry;
use claire_storage::{LocalFsBackend, S3Backend, StorageBackend};
use claire_submissions::SubmissionStore;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// This binary is always a standalone process, never the managed-function
/// entry point `ClaireConfig::validate` enforces against.
const RUNNING_AS_MANAGED_FUNCTION: bool = false;

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn listen_addr() -> String {
    std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned())
}

/// Fetch the remote config document bytes from S3, if `CONFIG_S3_BUCKET`
/// and `CONFIG_S3_KEY` are both set.
async fn fetch_remote_config() -> Option<Vec<u8>> {
    let bucket = std::env::var("CONFIG_S3_BUCKET").ok()?;
    let key = std::env::var("CONFIG_S3_KEY").ok()?;
    let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let client = aws_sdk_s3::Client::new(&sdk_config);
    match client.get_object().bucket(&bucket).key(&key).send().await {
        Ok(output) => match output.body.collect().await {
            Ok(bytes) => Some(bytes.into_bytes().to_vec()),
            Err(e) => {
                warn!(error = %e, "failed to read remote config body");
                None
            }
        },
        Err(e) => {
            warn!(error = %e, %bucket, %key, "failed to fetch remote config object");
            None
        }
    }
}

fn apply_env_overrides(mut config: ClaireConfig) -> ClaireConfig {
    if let Ok(env) = std::env::var("ENV") {
        if let Ok(parsed) = env.parse() {
            config.environment = parsed;
        }
    }
    if let Ok(org) = std::env::var("ORG") {
        if !org.trim().is_empty() {
            config.organization = org;
        }
    }
    if let Ok(forms) = std::env::var("FORMS_BUCKET") {
        config.storage.buckets.forms = forms;
    }
    if let Ok(eln) = std::env::var("ELN_BUCKET") {
        config.storage.buckets.eln = eln;
    }
    if let Ok(drafts) = std::env::var("DRAFTS_BUCKET") {
        config.storage.buckets.drafts = drafts;
    }
    if let Ok(region) = std::env::var("COGNITO_REGION") {
        config.auth.region = Some(region);
    }
    if let Ok(pool_id) = std::env::var("COGNITO_USER_POOL_ID") {
        config.auth.pool_id = Some(pool_id);
    }
    if let Ok(client_id) = std::env::var("COGNITO_CLIENT_ID") {
        config.auth.client_id = Some(client_id);
    }
    config
}

async fn build_storage_backend(config: &ClaireConfig) -> Result<Arc<dyn StorageBackend>> {
    match config.storage.backend {
        StorageBackendKind::Local => {
            let presign_secret = std::env::var("LOCAL_PRESIGN_SECRET")
                .unwrap_or_else(|_| "dev-only-insecure-presign-secret".to_owned());
            let base_url = std::env::var("LOCAL_STORAGE_BASE_URL")
                .unwrap_or_else(|_| format!("http://{}", listen_addr()));
            Ok(Arc::new(LocalFsBackend::new(
                config.storage.local_root.clone(),
                config.organization.clone(),
                base_url,
                presign_secret.into_bytes(),
            )))
        }
        StorageBackendKind::Object => {
            let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            let client = aws_sdk_s3::Client::new(&sdk_config);
            Ok(Arc::new(S3Backend::new(
                client,
                config.organization.clone(),
                config.storage.buckets.forms.clone(),
                config.storage.buckets.drafts.clone(),
                config.storage.buckets.eln.clone(),
                config.storage.buckets.lambda.clone(),
            )))
        }
    }
}

fn build_auth_provider(config: &ClaireConfig) -> Result<Arc<dyn AuthProvider>, ClaireError> {
    match config.auth.provider {
        Some(AuthProviderKind::Cognito) => {
            let region = config
                .auth
                .region
                .clone()
                .ok_or_else(|| ClaireError::ConfigInvalid("auth.region is required for cognito".to_owned()))?;
            let pool_id = config.auth.pool_id.clone().expect("validated by ClaireConfig::validate");
            let client_id = config.auth.client_id.clone().expect("validated by ClaireConfig::validate");
            Ok(Arc::new(CognitoProvider::new(&region, &pool_id, client_id, config.auth.groups.clone())))
        }
        Some(AuthProviderKind::Jwt) => {
            let secret = config.auth.secret.clone().expect("validated by ClaireConfig::validate");
            let algorithm = config.auth.algorithm.clone().expect("validated by ClaireConfig::validate");
            let issuer = config.auth.issuer.clone().unwrap_or_default();
            let audience = config.auth.audience.clone().unwrap_or_default();
            let credentials = Arc::new(StaticCredentialStore::new());
            let provider = JwtProvider::new(
                &secret,
                &algorithm,
                issuer,
                audience,
                config.environment,
                config.auth.groups.clone(),
                credentials,
            )
            .map_err(|e| ClaireError::ConfigInvalid(e.to_string()))?;
            Ok(Arc::new(provider))
        }
        None => Err(ClaireError::ConfigInvalid("auth.provider must be set".to_owned())),
    }
}

async fn run() -> Result<i32> {
    init_tracing()?;

    let remote_bytes = fetch_remote_config().await;
    let local_path = std::env::var("CONFIG_FILE").ok().map(std::path::PathBuf::from);
    let config = match ConfigLoader::resolve(remote_bytes.as_deref(), local_path.as_deref(), RUNNING_AS_MANAGED_FUNCTION) {
        Ok(config) => apply_env_overrides(config),
        Err(ClaireError::ConfigProviderMismatch(msg)) => {
            error!(%msg, "configuration provider mismatch");
            return Ok(3);
        }
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return Ok(2);
        }
    };
    // Env overrides (organization, environment) can change provider
    // applicability after the fact; re-validate before proceeding.
    if let Err(e) = config.validate(RUNNING_AS_MANAGED_FUNCTION) {
        match e {
            ClaireError::ConfigProviderMismatch(msg) => {
                error!(%msg, "configuration provider mismatch after env overrides");
                return Ok(3);
            }
            other => {
                error!(error = %other, "invalid configuration after env overrides");
                return Ok(2);
            }
        }
    }

    info!(organization = %config.organization, environment = %config.environment, "configuration resolved");

    let storage = match build_storage_backend(&config).await {
        Ok(backend) => backend,
        Err(e) => {
            error!(error = %e, "storage backend unreachable at startup");
            return Ok(4);
        }
    };

    let auth: Arc<dyn AuthProvider> = match build_auth_provider(&config) {
        Ok(provider) => provider,
        Err(e) => {
            error!(error = %e, "failed to construct auth provider");
            return Ok(2);
        }
    };

    let sops = Arc::new(SopRegistry::new(Arc::clone(&storage)));
    let files = Arc::new(FileStore::new(Arc::clone(&storage), config.files.clone()));
    let drafts = Arc::new(
        DraftStore::new(Arc::clone(&storage), config.drafts.ttl_seconds, config.drafts.max_per_user)
            .await
            .context("failed to build draft store index")?,
    );
    let submissions = Arc::new(SubmissionStore::new(
        Arc::clone(&storage),
        Arc::clone(&sops),
        Arc::clone(&files),
        Some(Arc::clone(&drafts)),
    ));

    spawn_orphan_sweep(Arc::clone(&files), config.files.sweep_interval_seconds);

    let state = Arc::new(AppState {
        config: Arc::new(config),
        auth,
        storage,
        sops,
        drafts,
        files,
        submissions,
    });

    let service = ClaireHttpService::new(
        state,
        ClaireHttpConfig {
            server_name: "claire".to_owned(),
        },
    );

    let addr: SocketAddr = listen_addr().parse().context("invalid LISTEN_ADDR")?;
    let listener = TcpListener::bind(addr).await.context("failed to bind listen address")?;
    info!(%addr, "starting CLAIRE server");

    serve(listener, service).await?;
    Ok(0)
}

/// Runs `FileStore::sweep_orphans` on a fixed cadence for the lifetime of
/// the process (§4.7: "swept by a background routine on a configured
/// cadence"). Detached rather than joined on shutdown — the sweep is
/// idempotent, so an in-flight pass losing its tokio runtime at process
/// exit leaves nothing inconsistent behind.
fn spawn_orphan_sweep(files: Arc<FileStore>, interval_seconds: u64) {
    if interval_seconds == 0 {
        return;
    }
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_seconds));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match files.sweep_orphans().await {
                Ok(removed) if removed > 0 => info!(removed, "orphan file sweep removed unbound uploads"),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "orphan file sweep failed"),
            }
        }
    });
}

async fn serve(listener: TcpListener, service: ClaireHttpService) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }
            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let code = run().await?;
    std::process::exit(code);
}
