//! The components every route handler closes over, bundled once at startup
//! by `apps/claire-server` and shared via `Arc` across every request.

use std::sync::Arc;

use claire_auth::AuthProvider;
use claire_core::ClaireConfig;
use claire_drafts::DraftStore;
use claire_files::FileStore;
use claire_sop::SopRegistry;
use claire_storage::StorageBackend;
use claire_submissions::SubmissionStore;

/// Everything a request handler needs, grouped so `claire-server` constructs
/// it once and every route shares the same `Arc`s rather than taking a
/// dozen individual parameters.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The frozen configuration document this process resolved at startup.
    pub config: Arc<ClaireConfig>,
    /// The configured identity provider.
    pub auth: Arc<dyn AuthProvider>,
    /// The configured storage backend, for routes that touch it directly
    /// (e.g. the config-document bootstrap, outside the component stores).
    pub storage: Arc<dyn StorageBackend>,
    /// SOP document registry.
    pub sops: Arc<SopRegistry>,
    /// Draft autosave store.
    pub drafts: Arc<DraftStore>,
    /// Attachment upload and integrity store.
    pub files: Arc<FileStore>,
    /// Finalized submission store.
    pub submissions: Arc<SubmissionStore>,
}
