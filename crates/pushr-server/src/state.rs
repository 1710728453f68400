use std::path::{Path, PathBuf};
use std::sync::Arc;

use pushr_store::{ReleaseStore, TransferLimits};
use pushr_types::{ContentTypes, Version};

use crate::auth::{AuthProvider, TokenAuth};
use crate::config::ServerConfig;

/// Shared handler state. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ReleaseStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub content_types: Arc<ContentTypes>,
    pub data_dir: Arc<PathBuf>,
    pub limits: TransferLimits,
    pub allow_query_token: bool,
}

impl AppState {
    /// State for `config`, guarded by its read and write tokens.
    pub fn new(store: Arc<ReleaseStore>, config: &ServerConfig) -> Self {
        Self {
            store,
            auth: Arc::new(TokenAuth::new(
                config.read_token.clone(),
                config.write_token.clone(),
            )),
            content_types: Arc::new(config.content_types()),
            data_dir: Arc::new(config.data_dir.clone()),
            limits: config.transfer_limits(),
            allow_query_token: config.allow_query_token,
        }
    }

    /// Replace the access policy.
    pub fn with_auth(mut self, auth: impl AuthProvider + 'static) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Absolute location of a version's payload.
    pub fn payload_path(&self, version: &Version) -> PathBuf {
        self.data_dir.join(&version.filename)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store)
            .field("data_dir", &self.data_dir)
            .field("limits", &self.limits)
            .finish()
    }
}
