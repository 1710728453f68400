use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use pushr_store::{TransferLimits, DEFAULT_CHUNK_SIZE};
use pushr_types::ContentTypes;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Snapshot file name used when `snapshot_path` is not set.
pub const DEFAULT_SNAPSHOT_FILE: &str = "pushr.db";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    /// Defaults to `<data_dir>/pushr.db`.
    pub snapshot_path: Option<PathBuf>,
    /// Empty means reads are open.
    pub read_token: String,
    /// Empty means writes are open.
    pub write_token: String,
    pub allow_query_token: bool,
    pub chunk_size: usize,
    pub max_upload_size: Option<u64>,
    /// Rebuild the index from `data_dir` when the restored store is empty.
    pub recover_from_data_dir: bool,
    /// Extension to MIME type entries merged over the built-in table.
    pub content_types: BTreeMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 7000)),
            data_dir: PathBuf::from("./data"),
            snapshot_path: None,
            read_token: String::new(),
            write_token: String::new(),
            allow_query_token: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_upload_size: None,
            recover_from_data_dir: false,
            content_types: BTreeMap::new(),
        }
    }
}

impl ServerConfig {
    /// Read a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.chunk_size == 0 {
            return Err(ServerError::Config("chunk_size must be greater than zero".into()));
        }
        if self.max_upload_size == Some(0) {
            return Err(ServerError::Config("max_upload_size must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DEFAULT_SNAPSHOT_FILE))
    }

    pub fn content_types(&self) -> ContentTypes {
        ContentTypes::default().with_overrides(self.content_types.clone())
    }

    pub fn transfer_limits(&self) -> TransferLimits {
        TransferLimits {
            chunk_size: self.chunk_size,
            max_bytes: self.max_upload_size,
        }
    }
}
