//! Storage backend selection with file persistence
//!
//! The active backend is chosen by a small JSON configuration record,
//! read once at startup and mutated only through an explicit save. A
//! deployment-provided override (environment variable) forces the
//! remote backend and makes the configuration immutable through the
//! normal save path for the process lifetime.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Error, Result};

/// File name of the persisted configuration record
pub const CONFIG_FILE_NAME: &str = "storage.json";

/// Environment variable carrying the deployment override URL
pub const REMOTE_URL_ENV: &str = "SNIPVAULT_REMOTE_URL";

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "SNIPVAULT_CONFIG_DIR";

/// The active storage medium
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Remote {
        #[serde(rename = "remoteUrl")]
        url: String,
    },
}

/// Process-wide backend selection state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(flatten)]
    pub backend: StorageBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
        }
    }
}

impl StorageConfig {
    /// A configuration selecting the remote backend at the given URL
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            backend: StorageBackend::Remote { url: url.into() },
        }
    }
}

/// Handle to the persisted configuration slot
///
/// Owns the file path and the deployment override; inject one into
/// whatever holds the storage layer instead of sharing global state,
/// so multiple instances coexist in tests.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    override_url: Option<String>,
}

impl ConfigStore {
    /// Build from the process environment
    pub fn from_env() -> Result<Self> {
        let dir = if let Ok(custom) = env::var(CONFIG_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            dirs::config_dir()
                .ok_or_else(|| Error::Config("could not determine config directory".to_string()))?
                .join("snipvault")
        };
        let override_url = env::var(REMOTE_URL_ENV)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(Self {
            path: dir.join(CONFIG_FILE_NAME),
            override_url,
        })
    }

    /// Build against an explicit file path and override (test seam)
    pub fn at(path: impl Into<PathBuf>, override_url: Option<String>) -> Self {
        Self {
            path: path.into(),
            override_url,
        }
    }

    /// Whether a deployment override pins the backend
    pub fn is_overridden(&self) -> bool {
        self.override_url.is_some()
    }

    /// Path of the persisted configuration file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the effective configuration
    ///
    /// An override URL wins over whatever is persisted and forces the
    /// remote backend. With no persisted record the local backend is
    /// the default.
    pub fn load(&self) -> Result<StorageConfig> {
        if let Some(url) = &self.override_url {
            return Ok(StorageConfig::remote(url.clone()));
        }
        if !self.path.exists() {
            return Ok(StorageConfig::default());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Persist a configuration record
    ///
    /// When the deployment override is active the save is skipped; the
    /// effective configuration stays pinned to the override.
    pub fn save(&self, config: &StorageConfig) -> Result<()> {
        if self.override_url.is_some() {
            warn!("storage backend is pinned by {REMOTE_URL_ENV}; ignoring save");
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(config)?)?;
        Ok(())
    }
}
