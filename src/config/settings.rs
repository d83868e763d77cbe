use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::db::DbOptions;
use crate::errors::{Result, VaultKeepError};

/// Project-level configuration, loaded from `.vaultkeep.toml`.
///
/// Every field has a sensible default so VaultKeep works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path of the SQLite database (relative paths resolve against the
    /// project directory).
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// How long a writer waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Number of audit entries returned when no explicit limit is given.
    #[serde(default = "default_audit_list_limit")]
    pub audit_list_limit: usize,

    /// Default `tracing` filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_database_path() -> String {
    ".vaultkeep/vaultkeep.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_audit_list_limit() -> usize {
    50
}

fn default_log_level() -> String {
    "warn".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            audit_list_limit: default_audit_list_limit(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = ".vaultkeep.toml";

    /// Load settings from `<project_dir>/.vaultkeep.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultKeepError::Config(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.audit_list_limit == 0 {
            return Err(VaultKeepError::Config(
                "audit_list_limit must be at least 1".into(),
            ));
        }

        Ok(settings)
    }

    /// Resolve the database path against the project directory.
    ///
    /// Absolute paths are returned unchanged.
    pub fn database_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.database_path)
    }

    /// Connection options derived from these settings.
    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
