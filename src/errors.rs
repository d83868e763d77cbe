use thiserror::Error;

/// All errors that can occur in VaultKeep.
#[derive(Debug, Error)]
pub enum VaultKeepError {
    // --- Access errors ---
    // Both variants render the same message so callers cannot test for
    // the existence of another user's vaults or secrets.
    #[error("Resource not found or access denied")]
    NotFound,

    #[error("Resource not found or access denied")]
    Unauthorized,

    // --- Input errors ---
    #[error("Invalid input: {0}")]
    Validation(String),

    // --- Storage errors ---
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Secret {0} has no metadata record: store is inconsistent")]
    MissingMetadata(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    Serialization(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

impl VaultKeepError {
    /// `true` for the two variants that surface as the uniform
    /// "not found or access denied" failure.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::NotFound | Self::Unauthorized)
    }
}

impl From<serde_json::Error> for VaultKeepError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Convenience type alias for VaultKeep results.
pub type Result<T> = std::result::Result<T, VaultKeepError>;
