//! Ownership checks shared by every vault, secret and device operation.
//!
//! A caller may touch a record only when the owning user id matches
//! exactly.  Secrets are owned transitively through their vault.  The
//! checks fail closed: a missing record is `NotFound`, anyone else's
//! record is `Unauthorized`, and nothing proceeds otherwise.

use crate::errors::{Result, VaultKeepError};
use crate::secret::{SecretRecord, SecretStore};
use crate::vault::{Vault, VaultStore};

/// The authenticated identity behind a request, plus the client details
/// carried into audit entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Caller {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_ip(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Compare a record's owner with the caller.
pub fn ensure_owner(caller: &Caller, owner_id: &str) -> Result<()> {
    if caller.user_id == owner_id {
        Ok(())
    } else {
        tracing::debug!(user_id = %caller.user_id, "ownership check failed");
        Err(VaultKeepError::Unauthorized)
    }
}

/// Fetch a vault the caller owns.
pub fn ensure_vault_owner(vaults: &VaultStore, caller: &Caller, vault_id: &str) -> Result<Vault> {
    let vault = vaults.get_by_id(vault_id)?.ok_or(VaultKeepError::NotFound)?;
    ensure_owner(caller, &vault.user_id)?;
    Ok(vault)
}

/// Fetch a secret whose vault the caller owns.
///
/// A secret whose vault has vanished is treated as not found.
pub fn ensure_secret_owner(
    vaults: &VaultStore,
    secrets: &SecretStore,
    caller: &Caller,
    secret_id: &str,
) -> Result<SecretRecord> {
    let record = secrets.get_by_id(secret_id)?.ok_or(VaultKeepError::NotFound)?;
    ensure_vault_owner(vaults, caller, record.vault_id())?;
    Ok(record)
}
