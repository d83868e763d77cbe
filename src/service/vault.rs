use tracing::{debug, info};

use crate::audit::{Action, AuditLog, NewAuditEntry};
use crate::errors::{Result, VaultKeepError};
use crate::guard::{self, Caller};
use crate::validation;
use crate::vault::{CreateVault, Vault, VaultStore, VaultUpdate};

/// Vault use cases.
#[derive(Debug, Clone)]
pub struct VaultService {
    vaults: VaultStore,
    audit: AuditLog,
}

impl VaultService {
    pub fn new(vaults: VaultStore, audit: AuditLog) -> Self {
        Self { vaults, audit }
    }

    /// Create a vault owned by the caller.
    pub fn create(&self, caller: &Caller, request: CreateVault) -> Result<Vault> {
        debug!(user_id = %caller.user_id, "creating vault");

        validation::vault_name(&request.name)?;
        if let Some(description) = &request.description {
            validation::vault_description(description)?;
        }
        validation::encrypted_bytes("encrypted key", &request.encrypted_key)?;
        if let Some(version) = request.key_encryption_version {
            validation::encryption_version(version)?;
        }

        let vault = self.vaults.create(request.into_new(&caller.user_id))?;

        self.audit
            .record(NewAuditEntry::new(caller, Action::Create).with_vault(&vault.id));
        info!(vault_id = %vault.id, user_id = %caller.user_id, "vault created");
        Ok(vault)
    }

    /// Fetch one of the caller's vaults.  Audited as a view.
    pub fn get(&self, caller: &Caller, vault_id: &str) -> Result<Vault> {
        debug!(vault_id, user_id = %caller.user_id, "fetching vault");

        let vault = guard::ensure_vault_owner(&self.vaults, caller, vault_id)?;

        self.audit
            .record(NewAuditEntry::new(caller, Action::View).with_vault(&vault.id));
        Ok(vault)
    }

    /// The caller's vaults, newest first.
    pub fn list(&self, caller: &Caller) -> Result<Vec<Vault>> {
        debug!(user_id = %caller.user_id, "listing vaults");
        self.vaults.list_by_user(&caller.user_id)
    }

    /// Rename or re-describe one of the caller's vaults.
    pub fn update(&self, caller: &Caller, vault_id: &str, update: VaultUpdate) -> Result<Vault> {
        debug!(vault_id, user_id = %caller.user_id, "updating vault");

        if update.is_empty() {
            return Err(VaultKeepError::Validation("nothing to update".into()));
        }
        if let Some(name) = &update.name {
            validation::vault_name(name)?;
        }
        if let Some(description) = update.description.as_set() {
            validation::vault_description(description)?;
        }

        let mut vault = guard::ensure_vault_owner(&self.vaults, caller, vault_id)?;
        update.apply(&mut vault);
        let vault = self.vaults.update(&vault)?.ok_or(VaultKeepError::NotFound)?;

        self.audit
            .record(NewAuditEntry::new(caller, Action::Update).with_vault(&vault.id));
        info!(vault_id = %vault.id, "vault updated");
        Ok(vault)
    }

    /// Delete one of the caller's vaults together with all of its secrets.
    pub fn delete(&self, caller: &Caller, vault_id: &str) -> Result<()> {
        debug!(vault_id, user_id = %caller.user_id, "deleting vault");

        let vault = guard::ensure_vault_owner(&self.vaults, caller, vault_id)?;
        if !self.vaults.delete(&vault.id)? {
            return Err(VaultKeepError::NotFound);
        }

        self.audit
            .record(NewAuditEntry::new(caller, Action::Delete).with_vault(&vault.id));
        info!(vault_id = %vault.id, "vault deleted");
        Ok(())
    }
}
