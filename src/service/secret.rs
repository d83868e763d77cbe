use tracing::{debug, info, warn};

use crate::audit::{Action, AuditLog, NewAuditEntry};
use crate::db;
use crate::errors::{Result, VaultKeepError};
use crate::guard::{self, Caller};
use crate::secret::{
    normalize_tags, CreateSecret, SecretFilter, SecretRecord, SecretStore, SecretUpdate,
};
use crate::validation;
use crate::vault::VaultStore;

/// Secret use cases.  Every operation is scoped to vaults the caller owns.
#[derive(Debug, Clone)]
pub struct SecretService {
    vaults: VaultStore,
    secrets: SecretStore,
    audit: AuditLog,
}

impl SecretService {
    pub fn new(vaults: VaultStore, secrets: SecretStore, audit: AuditLog) -> Self {
        Self {
            vaults,
            secrets,
            audit,
        }
    }

    /// Store a new secret and its metadata in one of the caller's vaults.
    pub fn create(&self, caller: &Caller, request: CreateSecret) -> Result<SecretRecord> {
        let CreateSecret { secret, mut metadata } = request;
        metadata.tags = normalize_tags(&metadata.tags);
        debug!(vault_id = %secret.vault_id, user_id = %caller.user_id, "creating secret");

        validation::encrypted_bytes("encrypted payload", &secret.encrypted_payload)?;
        validation::encryption_version(secret.encryption_version)?;
        validation::title(&metadata.title)?;
        if let Some(domain) = &metadata.domain {
            validation::domain(domain)?;
        }
        validation::tags(&metadata.tags)?;

        guard::ensure_vault_owner(&self.vaults, caller, &secret.vault_id)?;
        let record = self.secrets.create(secret, metadata)?;

        self.audit.record(
            NewAuditEntry::new(caller, Action::Create)
                .with_vault(record.vault_id())
                .with_secret(record.id()),
        );
        info!(secret_id = %record.id(), vault_id = %record.vault_id(), "secret created");
        Ok(record)
    }

    /// Fetch a secret.  Stamps its last-access time and is audited as a
    /// view; neither side effect can fail the read.
    pub fn get(&self, caller: &Caller, secret_id: &str) -> Result<SecretRecord> {
        debug!(secret_id, user_id = %caller.user_id, "fetching secret");

        let mut record = guard::ensure_secret_owner(&self.vaults, &self.secrets, caller, secret_id)?;

        let accessed_at = db::now();
        match self.secrets.update_last_accessed(record.id(), accessed_at) {
            Ok(()) => record.secret.last_accessed_at = Some(accessed_at),
            Err(e) => warn!(secret_id, error = %e, "failed to update last access time"),
        }

        self.audit.record(
            NewAuditEntry::new(caller, Action::View)
                .with_vault(record.vault_id())
                .with_secret(record.id()),
        );
        Ok(record)
    }

    /// All secrets in one of the caller's vaults, newest first.
    pub fn list(&self, caller: &Caller, vault_id: &str) -> Result<Vec<SecretRecord>> {
        debug!(vault_id, user_id = %caller.user_id, "listing secrets");

        guard::ensure_vault_owner(&self.vaults, caller, vault_id)?;
        self.secrets.list_by_vault(vault_id)
    }

    /// Search across every vault the caller owns.
    pub fn search(&self, caller: &Caller, filter: &SecretFilter) -> Result<Vec<SecretRecord>> {
        debug!(user_id = %caller.user_id, ?filter, "searching secrets");
        self.secrets.search(&caller.user_id, filter)
    }

    /// Change a secret's payload, encryption version or metadata.
    pub fn update(
        &self,
        caller: &Caller,
        secret_id: &str,
        mut update: SecretUpdate,
    ) -> Result<SecretRecord> {
        debug!(secret_id, user_id = %caller.user_id, "updating secret");
        update.tags = update.tags.map(normalize_tags);

        if update.is_empty() {
            return Err(VaultKeepError::Validation("nothing to update".into()));
        }
        if let Some(payload) = &update.encrypted_payload {
            validation::encrypted_bytes("encrypted payload", payload)?;
        }
        if let Some(version) = update.encryption_version {
            validation::encryption_version(version)?;
        }
        if let Some(title) = &update.title {
            validation::title(title)?;
        }
        if let Some(domain) = update.domain.as_set() {
            validation::domain(domain)?;
        }
        if let Some(tags) = &update.tags {
            validation::tags(tags)?;
        }

        let mut record = guard::ensure_secret_owner(&self.vaults, &self.secrets, caller, secret_id)?;
        update.apply(&mut record);
        let record = self.secrets.update(&record)?.ok_or(VaultKeepError::NotFound)?;

        self.audit.record(
            NewAuditEntry::new(caller, Action::Update)
                .with_vault(record.vault_id())
                .with_secret(record.id()),
        );
        info!(secret_id = %record.id(), "secret updated");
        Ok(record)
    }

    /// Delete a secret and its metadata.
    pub fn delete(&self, caller: &Caller, secret_id: &str) -> Result<()> {
        debug!(secret_id, user_id = %caller.user_id, "deleting secret");

        let record = guard::ensure_secret_owner(&self.vaults, &self.secrets, caller, secret_id)?;
        if !self.secrets.delete(record.id())? {
            return Err(VaultKeepError::NotFound);
        }

        self.audit.record(
            NewAuditEntry::new(caller, Action::Delete)
                .with_vault(record.vault_id())
                .with_secret(record.id()),
        );
        info!(secret_id = %record.id(), "secret deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, DbOptions};
    use crate::patch::Patch;
    use crate::secret::{NewMetadata, NewSecret, SecretType};
    use crate::users::UserStore;
    use crate::vault::NewVault;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        service: SecretService,
        audit: AuditLog,
        alice: Caller,
        bob: Caller,
        vault_id: String,
    }

    fn setup() -> Fixture {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("keep.db"), DbOptions::default()).unwrap();
        let users = UserStore::new(db.clone());
        let alice = users.create("alice@example.com", None).unwrap();
        let bob = users.create("bob@example.com", None).unwrap();

        let vaults = VaultStore::new(db.clone());
        let vault = vaults
            .create(NewVault {
                user_id: alice.id.clone(),
                name: "Personal".into(),
                description: None,
                encrypted_key: b"k".to_vec(),
                key_encryption_version: None,
            })
            .unwrap();
        let audit = AuditLog::new(db.clone());

        Fixture {
            _dir: dir,
            service: SecretService::new(vaults, SecretStore::new(db), audit.clone()),
            audit,
            alice: Caller::new(alice.id),
            bob: Caller::new(bob.id),
            vault_id: vault.id,
        }
    }

    fn request(vault_id: &str, title: &str) -> CreateSecret {
        CreateSecret {
            secret: NewSecret {
                vault_id: vault_id.to_string(),
                secret_type: SecretType::Password,
                encrypted_payload: b"x".to_vec(),
                encryption_version: 1,
            },
            metadata: NewMetadata {
                title: title.to_string(),
                domain: Some("bank.example.com".into()),
                tags: ["finance".to_string()].into_iter().collect(),
            },
        }
    }

    #[test]
    fn owner_can_read_what_they_created() {
        let f = setup();
        let created = f.service.create(&f.alice, request(&f.vault_id, "Bank")).unwrap();

        let fetched = f.service.get(&f.alice, created.id()).unwrap();
        assert_eq!(fetched.metadata.title, "Bank");
        assert_eq!(fetched.secret.encrypted_payload, b"x");
        assert!(fetched.secret.last_accessed_at.is_some());

        let actions: Vec<Action> = f
            .audit
            .list_by_user(&f.alice.user_id, 10)
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(actions, [Action::View, Action::Create]);
    }

    #[test]
    fn other_user_is_denied_everything() {
        let f = setup();
        let created = f.service.create(&f.alice, request(&f.vault_id, "Bank")).unwrap();

        assert!(matches!(
            f.service.get(&f.bob, created.id()),
            Err(VaultKeepError::Unauthorized)
        ));
        let retitle = SecretUpdate {
            title: Some("Stolen".into()),
            ..SecretUpdate::default()
        };
        assert!(f.service.update(&f.bob, created.id(), retitle).is_err());
        assert!(f.service.delete(&f.bob, created.id()).is_err());
        assert!(f.service.list(&f.bob, &f.vault_id).is_err());
        assert!(f
            .service
            .create(&f.bob, request(&f.vault_id, "Planted"))
            .is_err());

        let stored = f.service.get(&f.alice, created.id()).unwrap();
        assert_eq!(stored.metadata.title, "Bank");
        assert_eq!(f.service.list(&f.alice, &f.vault_id).unwrap().len(), 1);
    }

    #[test]
    fn search_is_scoped_to_caller() {
        let f = setup();
        let created = f.service.create(&f.alice, request(&f.vault_id, "Bank")).unwrap();

        let filter = SecretFilter {
            title: Some("ban".into()),
            ..SecretFilter::default()
        };
        let found = f.service.search(&f.alice, &filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), created.id());

        assert!(f.service.search(&f.bob, &filter).unwrap().is_empty());
        assert!(f
            .service
            .search(&f.bob, &SecretFilter::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn update_changes_payload_and_metadata() {
        let f = setup();
        let created = f.service.create(&f.alice, request(&f.vault_id, "Bank")).unwrap();

        let updated = f
            .service
            .update(
                &f.alice,
                created.id(),
                SecretUpdate {
                    encrypted_payload: Some(b"y".to_vec()),
                    encryption_version: Some(2),
                    domain: Patch::Clear,
                    tags: Some(BTreeSet::new()),
                    ..SecretUpdate::default()
                },
            )
            .unwrap();

        assert_eq!(updated.secret.encrypted_payload, b"y");
        assert_eq!(updated.secret.encryption_version, 2);
        assert_eq!(updated.metadata.title, "Bank");
        assert!(updated.metadata.domain.is_none());
        assert!(updated.metadata.tags.is_empty());
        assert!(updated.secret.updated_at >= created.secret.updated_at);
    }

    #[test]
    fn invalid_input_is_rejected() {
        let f = setup();
        let mut bad = request(&f.vault_id, "Bank");
        bad.secret.encryption_version = 0;
        assert!(matches!(
            f.service.create(&f.alice, bad),
            Err(VaultKeepError::Validation(_))
        ));

        assert!(matches!(
            f.service.create(&f.alice, request(&f.vault_id, "")),
            Err(VaultKeepError::Validation(_))
        ));

        let created = f.service.create(&f.alice, request(&f.vault_id, "Bank")).unwrap();
        assert!(matches!(
            f.service.update(&f.alice, created.id(), SecretUpdate::default()),
            Err(VaultKeepError::Validation(_))
        ));
    }

    #[test]
    fn create_in_missing_vault_is_not_found() {
        let f = setup();
        assert!(matches!(
            f.service.create(&f.alice, request("missing", "Bank")),
            Err(VaultKeepError::NotFound)
        ));
    }

    #[test]
    fn deleted_secret_is_gone() {
        let f = setup();
        let created = f.service.create(&f.alice, request(&f.vault_id, "Bank")).unwrap();

        f.service.delete(&f.alice, created.id()).unwrap();
        assert!(matches!(
            f.service.get(&f.alice, created.id()),
            Err(VaultKeepError::NotFound)
        ));
    }
}
