//! Vault persistence.
//!
//! `VaultStore` is keyed purely by primary id.  It does not know who is
//! asking: ownership filtering belongs to the services.

use rusqlite::{params, OptionalExtension, Row};

use crate::db::{self, Database};
use crate::errors::Result;

use super::model::{NewVault, Vault};

const VAULT_COLUMNS: &str = "id, user_id, name, description, encrypted_key, \
                             key_encryption_version, created_at, updated_at";

/// SQLite-backed vault records.
#[derive(Debug, Clone)]
pub struct VaultStore {
    db: Database,
}

impl VaultStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a vault, assigning its id and timestamps.
    pub fn create(&self, new: NewVault) -> Result<Vault> {
        let now = db::now();
        let vault = Vault {
            id: db::new_id(),
            user_id: new.user_id,
            name: new.name,
            description: new.description,
            encrypted_key: new.encrypted_key,
            key_encryption_version: new.key_encryption_version,
            created_at: now,
            updated_at: now,
        };

        let conn = self.db.connect()?;
        conn.execute(
            "INSERT INTO vaults (id, user_id, name, description, encrypted_key,
                                 key_encryption_version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                vault.id,
                vault.user_id,
                vault.name,
                vault.description,
                vault.encrypted_key,
                vault.key_encryption_version,
                db::encode_ts(&now),
            ],
        )?;

        Ok(vault)
    }

    /// Fetch a vault.  `None` when no such vault exists.
    pub fn get_by_id(&self, id: &str) -> Result<Option<Vault>> {
        let conn = self.db.connect()?;
        let vault = conn
            .query_row(
                &format!("SELECT {VAULT_COLUMNS} FROM vaults WHERE id = ?1"),
                [id],
                vault_from_row,
            )
            .optional()?;
        Ok(vault)
    }

    /// All vaults owned by `user_id`, most recently created first.
    pub fn list_by_user(&self, user_id: &str) -> Result<Vec<Vault>> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {VAULT_COLUMNS} FROM vaults
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC"
        ))?;

        let vaults = stmt
            .query_map([user_id], vault_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(vaults)
    }

    /// Persist `vault.name` and `vault.description` and refresh
    /// `updated_at`.  Every other field is ignored.
    ///
    /// Returns the stored record, or `None` if the vault no longer exists.
    pub fn update(&self, vault: &Vault) -> Result<Option<Vault>> {
        let now = db::now();
        let conn = self.db.connect()?;
        let changed = conn.execute(
            "UPDATE vaults SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            params![vault.name, vault.description, db::encode_ts(&now), vault.id],
        )?;

        if changed == 0 {
            return Ok(None);
        }

        Ok(Some(Vault {
            updated_at: now,
            ..vault.clone()
        }))
    }

    /// Delete a vault.  Its secrets and their metadata go with it through
    /// the `ON DELETE CASCADE` foreign keys.
    ///
    /// Returns `false` if there was nothing to delete.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.db.connect()?;
        let removed = conn.execute("DELETE FROM vaults WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }
}

fn vault_from_row(row: &Row<'_>) -> rusqlite::Result<Vault> {
    Ok(Vault {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        encrypted_key: row.get(4)?,
        key_encryption_version: row.get(5)?,
        created_at: db::ts_column(row, 6)?,
        updated_at: db::ts_column(row, 7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbOptions;
    use crate::errors::VaultKeepError;
    use crate::users::UserStore;
    use tempfile::TempDir;

    fn setup() -> (TempDir, VaultStore, String) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("keep.db"), DbOptions::default()).unwrap();
        let user = UserStore::new(db.clone())
            .create("owner@example.com", None)
            .unwrap();
        (dir, VaultStore::new(db), user.id)
    }

    fn new_vault(user_id: &str, name: &str) -> NewVault {
        NewVault {
            user_id: user_id.to_string(),
            name: name.to_string(),
            description: None,
            encrypted_key: b"key".to_vec(),
            key_encryption_version: None,
        }
    }

    #[test]
    fn create_assigns_id_and_timestamps() {
        let (_dir, vaults, user_id) = setup();
        let vault = vaults
            .create(NewVault {
                description: Some("A test vault".into()),
                key_encryption_version: Some(1),
                ..new_vault(&user_id, "Test Vault")
            })
            .unwrap();

        assert!(!vault.id.is_empty());
        assert_eq!(vault.user_id, user_id);
        assert_eq!(vault.description.as_deref(), Some("A test vault"));
        assert_eq!(vault.created_at, vault.updated_at);

        let stored = vaults.get_by_id(&vault.id).unwrap().unwrap();
        assert_eq!(stored, vault);
    }

    #[test]
    fn create_for_unknown_user_fails() {
        let (_dir, vaults, _user_id) = setup();
        let err = vaults.create(new_vault("ghost", "Invalid")).unwrap_err();
        assert!(matches!(err, VaultKeepError::Database(_)));
    }

    #[test]
    fn get_missing_vault_is_none() {
        let (_dir, vaults, _user_id) = setup();
        assert!(vaults.get_by_id("does-not-exist").unwrap().is_none());
    }

    #[test]
    fn list_is_newest_first() {
        let (_dir, vaults, user_id) = setup();
        for name in ["first", "second", "third"] {
            vaults.create(new_vault(&user_id, name)).unwrap();
        }

        let names: Vec<String> = vaults
            .list_by_user(&user_id)
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, ["third", "second", "first"]);
    }

    #[test]
    fn list_for_user_without_vaults_is_empty() {
        let (_dir, vaults, user_id) = setup();
        assert!(vaults.list_by_user(&user_id).unwrap().is_empty());
    }

    #[test]
    fn update_only_touches_name_and_description() {
        let (_dir, vaults, user_id) = setup();
        let original = vaults.create(new_vault(&user_id, "Original")).unwrap();

        let mut changed = original.clone();
        changed.name = "Updated".into();
        changed.description = Some("Now described".into());
        changed.encrypted_key = b"ignored".to_vec();

        let updated = vaults.update(&changed).unwrap().unwrap();
        assert!(updated.updated_at >= original.updated_at);

        let stored = vaults.get_by_id(&original.id).unwrap().unwrap();
        assert_eq!(stored.name, "Updated");
        assert_eq!(stored.description.as_deref(), Some("Now described"));
        assert_eq!(stored.encrypted_key, b"key");
        assert_eq!(stored.created_at, original.created_at);
    }

    #[test]
    fn update_missing_vault_is_none() {
        let (_dir, vaults, user_id) = setup();
        let vault = vaults.create(new_vault(&user_id, "Gone")).unwrap();
        assert!(vaults.delete(&vault.id).unwrap());
        assert!(vaults.update(&vault).unwrap().is_none());
    }

    #[test]
    fn delete_removes_vault() {
        let (_dir, vaults, user_id) = setup();
        let vault = vaults.create(new_vault(&user_id, "To Delete")).unwrap();

        assert!(vaults.delete(&vault.id).unwrap());
        assert!(vaults.get_by_id(&vault.id).unwrap().is_none());
        assert!(!vaults.delete(&vault.id).unwrap());
    }

    #[test]
    fn encrypted_key_persists_exactly() {
        let (_dir, vaults, user_id) = setup();
        let key: Vec<u8> = (0u8..=255).collect();
        let vault = vaults
            .create(NewVault {
                encrypted_key: key.clone(),
                key_encryption_version: Some(2),
                ..new_vault(&user_id, "Crypto")
            })
            .unwrap();

        let stored = vaults.get_by_id(&vault.id).unwrap().unwrap();
        assert_eq!(stored.encrypted_key, key);
        assert_eq!(stored.key_encryption_version, Some(2));
    }
}
