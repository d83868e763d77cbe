//! Secret persistence.
//!
//! A secret and its metadata are one unit: `create` and `update` write
//! both rows inside a single transaction, and every read joins them back
//! together.  A secret row without metadata is reported as
//! `MissingMetadata` instead of being papered over.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::db::{self, Database};
use crate::errors::{Result, VaultKeepError};

use super::filter::SecretFilter;
use super::model::{NewMetadata, NewSecret, Secret, SecretMetadata, SecretRecord};

const RECORD_SELECT: &str = "
    SELECT s.id, s.vault_id, s.type, s.encrypted_payload, s.encryption_version,
           s.last_accessed_at, s.created_at, s.updated_at,
           m.id, m.title, m.domain, m.tags, m.created_at, m.updated_at
    FROM secrets s
    LEFT JOIN secret_metadata m ON m.secret_id = s.id";

/// SQLite-backed secrets and their metadata.
#[derive(Debug, Clone)]
pub struct SecretStore {
    db: Database,
}

impl SecretStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a secret and its metadata atomically.
    ///
    /// If either insert fails the transaction is rolled back and neither
    /// row exists afterwards.
    pub fn create(&self, secret: NewSecret, metadata: NewMetadata) -> Result<SecretRecord> {
        let now = db::now();
        let secret_id = db::new_id();
        let record = SecretRecord {
            secret: Secret {
                id: secret_id.clone(),
                vault_id: secret.vault_id,
                secret_type: secret.secret_type,
                encrypted_payload: secret.encrypted_payload,
                encryption_version: secret.encryption_version,
                last_accessed_at: None,
                created_at: now,
                updated_at: now,
            },
            metadata: SecretMetadata {
                id: db::new_id(),
                secret_id,
                title: metadata.title,
                domain: metadata.domain,
                tags: metadata.tags,
                created_at: now,
                updated_at: now,
            },
        };
        let tags = encode_tags(&record.metadata.tags)?;
        let ts = db::encode_ts(&now);

        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO secrets (id, vault_id, type, encrypted_payload, encryption_version,
                                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                record.secret.id,
                record.secret.vault_id,
                record.secret.secret_type,
                record.secret.encrypted_payload,
                record.secret.encryption_version,
                ts,
            ],
        )?;

        tx.execute(
            "INSERT INTO secret_metadata (id, secret_id, title, domain, tags, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                record.metadata.id,
                record.metadata.secret_id,
                record.metadata.title,
                record.metadata.domain,
                tags,
                ts,
            ],
        )?;

        tx.commit()?;
        Ok(record)
    }

    /// Fetch a secret with its metadata.  `None` when the secret does not
    /// exist.
    pub fn get_by_id(&self, id: &str) -> Result<Option<SecretRecord>> {
        let conn = self.db.connect()?;
        get_record(&conn, id)
    }

    /// All secrets in a vault, newest first.
    pub fn list_by_vault(&self, vault_id: &str) -> Result<Vec<SecretRecord>> {
        let conn = self.db.connect()?;
        query_records(
            &conn,
            &format!("{RECORD_SELECT} WHERE s.vault_id = ?1 ORDER BY s.created_at DESC, s.rowid DESC"),
            [vault_id],
        )
    }

    /// Secrets matching `filter`, restricted to vaults owned by `user_id`.
    /// Newest first.
    pub fn search(&self, user_id: &str, filter: &SecretFilter) -> Result<Vec<SecretRecord>> {
        let predicate = filter.to_predicate(user_id);
        let sql = format!(
            "{RECORD_SELECT}
             INNER JOIN vaults v ON v.id = s.vault_id
             WHERE {}
             ORDER BY s.created_at DESC, s.rowid DESC",
            predicate.sql
        );

        let conn = self.db.connect()?;
        query_records(&conn, &sql, params_from_iter(predicate.params.iter()))
    }

    /// Stamp `last_accessed_at`.  Runs on its own connection, outside any
    /// read or write transaction.
    pub fn update_last_accessed(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let conn = self.db.connect()?;
        conn.execute(
            "UPDATE secrets SET last_accessed_at = ?1 WHERE id = ?2",
            params![db::encode_ts(&at), id],
        )?;
        Ok(())
    }

    /// Persist payload, encryption version and metadata of an existing
    /// secret atomically, refreshing both `updated_at` stamps.
    ///
    /// Returns the stored record, or `None` if the secret no longer exists.
    pub fn update(&self, record: &SecretRecord) -> Result<Option<SecretRecord>> {
        let now = db::now();
        let ts = db::encode_ts(&now);
        let tags = encode_tags(&record.metadata.tags)?;

        let mut conn = self.db.connect()?;
        let tx = conn.transaction()?;

        let changed = tx.execute(
            "UPDATE secrets SET encrypted_payload = ?1, encryption_version = ?2, updated_at = ?3
             WHERE id = ?4",
            params![
                record.secret.encrypted_payload,
                record.secret.encryption_version,
                ts,
                record.secret.id,
            ],
        )?;
        if changed == 0 {
            // Dropping the transaction rolls it back.
            return Ok(None);
        }

        let changed = tx.execute(
            "UPDATE secret_metadata SET title = ?1, domain = ?2, tags = ?3, updated_at = ?4
             WHERE secret_id = ?5",
            params![
                record.metadata.title,
                record.metadata.domain,
                tags,
                ts,
                record.secret.id,
            ],
        )?;
        if changed == 0 {
            return Err(VaultKeepError::MissingMetadata(record.secret.id.clone()));
        }

        tx.commit()?;

        let mut updated = record.clone();
        updated.secret.updated_at = now;
        updated.metadata.updated_at = now;
        Ok(Some(updated))
    }

    /// Delete a secret; its metadata row is removed by the cascade.
    ///
    /// Returns `false` if there was nothing to delete.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.db.connect()?;
        let removed = conn.execute("DELETE FROM secrets WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }
}

fn get_record(conn: &Connection, id: &str) -> Result<Option<SecretRecord>> {
    let row = conn
        .query_row(&format!("{RECORD_SELECT} WHERE s.id = ?1"), [id], joined_from_row)
        .optional()?;
    row.map(into_record).transpose()
}

fn query_records<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<SecretRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, joined_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(into_record).collect()
}

/// A joined row: the secret plus whatever the left join found.
type JoinedRow = (Secret, Option<SecretMetadata>);

fn joined_from_row(row: &Row<'_>) -> rusqlite::Result<JoinedRow> {
    let secret = Secret {
        id: row.get(0)?,
        vault_id: row.get(1)?,
        secret_type: row.get(2)?,
        encrypted_payload: row.get(3)?,
        encryption_version: row.get(4)?,
        last_accessed_at: db::opt_ts_column(row, 5)?,
        created_at: db::ts_column(row, 6)?,
        updated_at: db::ts_column(row, 7)?,
    };

    let metadata_id: Option<String> = row.get(8)?;
    let metadata = match metadata_id {
        Some(id) => Some(SecretMetadata {
            id,
            secret_id: secret.id.clone(),
            title: row.get(9)?,
            domain: row.get(10)?,
            tags: decode_tags(row, 11)?,
            created_at: db::ts_column(row, 12)?,
            updated_at: db::ts_column(row, 13)?,
        }),
        None => None,
    };

    Ok((secret, metadata))
}

fn into_record((secret, metadata): JoinedRow) -> Result<SecretRecord> {
    match metadata {
        Some(metadata) => Ok(SecretRecord { secret, metadata }),
        None => {
            tracing::error!(secret_id = %secret.id, "secret has no metadata row");
            Err(VaultKeepError::MissingMetadata(secret.id))
        }
    }
}

fn encode_tags(tags: &BTreeSet<String>) -> Result<String> {
    Ok(serde_json::to_string(tags)?)
}

fn decode_tags(row: &Row<'_>, idx: usize) -> rusqlite::Result<BTreeSet<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbOptions;
    use crate::secret::model::SecretType;
    use crate::users::UserStore;
    use crate::vault::{NewVault, VaultStore};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        db: Database,
        secrets: SecretStore,
        vault_id: String,
    }

    fn setup() -> Fixture {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("keep.db"), DbOptions::default()).unwrap();
        let user = UserStore::new(db.clone())
            .create("owner@example.com", None)
            .unwrap();
        let vault = VaultStore::new(db.clone())
            .create(NewVault {
                user_id: user.id,
                name: "Personal".into(),
                description: None,
                encrypted_key: b"key".to_vec(),
                key_encryption_version: None,
            })
            .unwrap();
        Fixture {
            _dir: dir,
            secrets: SecretStore::new(db.clone()),
            db,
            vault_id: vault.id,
        }
    }

    fn new_secret(vault_id: &str) -> NewSecret {
        NewSecret {
            vault_id: vault_id.to_string(),
            secret_type: SecretType::Password,
            encrypted_payload: b"x".to_vec(),
            encryption_version: 1,
        }
    }

    fn meta(title: &str) -> NewMetadata {
        NewMetadata {
            title: title.to_string(),
            domain: Some("bank.example.com".into()),
            tags: ["finance".to_string()].into_iter().collect(),
        }
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.connect()
            .unwrap()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn create_writes_both_rows() {
        let f = setup();
        let record = f.secrets.create(new_secret(&f.vault_id), meta("Bank")).unwrap();

        assert_eq!(record.metadata.secret_id, record.secret.id);

        let stored = f.secrets.get_by_id(record.id()).unwrap().unwrap();
        assert_eq!(stored, record);
        assert_eq!(count(&f.db, "secrets"), 1);
        assert_eq!(count(&f.db, "secret_metadata"), 1);
    }

    #[test]
    fn failed_metadata_insert_leaves_no_rows() {
        let f = setup();
        // An empty title violates the metadata CHECK constraint, so the
        // second insert of the unit fails after the first succeeded.
        let err = f.secrets.create(new_secret(&f.vault_id), meta("")).unwrap_err();
        assert!(matches!(err, VaultKeepError::Database(_)));

        assert_eq!(count(&f.db, "secrets"), 0);
        assert_eq!(count(&f.db, "secret_metadata"), 0);
    }

    #[test]
    fn create_in_missing_vault_fails() {
        let f = setup();
        assert!(f.secrets.create(new_secret("no-such-vault"), meta("Bank")).is_err());
        assert_eq!(count(&f.db, "secret_metadata"), 0);
    }

    #[test]
    fn get_missing_secret_is_none() {
        let f = setup();
        assert!(f.secrets.get_by_id("nope").unwrap().is_none());
    }

    #[test]
    fn secret_without_metadata_is_an_error() {
        let f = setup();
        let record = f.secrets.create(new_secret(&f.vault_id), meta("Bank")).unwrap();
        f.db.connect()
            .unwrap()
            .execute("DELETE FROM secret_metadata WHERE secret_id = ?1", [record.id()])
            .unwrap();

        let err = f.secrets.get_by_id(record.id()).unwrap_err();
        assert!(matches!(err, VaultKeepError::MissingMetadata(id) if id == record.secret.id));
        assert!(f.secrets.list_by_vault(&f.vault_id).is_err());
    }

    #[test]
    fn list_by_vault_is_newest_first() {
        let f = setup();
        for title in ["one", "two", "three"] {
            f.secrets.create(new_secret(&f.vault_id), meta(title)).unwrap();
        }

        let titles: Vec<String> = f
            .secrets
            .list_by_vault(&f.vault_id)
            .unwrap()
            .into_iter()
            .map(|r| r.metadata.title)
            .collect();
        assert_eq!(titles, ["three", "two", "one"]);
    }

    #[test]
    fn update_rewrites_secret_and_metadata() {
        let f = setup();
        let mut record = f.secrets.create(new_secret(&f.vault_id), meta("Bank")).unwrap();

        record.secret.encrypted_payload = b"y".to_vec();
        record.secret.encryption_version = 2;
        record.metadata.title = "Savings".into();
        record.metadata.domain = None;
        record.metadata.tags = ["money".to_string(), "home".to_string()].into_iter().collect();

        let updated = f.secrets.update(&record).unwrap().unwrap();
        let stored = f.secrets.get_by_id(record.id()).unwrap().unwrap();
        assert_eq!(stored, updated);
        assert_eq!(stored.secret.encrypted_payload, b"y");
        assert_eq!(stored.secret.encryption_version, 2);
        assert_eq!(stored.metadata.title, "Savings");
        assert!(stored.metadata.domain.is_none());
        assert_eq!(stored.metadata.tags.len(), 2);
    }

    #[test]
    fn failed_metadata_update_rolls_back_secret_update() {
        let f = setup();
        let original = f.secrets.create(new_secret(&f.vault_id), meta("Bank")).unwrap();

        let mut broken = original.clone();
        broken.secret.encrypted_payload = b"changed".to_vec();
        broken.metadata.title = String::new();

        assert!(f.secrets.update(&broken).is_err());

        let stored = f.secrets.get_by_id(original.id()).unwrap().unwrap();
        assert_eq!(stored, original);
    }

    #[test]
    fn update_missing_secret_is_none() {
        let f = setup();
        let record = f.secrets.create(new_secret(&f.vault_id), meta("Bank")).unwrap();
        assert!(f.secrets.delete(record.id()).unwrap());
        assert!(f.secrets.update(&record).unwrap().is_none());
    }

    #[test]
    fn delete_cascades_to_metadata() {
        let f = setup();
        let record = f.secrets.create(new_secret(&f.vault_id), meta("Bank")).unwrap();

        assert!(f.secrets.delete(record.id()).unwrap());
        assert!(f.secrets.get_by_id(record.id()).unwrap().is_none());
        assert_eq!(count(&f.db, "secret_metadata"), 0);
        assert!(!f.secrets.delete(record.id()).unwrap());
    }

    #[test]
    fn last_accessed_is_stamped() {
        let f = setup();
        let record = f.secrets.create(new_secret(&f.vault_id), meta("Bank")).unwrap();
        assert!(record.secret.last_accessed_at.is_none());

        let at = db::now();
        f.secrets.update_last_accessed(record.id(), at).unwrap();

        let stored = f.secrets.get_by_id(record.id()).unwrap().unwrap();
        assert_eq!(stored.secret.last_accessed_at, Some(at));
    }
}
