//! User directory: the account rows that vaults and devices belong to.
//!
//! Accounts are provisioned by whatever authenticates callers; VaultKeep
//! only needs the row to exist so ownership foreign keys hold.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::db::{self, Database};
use crate::errors::Result;
use crate::validation;

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// SQLite-backed user directory.
#[derive(Debug, Clone)]
pub struct UserStore {
    db: Database,
}

const USER_COLUMNS: &str = "id, email, name, created_at";

impl UserStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create an account.  Fails with a constraint error if the email is
    /// already taken.
    pub fn create(&self, email: &str, name: Option<&str>) -> Result<User> {
        validation::email(email)?;

        let user = User {
            id: db::new_id(),
            email: email.to_string(),
            name: name.map(str::to_string),
            created_at: db::now(),
        };

        let conn = self.db.connect()?;
        conn.execute(
            "INSERT INTO users (id, email, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![user.id, user.email, user.name, db::encode_ts(&user.created_at)],
        )?;

        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        let conn = self.db.connect()?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.db.connect()?;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                [email],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        created_at: db::ts_column(row, 3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbOptions;
    use crate::errors::VaultKeepError;
    use tempfile::TempDir;

    fn store() -> (TempDir, UserStore) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("keep.db"), DbOptions::default()).unwrap();
        (dir, UserStore::new(db))
    }

    #[test]
    fn create_and_lookup() {
        let (_dir, users) = store();
        let alice = users.create("alice@example.com", Some("Alice")).unwrap();

        let by_id = users.get_by_id(&alice.id).unwrap().unwrap();
        assert_eq!(by_id, alice);

        let by_email = users.get_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, alice.id);
    }

    #[test]
    fn missing_user_is_none() {
        let (_dir, users) = store();
        assert!(users.get_by_id("nope").unwrap().is_none());
        assert!(users.get_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let (_dir, users) = store();
        users.create("dup@example.com", None).unwrap();
        let err = users.create("dup@example.com", None).unwrap_err();
        assert!(matches!(err, VaultKeepError::Database(_)));
    }

    #[test]
    fn invalid_email_is_rejected_before_insert() {
        let (_dir, users) = store();
        let err = users.create("not-an-email", None).unwrap_err();
        assert!(matches!(err, VaultKeepError::Validation(_)));
    }
}
