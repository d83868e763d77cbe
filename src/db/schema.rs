//! Schema definition and migration.

use rusqlite::Connection;

use crate::errors::Result;

/// Schema version recorded in `PRAGMA user_version`.
pub const SCHEMA_VERSION: u32 = 1;

// Audit rows keep vault/secret ids without foreign keys: they must outlive
// the records they describe, and the triggers below reject any change.
const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS users (
    id          TEXT PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,
    name        TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS vaults (
    id                      TEXT PRIMARY KEY,
    user_id                 TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name                    TEXT NOT NULL CHECK (length(name) > 0),
    description             TEXT,
    encrypted_key           BLOB NOT NULL,
    key_encryption_version  INTEGER CHECK (key_encryption_version IS NULL OR key_encryption_version >= 1),
    created_at              TEXT NOT NULL,
    updated_at              TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_vaults_user ON vaults (user_id, created_at);

CREATE TABLE IF NOT EXISTS secrets (
    id                  TEXT PRIMARY KEY,
    vault_id            TEXT NOT NULL REFERENCES vaults(id) ON DELETE CASCADE,
    type                TEXT NOT NULL CHECK (type IN ('password', 'note', 'api_key', 'card')),
    encrypted_payload   BLOB NOT NULL,
    encryption_version  INTEGER NOT NULL CHECK (encryption_version >= 1),
    last_accessed_at    TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_secrets_vault ON secrets (vault_id, created_at);

CREATE TABLE IF NOT EXISTS secret_metadata (
    id          TEXT PRIMARY KEY,
    secret_id   TEXT NOT NULL UNIQUE REFERENCES secrets(id) ON DELETE CASCADE,
    title       TEXT NOT NULL CHECK (length(title) > 0),
    domain      TEXT,
    tags        TEXT NOT NULL DEFAULT '[]' CHECK (json_valid(tags)),
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS devices (
    id                  TEXT PRIMARY KEY,
    user_id             TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    device_fingerprint  TEXT NOT NULL,
    last_seen_at        TEXT NOT NULL,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    UNIQUE (user_id, device_fingerprint)
);

CREATE TABLE IF NOT EXISTS audit_logs (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    vault_id    TEXT,
    secret_id   TEXT,
    action      TEXT NOT NULL CHECK (action IN ('create', 'view', 'update', 'delete')),
    ip_address  TEXT,
    user_agent  TEXT,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_audit_user ON audit_logs (user_id, created_at);

CREATE TRIGGER IF NOT EXISTS audit_logs_immutable_update
BEFORE UPDATE ON audit_logs
BEGIN
    SELECT RAISE(ABORT, 'audit log entries are immutable');
END;

CREATE TRIGGER IF NOT EXISTS audit_logs_immutable_delete
BEFORE DELETE ON audit_logs
BEGIN
    SELECT RAISE(ABORT, 'audit log entries are immutable');
END;
";

/// Bring the schema up to [`SCHEMA_VERSION`].
pub(super) fn migrate(conn: &mut Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if current >= SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA_V1)?;
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;

    tracing::info!(from = current, to = SCHEMA_VERSION, "database schema migrated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn migrate_creates_all_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables = table_names(&conn);
        for expected in [
            "audit_logs",
            "devices",
            "secret_metadata",
            "secrets",
            "users",
            "vaults",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
    }

    #[test]
    fn migrate_twice_is_a_no_op() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn audit_rows_reject_updates_and_deletes() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        conn.execute(
            "INSERT INTO audit_logs (id, user_id, action, created_at)
             VALUES ('a1', 'u1', 'view', '2024-01-01T00:00:00.000000Z')",
            [],
        )
        .unwrap();

        assert!(conn
            .execute("UPDATE audit_logs SET action = 'delete' WHERE id = 'a1'", [])
            .is_err());
        assert!(conn
            .execute("DELETE FROM audit_logs WHERE id = 'a1'", [])
            .is_err());
    }
}
