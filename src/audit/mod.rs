//! Audit log: append-only history of vault and secret access.
//!
//! Every create, view, update and delete of a vault or secret leaves one
//! row here.  Rows are never changed or removed (the schema rejects it)
//! and keep their vault/secret ids after those records are deleted.
//!
//! Writing is best-effort: services call [`AuditLog::record`], which logs
//! a warning on failure and carries on, so a broken audit table can never
//! fail or roll back the operation being audited.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Row};
use serde::Serialize;

use crate::db::{self, Database};
use crate::errors::{Result, VaultKeepError};
use crate::guard::Caller;

/// What happened to the audited record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    View,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::View => "view",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = VaultKeepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(Self::Create),
            "view" => Ok(Self::View),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(VaultKeepError::Validation(format!(
                "unknown audit action '{other}'"
            ))),
        }
    }
}

impl ToSql for Action {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Action {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: VaultKeepError| FromSqlError::Other(Box::new(e)))
    }
}

/// A stored audit row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub user_id: String,
    pub vault_id: Option<String>,
    pub secret_id: Option<String>,
    pub action: Action,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An audit row about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub user_id: String,
    pub vault_id: Option<String>,
    pub secret_id: Option<String>,
    pub action: Action,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewAuditEntry {
    /// Entry for `action` by `caller`, carrying the caller's client details.
    pub fn new(caller: &Caller, action: Action) -> Self {
        Self {
            user_id: caller.user_id.clone(),
            vault_id: None,
            secret_id: None,
            action,
            ip_address: caller.ip_address.clone(),
            user_agent: caller.user_agent.clone(),
        }
    }

    pub fn with_vault(mut self, vault_id: &str) -> Self {
        self.vault_id = Some(vault_id.to_string());
        self
    }

    pub fn with_secret(mut self, secret_id: &str) -> Self {
        self.secret_id = Some(secret_id.to_string());
        self
    }
}

const AUDIT_COLUMNS: &str =
    "id, user_id, vault_id, secret_id, action, ip_address, user_agent, created_at";

/// SQLite-backed audit log.
#[derive(Debug, Clone)]
pub struct AuditLog {
    db: Database,
}

impl AuditLog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append one entry and return it with its id and timestamp.
    pub fn log(&self, entry: NewAuditEntry) -> Result<AuditEntry> {
        let stored = AuditEntry {
            id: db::new_id(),
            user_id: entry.user_id,
            vault_id: entry.vault_id,
            secret_id: entry.secret_id,
            action: entry.action,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            created_at: db::now(),
        };

        let conn = self.db.connect()?;
        conn.execute(
            "INSERT INTO audit_logs (id, user_id, vault_id, secret_id, action,
                                     ip_address, user_agent, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                stored.id,
                stored.user_id,
                stored.vault_id,
                stored.secret_id,
                stored.action,
                stored.ip_address,
                stored.user_agent,
                db::encode_ts(&stored.created_at),
            ],
        )?;

        Ok(stored)
    }

    /// Log an entry, never failing the caller.  Errors are reported as a
    /// warning and dropped.
    pub fn record(&self, entry: NewAuditEntry) {
        let action = entry.action;
        let user_id = entry.user_id.clone();
        if let Err(e) = self.log(entry) {
            tracing::warn!(%action, user_id = %user_id, error = %e, "failed to write audit entry");
        }
    }

    /// Entries for `user_id`, most recent first, at most `limit` of them.
    pub fn list_by_user(&self, user_id: &str, limit: usize) -> Result<Vec<AuditEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_logs
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2"
        ))?;

        let entries = stmt
            .query_map(params![user_id, limit], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        vault_id: row.get(2)?,
        secret_id: row.get(3)?,
        action: row.get(4)?,
        ip_address: row.get(5)?,
        user_agent: row.get(6)?,
        created_at: db::ts_column(row, 7)?,
    })
}
