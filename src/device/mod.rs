//! Device registry: one row per (user, fingerprint).
//!
//! Registration is an upsert resolved inside SQLite, so concurrent
//! registrations of the same device never produce duplicates and the last
//! writer's `last_seen_at` wins.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::db::{self, Database};
use crate::errors::Result;

/// A client device a user has signed in from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub user_id: String,
    pub device_fingerprint: String,
    pub last_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const DEVICE_COLUMNS: &str =
    "id, user_id, device_fingerprint, last_seen_at, created_at, updated_at";

/// SQLite-backed device rows.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    db: Database,
}

impl DeviceRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert the device, or refresh `last_seen_at` if this user already
    /// registered the fingerprint.  Returns the stored row either way.
    pub fn register(
        &self,
        user_id: &str,
        fingerprint: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<Device> {
        let now = db::encode_ts(&db::now());
        let conn = self.db.connect()?;
        let device = conn.query_row(
            &format!(
                "INSERT INTO devices (id, user_id, device_fingerprint, last_seen_at,
                                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT (user_id, device_fingerprint) DO UPDATE SET
                     last_seen_at = excluded.last_seen_at,
                     updated_at = excluded.updated_at
                 RETURNING {DEVICE_COLUMNS}"
            ),
            params![db::new_id(), user_id, fingerprint, db::encode_ts(&seen_at), now],
            device_from_row,
        )?;
        Ok(device)
    }

    /// All devices of `user_id`, most recently seen first.
    pub fn list_by_user(&self, user_id: &str) -> Result<Vec<Device>> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DEVICE_COLUMNS} FROM devices
             WHERE user_id = ?1
             ORDER BY last_seen_at DESC, rowid DESC"
        ))?;
        let devices = stmt
            .query_map([user_id], device_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(devices)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Device>> {
        let conn = self.db.connect()?;
        let device = conn
            .query_row(
                &format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = ?1"),
                [id],
                device_from_row,
            )
            .optional()?;
        Ok(device)
    }

    /// Refresh `last_seen_at` of a known device.  Returns `false` if the
    /// device does not exist.
    pub fn touch(&self, id: &str, seen_at: DateTime<Utc>) -> Result<bool> {
        let conn = self.db.connect()?;
        let changed = conn.execute(
            "UPDATE devices SET last_seen_at = ?1, updated_at = ?2 WHERE id = ?3",
            params![db::encode_ts(&seen_at), db::encode_ts(&db::now()), id],
        )?;
        Ok(changed > 0)
    }

    /// Returns `false` if there was nothing to delete.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.db.connect()?;
        let removed = conn.execute("DELETE FROM devices WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }
}

fn device_from_row(row: &Row<'_>) -> rusqlite::Result<Device> {
    Ok(Device {
        id: row.get(0)?,
        user_id: row.get(1)?,
        device_fingerprint: row.get(2)?,
        last_seen_at: db::ts_column(row, 3)?,
        created_at: db::ts_column(row, 4)?,
        updated_at: db::ts_column(row, 5)?,
    })
}
