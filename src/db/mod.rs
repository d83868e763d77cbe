//! Database handle: SQLite connection setup, schema migration and the
//! shared row helpers used by every store.
//!
//! A `Database` is just a path plus connection options.  It holds no open
//! connection: each store operation calls [`Database::connect`] and keeps
//! that connection for exactly one unit of work, so stores are cheap to
//! clone and safe to use from many threads.  SQLite itself is the only
//! serialization point; concurrent writers wait up to the busy timeout.
//!
//! Every connection also carries a `casefold(text)` SQL function, a
//! Unicode-aware `lower()` used for case-insensitive search.

mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};

use crate::errors::Result;

pub use schema::SCHEMA_VERSION;

/// Per-connection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbOptions {
    /// How long to wait on a locked database before returning `SQLITE_BUSY`.
    pub busy_timeout: Duration,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle to the VaultKeep database file.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    options: DbOptions,
}

impl Database {
    /// Open (or create) the database at `path` and bring its schema up to
    /// date.
    ///
    /// Creates the parent directory if needed and, on unix, restricts the
    /// database file and its WAL sidecars to owner-only permissions.
    pub fn open(path: &Path, options: DbOptions) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // SQLite gives `-wal` and `-shm` the mode of the main file, so the
        // main file must be 0o600 before the first connection opens it.
        #[cfg(unix)]
        restrict_permissions(path, true)?;

        let db = Self {
            path: path.to_path_buf(),
            options,
        };

        let mut conn = db.connect()?;

        // WAL is a property of the file, so it only needs setting once.
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        // Sidecars left behind by an older process may predate the above.
        #[cfg(unix)]
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = path.as_os_str().to_owned();
            sidecar.push(suffix);
            restrict_permissions(Path::new(&sidecar), false)?;
        }

        schema::migrate(&mut conn)?;
        tracing::debug!(path = %path.display(), "database ready");

        Ok(db)
    }

    /// Open a fresh connection with foreign keys enforced, the busy
    /// timeout applied and `casefold` registered.
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.options.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.create_scalar_function(
            "casefold",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let value: Option<String> = ctx.get(0)?;
                Ok(value.map(|s| s.to_lowercase()))
            },
        )?;
        Ok(conn)
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Set owner-only permissions on `path`, creating it first when `create`
/// is set.  A missing file is skipped otherwise.
#[cfg(unix)]
fn restrict_permissions(path: &Path, create: bool) -> Result<()> {
    use std::fs::{OpenOptions, Permissions};
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    if create {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o600)
            .open(path)?;
    } else if !path.exists() {
        return Ok(());
    }
    std::fs::set_permissions(path, Permissions::from_mode(0o600))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Generate a new primary key.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time at the precision the database stores.
///
/// Truncating here means a value handed back to the caller compares equal
/// to the same value read back from disk later.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Encode a timestamp as fixed-width RFC 3339 so that text order in SQL
/// equals chronological order.
pub(crate) fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Read a required timestamp column.
pub(crate) fn ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(idx, &raw)
}

/// Read a nullable timestamp column.
pub(crate) fn opt_ts_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_ts(idx, &s)).transpose()
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
