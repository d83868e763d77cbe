use tracing::debug;

use crate::audit::{AuditEntry, AuditLog};
use crate::errors::{Result, VaultKeepError};
use crate::guard::Caller;

/// Read access to the caller's own audit trail.
#[derive(Debug, Clone)]
pub struct AuditService {
    audit: AuditLog,
    default_limit: usize,
}

impl AuditService {
    pub fn new(audit: AuditLog, default_limit: usize) -> Self {
        Self {
            audit,
            default_limit,
        }
    }

    /// The caller's most recent audit entries.  `limit` falls back to the
    /// configured default.
    pub fn list(&self, caller: &Caller, limit: Option<usize>) -> Result<Vec<AuditEntry>> {
        let limit = limit.unwrap_or(self.default_limit);
        if limit == 0 {
            return Err(VaultKeepError::Validation("limit must be at least 1".into()));
        }
        debug!(user_id = %caller.user_id, limit, "listing audit entries");
        self.audit.list_by_user(&caller.user_id, limit)
    }
}
