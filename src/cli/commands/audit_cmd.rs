//! `vaultkeep audit`: display your audit trail.
//!
//! Usage:
//!   vaultkeep audit               # show the configured default (50)
//!   vaultkeep audit --last 20     # show last 20

use crate::audit::AuditLog;
use crate::cli::output;
use crate::cli::{open_database, resolve_caller, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::service::AuditService;

/// Execute the `audit` command.
pub fn execute(cli: &Cli, settings: &Settings, last: Option<usize>) -> Result<()> {
    let db = open_database(cli, settings)?;
    let caller = resolve_caller(cli, &db)?;
    let service = AuditService::new(AuditLog::new(db), settings.audit_list_limit);

    let entries = service.list(&caller, last)?;

    if cli.json {
        return output::print_json(&entries);
    }
    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }
    output::print_audit_table(&entries);
    Ok(())
}
