//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use chrono::{DateTime, Utc};
use comfy_table::{ContentArrangement, Table};
use console::style;
use serde::Serialize;

use crate::audit::{Action, AuditEntry};
use crate::device::Device;
use crate::encoding;
use crate::errors::Result;
use crate::secret::SecretRecord;
use crate::vault::Vault;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Pretty-print any value as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

/// Print a table of vaults (ID, Name, Description, Created).
pub fn print_vaults_table(vaults: &[Vault]) {
    if vaults.is_empty() {
        info("No vaults yet.");
        tip("Run `vaultkeep vault create <NAME> --key <BASE64>` to create one.");
        return;
    }

    let mut table = new_table(vec!["ID", "Name", "Description", "Created"]);
    for v in vaults {
        table.add_row(vec![
            v.id.clone(),
            v.name.clone(),
            v.description.clone().unwrap_or_else(|| "-".into()),
            timestamp(&v.created_at),
        ]);
    }
    println!("{table}");
}

/// Print one vault as a two-column field/value table.
pub fn print_vault(vault: &Vault) {
    let mut table = new_table(vec!["Field", "Value"]);
    table.add_row(vec!["ID".to_string(), vault.id.clone()]);
    table.add_row(vec!["Name".to_string(), vault.name.clone()]);
    table.add_row(vec![
        "Description".to_string(),
        vault.description.clone().unwrap_or_else(|| "-".into()),
    ]);
    table.add_row(vec![
        "Encrypted key".to_string(),
        encoding::encode(&vault.encrypted_key),
    ]);
    table.add_row(vec![
        "Key version".to_string(),
        vault
            .key_encryption_version
            .map_or_else(|| "-".into(), |v| v.to_string()),
    ]);
    table.add_row(vec!["Created".to_string(), timestamp(&vault.created_at)]);
    table.add_row(vec!["Updated".to_string(), timestamp(&vault.updated_at)]);
    println!("{table}");
}

/// Print a table of secrets (ID, Type, Title, Domain, Tags, Updated).
pub fn print_secrets_table(secrets: &[SecretRecord]) {
    if secrets.is_empty() {
        info("No secrets found.");
        return;
    }

    let mut table = new_table(vec!["ID", "Type", "Title", "Domain", "Tags", "Updated"]);
    for s in secrets {
        table.add_row(vec![
            s.secret.id.clone(),
            s.secret.secret_type.to_string(),
            s.metadata.title.clone(),
            s.metadata.domain.clone().unwrap_or_else(|| "-".into()),
            join_tags(s),
            timestamp(&s.secret.updated_at),
        ]);
    }
    println!("{table}");
}

/// Print one secret, including its base64 payload.
pub fn print_secret(record: &SecretRecord) {
    let mut table = new_table(vec!["Field", "Value"]);
    table.add_row(vec!["ID".to_string(), record.secret.id.clone()]);
    table.add_row(vec!["Vault".to_string(), record.secret.vault_id.clone()]);
    table.add_row(vec!["Type".to_string(), record.secret.secret_type.to_string()]);
    table.add_row(vec!["Title".to_string(), record.metadata.title.clone()]);
    table.add_row(vec![
        "Domain".to_string(),
        record.metadata.domain.clone().unwrap_or_else(|| "-".into()),
    ]);
    table.add_row(vec!["Tags".to_string(), join_tags(record)]);
    table.add_row(vec![
        "Payload".to_string(),
        encoding::encode(&record.secret.encrypted_payload),
    ]);
    table.add_row(vec![
        "Encryption version".to_string(),
        record.secret.encryption_version.to_string(),
    ]);
    table.add_row(vec![
        "Last accessed".to_string(),
        record
            .secret
            .last_accessed_at
            .as_ref()
            .map_or_else(|| "-".into(), timestamp),
    ]);
    table.add_row(vec!["Updated".to_string(), timestamp(&record.secret.updated_at)]);
    println!("{table}");
}

fn join_tags(record: &SecretRecord) -> String {
    if record.metadata.tags.is_empty() {
        return "-".into();
    }
    record
        .metadata
        .tags
        .iter()
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}

/// Print a table of devices (ID, Fingerprint, Last seen, Registered).
pub fn print_devices_table(devices: &[Device]) {
    if devices.is_empty() {
        info("No devices registered.");
        return;
    }

    let mut table = new_table(vec!["ID", "Fingerprint", "Last seen", "Registered"]);
    for d in devices {
        table.add_row(vec![
            d.id.clone(),
            d.device_fingerprint.clone(),
            timestamp(&d.last_seen_at),
            timestamp(&d.created_at),
        ]);
    }
    println!("{table}");
}

/// Print audit entries in a formatted table.
pub fn print_audit_table(entries: &[AuditEntry]) {
    let mut table = new_table(vec!["Time", "Action", "Vault", "Secret", "IP", "User agent"]);

    for entry in entries {
        table.add_row(vec![
            timestamp(&entry.created_at),
            colorize_action(entry.action),
            entry.vault_id.clone().unwrap_or_else(|| "-".into()),
            entry.secret_id.clone().unwrap_or_else(|| "-".into()),
            entry.ip_address.clone().unwrap_or_else(|| "-".into()),
            entry.user_agent.clone().unwrap_or_else(|| "-".into()),
        ]);
    }

    println!(
        "{}",
        style(format!("{} audit entries:", entries.len())).bold()
    );
    println!("{table}");
}

/// Colorize action names for display.
fn colorize_action(action: Action) -> String {
    let name = action.as_str();
    match action {
        Action::Create => style(name).green().to_string(),
        Action::View => style(name).cyan().to_string(),
        Action::Update => style(name).blue().to_string(),
        Action::Delete => style(name).red().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colorize_action_keeps_name() {
        for action in [Action::Create, Action::View, Action::Update, Action::Delete] {
            assert!(console::strip_ansi_codes(&colorize_action(action)).contains(action.as_str()));
        }
    }

    #[test]
    fn timestamp_format() {
        let ts = DateTime::parse_from_rfc3339("2024-03-05T07:08:09.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(timestamp(&ts), "2024-03-05 07:08:09");
    }
}
