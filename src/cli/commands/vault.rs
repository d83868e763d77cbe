//! `vaultkeep vault`: create, inspect, change and delete vaults.

use dialoguer::Confirm;

use crate::audit::AuditLog;
use crate::cli::output;
use crate::cli::{open_database, resolve_caller, Cli};
use crate::config::Settings;
use crate::encoding;
use crate::errors::{Result, VaultKeepError};
use crate::guard::Caller;
use crate::patch::Patch;
use crate::service::VaultService;
use crate::vault::{CreateVault, VaultStore, VaultUpdate};

fn service(cli: &Cli, settings: &Settings) -> Result<(VaultService, Caller)> {
    let db = open_database(cli, settings)?;
    let caller = resolve_caller(cli, &db)?;
    let service = VaultService::new(VaultStore::new(db.clone()), AuditLog::new(db));
    Ok((service, caller))
}

/// Execute `vault create`.
pub fn create(
    cli: &Cli,
    settings: &Settings,
    name: &str,
    key: &str,
    key_version: Option<u32>,
    description: Option<&str>,
) -> Result<()> {
    let encrypted_key = encoding::decode_field("key", key)?;
    let (service, caller) = service(cli, settings)?;

    let vault = service.create(
        &caller,
        CreateVault {
            name: name.to_string(),
            description: description.map(str::to_string),
            encrypted_key,
            key_encryption_version: key_version,
        },
    )?;

    if cli.json {
        return output::print_json(&vault);
    }
    output::success(&format!("Created vault '{}' ({})", vault.name, vault.id));
    Ok(())
}

/// Execute `vault list`.
pub fn list(cli: &Cli, settings: &Settings) -> Result<()> {
    let (service, caller) = service(cli, settings)?;
    let vaults = service.list(&caller)?;

    if cli.json {
        return output::print_json(&vaults);
    }
    output::print_vaults_table(&vaults);
    Ok(())
}

/// Execute `vault show`.
pub fn show(cli: &Cli, settings: &Settings, id: &str) -> Result<()> {
    let (service, caller) = service(cli, settings)?;
    let vault = service.get(&caller, id)?;

    if cli.json {
        return output::print_json(&vault);
    }
    output::print_vault(&vault);
    Ok(())
}

/// Execute `vault update`.
pub fn update(
    cli: &Cli,
    settings: &Settings,
    id: &str,
    name: Option<&str>,
    description: Option<&str>,
    clear_description: bool,
) -> Result<()> {
    let (service, caller) = service(cli, settings)?;
    let vault = service.update(
        &caller,
        id,
        VaultUpdate {
            name: name.map(str::to_string),
            description: Patch::from_parts(description.map(str::to_string), clear_description),
        },
    )?;

    if cli.json {
        return output::print_json(&vault);
    }
    output::success(&format!("Updated vault '{}'", vault.name));
    Ok(())
}

/// Execute `vault delete`.
pub fn delete(cli: &Cli, settings: &Settings, id: &str, force: bool) -> Result<()> {
    let (service, caller) = service(cli, settings)?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete vault {id} and all of its secrets?"))
            .default(false)
            .interact()
            .map_err(|e| VaultKeepError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    service.delete(&caller, id)?;
    output::success(&format!("Deleted vault {id}"));
    Ok(())
}
