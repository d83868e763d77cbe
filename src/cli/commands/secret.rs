//! `vaultkeep secret`: store, read, search, change and delete secrets.

use dialoguer::Confirm;

use crate::audit::AuditLog;
use crate::cli::output;
use crate::cli::{open_database, resolve_caller, tag_set, Cli};
use crate::config::Settings;
use crate::encoding;
use crate::errors::{Result, VaultKeepError};
use crate::guard::Caller;
use crate::patch::Patch;
use crate::secret::{
    CreateSecret, NewMetadata, NewSecret, SecretFilter, SecretStore, SecretType, SecretUpdate,
};
use crate::service::SecretService;
use crate::vault::VaultStore;

fn service(cli: &Cli, settings: &Settings) -> Result<(SecretService, Caller)> {
    let db = open_database(cli, settings)?;
    let caller = resolve_caller(cli, &db)?;
    let service = SecretService::new(
        VaultStore::new(db.clone()),
        SecretStore::new(db.clone()),
        AuditLog::new(db),
    );
    Ok((service, caller))
}

/// Arguments of `secret add`.
pub struct AddArgs<'a> {
    pub vault_id: &'a str,
    pub secret_type: &'a str,
    pub payload: &'a str,
    pub version: u32,
    pub title: &'a str,
    pub domain: Option<&'a str>,
    pub tags: &'a [String],
}

/// Execute `secret add`.
pub fn add(cli: &Cli, settings: &Settings, args: AddArgs<'_>) -> Result<()> {
    let secret_type: SecretType = args.secret_type.parse()?;
    let encrypted_payload = encoding::decode_field("payload", args.payload)?;
    let (service, caller) = service(cli, settings)?;

    let record = service.create(
        &caller,
        CreateSecret {
            secret: NewSecret {
                vault_id: args.vault_id.to_string(),
                secret_type,
                encrypted_payload,
                encryption_version: args.version,
            },
            metadata: NewMetadata {
                title: args.title.to_string(),
                domain: args.domain.map(str::to_string),
                tags: tag_set(args.tags),
            },
        },
    )?;

    if cli.json {
        return output::print_json(&record);
    }
    output::success(&format!(
        "Added secret '{}' ({})",
        record.metadata.title,
        record.id()
    ));
    Ok(())
}

/// Execute `secret get`.
pub fn get(cli: &Cli, settings: &Settings, id: &str) -> Result<()> {
    let (service, caller) = service(cli, settings)?;
    let record = service.get(&caller, id)?;

    if cli.json {
        return output::print_json(&record);
    }
    output::print_secret(&record);
    Ok(())
}

/// Execute `secret list`.
pub fn list(cli: &Cli, settings: &Settings, vault_id: &str) -> Result<()> {
    let (service, caller) = service(cli, settings)?;
    let records = service.list(&caller, vault_id)?;

    if cli.json {
        return output::print_json(&records);
    }
    output::print_secrets_table(&records);
    Ok(())
}

/// Execute `secret search`.
pub fn search(
    cli: &Cli,
    settings: &Settings,
    vault: Option<&str>,
    secret_type: Option<&str>,
    title: Option<&str>,
    domain: Option<&str>,
    tags: &[String],
) -> Result<()> {
    let filter = SecretFilter {
        vault_id: vault.map(str::to_string),
        secret_type: secret_type.map(str::parse::<SecretType>).transpose()?,
        title: title.map(str::to_string),
        domain: domain.map(str::to_string),
        tags: tag_set(tags),
    };

    let (service, caller) = service(cli, settings)?;
    let records = service.search(&caller, &filter)?;

    if cli.json {
        return output::print_json(&records);
    }
    output::print_secrets_table(&records);
    Ok(())
}

/// Arguments of `secret update`.
pub struct UpdateArgs<'a> {
    pub id: &'a str,
    pub payload: Option<&'a str>,
    pub version: Option<u32>,
    pub title: Option<&'a str>,
    pub domain: Option<&'a str>,
    pub clear_domain: bool,
    pub tags: &'a [String],
    pub clear_tags: bool,
}

/// Execute `secret update`.
pub fn update(cli: &Cli, settings: &Settings, args: UpdateArgs<'_>) -> Result<()> {
    let encrypted_payload = args
        .payload
        .map(|p| encoding::decode_field("payload", p))
        .transpose()?;

    let tags = if args.clear_tags {
        Some(Default::default())
    } else if args.tags.is_empty() {
        None
    } else {
        Some(tag_set(args.tags))
    };

    let (service, caller) = service(cli, settings)?;
    let record = service.update(
        &caller,
        args.id,
        SecretUpdate {
            encrypted_payload,
            encryption_version: args.version,
            title: args.title.map(str::to_string),
            domain: Patch::from_parts(args.domain.map(str::to_string), args.clear_domain),
            tags,
        },
    )?;

    if cli.json {
        return output::print_json(&record);
    }
    output::success(&format!("Updated secret '{}'", record.metadata.title));
    Ok(())
}

/// Execute `secret delete`.
pub fn delete(cli: &Cli, settings: &Settings, id: &str, force: bool) -> Result<()> {
    let (service, caller) = service(cli, settings)?;

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete secret {id}?"))
            .default(false)
            .interact()
            .map_err(|e| VaultKeepError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    service.delete(&caller, id)?;
    output::success(&format!("Deleted secret {id}"));
    Ok(())
}
