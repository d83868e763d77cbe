use clap::Parser;
use tracing_subscriber::EnvFilter;
use vaultkeep::cli::commands::{audit_cmd, completions, device, secret, user, vault};
use vaultkeep::cli::{
    load_settings, output, Cli, Commands, DeviceAction, SecretAction, UserAction, VaultAction,
};
use vaultkeep::config::Settings;
use vaultkeep::errors::Result;

fn main() {
    let cli = Cli::parse();

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(1);
        }
    };

    init_tracing(&cli, &settings);

    if let Err(e) = run(&cli, &settings) {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Log to stderr so `--json` output on stdout stays clean.  `RUST_LOG`
/// wins over the configured level; `--verbose` wins over both.
fn init_tracing(cli: &Cli, settings: &Settings) {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn run(cli: &Cli, settings: &Settings) -> Result<()> {
    match &cli.command {
        Commands::User { action } => match action {
            UserAction::Add { email, name } => user::add(cli, settings, email, name.as_deref()),
            UserAction::Show { email } => user::show(cli, settings, email),
        },
        Commands::Vault { action } => match action {
            VaultAction::Create {
                name,
                key,
                key_version,
                description,
            } => vault::create(
                cli,
                settings,
                name,
                key,
                *key_version,
                description.as_deref(),
            ),
            VaultAction::List => vault::list(cli, settings),
            VaultAction::Show { id } => vault::show(cli, settings, id),
            VaultAction::Update {
                id,
                name,
                description,
                clear_description,
            } => vault::update(
                cli,
                settings,
                id,
                name.as_deref(),
                description.as_deref(),
                *clear_description,
            ),
            VaultAction::Delete { id, force } => vault::delete(cli, settings, id, *force),
        },
        Commands::Secret { action } => match action {
            SecretAction::Add {
                vault_id,
                secret_type,
                payload,
                version,
                title,
                domain,
                tags,
            } => secret::add(
                cli,
                settings,
                secret::AddArgs {
                    vault_id,
                    secret_type,
                    payload,
                    version: *version,
                    title,
                    domain: domain.as_deref(),
                    tags,
                },
            ),
            SecretAction::Get { id } => secret::get(cli, settings, id),
            SecretAction::List { vault_id } => secret::list(cli, settings, vault_id),
            SecretAction::Search {
                vault,
                secret_type,
                title,
                domain,
                tags,
            } => secret::search(
                cli,
                settings,
                vault.as_deref(),
                secret_type.as_deref(),
                title.as_deref(),
                domain.as_deref(),
                tags,
            ),
            SecretAction::Update {
                id,
                payload,
                version,
                title,
                domain,
                clear_domain,
                tags,
                clear_tags,
            } => secret::update(
                cli,
                settings,
                secret::UpdateArgs {
                    id,
                    payload: payload.as_deref(),
                    version: *version,
                    title: title.as_deref(),
                    domain: domain.as_deref(),
                    clear_domain: *clear_domain,
                    tags,
                    clear_tags: *clear_tags,
                },
            ),
            SecretAction::Delete { id, force } => secret::delete(cli, settings, id, *force),
        },
        Commands::Device { action } => match action {
            DeviceAction::Register { fingerprint } => device::register(cli, settings, fingerprint),
            DeviceAction::List => device::list(cli, settings),
            DeviceAction::Touch { id } => device::touch(cli, settings, id),
            DeviceAction::Delete { id } => device::delete(cli, settings, id),
        },
        Commands::Audit { last } => audit_cmd::execute(cli, settings, *last),
        Commands::Completions { shell } => completions::execute(shell),
    }
}
