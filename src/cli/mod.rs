//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::config::Settings;
use crate::db::Database;
use crate::errors::{Result, VaultKeepError};
use crate::guard::Caller;
use crate::users::UserStore;

/// VaultKeep CLI: drive the vault store from the command line.
#[derive(Parser)]
#[command(
    name = "vaultkeep",
    about = "Ownership-scoped store for client-encrypted vaults and secrets",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database file (default: from .vaultkeep.toml, else .vaultkeep/vaultkeep.db)
    #[arg(long, env = "VAULTKEEP_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Acting user, by id or email
    #[arg(short, long, env = "VAULTKEEP_USER", global = true)]
    pub user: Option<String>,

    /// Client IP address recorded in audit entries
    #[arg(long, global = true)]
    pub ip: Option<String>,

    /// Client user agent recorded in audit entries
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage vaults
    Vault {
        #[command(subcommand)]
        action: VaultAction,
    },

    /// Manage secrets
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },

    /// Manage registered devices
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },

    /// View your audit trail
    Audit {
        /// Number of entries to show (default: audit_list_limit from config)
        #[arg(long)]
        last: Option<usize>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

#[derive(clap::Subcommand)]
pub enum UserAction {
    /// Create a user account
    Add {
        email: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Show a user account
    Show { email: String },
}

#[derive(clap::Subcommand)]
pub enum VaultAction {
    /// Create a vault
    Create {
        name: String,
        /// Client-wrapped vault key, base64
        #[arg(long)]
        key: String,
        /// Version of the scheme that wrapped the key
        #[arg(long)]
        key_version: Option<u32>,
        #[arg(long)]
        description: Option<String>,
    },

    /// List your vaults
    List,

    /// Show one vault
    Show { id: String },

    /// Rename or re-describe a vault
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        /// Remove the description
        #[arg(long)]
        clear_description: bool,
    },

    /// Delete a vault and every secret in it
    Delete {
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(clap::Subcommand)]
pub enum SecretAction {
    /// Add a secret to a vault
    Add {
        vault_id: String,
        /// password, note, api_key or card
        #[arg(long = "type")]
        secret_type: String,
        /// Client-encrypted payload, base64
        #[arg(long)]
        payload: String,
        /// Version of the scheme that encrypted the payload
        #[arg(long, default_value = "1")]
        version: u32,
        #[arg(long)]
        title: String,
        #[arg(long)]
        domain: Option<String>,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Show a secret (records a view)
    Get { id: String },

    /// List the secrets in a vault
    List { vault_id: String },

    /// Search your secrets
    Search {
        /// Only this vault
        #[arg(long)]
        vault: Option<String>,
        /// Only this type
        #[arg(long = "type")]
        secret_type: Option<String>,
        /// Title contains (case-insensitive)
        #[arg(long)]
        title: Option<String>,
        /// Domain contains (case-insensitive)
        #[arg(long)]
        domain: Option<String>,
        /// Carries any of these tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Change a secret's payload or metadata
    Update {
        id: String,
        #[arg(long)]
        payload: Option<String>,
        #[arg(long)]
        version: Option<u32>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_domain")]
        domain: Option<String>,
        /// Remove the domain
        #[arg(long)]
        clear_domain: bool,
        /// Replace all tags (repeatable)
        #[arg(long = "tag", conflicts_with = "clear_tags")]
        tags: Vec<String>,
        /// Remove all tags
        #[arg(long)]
        clear_tags: bool,
    },

    /// Delete a secret
    Delete {
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(clap::Subcommand)]
pub enum DeviceAction {
    /// Register this device, or mark it as seen
    Register { fingerprint: String },

    /// List your devices
    List,

    /// Mark a registered device as seen now
    Touch { id: String },

    /// Remove a device
    Delete { id: String },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load `.vaultkeep.toml` from the current directory.
pub fn load_settings() -> Result<Settings> {
    let cwd = std::env::current_dir()?;
    Settings::load(&cwd)
}

/// Open the database named by `--db`, falling back to the configured path.
pub fn open_database(cli: &Cli, settings: &Settings) -> Result<Database> {
    let path = match &cli.db {
        Some(path) => path.clone(),
        None => settings.database_path(&std::env::current_dir()?),
    };
    Database::open(&path, settings.db_options())
}

/// Resolve `--user` (an id or an email) to the acting caller.
pub fn resolve_caller(cli: &Cli, db: &Database) -> Result<Caller> {
    let Some(who) = cli.user.as_deref() else {
        return Err(VaultKeepError::CommandFailed(
            "no user given; pass --user or set VAULTKEEP_USER".into(),
        ));
    };

    let users = UserStore::new(db.clone());
    let user = match users.get_by_id(who)? {
        Some(user) => user,
        None => users.get_by_email(who)?.ok_or_else(|| {
            VaultKeepError::CommandFailed(format!("unknown user '{who}'"))
        })?,
    };

    let mut caller = Caller::new(user.id);
    if let Some(ip) = &cli.ip {
        caller = caller.with_ip(ip.clone());
    }
    if let Some(agent) = &cli.user_agent {
        caller = caller.with_user_agent(agent.clone());
    }
    Ok(caller)
}

/// Turn repeated `--tag` values into a tag set, dropping blanks.
pub fn tag_set(tags: &[String]) -> std::collections::BTreeSet<String> {
    crate::secret::normalize_tags(tags)
}
