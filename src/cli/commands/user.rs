//! `vaultkeep user`: create and inspect accounts.

use crate::cli::output;
use crate::cli::{open_database, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultKeepError};
use crate::users::{User, UserStore};

/// Execute `user add`.
pub fn add(cli: &Cli, settings: &Settings, email: &str, name: Option<&str>) -> Result<()> {
    let users = UserStore::new(open_database(cli, settings)?);

    if users.get_by_email(email)?.is_some() {
        return Err(VaultKeepError::CommandFailed(format!(
            "a user with email '{email}' already exists"
        )));
    }
    let user = users.create(email, name)?;

    if cli.json {
        return output::print_json(&user);
    }
    output::success(&format!("Created user {}", user.email));
    print_user(&user);
    Ok(())
}

/// Execute `user show`.
pub fn show(cli: &Cli, settings: &Settings, email: &str) -> Result<()> {
    let users = UserStore::new(open_database(cli, settings)?);
    let user = users
        .get_by_email(email)?
        .ok_or_else(|| VaultKeepError::CommandFailed(format!("unknown user '{email}'")))?;

    if cli.json {
        return output::print_json(&user);
    }
    print_user(&user);
    Ok(())
}

fn print_user(user: &User) {
    output::info(&format!("id:    {}", user.id));
    output::info(&format!("email: {}", user.email));
    if let Some(name) = &user.name {
        output::info(&format!("name:  {name}"));
    }
}
