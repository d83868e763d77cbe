//! Input checks applied by the services before anything touches the store.
//!
//! Limits are counted in characters, not bytes.

use std::collections::BTreeSet;

use crate::errors::{Result, VaultKeepError};

pub const VAULT_NAME_MAX: usize = 100;
pub const VAULT_DESCRIPTION_MAX: usize = 500;
pub const TITLE_MAX: usize = 200;
pub const DOMAIN_MAX: usize = 255;
pub const TAG_MAX: usize = 50;
pub const FINGERPRINT_MAX: usize = 255;
pub const EMAIL_MAX: usize = 320;

fn invalid(msg: impl Into<String>) -> VaultKeepError {
    VaultKeepError::Validation(msg.into())
}

/// Non-empty (after trimming) and at most `max` characters.
fn required(field: &str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{field} cannot be empty")));
    }
    bounded(field, value, max)
}

/// At most `max` characters.
fn bounded(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(invalid(format!("{field} cannot exceed {max} characters")));
    }
    Ok(())
}

pub fn vault_name(name: &str) -> Result<()> {
    required("vault name", name, VAULT_NAME_MAX)
}

pub fn vault_description(description: &str) -> Result<()> {
    bounded("vault description", description, VAULT_DESCRIPTION_MAX)
}

pub fn title(title: &str) -> Result<()> {
    required("title", title, TITLE_MAX)
}

pub fn domain(domain: &str) -> Result<()> {
    bounded("domain", domain, DOMAIN_MAX)
}

pub fn tags(tags: &BTreeSet<String>) -> Result<()> {
    for tag in tags {
        required("tag", tag, TAG_MAX)?;
    }
    Ok(())
}

pub fn fingerprint(fingerprint: &str) -> Result<()> {
    required("device fingerprint", fingerprint, FINGERPRINT_MAX)
}

pub fn encryption_version(version: u32) -> Result<()> {
    if version < 1 {
        return Err(invalid("encryption version must be at least 1"));
    }
    Ok(())
}

pub fn encrypted_bytes(field: &str, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(invalid(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Loose shape check: one `@` with something on both sides.
pub fn email(email: &str) -> Result<()> {
    required("email", email, EMAIL_MAX)?;
    match email.split_once('@') {
        Some((local, host)) if !local.is_empty() && !host.is_empty() && !host.contains('@') => {
            Ok(())
        }
        _ => Err(invalid(format!("'{email}' is not a valid email address"))),
    }
}
