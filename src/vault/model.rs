//! Vault records and the request shapes used to create and change them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::encoding::base64_encode;
use crate::patch::Patch;

/// A user-owned container for secrets.
///
/// `encrypted_key` is the vault master key wrapped by the client; it is
/// stored and returned byte-for-byte and never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(serialize_with = "base64_encode")]
    pub encrypted_key: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_encryption_version: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row-level input for `VaultStore::create`.  The owner is already known.
#[derive(Debug, Clone)]
pub struct NewVault {
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub encrypted_key: Vec<u8>,
    pub key_encryption_version: Option<u32>,
}

/// What a caller asks for when creating a vault.  The owner comes from
/// the caller identity, never from the request.
#[derive(Debug, Clone)]
pub struct CreateVault {
    pub name: String,
    pub description: Option<String>,
    pub encrypted_key: Vec<u8>,
    pub key_encryption_version: Option<u32>,
}

impl CreateVault {
    pub fn into_new(self, user_id: &str) -> NewVault {
        NewVault {
            user_id: user_id.to_string(),
            name: self.name,
            description: self.description,
            encrypted_key: self.encrypted_key,
            key_encryption_version: self.key_encryption_version,
        }
    }
}

/// Partial update of a vault.  Only name and description are mutable.
#[derive(Debug, Clone, Default)]
pub struct VaultUpdate {
    pub name: Option<String>,
    pub description: Patch<String>,
}

impl VaultUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_keep()
    }

    /// Apply the requested changes to `vault` in memory.
    pub fn apply(self, vault: &mut Vault) {
        if let Some(name) = self.name {
            vault.name = name;
        }
        vault.description = self.description.apply(vault.description.take());
    }
}
