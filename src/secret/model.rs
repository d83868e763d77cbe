//! Secret, metadata and the request shapes used to create and change them.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::encoding::base64_encode;
use crate::errors::VaultKeepError;
use crate::patch::Patch;

/// What kind of entry a secret holds.  Purely descriptive: the payload is
/// opaque regardless of type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretType {
    Password,
    Note,
    ApiKey,
    Card,
}

impl SecretType {
    pub const ALL: [SecretType; 4] = [Self::Password, Self::Note, Self::ApiKey, Self::Card];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Note => "note",
            Self::ApiKey => "api_key",
            Self::Card => "card",
        }
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecretType {
    type Err = VaultKeepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                VaultKeepError::Validation(format!(
                    "unknown secret type '{s}': expected one of password, note, api_key, card"
                ))
            })
    }
}

impl ToSql for SecretType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SecretType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: VaultKeepError| FromSqlError::Other(Box::new(e)))
    }
}

/// One encrypted entry.  `encrypted_payload` is opaque client ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    pub id: String,
    pub vault_id: String,
    #[serde(rename = "type")]
    pub secret_type: SecretType,
    #[serde(serialize_with = "base64_encode")]
    pub encrypted_payload: Vec<u8>,
    pub encryption_version: u32,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Searchable plaintext attributes of a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretMetadata {
    pub id: String,
    pub secret_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A secret together with its metadata.  The two are only ever written
/// as a pair, so every read hands them back as one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretRecord {
    #[serde(flatten)]
    pub secret: Secret,
    pub metadata: SecretMetadata,
}

impl SecretRecord {
    pub fn id(&self) -> &str {
        &self.secret.id
    }

    pub fn vault_id(&self) -> &str {
        &self.secret.vault_id
    }
}

/// Trim each tag and drop the blank ones.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Row-level input for the secret half of `SecretStore::create`.
#[derive(Debug, Clone)]
pub struct NewSecret {
    pub vault_id: String,
    pub secret_type: SecretType,
    pub encrypted_payload: Vec<u8>,
    pub encryption_version: u32,
}

/// Row-level input for the metadata half of `SecretStore::create`.
#[derive(Debug, Clone, Default)]
pub struct NewMetadata {
    pub title: String,
    pub domain: Option<String>,
    pub tags: BTreeSet<String>,
}

/// What a caller asks for when creating a secret.
#[derive(Debug, Clone)]
pub struct CreateSecret {
    pub secret: NewSecret,
    pub metadata: NewMetadata,
}

/// Partial update of a secret and its metadata.
#[derive(Debug, Clone, Default)]
pub struct SecretUpdate {
    pub encrypted_payload: Option<Vec<u8>>,
    pub encryption_version: Option<u32>,
    pub title: Option<String>,
    pub domain: Patch<String>,
    /// Replaces the whole tag set when present.
    pub tags: Option<BTreeSet<String>>,
}

impl SecretUpdate {
    pub fn is_empty(&self) -> bool {
        self.encrypted_payload.is_none()
            && self.encryption_version.is_none()
            && self.title.is_none()
            && self.domain.is_keep()
            && self.tags.is_none()
    }

    /// Apply the requested changes to `record` in memory.
    pub fn apply(self, record: &mut SecretRecord) {
        if let Some(payload) = self.encrypted_payload {
            record.secret.encrypted_payload = payload;
        }
        if let Some(version) = self.encryption_version {
            record.secret.encryption_version = version;
        }
        if let Some(title) = self.title {
            record.metadata.title = title;
        }
        record.metadata.domain = self.domain.apply(record.metadata.domain.take());
        if let Some(tags) = self.tags {
            record.metadata.tags = tags;
        }
    }
}
