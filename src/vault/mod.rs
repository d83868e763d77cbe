//! Vault module: user-owned containers for secrets.
//!
//! This module provides:
//! - `Vault` and its create/update request shapes (`model`)
//! - `VaultStore`, the id-keyed persistence layer (`store`)

pub mod model;
pub mod store;

// Re-export the most commonly used items.
pub use model::{CreateVault, NewVault, Vault, VaultUpdate};
pub use store::VaultStore;
