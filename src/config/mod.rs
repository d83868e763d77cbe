//! Configuration: project-level settings loaded from `.vaultkeep.toml`.

pub mod settings;

pub use settings::Settings;
