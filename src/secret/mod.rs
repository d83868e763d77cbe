pub mod filter;
pub mod model;
pub mod store;

pub use filter::SecretFilter;
pub use model::{
    normalize_tags, CreateSecret, NewMetadata, NewSecret, Secret, SecretMetadata, SecretRecord,
    SecretType, SecretUpdate,
};
pub use store::SecretStore;
