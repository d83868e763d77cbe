//! Use-case orchestration.
//!
//! Each service is built from exactly the stores it needs and runs the
//! same sequence for every operation: validate input, check ownership,
//! perform the store operation, then write the audit entry outside any
//! transaction.

pub mod audit;
pub mod device;
pub mod secret;
pub mod vault;

pub use audit::AuditService;
pub use device::DeviceService;
pub use secret::SecretService;
pub use vault::VaultService;
