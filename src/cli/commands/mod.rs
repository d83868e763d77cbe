pub mod audit_cmd;
pub mod completions;
pub mod device;
pub mod secret;
pub mod user;
pub mod vault;
