pub mod audit;
pub mod cli;
pub mod config;
pub mod db;
pub mod device;
pub mod encoding;
pub mod errors;
pub mod guard;
pub mod patch;
pub mod secret;
pub mod service;
pub mod users;
pub mod validation;
pub mod vault;
