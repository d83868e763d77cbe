//! `vaultkeep device`: register, list, touch and remove devices.

use crate::cli::output;
use crate::cli::{open_database, resolve_caller, Cli};
use crate::config::Settings;
use crate::device::DeviceRegistry;
use crate::errors::Result;
use crate::guard::Caller;
use crate::service::DeviceService;

fn service(cli: &Cli, settings: &Settings) -> Result<(DeviceService, Caller)> {
    let db = open_database(cli, settings)?;
    let caller = resolve_caller(cli, &db)?;
    Ok((DeviceService::new(DeviceRegistry::new(db)), caller))
}

/// Execute `device register`.
pub fn register(cli: &Cli, settings: &Settings, fingerprint: &str) -> Result<()> {
    let (service, caller) = service(cli, settings)?;
    let device = service.register(&caller, fingerprint)?;

    if cli.json {
        return output::print_json(&device);
    }
    output::success(&format!(
        "Device '{}' registered ({})",
        device.device_fingerprint, device.id
    ));
    Ok(())
}

/// Execute `device list`.
pub fn list(cli: &Cli, settings: &Settings) -> Result<()> {
    let (service, caller) = service(cli, settings)?;
    let devices = service.list(&caller)?;

    if cli.json {
        return output::print_json(&devices);
    }
    output::print_devices_table(&devices);
    Ok(())
}

/// Execute `device touch`.
pub fn touch(cli: &Cli, settings: &Settings, id: &str) -> Result<()> {
    let (service, caller) = service(cli, settings)?;
    let device = service.touch(&caller, id)?;

    if cli.json {
        return output::print_json(&device);
    }
    output::success(&format!("Device '{}' marked as seen", device.device_fingerprint));
    Ok(())
}

/// Execute `device delete`.
pub fn delete(cli: &Cli, settings: &Settings, id: &str) -> Result<()> {
    let (service, caller) = service(cli, settings)?;
    service.delete(&caller, id)?;
    output::success(&format!("Removed device {id}"));
    Ok(())
}
