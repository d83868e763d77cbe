use tracing::{debug, info};

use crate::db;
use crate::device::{Device, DeviceRegistry};
use crate::errors::{Result, VaultKeepError};
use crate::guard::{self, Caller};
use crate::validation;

/// Device use cases.  Device operations are not audited.
#[derive(Debug, Clone)]
pub struct DeviceService {
    devices: DeviceRegistry,
}

impl DeviceService {
    pub fn new(devices: DeviceRegistry) -> Self {
        Self { devices }
    }

    /// Register the caller's device, or mark it as seen now if it is
    /// already known.
    pub fn register(&self, caller: &Caller, fingerprint: &str) -> Result<Device> {
        debug!(user_id = %caller.user_id, "registering device");
        validation::fingerprint(fingerprint)?;

        let device = self
            .devices
            .register(&caller.user_id, fingerprint, db::now())?;
        info!(device_id = %device.id, user_id = %caller.user_id, "device registered");
        Ok(device)
    }

    /// The caller's devices, most recently seen first.
    pub fn list(&self, caller: &Caller) -> Result<Vec<Device>> {
        debug!(user_id = %caller.user_id, "listing devices");
        self.devices.list_by_user(&caller.user_id)
    }

    /// Mark one of the caller's devices as seen now.
    pub fn touch(&self, caller: &Caller, device_id: &str) -> Result<Device> {
        debug!(device_id, user_id = %caller.user_id, "touching device");

        let device = self
            .devices
            .get_by_id(device_id)?
            .ok_or(VaultKeepError::NotFound)?;
        guard::ensure_owner(caller, &device.user_id)?;

        if !self.devices.touch(&device.id, db::now())? {
            return Err(VaultKeepError::NotFound);
        }
        self.devices
            .get_by_id(&device.id)?
            .ok_or(VaultKeepError::NotFound)
    }

    /// Remove one of the caller's devices.
    pub fn delete(&self, caller: &Caller, device_id: &str) -> Result<()> {
        debug!(device_id, user_id = %caller.user_id, "deleting device");

        let device = self
            .devices
            .get_by_id(device_id)?
            .ok_or(VaultKeepError::NotFound)?;
        guard::ensure_owner(caller, &device.user_id)?;

        if !self.devices.delete(&device.id)? {
            return Err(VaultKeepError::NotFound);
        }
        info!(device_id = %device.id, "device deleted");
        Ok(())
    }
}
