//! Linux SMBus transport over `/dev/i2c-N`

use super::RegisterBus;
use crate::error::{Error, Result};
use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;

/// SMBus byte-data access to a single I2C slave
pub struct I2cBus {
    device: LinuxI2CDevice,
    path: String,
    address: u16,
}

impl I2cBus {
    /// Open `/dev/i2c-<bus>` and bind it to `address`
    pub fn open(bus: u8, address: u16) -> Result<Self> {
        let path = format!("/dev/i2c-{}", bus);
        let device = LinuxI2CDevice::new(&path, address)
            .map_err(|e| Error::TransportUnavailable(format!("{} @ {:#04x}: {}", path, address, e)))?;

        log::info!("Opened {} at address {:#04x}", path, address);
        Ok(Self {
            device,
            path,
            address,
        })
    }
}

impl RegisterBus for I2cBus {
    fn read_register(&mut self, register: u8) -> Result<u8> {
        self.device
            .smbus_read_byte_data(register)
            .map_err(|e| Error::Bus {
                register,
                reason: e.to_string(),
            })
    }

    fn address(&self) -> u16 {
        self.address
    }
}

impl Drop for I2cBus {
    fn drop(&mut self) {
        log::debug!("Releasing {} @ {:#04x}", self.path, self.address);
    }
}
