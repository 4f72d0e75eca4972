//! Transport layer for register access

use crate::error::Result;

#[cfg(feature = "i2c")]
mod i2c;
mod mock;

#[cfg(feature = "i2c")]
pub use i2c::I2cBus;
pub use mock::MockBus;

/// Byte-register access to one device on an addressed serial bus
///
/// The device address is fixed when the bus handle is opened.
pub trait RegisterBus: Send {
    /// Read one register; any transport failure is an `Err`
    fn read_register(&mut self, register: u8) -> Result<u8>;

    /// Device address this handle talks to
    fn address(&self) -> u16;
}
