//! pisugar-gauge - Fuel gauge library for PiSugar battery modules
//!
//! Samples a battery module over a register bus, smooths and interpolates
//! the readings into capacity and charge state, and exposes the result as
//! power-supply reports.
//!
//! ## Features
//!
//! - `i2c` (default): Linux SMBus transport via `/dev/i2c-N`. Without it
//!   only [`transport::MockBus`] and the software battery are available.

pub mod app;
pub mod config;
pub mod core;
pub mod devices;
pub mod error;
pub mod monitor;
pub mod report;
pub mod streaming;
pub mod transport;

// Re-export commonly used types
pub use config::{Config, HardwareModel};
pub use crate::core::state::GaugeState;
pub use crate::core::types::{BatteryState, CapacityLevel, ChargeStatus, SourceState, SupplyId};
pub use error::{Error, Result};
