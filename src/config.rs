//! Configuration for pisugar-gauge
//!
//! Loads configuration from a TOML file. Bus, address and hardware model
//! are fixed at startup; nothing here is mutable afterwards.

use crate::core::curve::{CapacityCurve, Interpolation};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Supported battery modules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareModel {
    /// PiSugar 2 (IP5209), capacity from voltage curve
    #[serde(alias = "ip5209", alias = "pisugar2")]
    StandardCurve,
    /// PiSugar 2 Pro (IP5312), capacity from voltage curve
    #[serde(alias = "ip5312", alias = "pisugar2_pro")]
    ProCurve,
    /// PiSugar 3, capacity reported by firmware
    #[serde(alias = "pisugar3")]
    DirectRegister,
    /// No hardware; state set through the control channel
    #[serde(alias = "software")]
    SoftwareOnly,
}

impl HardwareModel {
    /// Default I2C address of the charge controller
    pub fn default_address(&self) -> u16 {
        match self {
            HardwareModel::StandardCurve | HardwareModel::ProCurve => 0x75,
            HardwareModel::DirectRegister => 0x57,
            HardwareModel::SoftwareOnly => 0,
        }
    }

    /// Number of batteries exposed
    pub fn battery_count(&self) -> usize {
        match self {
            HardwareModel::SoftwareOnly => 2,
            _ => 1,
        }
    }

    /// Whether this model is sampled from a register bus
    pub fn uses_bus(&self) -> bool {
        !matches!(self, HardwareModel::SoftwareOnly)
    }
}

impl fmt::Display for HardwareModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HardwareModel::StandardCurve => "PiSugar 2 (IP5209)",
            HardwareModel::ProCurve => "PiSugar 2 Pro (IP5312)",
            HardwareModel::DirectRegister => "PiSugar 3",
            HardwareModel::SoftwareOnly => "Software battery",
        };
        f.write_str(s)
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub device: DeviceConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Battery module selection and bus location
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    pub model: HardwareModel,

    /// I2C bus number, opened as `/dev/i2c-<bus>` (default: 1)
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: u8,

    /// Device address; defaults per model (0x75 PiSugar 2, 0x57 PiSugar 3)
    #[serde(default)]
    pub i2c_addr: Option<u16>,
}

impl DeviceConfig {
    /// Configured address or the model default
    pub fn address(&self) -> u16 {
        self.i2c_addr.unwrap_or_else(|| self.model.default_address())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            model: HardwareModel::StandardCurve,
            i2c_bus: default_i2c_bus(),
            i2c_addr: None,
        }
    }
}

/// Sampling loop settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// Tick period in milliseconds (default: 1000)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Rolling voltage window in ticks (default: 30)
    #[serde(default = "default_history_len")]
    pub history_len: usize,

    /// Curve interpolation mode (default: segment)
    #[serde(default)]
    pub interpolation: Interpolation,

    /// Replacement curve as `[[mv, pct], ...]`, highest voltage first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_curve: Option<Vec<(i32, i32)>>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            history_len: default_history_len(),
            interpolation: Interpolation::default(),
            battery_curve: None,
        }
    }
}

/// TCP reporting and control endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamingConfig {
    /// Snapshot publisher bind address
    ///
    /// Examples:
    /// - `0.0.0.0:8423` - Bind to all interfaces
    /// - `127.0.0.1:8423` - Localhost only
    #[serde(default = "default_pub_address")]
    pub tcp_pub_address: String,

    /// Control endpoint bind address (software battery only)
    #[serde(default = "default_cmd_address")]
    pub tcp_cmd_address: String,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            tcp_pub_address: default_pub_address(),
            tcp_cmd_address: default_cmd_address(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error); `RUST_LOG` wins
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_i2c_bus() -> u8 {
    1
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_history_len() -> usize {
    crate::core::history::DEFAULT_HISTORY_LEN
}

fn default_pub_address() -> String {
    "0.0.0.0:8423".to_string()
}

fn default_cmd_address() -> String {
    "127.0.0.1:8424".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Render configuration as TOML text
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Check ranges and the custom curve
    pub fn validate(&self) -> Result<()> {
        if self.monitor.interval_ms == 0 {
            return Err(Error::Config("monitor.interval_ms must be > 0".to_string()));
        }
        if self.monitor.history_len == 0 {
            return Err(Error::Config("monitor.history_len must be > 0".to_string()));
        }
        if self.device.model.uses_bus() && self.device.address() > 0x7f {
            return Err(Error::Config(format!(
                "device.i2c_addr {:#x} is not a 7-bit address",
                self.device.address()
            )));
        }
        self.curve()?;
        Ok(())
    }

    /// Capacity curve for the configured model
    ///
    /// Returns `None` for models that report capacity directly.
    pub fn curve(&self) -> Result<Option<CapacityCurve>> {
        let mode = self.monitor.interpolation;
        let builtin = match self.device.model {
            HardwareModel::StandardCurve => CapacityCurve::ip5209(mode),
            HardwareModel::ProCurve => CapacityCurve::ip5312(mode),
            HardwareModel::DirectRegister | HardwareModel::SoftwareOnly => {
                if self.monitor.battery_curve.is_some() {
                    log::warn!(
                        "monitor.battery_curve ignored: {} reports capacity directly",
                        self.device.model
                    );
                }
                return Ok(None);
            }
        };
        match &self.monitor.battery_curve {
            Some(points) => CapacityCurve::new(points, mode).map(Some),
            None => Ok(Some(builtin)),
        }
    }
}
