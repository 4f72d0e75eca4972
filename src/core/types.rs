//! Core data types for samples and battery state.
//!
//! Key types:
//! - [`RawSample`]: One tick's worth of register data, produced by a sample reader
//! - [`BatteryState`]: Smoothed per-battery state published to the reporting sink
//! - [`SourceState`]: External power source shared by all batteries

use serde::{Deserialize, Serialize};
use std::fmt;

/// Estimated runtime of a full battery (3 hours)
pub const TOTAL_LIFE_SECONDS: i32 = 3 * 60 * 60;

/// Design charge in µAh
pub const TOTAL_CHARGE_UAH: i32 = 2000 * 1000;

/// Time to charge from empty to full (1 hour)
pub const TOTAL_CHARGE_FULL_SECONDS: i32 = 60 * 60;

/// Voltage used to pre-fill the rolling history and the initial snapshot
pub const FULL_VOLTAGE_MV: i32 = 4200;

/// Charge status of a battery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeStatus {
    Charging,
    Discharging,
    Full,
}

impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChargeStatus::Charging => "Charging",
            ChargeStatus::Discharging => "Discharging",
            ChargeStatus::Full => "Full",
        };
        f.write_str(s)
    }
}

/// Coarse capacity bucket used for low-battery thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapacityLevel {
    Full,
    High,
    Normal,
    Low,
    Critical,
}

impl fmt::Display for CapacityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CapacityLevel::Full => "Full",
            CapacityLevel::High => "High",
            CapacityLevel::Normal => "Normal",
            CapacityLevel::Low => "Low",
            CapacityLevel::Critical => "Critical",
        };
        f.write_str(s)
    }
}

/// Raw register data from one tick
///
/// Absent fields were either not read by this hardware variant or the read
/// sequence stopped before reaching them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSample {
    /// Cell voltage in millivolts
    pub voltage_mv: Option<i32>,
    /// On-chip temperature in °C
    pub temperature_c: Option<i32>,
    /// Capacity reported directly by the chip (0-100)
    pub capacity_pct: Option<i32>,
    /// USB / mains input present
    pub external_power_present: bool,
    /// Charger enabled by firmware
    pub charging_enabled: bool,
}

impl RawSample {
    /// Whether the charger is actually feeding the cell
    #[inline]
    pub fn is_charging(&self) -> bool {
        self.external_power_present && self.charging_enabled
    }
}

/// Result of one sampling attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    /// Device answered, possibly with a partial reading
    Reading(RawSample),
    /// Device identity did not match; treated as external power absent
    Offline,
}

/// Per-battery state, mutated once per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryState {
    pub status: ChargeStatus,
    pub capacity_level: CapacityLevel,
    /// Capacity in percent (0-100)
    pub capacity_pct: i32,
    /// Estimated seconds left
    pub time_left_s: i32,
    /// Voltage in µV
    pub voltage_uv: i32,
    /// Temperature in °C
    pub temperature_c: i32,
}

impl BatteryState {
    /// Fully charged snapshot used at startup
    pub const fn fully_charged() -> Self {
        Self {
            status: ChargeStatus::Full,
            capacity_level: CapacityLevel::Full,
            capacity_pct: 100,
            time_left_s: TOTAL_LIFE_SECONDS,
            voltage_uv: FULL_VOLTAGE_MV * 1000,
            temperature_c: 30,
        }
    }
}

impl Default for BatteryState {
    fn default() -> Self {
        Self::fully_charged()
    }
}

/// External power source shared by all batteries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceState {
    pub external_power_present: bool,
}

impl Default for SourceState {
    fn default() -> Self {
        Self {
            external_power_present: true,
        }
    }
}

/// Power supply identifiers exposed to the reporting sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupplyId {
    /// Battery by index (BAT0, BAT1)
    Battery(usize),
    /// Mains / USB input (AC0)
    Mains,
}

impl fmt::Display for SupplyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupplyId::Battery(i) => write!(f, "BAT{}", i),
            SupplyId::Mains => f.write_str("AC0"),
        }
    }
}
