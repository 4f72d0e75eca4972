//! Power-supply reporting sink
//!
//! Expands a [`PowerSnapshot`] into the fixed property set a host power
//! supply class expects: one record per battery (`BAT0`, `BAT1`) plus the
//! mains supply (`AC0`). Reports serialize to JSON for the TCP publisher
//! and render as `POWER_SUPPLY_*` uevent lines.

use crate::config::HardwareModel;
use crate::core::state::PowerSnapshot;
use crate::core::types::{
    BatteryState, CapacityLevel, ChargeStatus, SupplyId, TOTAL_CHARGE_FULL_SECONDS,
    TOTAL_CHARGE_UAH,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Properties of one battery supply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryProperties {
    pub name: String,
    pub status: ChargeStatus,
    pub charge_type: String,
    pub health: String,
    pub present: bool,
    pub technology: String,
    /// µAh
    pub charge_empty: i32,
    pub charge_full_design: i32,
    pub charge_full: i32,
    pub charge_now: i32,
    /// Percent
    pub capacity: i32,
    pub capacity_level: CapacityLevel,
    /// Seconds
    pub time_to_empty_avg: i32,
    pub time_to_full_now: i32,
    pub model_name: String,
    pub manufacturer: String,
    pub serial_number: String,
    /// °C
    pub temp: i32,
    /// µV
    pub voltage_now: i32,
}

impl BatteryProperties {
    pub fn new(index: usize, battery: &BatteryState, model: HardwareModel) -> Self {
        let (manufacturer, model_name, serial_number) = match model {
            HardwareModel::SoftwareOnly => (
                "Linux".to_string(),
                format!("Fake battery {}", index),
                "12345678".to_string(),
            ),
            _ => (
                "PiSugar".to_string(),
                format!("PiSugar battery {}", index),
                String::new(),
            ),
        };
        let pct = battery.capacity_pct;

        Self {
            name: SupplyId::Battery(index).to_string(),
            status: battery.status,
            charge_type: "Standard".to_string(),
            health: "Good".to_string(),
            present: true,
            technology: "Li-ion".to_string(),
            charge_empty: 0,
            charge_full_design: TOTAL_CHARGE_UAH,
            charge_full: TOTAL_CHARGE_UAH,
            charge_now: pct * TOTAL_CHARGE_UAH / 100,
            capacity: pct,
            capacity_level: battery.capacity_level,
            time_to_empty_avg: battery.time_left_s,
            time_to_full_now: (100 - pct) * TOTAL_CHARGE_FULL_SECONDS / 100,
            model_name,
            manufacturer,
            serial_number,
            temp: battery.temperature_c,
            voltage_now: battery.voltage_uv,
        }
    }

    fn write_uevent(&self, out: &mut String) {
        let mut line = |key: &str, value: &dyn std::fmt::Display| {
            let _ = writeln!(out, "POWER_SUPPLY_{}={}", key, value);
        };
        line("NAME", &self.name);
        line("STATUS", &self.status);
        line("CHARGE_TYPE", &self.charge_type);
        line("HEALTH", &self.health);
        line("PRESENT", &u8::from(self.present));
        line("TECHNOLOGY", &self.technology);
        line("CHARGE_EMPTY", &self.charge_empty);
        line("CHARGE_FULL_DESIGN", &self.charge_full_design);
        line("CHARGE_FULL", &self.charge_full);
        line("CHARGE_NOW", &self.charge_now);
        line("CAPACITY", &self.capacity);
        line("CAPACITY_LEVEL", &self.capacity_level);
        line("TIME_TO_EMPTY_AVG", &self.time_to_empty_avg);
        line("TIME_TO_FULL_NOW", &self.time_to_full_now);
        line("MODEL_NAME", &self.model_name);
        line("MANUFACTURER", &self.manufacturer);
        line("SERIAL_NUMBER", &self.serial_number);
        line("TEMP", &self.temp);
        line("VOLTAGE_NOW", &self.voltage_now);
    }
}

/// Properties of the mains supply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainsProperties {
    pub name: String,
    pub online: bool,
}

/// Everything exposed for one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerReport {
    pub timestamp_us: u64,
    pub model: HardwareModel,
    pub batteries: Vec<BatteryProperties>,
    pub mains: MainsProperties,
}

impl PowerReport {
    pub fn from_snapshot(snapshot: &PowerSnapshot, model: HardwareModel) -> Self {
        Self {
            timestamp_us: snapshot.timestamp_us,
            model,
            batteries: snapshot
                .batteries
                .iter()
                .enumerate()
                .map(|(i, bat)| BatteryProperties::new(i, bat, model))
                .collect(),
            mains: MainsProperties {
                name: SupplyId::Mains.to_string(),
                online: snapshot.source.external_power_present,
            },
        }
    }

    /// Properties of one supply, `None` for an unknown battery index
    pub fn supply_uevent(&self, id: SupplyId) -> Option<String> {
        let mut out = String::new();
        match id {
            SupplyId::Battery(i) => self.batteries.get(i)?.write_uevent(&mut out),
            SupplyId::Mains => {
                let _ = writeln!(out, "POWER_SUPPLY_NAME={}", self.mains.name);
                let _ = writeln!(out, "POWER_SUPPLY_ONLINE={}", u8::from(self.mains.online));
            }
        }
        Some(out)
    }

    /// All supplies as uevent blocks separated by blank lines
    pub fn to_uevent(&self) -> String {
        (0..self.batteries.len())
            .map(SupplyId::Battery)
            .chain(std::iter::once(SupplyId::Mains))
            .filter_map(|id| self.supply_uevent(id))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
