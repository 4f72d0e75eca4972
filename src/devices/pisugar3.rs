//! PiSugar 3 reader
//!
//! The PiSugar 3 firmware computes capacity itself and exposes it together
//! with temperature and voltage in an I2C register file.
//!
//! # Read sequence
//!
//! 1. Version (0x00) and mode (0x01) must read 3 and 0x0F (application
//!    firmware). Anything else, including a failed read, means the device
//!    is offline for this tick.
//! 2. CTL1 (0x02): bit 7 USB present, bit 6 charging enabled. A failure
//!    here skips the tick.
//! 3. Temperature (0x04, raw - 40 = °C), capacity (0x2A, clamped to 100),
//!    voltage (0x22 high, 0x23 low, mV).
//!
//! Reads in step 3 stop at the first failure; whatever was read before it
//! is still returned and committed by the monitor.

use crate::config::HardwareModel;
use crate::core::driver::SampleReader;
use crate::core::types::{RawSample, Sample};
use crate::error::Result;
use crate::transport::RegisterBus;

const REG_VERSION: u8 = 0x00;
const REG_MODE: u8 = 0x01;
const REG_CTL1: u8 = 0x02;
const REG_TEMPERATURE: u8 = 0x04;
const REG_VOLTAGE_HIGH: u8 = 0x22;
const REG_VOLTAGE_LOW: u8 = 0x23;
const REG_CAPACITY: u8 = 0x2a;

const EXPECTED_VERSION: u8 = 3;
const EXPECTED_MODE: u8 = 0x0f;

const MASK_CTL1_USB: u8 = 1 << 7;
const MASK_CTL1_CHARGE_EN: u8 = 1 << 6;

/// Temperature register zero point
const TEMPERATURE_OFFSET_C: i32 = 40;

/// Direct-register reader for PiSugar 3
#[derive(Debug, Default)]
pub struct Pisugar3Reader {
    online: bool,
}

impl Pisugar3Reader {
    pub fn new() -> Self {
        Self::default()
    }

    fn identity_matches(bus: &mut dyn RegisterBus) -> bool {
        let version = bus.read_register(REG_VERSION).ok();
        let mode = bus.read_register(REG_MODE).ok();
        version == Some(EXPECTED_VERSION) && mode == Some(EXPECTED_MODE)
    }

    /// Step 3 of the read sequence; fills `raw` until a read fails
    fn read_measurements(bus: &mut dyn RegisterBus, raw: &mut RawSample) -> Result<()> {
        let temperature = bus.read_register(REG_TEMPERATURE)?;
        raw.temperature_c = Some(temperature as i32 - TEMPERATURE_OFFSET_C);

        let capacity = bus.read_register(REG_CAPACITY)?;
        raw.capacity_pct = Some(capacity.min(100) as i32);

        let high = bus.read_register(REG_VOLTAGE_HIGH)?;
        let low = bus.read_register(REG_VOLTAGE_LOW)?;
        raw.voltage_mv = Some(((high as i32) << 8) | low as i32);
        Ok(())
    }
}

impl SampleReader for Pisugar3Reader {
    fn model(&self) -> HardwareModel {
        HardwareModel::DirectRegister
    }

    fn sample(&mut self, bus: &mut dyn RegisterBus) -> Result<Sample> {
        if !Self::identity_matches(bus) {
            if self.online {
                log::warn!("PiSugar 3 not responding with application firmware, marking offline");
            }
            self.online = false;
            return Ok(Sample::Offline);
        }
        if !self.online {
            log::info!("PiSugar 3 online at {:#04x}", bus.address());
            self.online = true;
        }

        let ctl1 = bus.read_register(REG_CTL1)?;
        let mut raw = RawSample {
            external_power_present: ctl1 & MASK_CTL1_USB != 0,
            charging_enabled: ctl1 & MASK_CTL1_CHARGE_EN != 0,
            ..Default::default()
        };
        if let Err(e) = Self::read_measurements(bus, &mut raw) {
            log::debug!("PiSugar 3 partial reading: {}", e);
        }

        Ok(Sample::Reading(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockBus;

    fn healthy_bus() -> MockBus {
        let bus = MockBus::new(0x57);
        bus.set_registers(&[
            (REG_VERSION, 3),
            (REG_MODE, 0x0f),
            (REG_CTL1, MASK_CTL1_USB | MASK_CTL1_CHARGE_EN),
            (REG_TEMPERATURE, 65),
            (REG_CAPACITY, 87),
            (REG_VOLTAGE_HIGH, 0x0f),
            (REG_VOLTAGE_LOW, 0xa0),
        ]);
        bus
    }

    fn read(reader: &mut Pisugar3Reader, bus: &MockBus) -> Sample {
        reader.sample(&mut bus.clone()).unwrap()
    }

    #[test]
    fn test_full_reading() {
        let bus = healthy_bus();
        let sample = read(&mut Pisugar3Reader::new(), &bus);
        assert_eq!(
            sample,
            Sample::Reading(RawSample {
                voltage_mv: Some(0x0fa0),
                temperature_c: Some(25),
                capacity_pct: Some(87),
                external_power_present: true,
                charging_enabled: true,
            })
        );
    }

    #[test]
    fn test_capacity_clamped() {
        let bus = healthy_bus();
        bus.set_register(REG_CAPACITY, 180);
        let Sample::Reading(raw) = read(&mut Pisugar3Reader::new(), &bus) else {
            panic!("expected reading");
        };
        assert_eq!(raw.capacity_pct, Some(100));
    }

    #[test]
    fn test_identity_mismatch_is_offline() {
        let bus = healthy_bus();
        bus.set_register(REG_MODE, 0x01); // bootloader
        assert_eq!(read(&mut Pisugar3Reader::new(), &bus), Sample::Offline);
        // No further registers touched
        assert_eq!(bus.reads(), vec![REG_VERSION, REG_MODE]);

        let bus = healthy_bus();
        bus.fail_register(REG_VERSION);
        assert_eq!(read(&mut Pisugar3Reader::new(), &bus), Sample::Offline);
    }

    #[test]
    fn test_ctl1_failure_skips_tick() {
        let bus = healthy_bus();
        bus.fail_register(REG_CTL1);
        assert!(Pisugar3Reader::new().sample(&mut bus.clone()).is_err());
    }

    #[test]
    fn test_partial_reading_stops_at_first_failure() {
        let bus = healthy_bus();
        bus.fail_register(REG_CAPACITY);
        let Sample::Reading(raw) = read(&mut Pisugar3Reader::new(), &bus) else {
            panic!("expected reading");
        };
        assert_eq!(raw.temperature_c, Some(25));
        assert_eq!(raw.capacity_pct, None);
        assert_eq!(raw.voltage_mv, None);
        assert!(!bus.reads().contains(&REG_VOLTAGE_HIGH));

        let bus = healthy_bus();
        bus.fail_register(REG_VOLTAGE_LOW);
        let Sample::Reading(raw) = read(&mut Pisugar3Reader::new(), &bus) else {
            panic!("expected reading");
        };
        assert_eq!(raw.capacity_pct, Some(87));
        assert_eq!(raw.voltage_mv, None);
    }

    #[test]
    fn test_charge_disabled() {
        let bus = healthy_bus();
        bus.set_register(REG_CTL1, MASK_CTL1_USB);
        let Sample::Reading(raw) = read(&mut Pisugar3Reader::new(), &bus) else {
            panic!("expected reading");
        };
        assert!(raw.external_power_present);
        assert!(!raw.is_charging());
    }
}
