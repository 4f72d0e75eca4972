//! Charge status and capacity level classification
//!
//! Two policies exist. [`standard`] is used by every hardware variant;
//! [`alternate`] belongs to the software-only battery and has its own
//! thresholds. They are intentionally kept apart.

use crate::core::types::{CapacityLevel, ChargeStatus, TOTAL_LIFE_SECONDS};

/// Thresholds used by the hardware drivers
pub mod standard {
    use super::*;

    /// Level bucket; strict "greater than", first match wins
    pub fn capacity_level(pct: i32) -> CapacityLevel {
        if pct > 95 {
            CapacityLevel::Full
        } else if pct > 85 {
            CapacityLevel::High
        } else if pct > 40 {
            CapacityLevel::Normal
        } else if pct > 30 {
            CapacityLevel::Low
        } else {
            CapacityLevel::Critical
        }
    }

    /// Charging requires external power; above 95 % it reports full
    pub fn status(pct: i32, external_power: bool) -> ChargeStatus {
        if !external_power {
            ChargeStatus::Discharging
        } else if pct > 95 {
            ChargeStatus::Full
        } else {
            ChargeStatus::Charging
        }
    }

    /// Remaining runtime, proportional to capacity
    pub fn time_left(pct: i32) -> i32 {
        pct * TOTAL_LIFE_SECONDS / 100
    }
}

/// Thresholds used by the software-only battery
pub mod alternate {
    use super::*;

    pub fn capacity_level(pct: i32) -> CapacityLevel {
        if pct >= 98 {
            CapacityLevel::Full
        } else if pct >= 70 {
            CapacityLevel::High
        } else if pct >= 30 {
            CapacityLevel::Normal
        } else if pct >= 5 {
            CapacityLevel::Low
        } else {
            CapacityLevel::Critical
        }
    }

    /// Full only at 100 % while powered
    pub fn status(pct: i32, external_power: bool) -> ChargeStatus {
        if !external_power {
            ChargeStatus::Discharging
        } else if pct >= 100 {
            ChargeStatus::Full
        } else {
            ChargeStatus::Charging
        }
    }

    pub fn time_left(pct: i32) -> i32 {
        36 * pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_level_boundaries() {
        let table = [
            (100, CapacityLevel::Full),
            (96, CapacityLevel::Full),
            (95, CapacityLevel::High),
            (86, CapacityLevel::High),
            (85, CapacityLevel::Normal),
            (41, CapacityLevel::Normal),
            (40, CapacityLevel::Low),
            (31, CapacityLevel::Low),
            (30, CapacityLevel::Critical),
            (0, CapacityLevel::Critical),
        ];
        for (pct, level) in table {
            assert_eq!(standard::capacity_level(pct), level, "at {}%", pct);
        }
    }

    #[test]
    fn test_standard_status() {
        assert_eq!(standard::status(96, true), ChargeStatus::Full);
        assert_eq!(standard::status(95, true), ChargeStatus::Charging);
        for pct in 0..=100 {
            assert_eq!(standard::status(pct, false), ChargeStatus::Discharging);
        }
    }

    #[test]
    fn test_standard_time_left() {
        assert_eq!(standard::time_left(100), 10800);
        assert_eq!(standard::time_left(50), 5400);
        assert_eq!(standard::time_left(0), 0);
    }

    #[test]
    fn test_alternate_level_boundaries() {
        let table = [
            (98, CapacityLevel::Full),
            (97, CapacityLevel::High),
            (70, CapacityLevel::High),
            (69, CapacityLevel::Normal),
            (30, CapacityLevel::Normal),
            (29, CapacityLevel::Low),
            (5, CapacityLevel::Low),
            (4, CapacityLevel::Critical),
        ];
        for (pct, level) in table {
            assert_eq!(alternate::capacity_level(pct), level, "at {}%", pct);
        }
    }

    #[test]
    fn test_alternate_status_and_time() {
        assert_eq!(alternate::status(100, true), ChargeStatus::Full);
        assert_eq!(alternate::status(99, true), ChargeStatus::Charging);
        assert_eq!(alternate::status(100, false), ChargeStatus::Discharging);
        assert_eq!(alternate::time_left(50), 1800);
    }
}
