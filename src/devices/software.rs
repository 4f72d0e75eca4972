//! Software battery control channel
//!
//! With no hardware attached, state is set by writing `key=value` lines:
//!
//! ```text
//! capacity0=50
//! capacity1=80
//! charging=1
//! ```
//!
//! Lines are applied one at a time. A bad line aborts the batch, but lines
//! before it stay applied; status, level and time left are only recomputed
//! after a batch that applied completely.

use crate::core::classifier::alternate;
use crate::core::state::{GaugeState, PowerSnapshot};
use crate::core::types::SupplyId;
use crate::error::{Error, Result};

/// Largest accepted write, in bytes
pub const MAX_PAYLOAD: usize = 1024;

/// Text returned by a read at offset 0
pub const BANNER: &str = "pisugar-gauge software battery\n\
    write lines of: capacity0=<0-100> capacity1=<0-100> charging=<0|1>\n";

/// One parsed assignment line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assignment {
    Capacity { battery: usize, pct: i32 },
    Charging(bool),
}

impl Assignment {
    fn parse(line: &str) -> Result<Self> {
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| Error::Format(format!("missing '=' in {:?}", line)))?;
        let value: i32 = value
            .trim()
            .parse()
            .map_err(|_| Error::Format(format!("{:?} is not an integer", value.trim())))?;

        match key {
            "capacity0" | "capacity1" => {
                if !(0..=100).contains(&value) {
                    return Err(Error::Format(format!("{} out of range 0-100: {}", key, value)));
                }
                let battery = if key == "capacity0" { 0 } else { 1 };
                Ok(Assignment::Capacity { battery, pct: value })
            }
            "charging" => match value {
                0 => Ok(Assignment::Charging(false)),
                1 => Ok(Assignment::Charging(true)),
                _ => Err(Error::Format(format!("charging must be 0 or 1, got {}", value))),
            },
            _ => Err(Error::Format(format!("unknown key {:?}", key))),
        }
    }

    fn apply(self, snap: &mut PowerSnapshot) {
        match self {
            Assignment::Capacity { battery, pct } => {
                if let Some(bat) = snap.batteries.get_mut(battery) {
                    bat.capacity_pct = pct;
                }
            }
            Assignment::Charging(on) => snap.source.external_power_present = on,
        }
    }
}

/// Line-protocol writer for the software battery
#[derive(Clone)]
pub struct ControlChannel {
    state: GaugeState,
}

impl ControlChannel {
    pub fn new(state: GaugeState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &GaugeState {
        &self.state
    }

    /// Apply a batch of assignment lines, returning the bytes consumed
    pub fn write(&self, payload: &[u8]) -> Result<usize> {
        if payload.len() > MAX_PAYLOAD {
            return Err(Error::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        let text = std::str::from_utf8(payload)
            .map_err(|e| Error::Format(format!("payload is not UTF-8: {}", e)))?;

        for line in text.split('\n').filter(|l| !l.trim().is_empty()) {
            let assignment = Assignment::parse(line).inspect_err(|e| {
                log::debug!("Control batch aborted at {:?}: {}", line, e);
            })?;
            self.state.update(|snap| assignment.apply(snap));
        }

        self.state.update(|snap| {
            let powered = snap.source.external_power_present;
            for bat in snap.batteries.iter_mut() {
                bat.status = alternate::status(bat.capacity_pct, powered);
                bat.capacity_level = alternate::capacity_level(bat.capacity_pct);
                bat.time_left_s = alternate::time_left(bat.capacity_pct);
            }
        });
        let mut changed: Vec<SupplyId> = (0..self.state.battery_count())
            .map(SupplyId::Battery)
            .collect();
        changed.push(SupplyId::Mains);
        self.state.notify_changed(&changed);

        Ok(payload.len())
    }

    /// Banner text; nothing past offset 0
    pub fn read(&self, offset: usize) -> &'static str {
        if offset == 0 { BANNER } else { "" }
    }
}
