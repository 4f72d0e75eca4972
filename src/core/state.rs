//! Shared gauge state
//!
//! One [`PowerSnapshot`] per gauge, written by a single producer (the monitor
//! thread, or the control channel for the software battery) and read by the
//! reporting sink. Writers update a whole tick under one write lock, so
//! readers never see half of a tick.

use crate::core::types::{BatteryState, SourceState, SupplyId};
use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Point-in-time copy of all supplies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerSnapshot {
    /// Microseconds since epoch of the last update (0 = never updated)
    pub timestamp_us: u64,
    pub batteries: Vec<BatteryState>,
    pub source: SourceState,
}

impl PowerSnapshot {
    /// Create a snapshot with `battery_count` fully charged batteries
    pub fn new(battery_count: usize) -> Self {
        Self {
            timestamp_us: 0,
            batteries: vec![BatteryState::fully_charged(); battery_count],
            source: SourceState::default(),
        }
    }

    /// Update timestamp to current time
    #[inline]
    pub fn touch(&mut self) {
        self.timestamp_us = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
    }
}

/// Cloneable handle to the shared snapshot plus change subscribers
#[derive(Clone)]
pub struct GaugeState {
    inner: Arc<RwLock<PowerSnapshot>>,
    subscribers: Arc<Mutex<Vec<Sender<SupplyId>>>>,
}

impl GaugeState {
    /// Create state for `battery_count` batteries and one shared source
    pub fn new(battery_count: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(PowerSnapshot::new(battery_count))),
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Clone the current snapshot
    pub fn snapshot(&self) -> PowerSnapshot {
        self.inner.read().clone()
    }

    /// State of one battery, `None` if the index does not exist
    pub fn battery(&self, index: usize) -> Option<BatteryState> {
        self.inner.read().batteries.get(index).copied()
    }

    pub fn source(&self) -> SourceState {
        self.inner.read().source
    }

    pub fn battery_count(&self) -> usize {
        self.inner.read().batteries.len()
    }

    /// Mutate the snapshot under one write lock
    pub fn update<R>(&self, f: impl FnOnce(&mut PowerSnapshot) -> R) -> R {
        let mut guard = self.inner.write();
        let result = f(&mut guard);
        guard.touch();
        result
    }

    /// Receive a [`SupplyId`] every time that supply changes
    pub fn subscribe(&self) -> Receiver<SupplyId> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Tell subscribers that the given supplies changed
    ///
    /// Subscribers whose receiver was dropped are removed.
    pub fn notify_changed(&self, supplies: &[SupplyId]) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| supplies.iter().all(|id| tx.send(*id).is_ok()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ChargeStatus;

    #[test]
    fn test_update_is_visible_to_clones() {
        let state = GaugeState::new(2);
        let reader = state.clone();

        state.update(|snap| {
            snap.batteries[1].capacity_pct = 42;
            snap.batteries[1].status = ChargeStatus::Discharging;
            snap.source.external_power_present = false;
        });

        let snap = reader.snapshot();
        assert_eq!(snap.batteries[1].capacity_pct, 42);
        assert_eq!(snap.batteries[0].capacity_pct, 100);
        assert!(!snap.source.external_power_present);
        assert!(snap.timestamp_us > 0);
        assert_eq!(reader.battery(2), None);
    }

    #[test]
    fn test_notify_and_prune_subscribers() {
        let state = GaugeState::new(1);
        let rx = state.subscribe();
        let dropped = state.subscribe();
        drop(dropped);

        state.notify_changed(&[SupplyId::Battery(0), SupplyId::Mains]);
        assert_eq!(rx.try_recv().unwrap(), SupplyId::Battery(0));
        assert_eq!(rx.try_recv().unwrap(), SupplyId::Mains);
        assert_eq!(state.subscribers.lock().len(), 1);
    }
}
