//! Periodic sampling loop
//!
//! [`Estimator`] turns one [`Sample`] into a state update: smooth the
//! voltage, look capacity up on the curve (or take it from the chip),
//! classify, and publish through a single write lock. [`Monitor`] runs it
//! on a dedicated thread roughly once per interval.
//!
//! The stop signal is checked at the top of every iteration, before any
//! register I/O, and doubles as the interruptible sleep between ticks. A
//! read in progress always completes before the stop is honoured.

use crate::core::classifier::standard;
use crate::core::driver::SampleReader;
use crate::core::history::VoltageHistory;
use crate::core::state::GaugeState;
use crate::core::types::{FULL_VOLTAGE_MV, Sample, SupplyId};
use crate::error::{Error, Result};
use crate::transport::RegisterBus;
use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Cancellation token with an interruptible wait
#[derive(Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    cvar: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop and wake any waiter
    pub fn set(&self) {
        *self.stopped.lock() = true;
        self.cvar.notify_all();
    }

    pub fn is_set(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleep up to `timeout`, returning early if a stop is requested
    ///
    /// Returns whether the signal is set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        self.cvar
            .wait_while_for(&mut stopped, |stopped| !*stopped, timeout);
        *stopped
    }
}

/// What a completed tick did to the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Battery and source updated from a reading
    Updated,
    /// Device identity mismatch; source marked absent, battery untouched
    Offline,
}

/// Sample reader plus the smoothing state it needs between ticks
pub struct Estimator {
    reader: Box<dyn SampleReader>,
    history: VoltageHistory,
}

impl Estimator {
    /// Create an estimator whose voltage window holds `history_len` ticks
    pub fn new(reader: Box<dyn SampleReader>, history_len: usize) -> Self {
        Self {
            reader,
            history: VoltageHistory::new(history_len, FULL_VOLTAGE_MV),
        }
    }

    pub fn reader(&self) -> &dyn SampleReader {
        self.reader.as_ref()
    }

    pub fn history(&self) -> &VoltageHistory {
        &self.history
    }

    /// Run one tick against `bus` and publish the result to `state`
    ///
    /// An `Err` means the reader failed before producing a sample; the state
    /// has not been touched.
    pub fn tick_once(
        &mut self,
        bus: &mut dyn RegisterBus,
        state: &GaugeState,
    ) -> Result<TickOutcome> {
        let raw = match self.reader.sample(bus)? {
            Sample::Offline => {
                state.update(|snap| snap.source.external_power_present = false);
                state.notify_changed(&[SupplyId::Mains]);
                return Ok(TickOutcome::Offline);
            }
            Sample::Reading(raw) => raw,
        };

        // Curve models report the smoothed voltage the capacity came from
        let (capacity, voltage_mv) = match (self.reader.curve(), raw.voltage_mv) {
            (Some(curve), Some(mv)) => {
                self.history.push(mv);
                let avg = self.history.average();
                (Some(curve.interpolate(avg)), Some(avg))
            }
            (Some(_), None) => (None, None),
            (None, mv) => (raw.capacity_pct, mv),
        };

        state.update(|snap| {
            snap.source.external_power_present = raw.external_power_present;
            let Some(bat) = snap.batteries.first_mut() else {
                return;
            };
            if let Some(temp) = raw.temperature_c {
                bat.temperature_c = temp;
            }
            if let Some(pct) = capacity {
                bat.capacity_pct = pct;
                bat.capacity_level = standard::capacity_level(pct);
                bat.time_left_s = standard::time_left(pct);
            }
            // Voltage is the last register read; only a complete tick reclassifies
            if let Some(mv) = voltage_mv {
                bat.voltage_uv = mv * 1000;
                bat.status = standard::status(bat.capacity_pct, raw.is_charging());
            }
        });
        state.notify_changed(&[SupplyId::Battery(0), SupplyId::Mains]);

        Ok(TickOutcome::Updated)
    }
}

/// Background sampling thread
pub struct Monitor {
    state: GaugeState,
    stop: Arc<StopSignal>,
    thread: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Spawn the `gauge-monitor` thread
    ///
    /// The thread owns the bus; it is released when the thread exits.
    pub fn start(
        estimator: Estimator,
        bus: Box<dyn RegisterBus>,
        state: GaugeState,
        interval: Duration,
    ) -> Result<Self> {
        let stop = Arc::new(StopSignal::new());
        let stop_clone = Arc::clone(&stop);
        let state_clone = state.clone();
        let model = estimator.reader().model();
        let address = bus.address();

        let thread = thread::Builder::new()
            .name("gauge-monitor".to_string())
            .spawn(move || Self::run_loop(estimator, bus, state_clone, stop_clone, interval))?;

        info!(
            "Monitor started: {} at {:#04x}, every {} ms",
            model,
            address,
            interval.as_millis()
        );

        Ok(Self {
            state,
            stop,
            thread: Some(thread),
        })
    }

    fn run_loop(
        mut estimator: Estimator,
        mut bus: Box<dyn RegisterBus>,
        state: GaugeState,
        stop: Arc<StopSignal>,
        interval: Duration,
    ) {
        let mut ticks = 0u64;
        let mut skipped = 0u64;
        let mut offline = false;

        loop {
            if stop.is_set() {
                break;
            }

            match estimator.tick_once(bus.as_mut(), &state) {
                Ok(TickOutcome::Updated) => {
                    ticks += 1;
                    if offline {
                        info!("Battery module back online");
                        offline = false;
                    }
                }
                Ok(TickOutcome::Offline) => {
                    ticks += 1;
                    if !offline {
                        warn!("Battery module offline, external power marked absent");
                        offline = true;
                    }
                }
                Err(e) => {
                    skipped += 1;
                    debug!("Tick skipped: {}", e);
                }
            }

            stop.wait_timeout(interval);
        }

        drop(bus);
        info!("Monitor exiting ({} ticks, {} skipped)", ticks, skipped);
    }

    pub fn state(&self) -> &GaugeState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the loop and wait for the thread to exit
    pub fn shutdown(&mut self) -> Result<()> {
        self.stop.set();
        if let Some(thread) = self.thread.take() {
            thread.join().map_err(|_| Error::ThreadPanic)?;
        }
        Ok(())
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("Monitor shutdown failed: {}", e);
        }
    }
}
