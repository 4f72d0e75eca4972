//! Application orchestration for the pisugar-gauge daemon
//!
//! Wires the configured hardware model to its state producer (monitor
//! thread or control endpoint), starts the report publisher, and runs until
//! SIGINT/SIGTERM.

use crate::config::Config;
use crate::core::state::GaugeState;
use crate::devices::software::ControlChannel;
use crate::devices::{create_reader, open_bus};
use crate::error::{Error, Result};
use crate::monitor::{Estimator, Monitor};
use crate::streaming::{TcpControlServer, TcpPublisher};
use crate::transport::RegisterBus;
use log::{debug, info};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How often the main loop logs a status line
const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// Main application structure that manages all components
pub struct GaugeApp {
    config: Config,
    state: GaugeState,
    monitor: Option<Monitor>,
    control: Option<TcpControlServer>,
    publisher: Option<TcpPublisher>,
    shutdown: Arc<AtomicBool>,
}

impl GaugeApp {
    /// Open the configured bus and start all components
    ///
    /// Failing to open the bus is fatal: no state is ever produced.
    pub fn new(config: Config) -> Result<Self> {
        let bus = if config.device.model.uses_bus() {
            info!(
                "Opening I2C bus {} at {:#04x}",
                config.device.i2c_bus,
                config.device.address()
            );
            Some(open_bus(&config.device)?)
        } else {
            None
        };
        Self::with_bus(config, bus)
    }

    /// Start all components on an already opened bus
    ///
    /// `bus` is required for every model except the software battery.
    pub fn with_bus(config: Config, bus: Option<Box<dyn RegisterBus>>) -> Result<Self> {
        config.validate()?;
        let model = config.device.model;
        info!("Initializing pisugar-gauge for {}", model);

        let state = GaugeState::new(model.battery_count());
        let interval = Duration::from_millis(config.monitor.interval_ms);

        let (monitor, control) = if model.uses_bus() {
            let bus = bus.ok_or_else(|| {
                Error::TransportUnavailable(format!("{} needs a register bus", model))
            })?;
            let estimator = Estimator::new(create_reader(&config)?, config.monitor.history_len);
            let monitor = Monitor::start(estimator, bus, state.clone(), interval)?;
            (Some(monitor), None)
        } else {
            let channel = ControlChannel::new(state.clone());
            let control = TcpControlServer::new(&config.streaming.tcp_cmd_address, channel)?;
            (None, Some(control))
        };

        let publisher = TcpPublisher::new(
            &config.streaming.tcp_pub_address,
            state.clone(),
            model,
            interval,
        )?;

        info!("✓ Gauge and streaming initialized successfully");

        Ok(Self {
            config,
            state,
            monitor,
            control,
            publisher: Some(publisher),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn state(&self) -> &GaugeState {
        &self.state
    }

    /// Flag that ends [`run`](Self::run) when set
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn publisher_addr(&self) -> Option<SocketAddr> {
        self.publisher.as_ref().map(TcpPublisher::local_addr)
    }

    pub fn control_addr(&self) -> Option<SocketAddr> {
        self.control.as_ref().map(TcpControlServer::local_addr)
    }

    /// Block until a shutdown signal arrives, then stop everything
    pub fn run(&mut self) -> Result<()> {
        self.setup_signal_handler()?;

        info!("Publishing on: {}", self.config.streaming.tcp_pub_address);
        if self.control.is_some() {
            info!("Control on: {}", self.config.streaming.tcp_cmd_address);
        }
        info!("Press Ctrl+C to stop");

        let mut last_stats = Instant::now();
        while !self.shutdown.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_millis(100));

            if last_stats.elapsed() >= STATS_INTERVAL {
                self.log_statistics();
                last_stats = Instant::now();
            }
        }

        info!("Shutdown signal received, stopping threads...");
        self.stop_all()
    }

    /// SIGINT/SIGTERM set the shutdown flag
    fn setup_signal_handler(&self) -> Result<()> {
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&self.shutdown))?;
        }
        Ok(())
    }

    fn log_statistics(&self) {
        let snap = self.state.snapshot();
        for (i, bat) in snap.batteries.iter().enumerate() {
            info!(
                "BAT{}: {}% {} ({}), {} mV, {} °C",
                i,
                bat.capacity_pct,
                bat.status,
                bat.capacity_level,
                bat.voltage_uv / 1000,
                bat.temperature_c
            );
        }
        info!(
            "AC0: {}",
            if snap.source.external_power_present {
                "online"
            } else {
                "offline"
            }
        );
    }

    /// Stop producers first, then the publisher
    pub fn stop_all(&mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::Relaxed);
        if self.monitor.is_none() && self.control.is_none() && self.publisher.is_none() {
            return Ok(());
        }

        if let Some(mut monitor) = self.monitor.take() {
            debug!("Stopping monitor...");
            monitor.shutdown()?;
        }
        if let Some(control) = self.control.take() {
            debug!("Stopping control endpoint...");
            drop(control);
        }
        if let Some(publisher) = self.publisher.take() {
            debug!("Stopping publisher...");
            drop(publisher);
        }

        info!("✓ All threads stopped");
        Ok(())
    }
}

impl Drop for GaugeApp {
    fn drop(&mut self) {
        if let Err(e) = self.stop_all() {
            log::error!("Error during cleanup: {}", e);
        }
    }
}
