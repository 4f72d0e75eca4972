//! Power report publisher using TCP sockets.
//!
//! A dedicated publisher thread owns the listener and the client list. It
//! sends the current [`PowerReport`] when a client connects, whenever the
//! gauge state signals a change, and at least once per interval.

use crate::config::HardwareModel;
use crate::core::state::GaugeState;
use crate::core::types::SupplyId;
use crate::error::Result;
use crate::report::PowerReport;
use crate::streaming::messages::POWER_TOPIC;
use crate::streaming::wire;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, error, info, warn};
use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Poll period for accepting clients and checking the shutdown flag
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Longest a single report write may block on a client that stopped reading
pub const CLIENT_WRITE_TIMEOUT: Duration = Duration::from_millis(100);

/// Publishes power reports to every connected TCP client
pub struct TcpPublisher {
    local_addr: SocketAddr,
    publisher_thread: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl TcpPublisher {
    /// Bind `bind_address` and spawn the publisher thread
    ///
    /// # Arguments
    /// - `bind_address`: TCP bind address (e.g., "0.0.0.0:8423")
    /// - `state`: gauge state to report; its change notifications trigger sends
    /// - `model`: hardware model, selects the reported identity strings
    /// - `interval`: longest gap between two reports
    pub fn new(
        bind_address: &str,
        state: GaugeState,
        model: HardwareModel,
        interval: Duration,
    ) -> Result<Self> {
        let listener = TcpListener::bind(bind_address)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let changes = state.subscribe();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = Arc::clone(&shutdown);

        let publisher_thread = thread::Builder::new()
            .name("tcp-publisher".to_string())
            .spawn(move || {
                Self::publisher_thread_loop(
                    listener,
                    state,
                    changes,
                    model,
                    interval,
                    shutdown_clone,
                )
            })?;

        info!("TCP power publisher started on {}", local_addr);

        Ok(Self {
            local_addr,
            publisher_thread: Some(publisher_thread),
            shutdown,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn publisher_thread_loop(
        listener: TcpListener,
        state: GaugeState,
        changes: Receiver<SupplyId>,
        model: HardwareModel,
        interval: Duration,
        shutdown: Arc<AtomicBool>,
    ) {
        let mut clients: Vec<TcpStream> = Vec::new();
        let mut message_buffer = Vec::with_capacity(2048);
        let mut last_publish = Instant::now();
        let mut published = 0u64;

        while !shutdown.load(Ordering::Relaxed) {
            let mut publish = false;

            // Accept new client connections (non-blocking)
            match listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = Self::configure_client(&stream) {
                        warn!("Failed to configure client {}: {}", addr, e);
                    } else {
                        info!("New client connected: {}", addr);
                        clients.push(stream);
                        publish = true;
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => error!("Error accepting client connection: {}", e),
            }

            // Wait for a change, collapsing bursts into one report
            match changes.recv_timeout(POLL_INTERVAL) {
                Ok(_) => {
                    changes.try_iter().for_each(drop);
                    publish = true;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => thread::sleep(POLL_INTERVAL),
            }

            if last_publish.elapsed() >= interval {
                publish = true;
            }
            if !publish || clients.is_empty() {
                continue;
            }

            let report = PowerReport::from_snapshot(&state.snapshot(), model);
            match Self::broadcast_to_clients(&mut clients, &report, &mut message_buffer) {
                Ok(()) => published += 1,
                Err(e) => debug!("Failed to publish power report: {}", e),
            }
            last_publish = Instant::now();
        }

        info!("Publisher thread exiting ({} reports published)", published);
    }

    /// Blocking writes, bounded so a stalled reader cannot wedge the thread
    fn configure_client(stream: &TcpStream) -> std::io::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_write_timeout(Some(CLIENT_WRITE_TIMEOUT))?;
        stream.set_nodelay(true)
    }

    /// Send one report to all clients, dropping disconnected ones
    ///
    /// A timed-out write may have sent part of a frame, so that client is
    /// dropped as well.
    fn broadcast_to_clients(
        clients: &mut Vec<TcpStream>,
        report: &PowerReport,
        buffer: &mut Vec<u8>,
    ) -> Result<()> {
        let payload = wire::encode(report)?;
        wire::topic_frame(POWER_TOPIC, &payload, buffer);

        clients.retain_mut(|client| match client.write_all(buffer) {
            Ok(_) => true,
            Err(e) => {
                if let Ok(addr) = client.peer_addr() {
                    debug!("Client {} disconnected: {}", addr, e);
                }
                false
            }
        });

        Ok(())
    }

    /// Stop the publisher
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        info!("TCP power publisher shutdown requested");
    }
}

impl Drop for TcpPublisher {
    fn drop(&mut self) {
        self.stop();

        if let Some(thread) = self.publisher_thread.take() {
            let _ = thread.join();
        }
    }
}
