//! TCP control endpoint for the software battery
//!
//! Clients send [`ControlRequest`] frames and get one [`ControlResponse`]
//! frame back per request, in order.
//!
//! # Wire Format
//!
//! ```text
//! ┌──────────────────┬─────────────────────┐
//! │ Length (4 bytes) │ JSON request        │
//! │ Big-endian u32   │ (variable size)     │
//! └──────────────────┴─────────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! ```text
//! 1. Client connects to the control port
//! 2. Server spawns a receiver thread for this client
//! 3. Receiver answers requests until disconnect or daemon shutdown
//! ```
//!
//! - **Read timeout**: 500ms timeout allows periodic shutdown flag checks
//! - **Frame limit**: frames over 64 KiB close the connection
//! - **Bad JSON**: answered with `Rejected`, connection stays open

use crate::devices::software::ControlChannel;
use crate::error::{Error, Result};
use crate::streaming::messages::{ControlRequest, ControlResponse};
use crate::streaming::wire;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Read timeout per connection
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Initial capacity for the request buffer (typical request size)
const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Apply one request to the control channel
pub fn handle_request(channel: &ControlChannel, request: ControlRequest) -> ControlResponse {
    match request {
        ControlRequest::Write { payload } => match channel.write(payload.as_bytes()) {
            Ok(bytes) => ControlResponse::Written { bytes },
            Err(e) => ControlResponse::Rejected {
                error: e.to_string(),
            },
        },
        ControlRequest::Read { offset } => ControlResponse::Banner {
            text: channel.read(offset).to_string(),
        },
    }
}

/// Serves one connected client
struct ControlConnection {
    channel: ControlChannel,
    /// Global running flag (daemon shutdown)
    running: Arc<AtomicBool>,
    read_buffer: Vec<u8>,
}

impl ControlConnection {
    fn run(&mut self, mut stream: TcpStream) -> Result<()> {
        if let Err(e) = stream.set_read_timeout(Some(READ_TIMEOUT)) {
            log::warn!("Failed to set read timeout: {}", e);
        }

        let result = self.serve(&mut stream);
        let _ = stream.shutdown(Shutdown::Both);

        match result {
            Err(Error::Io(ref e))
                if matches!(
                    e.kind(),
                    ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset
                ) =>
            {
                log::debug!("Control client disconnected");
                Ok(())
            }
            other => other,
        }
    }

    fn serve(&mut self, stream: &mut TcpStream) -> Result<()> {
        while self.running.load(Ordering::Relaxed) {
            if !wire::read_frame(stream, &mut self.read_buffer)? {
                continue;
            }

            let response = match wire::decode::<ControlRequest>(&self.read_buffer) {
                Ok(request) => {
                    log::debug!("Control request: {:?}", request);
                    handle_request(&self.channel, request)
                }
                Err(e) => ControlResponse::Rejected {
                    error: e.to_string(),
                },
            };
            if let ControlResponse::Rejected { ref error } = response {
                log::info!("Control request rejected: {}", error);
            }
            wire::write_frame(stream, &wire::encode(&response)?)?;
        }
        Ok(())
    }
}

/// Accepts control connections, one receiver thread each
pub struct TcpControlServer {
    local_addr: SocketAddr,
    accept_thread: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl TcpControlServer {
    /// Bind `bind_address` and spawn the accept thread
    pub fn new(bind_address: &str, channel: ControlChannel) -> Result<Self> {
        let listener = TcpListener::bind(bind_address)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);

        let accept_thread = thread::Builder::new()
            .name("tcp-control".to_string())
            .spawn(move || Self::accept_loop(listener, channel, running_clone))?;

        log::info!("TCP control endpoint listening on {}", local_addr);

        Ok(Self {
            local_addr,
            accept_thread: Some(accept_thread),
            running,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn accept_loop(listener: TcpListener, channel: ControlChannel, running: Arc<AtomicBool>) {
        let mut receivers: Vec<JoinHandle<()>> = Vec::new();

        while running.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        log::error!("Failed to set socket to blocking mode: {}", e);
                        continue;
                    }
                    log::info!("Control client connected: {}", addr);

                    let mut connection = ControlConnection {
                        channel: channel.clone(),
                        running: Arc::clone(&running),
                        read_buffer: Vec::with_capacity(INITIAL_BUFFER_CAPACITY),
                    };
                    let spawned = thread::Builder::new()
                        .name("tcp-control-conn".to_string())
                        .spawn(move || {
                            if let Err(e) = connection.run(stream) {
                                log::error!("Control connection {} error: {}", addr, e);
                            }
                            log::info!("Control client disconnected: {}", addr);
                        });
                    match spawned {
                        Ok(handle) => receivers.push(handle),
                        Err(e) => log::error!("Failed to spawn control receiver: {}", e),
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(e) => log::error!("Accept error: {}", e),
            }
            receivers.retain(|handle| !handle.is_finished());
        }

        for handle in receivers {
            let _ = handle.join();
        }
        log::info!("Control endpoint stopped");
    }

    /// Stop accepting and close all connections
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for TcpControlServer {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.accept_thread.take() {
            let _ = thread.join();
        }
    }
}
