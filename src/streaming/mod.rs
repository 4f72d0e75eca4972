//! TCP streaming module for pisugar-gauge
//!
//! - [`TcpPublisher`]: pushes a [`PowerReport`](crate::report::PowerReport)
//!   to every connected client on each change and once per interval
//! - [`TcpControlServer`]: accepts control requests for the software battery

pub mod messages;
pub mod tcp_publisher;
pub mod tcp_receiver;
pub mod wire;

pub use messages::{ControlRequest, ControlResponse, POWER_TOPIC};
pub use tcp_publisher::TcpPublisher;
pub use tcp_receiver::TcpControlServer;
