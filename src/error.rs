//! Error types for pisugar-gauge

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// pisugar-gauge error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The register bus could not be opened (fatal at startup)
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// A single register read failed or returned garbage
    #[error("Register read failed at {register:#04x}: {reason}")]
    Bus {
        /// Register address that was being read
        register: u8,
        /// Underlying failure
        reason: String,
    },

    /// Malformed control input
    #[error("Format error: {0}")]
    Format(String),

    /// Control batch larger than the channel accepts in one unit
    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Size of the rejected payload
        size: usize,
        /// Maximum accepted size
        max: usize,
    },

    /// Invalid capacity curve
    #[error("Invalid battery curve: {0}")]
    Curve(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation not supported by the active hardware model
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Thread panic
    #[error("Thread panicked")]
    ThreadPanic,
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
