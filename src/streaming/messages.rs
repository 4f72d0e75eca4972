//! Message types for the TCP endpoints.
//!
//! Outbound reports reuse [`PowerReport`](crate::report::PowerReport) and
//! are published on the [`POWER_TOPIC`] topic. The control endpoint speaks
//! a request/response pair per frame.

use serde::{Deserialize, Serialize};

/// Topic of published power reports
pub const POWER_TOPIC: &str = "power";

/// Request sent to the control endpoint
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    /// Apply a batch of `key=value` lines
    ///
    /// Example payload: `"capacity0=50\ncharging=1\n"`
    Write { payload: String },

    /// Read the channel description starting at `offset`
    Read { offset: usize },
}

/// Reply to a [`ControlRequest`]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ControlResponse {
    /// Whole batch applied
    Written { bytes: usize },
    /// Banner text (empty past offset 0)
    Banner { text: String },
    /// Batch rejected; lines before the bad one may already be applied
    Rejected { error: String },
}
