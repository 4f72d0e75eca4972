//! Core estimation engine.
//!
//! - [`driver::SampleReader`]: Trait to implement for new charge controllers
//! - [`history`], [`curve`], [`classifier`]: Smoothing, lookup and classification
//! - [`state`]: Shared snapshot read by the reporting sink
//! - [`types`]: Samples and battery state

pub mod classifier;
pub mod curve;
pub mod driver;
pub mod history;
pub mod state;
pub mod types;
