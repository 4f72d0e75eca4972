//! SampleReader trait definition

use crate::config::HardwareModel;
use crate::core::curve::CapacityCurve;
use crate::core::types::Sample;
use crate::error::Result;
use crate::transport::RegisterBus;

/// Per-chip register sampling
///
/// Implementations turn raw registers into a [`Sample`]. They never touch
/// the shared state; the monitor owns smoothing and classification.
pub trait SampleReader: Send {
    /// Hardware model this reader implements
    fn model(&self) -> HardwareModel;

    /// Lookup curve for chips that only report voltage
    ///
    /// `None` means the chip reports capacity directly.
    fn curve(&self) -> Option<&CapacityCurve> {
        None
    }

    /// Read one sample
    ///
    /// An `Err` means the tick must be skipped with state left untouched.
    fn sample(&mut self, bus: &mut dyn RegisterBus) -> Result<Sample>;
}
