//! Configuration for the charging schedulers.

use pyo3::prelude::*;

/// Remaining energy (kWh) at or below which a job counts as fully charged.
pub const DEMAND_EPSILON: f64 = 1e-4;

/// Jobs whose progress deadlines lie within this many seconds share a batch.
pub const URGENCY_TIE_SECS: f64 = 1.0;

/// Tolerance for budget exhaustion and "fraction below full rate" tests.
pub const RATE_EPSILON: f64 = 1e-4;

/// Smallest step (seconds) the forward simulation will take.
pub const MIN_STEP_SECS: f64 = 1e-3;

/// LP slot width used by the reference study (15 minutes).
pub const DEFAULT_SLOT_LENGTH_SECS: f64 = 900.0;

/// Envelope on the scaled LP peak the online engine may draw.
pub const DEFAULT_PEAK_SLACK: f64 = 1.4;

/// Settings shared by every scheduler policy.
#[pyclass]
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Multiplier applied to the LP peak before the slack envelope (greedy/eps)
    #[pyo3(get, set)]
    pub scale_factor: f64,
    /// Budget = min(total max rate, peak_slack * scale_factor * LP peak)
    #[pyo3(get, set)]
    pub peak_slack: f64,
    /// Width of one LP slot in seconds
    #[pyo3(get, set)]
    pub slot_length_secs: f64,
    /// Verbosity level: 0=silent, 1=decisions, 2=steps, 3=debug.
    #[pyo3(get, set)]
    pub verbosity: u8,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            peak_slack: DEFAULT_PEAK_SLACK,
            slot_length_secs: DEFAULT_SLOT_LENGTH_SECS,
            verbosity: 0,
        }
    }
}

impl SchedulerConfig {
    /// Default configuration with a different peak scale factor.
    pub fn with_scale(scale_factor: f64) -> Self {
        Self {
            scale_factor,
            ..Self::default()
        }
    }
}

#[pymethods]
impl SchedulerConfig {
    #[new]
    #[pyo3(signature = (
        scale_factor=None,
        peak_slack=None,
        slot_length_secs=None,
        verbosity=None
    ))]
    fn new(
        scale_factor: Option<f64>,
        peak_slack: Option<f64>,
        slot_length_secs: Option<f64>,
        verbosity: Option<u8>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            scale_factor: scale_factor.unwrap_or(defaults.scale_factor),
            peak_slack: peak_slack.unwrap_or(defaults.peak_slack),
            slot_length_secs: slot_length_secs.unwrap_or(defaults.slot_length_secs),
            verbosity: verbosity.unwrap_or(defaults.verbosity),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "SchedulerConfig(scale_factor={}, peak_slack={}, slot_length_secs={}, verbosity={})",
            self.scale_factor, self.peak_slack, self.slot_length_secs, self.verbosity
        )
    }
}
