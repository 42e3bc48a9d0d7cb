//! Charging schedulers.
//!
//! Every policy composes a `SchedulerCore` (job sets, decision history,
//! counters) and implements the `Scheduler` trait's allocation step.

mod continuous;
mod core;
mod greedy;
mod oracle;
mod urgency;

pub use continuous::{ContinuousScheduler, RatePolicy};
pub use self::core::{
    Allocation, RetiredJob, Scheduler, SchedulerCore, SchedulerError, SweepOutcome,
};
pub use greedy::{BoundSource, GreedyScheduler};
pub use oracle::OracleScheduler;
pub use urgency::{batch_by_urgency, progress_deadline, UrgencyBatch};

use crate::config::SchedulerConfig;
use crate::peak::check_slot_length;

/// Policy names accepted by `build_scheduler`.
pub const POLICY_NAMES: [&str; 5] = ["max_rate", "fix_rate", "oracle", "greedy", "eps"];

fn validate_config(config: &SchedulerConfig) -> Result<(), SchedulerError> {
    check_slot_length(config.slot_length_secs)
        .map_err(|e| SchedulerError::InvalidConfig(e.to_string()))?;
    for (name, value) in [
        ("scale_factor", config.scale_factor),
        ("peak_slack", config.peak_slack),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(SchedulerError::InvalidConfig(format!(
                "{} must be a non-negative number, got {}",
                name, value
            )));
        }
    }
    Ok(())
}

/// Construct a scheduler by policy name.
pub fn build_scheduler(
    kind: &str,
    config: SchedulerConfig,
) -> Result<Box<dyn Scheduler + Send>, SchedulerError> {
    validate_config(&config)?;
    let scheduler: Box<dyn Scheduler + Send> = match kind {
        "max_rate" => Box::new(ContinuousScheduler::max_rate(&config)),
        "fix_rate" => Box::new(ContinuousScheduler::fix_rate(&config)),
        "oracle" => Box::new(OracleScheduler::new(&config)),
        "greedy" => Box::new(GreedyScheduler::new(config)),
        "eps" => Box::new(GreedyScheduler::eps(config)),
        other => return Err(SchedulerError::UnknownPolicy(other.to_string())),
    };
    Ok(scheduler)
}
