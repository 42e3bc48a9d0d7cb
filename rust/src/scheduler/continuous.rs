//! Baseline policies without a shared cap.
//!
//! Each `schedule(t)` first charges every job for the time since the previous
//! instant at the rate it was assigned then, sweeps finished and expired jobs,
//! and assigns new rates to the jobs that have arrived.

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;

use crate::config::SchedulerConfig;
use crate::interner::JobKey;
use crate::models::{hours_between, Job};
use crate::{log_decisions, log_steps};

use super::core::{Allocation, Scheduler, SchedulerCore, SchedulerError};

/// How a continuous scheduler picks each job's rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RatePolicy {
    /// Always charge at the job's max rate.
    MaxRate,
    /// Charge at exactly the rate that finishes the job at its deadline.
    FixRate,
}

impl RatePolicy {
    fn rate_for(self, job: &Job, instant: NaiveDateTime) -> f64 {
        match self {
            RatePolicy::MaxRate => job.max_rate_kw,
            RatePolicy::FixRate => job.remaining_kwh / hours_between(instant, job.deadline),
        }
    }
}

pub struct ContinuousScheduler {
    core: SchedulerCore,
    policy: RatePolicy,
    /// Rates assigned at the last scheduled instant.
    last_rates: FxHashMap<JobKey, f64>,
}

impl ContinuousScheduler {
    pub fn new(policy: RatePolicy, config: &SchedulerConfig) -> Self {
        Self {
            core: SchedulerCore::new(config.verbosity),
            policy,
            last_rates: FxHashMap::default(),
        }
    }

    pub fn max_rate(config: &SchedulerConfig) -> Self {
        Self::new(RatePolicy::MaxRate, config)
    }

    pub fn fix_rate(config: &SchedulerConfig) -> Self {
        Self::new(RatePolicy::FixRate, config)
    }
}

impl Scheduler for ContinuousScheduler {
    fn core(&self) -> &SchedulerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SchedulerCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        match self.policy {
            RatePolicy::MaxRate => "Max scheduler",
            RatePolicy::FixRate => "Fix rate scheduler",
        }
    }

    fn allocate(&mut self, instant: NaiveDateTime) -> Result<Allocation, SchedulerError> {
        if let Some(last) = self.core.last_schedule_time() {
            let hours = hours_between(last, instant);
            for job in self.core.live_jobs_mut() {
                if let Some(&rate) = self.last_rates.get(&job.key) {
                    job.deliver(rate * hours);
                }
            }
        }

        let outcome = self.core.sweep(instant);

        let policy = self.policy;
        let verbosity = self.core.verbosity();
        let rates: FxHashMap<JobKey, f64> = self
            .core
            .live_jobs()
            .iter()
            .filter(|job| job.arrival_time <= instant)
            .map(|job| {
                let rate = policy.rate_for(job, instant);
                log_steps!(verbosity, "  {} -> {:.3} kW", job.id, rate);
                (job.key, rate)
            })
            .collect();

        log_decisions!(
            verbosity,
            "{} at {}: drawing {:.3} kW across {} jobs ({} finished, {} expired)",
            self.name(),
            instant,
            rates.values().sum::<f64>(),
            rates.len(),
            outcome.completed,
            outcome.expired
        );

        self.last_rates = rates.clone();
        Ok(Allocation::Rates(rates))
    }
}
