//! Shared scheduler state machine and the policy trait.

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::interner::{JobIdInterner, JobKey};
use crate::models::{Decision, Job, JobRequest, SchedulerStats};
use crate::peak::PeakSolverError;
use crate::{log_decisions, log_steps};

/// Errors that can occur during admission or scheduling.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("Job {id} arrives at {arrival}, before the last admission at {current}")]
    AdmissionOrder {
        id: String,
        arrival: NaiveDateTime,
        current: NaiveDateTime,
    },
    #[error("Schedule requested for {instant}, before the last scheduled instant {last}")]
    ScheduleOrder {
        instant: NaiveDateTime,
        last: NaiveDateTime,
    },
    #[error("Urgency batches out of order: progress deadline {found:.3}s after batch at {previous:.3}s")]
    UrgencyOrder { previous: f64, found: f64 },
    #[error("Peak solver failed: {0}")]
    Solver(#[from] PeakSolverError),
    #[error("Duplicate job id: {0}")]
    DuplicateJob(String),
    #[error("Invalid job {id}: {reason}")]
    InvalidJob { id: String, reason: String },
    #[error("Unknown scheduling policy: {0}")]
    UnknownPolicy(String),
    #[error("Invalid scheduler config: {0}")]
    InvalidConfig(String),
}

/// Result of one policy step, before it is written into the history.
#[derive(Clone, Debug)]
pub enum Allocation {
    /// Per-job rates at the scheduled instant.
    Rates(FxHashMap<JobKey, f64>),
    /// Aggregate rate per slot start; merged into the history, later solves win.
    Slots(BTreeMap<NaiveDateTime, f64>),
}

/// State common to every policy: job sets, decision history, counters.
#[derive(Clone, Debug, Default)]
pub struct SchedulerCore {
    live: Vec<Job>,
    /// Jobs exactly as admitted; never mutated.
    admitted: Vec<Job>,
    history: BTreeMap<NaiveDateTime, Decision>,
    interner: JobIdInterner,
    current_time: Option<NaiveDateTime>,
    last_schedule_time: Option<NaiveDateTime>,
    retired: Vec<RetiredJob>,
    jobs_unfinished: usize,
    verbosity: u8,
}

/// A job removed from the live set, as it stood when removed.
#[derive(Clone, Debug)]
pub struct RetiredJob {
    pub job: Job,
    pub retired_at: NaiveDateTime,
}

impl RetiredJob {
    /// Removed at its deadline with demand left.
    pub fn missed_deadline(&self) -> bool {
        !self.job.is_complete()
    }
}

/// Counts from one completion/expiry sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub completed: usize,
    pub expired: usize,
}

impl SchedulerCore {
    pub fn new(verbosity: u8) -> Self {
        Self {
            verbosity,
            ..Self::default()
        }
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    /// Admit a job into both the live set and the immutable snapshot.
    pub fn admit(&mut self, request: &JobRequest) -> Result<(), SchedulerError> {
        if let Some(current) = self.current_time {
            if request.arrival_time < current {
                return Err(SchedulerError::AdmissionOrder {
                    id: request.id.clone(),
                    arrival: request.arrival_time,
                    current,
                });
            }
        }
        validate_request(request)?;

        let key = self
            .interner
            .intern_new(&request.id)
            .ok_or_else(|| SchedulerError::DuplicateJob(request.id.clone()))?;

        let job = Job::from_request(request, key);
        log_decisions!(
            self.verbosity,
            "  Admitted {} ({:.2} kWh at <= {:.2} kW, {} -> {})",
            job.id,
            job.remaining_kwh,
            job.max_rate_kw,
            job.arrival_time,
            job.deadline
        );
        self.current_time = Some(request.arrival_time);
        self.admitted.push(job.clone());
        self.live.push(job);
        Ok(())
    }

    /// Reject instants earlier than the last scheduled one.
    pub fn check_schedule_order(&self, instant: NaiveDateTime) -> Result<(), SchedulerError> {
        match self.last_schedule_time {
            Some(last) if instant < last => Err(SchedulerError::ScheduleOrder { instant, last }),
            _ => Ok(()),
        }
    }

    /// Write a policy step into the history and advance the schedule cursor.
    pub fn record(&mut self, instant: NaiveDateTime, allocation: Allocation) {
        match allocation {
            Allocation::Rates(rates) => {
                self.history.insert(instant, Decision::Rates(rates));
            }
            Allocation::Slots(slots) => {
                self.history.extend(
                    slots
                        .into_iter()
                        .map(|(slot, rate)| (slot, Decision::Aggregate(rate))),
                );
            }
        }
        self.last_schedule_time = Some(instant);
    }

    /// Drop completed jobs and jobs whose deadline has passed by `instant`.
    ///
    /// Expired jobs with demand left count as unfinished. Cursors of the
    /// surviving jobs move up to `instant`.
    pub fn sweep(&mut self, instant: NaiveDateTime) -> SweepOutcome {
        let verbosity = self.verbosity;
        let mut outcome = SweepOutcome::default();
        let retired = &mut self.retired;

        self.live.retain_mut(|job| {
            let keep = sweep_one(job, instant, verbosity, &mut outcome);
            if !keep {
                retired.push(RetiredJob {
                    job: job.clone(),
                    retired_at: instant,
                });
            }
            keep
        });

        self.jobs_unfinished += outcome.expired;
        outcome
    }

    pub fn live_jobs(&self) -> &[Job] {
        &self.live
    }

    pub fn live_jobs_mut(&mut self) -> &mut [Job] {
        &mut self.live
    }

    pub fn admitted_jobs(&self) -> &[Job] {
        &self.admitted
    }

    /// Jobs removed by sweeps, in removal order.
    pub fn retired_jobs(&self) -> &[RetiredJob] {
        &self.retired
    }

    pub fn history(&self) -> &BTreeMap<NaiveDateTime, Decision> {
        &self.history
    }

    pub fn last_schedule_time(&self) -> Option<NaiveDateTime> {
        self.last_schedule_time
    }

    pub fn resolve(&self, key: JobKey) -> Option<&str> {
        self.interner.resolve(key)
    }

    pub fn total_rate_at(&self, instant: NaiveDateTime) -> Option<f64> {
        self.history.get(&instant).map(Decision::total_rate)
    }

    /// Per-job rates recorded at `instant`, keyed by job id.
    pub fn rates_at(&self, instant: NaiveDateTime) -> Option<Vec<(String, f64)>> {
        match self.history.get(&instant)? {
            Decision::Rates(rates) => {
                let mut named: Vec<(String, f64)> = rates
                    .iter()
                    .filter_map(|(&key, &rate)| self.resolve(key).map(|id| (id.to_string(), rate)))
                    .collect();
                named.sort_by(|a, b| a.0.cmp(&b.0));
                Some(named)
            }
            Decision::Aggregate(_) => None,
        }
    }

    /// Highest total rate across the recorded history.
    pub fn realized_peak(&self) -> f64 {
        self.history
            .values()
            .map(Decision::total_rate)
            .fold(0.0, f64::max)
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            jobs_admitted: self.admitted.len(),
            jobs_unfinished: self.jobs_unfinished,
        }
    }
}

/// Classify one live job at `instant`. Returns whether it stays live.
fn sweep_one(
    job: &mut Job,
    instant: NaiveDateTime,
    verbosity: u8,
    outcome: &mut SweepOutcome,
) -> bool {
    if job.deadline <= instant {
        if !job.is_complete() {
            outcome.expired += 1;
            log_decisions!(
                verbosity,
                "  Job {} missed its deadline {} with {:.4} kWh left",
                job.id,
                job.deadline,
                job.remaining_kwh
            );
        } else {
            outcome.completed += 1;
        }
        return false;
    }
    if job.is_complete() {
        outcome.completed += 1;
        log_steps!(verbosity, "  Job {} finished charging", job.id);
        return false;
    }
    if job.processed_up_to < instant {
        job.processed_up_to = instant;
    }
    true
}

fn validate_request(request: &JobRequest) -> Result<(), SchedulerError> {
    let invalid = |reason: &str| SchedulerError::InvalidJob {
        id: request.id.clone(),
        reason: reason.to_string(),
    };

    if let Some(notify) = request.notify_time {
        if notify != request.arrival_time {
            return Err(invalid("notify time must equal arrival time"));
        }
    }
    if request.max_rate_kw.is_nan() || request.max_rate_kw <= 0.0 {
        return Err(invalid("max rate must be positive"));
    }
    if request.demand_kwh.is_nan() || request.demand_kwh < 0.0 {
        return Err(invalid("demand must be non-negative"));
    }
    Ok(())
}

/// A charging policy over a `SchedulerCore`.
///
/// Policies implement `allocate`; admission, ordering checks and history
/// bookkeeping are shared.
pub trait Scheduler {
    fn core(&self) -> &SchedulerCore;

    fn core_mut(&mut self) -> &mut SchedulerCore;

    fn name(&self) -> &'static str;

    /// Policy step for `instant`. Called after the ordering check and before
    /// the result is recorded, so `core().last_schedule_time()` is still the
    /// previous instant.
    fn allocate(&mut self, instant: NaiveDateTime) -> Result<Allocation, SchedulerError>;

    fn add_job(&mut self, request: &JobRequest) -> Result<(), SchedulerError> {
        self.core_mut().admit(request)
    }

    fn schedule(&mut self, instant: NaiveDateTime) -> Result<(), SchedulerError> {
        self.core().check_schedule_order(instant)?;
        let allocation = self.allocate(instant)?;
        self.core_mut().record(instant, allocation);
        Ok(())
    }

    /// Total rate at an instant previously recorded by `schedule`.
    fn total_charging_rate_at(&self, instant: NaiveDateTime) -> Option<f64> {
        self.core().total_rate_at(instant)
    }

    fn realized_peak(&self) -> f64 {
        self.core().realized_peak()
    }

    fn stats(&self) -> SchedulerStats {
        self.core().stats()
    }

    /// Budget recorded per instant, for policies that derive one.
    fn peak_bounds(&self) -> Option<&BTreeMap<NaiveDateTime, f64>> {
        None
    }
}
