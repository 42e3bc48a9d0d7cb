//! Core data types for the charging schedulers.

use chrono::NaiveDateTime;
use pyo3::prelude::*;
use rustc_hash::FxHashMap;

use crate::config::DEMAND_EPSILON;
use crate::interner::JobKey;

pub const SECS_PER_HOUR: f64 = 3600.0;

/// Signed seconds from `from` to `to`.
pub fn seconds_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1e6,
        None => delta.num_seconds() as f64,
    }
}

/// Signed hours from `from` to `to`.
pub fn hours_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    seconds_between(from, to) / SECS_PER_HOUR
}

/// A charging request as presented for admission.
#[pyclass]
#[derive(Clone, Debug)]
pub struct JobRequest {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub arrival_time: NaiveDateTime,
    #[pyo3(get, set)]
    pub deadline: NaiveDateTime,
    #[pyo3(get, set)]
    pub demand_kwh: f64,
    #[pyo3(get, set)]
    pub max_rate_kw: f64,
    /// Must equal `arrival_time` when set; no notification latency is modeled.
    #[pyo3(get, set)]
    pub notify_time: Option<NaiveDateTime>,
}

#[pymethods]
impl JobRequest {
    #[new]
    #[pyo3(signature = (id, arrival_time, deadline, demand_kwh, max_rate_kw, notify_time=None))]
    pub fn new(
        id: String,
        arrival_time: NaiveDateTime,
        deadline: NaiveDateTime,
        demand_kwh: f64,
        max_rate_kw: f64,
        notify_time: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            id,
            arrival_time,
            deadline,
            demand_kwh,
            max_rate_kw,
            notify_time,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "JobRequest(id={:?}, arrival={}, deadline={}, demand_kwh={}, max_rate_kw={})",
            self.id, self.arrival_time, self.deadline, self.demand_kwh, self.max_rate_kw
        )
    }
}

/// A live charging job owned by one scheduler instance.
#[derive(Clone, Debug)]
pub struct Job {
    pub id: String,
    pub key: JobKey,
    pub notify_time: NaiveDateTime,
    pub arrival_time: NaiveDateTime,
    pub deadline: NaiveDateTime,
    /// Energy still owed; never increases.
    pub remaining_kwh: f64,
    pub max_rate_kw: f64,
    /// Instant up to which the owning scheduler has accounted this job's charging.
    pub processed_up_to: NaiveDateTime,
}

impl Job {
    pub fn from_request(request: &JobRequest, key: JobKey) -> Self {
        Self {
            id: request.id.clone(),
            key,
            notify_time: request.notify_time.unwrap_or(request.arrival_time),
            arrival_time: request.arrival_time,
            deadline: request.deadline,
            remaining_kwh: request.demand_kwh,
            max_rate_kw: request.max_rate_kw,
            processed_up_to: request.arrival_time,
        }
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.remaining_kwh <= DEMAND_EPSILON
    }

    /// Deliver `kwh` of energy, never going below zero.
    pub fn deliver(&mut self, kwh: f64) {
        self.remaining_kwh = (self.remaining_kwh - kwh).max(0.0);
    }
}

/// What a scheduler decided at one recorded instant.
#[derive(Clone, Debug)]
pub enum Decision {
    /// Per-job charging rates (kW).
    Rates(FxHashMap<JobKey, f64>),
    /// A single aggregate rate (kW), as produced by the offline solver.
    Aggregate(f64),
}

impl Decision {
    pub fn total_rate(&self) -> f64 {
        match self {
            Decision::Rates(rates) => rates.values().sum(),
            Decision::Aggregate(rate) => *rate,
        }
    }
}

/// Admission and deadline-miss counters.
#[pyclass]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    #[pyo3(get)]
    pub jobs_admitted: usize,
    #[pyo3(get)]
    pub jobs_unfinished: usize,
}

#[pymethods]
impl SchedulerStats {
    /// Fraction of admitted jobs that reached their deadline with demand left.
    pub fn unfinished_ratio(&self) -> f64 {
        if self.jobs_admitted == 0 {
            return 0.0;
        }
        self.jobs_unfinished as f64 / self.jobs_admitted as f64
    }

    fn __repr__(&self) -> String {
        format!(
            "SchedulerStats(jobs_admitted={}, jobs_unfinished={})",
            self.jobs_admitted, self.jobs_unfinished
        )
    }
}
