//! Rust core for evaluating peak-minimizing EV charging schedulers.
//!
//! Provides the offline optimal peak LP, the online fair-share engine and the
//! baseline policies, plus Python bindings for the analysis scripts that feed
//! arrivals in and plot the recorded decisions.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::NaiveDateTime;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

mod config;
mod interner;
pub mod logging;
mod models;
pub mod peak;
pub mod scheduler;

pub use config::{
    SchedulerConfig, DEFAULT_PEAK_SLACK, DEFAULT_SLOT_LENGTH_SECS, DEMAND_EPSILON, MIN_STEP_SECS,
    RATE_EPSILON, URGENCY_TIE_SECS,
};
pub use interner::{JobIdInterner, JobKey};
pub use models::{hours_between, seconds_between, Decision, Job, JobRequest, SchedulerStats};
pub use peak::{LinearProgramSolver, PeakJob, PeakSolution, PeakSolver, PeakSolverError};
pub use scheduler::{
    build_scheduler, Allocation, BoundSource, ContinuousScheduler, GreedyScheduler,
    OracleScheduler, RatePolicy, RetiredJob, Scheduler, SchedulerCore, SchedulerError,
    POLICY_NAMES,
};

/// Compute the offline optimal peak for a set of jobs.
///
/// # Arguments
/// * `jobs` - Jobs to solve over; each window runs from arrival to deadline
/// * `slot_length_secs` - LP slot width (900s reproduces the reference study)
///
/// # Returns
/// * (peak, [(slot_start, aggregate_rate)]) with slots in time order
///
/// # Raises
/// * ValueError if `slot_length_secs` is not a positive number, or if the LP
///   backend reports no solution
#[pyfunction]
#[pyo3(signature = (jobs, slot_length_secs=DEFAULT_SLOT_LENGTH_SECS))]
fn compute_optimal_peak(
    jobs: Vec<JobRequest>,
    slot_length_secs: f64,
) -> PyResult<(f64, Vec<(NaiveDateTime, f64)>)> {
    let peak_jobs: Vec<PeakJob> = jobs
        .iter()
        .map(|job| PeakJob {
            window_start: job.arrival_time,
            deadline: job.deadline,
            demand_kwh: job.demand_kwh,
            max_rate_kw: job.max_rate_kw,
        })
        .collect();

    match LinearProgramSolver::new(slot_length_secs, 0).solve(&peak_jobs) {
        Ok(solution) => Ok((solution.peak, solution.slot_rates.into_iter().collect())),
        Err(e) => Err(PyValueError::new_err(e.to_string())),
    }
}

/// One scheduler instance (PyO3 wrapper over any policy).
#[pyclass(name = "Scheduler")]
pub struct PyScheduler {
    inner: Box<dyn Scheduler + Send>,
}

#[pymethods]
impl PyScheduler {
    /// Create a scheduler; `kind` is one of "max_rate", "fix_rate", "oracle",
    /// "greedy" or "eps".
    #[new]
    #[pyo3(signature = (kind, config=None))]
    fn new(kind: &str, config: Option<SchedulerConfig>) -> PyResult<Self> {
        build_scheduler(kind, config.unwrap_or_default())
            .map(|inner| Self { inner })
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn add_job(&mut self, job: JobRequest) -> PyResult<()> {
        self.inner
            .add_job(&job)
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn schedule(&mut self, instant: NaiveDateTime) -> PyResult<()> {
        self.inner
            .schedule(instant)
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn total_charging_rate_at(&self, instant: NaiveDateTime) -> Option<f64> {
        self.inner.total_charging_rate_at(instant)
    }

    /// Per-job rates at a recorded instant (None for the offline scheduler).
    fn rates_at(&self, instant: NaiveDateTime) -> Option<Vec<(String, f64)>> {
        self.inner.core().rates_at(instant)
    }

    /// Every recorded instant with its total charging rate.
    fn history(&self) -> Vec<(NaiveDateTime, f64)> {
        self.inner
            .core()
            .history()
            .iter()
            .map(|(instant, decision)| (*instant, decision.total_rate()))
            .collect()
    }

    /// Budget per scheduled instant (greedy and eps only).
    fn peak_bounds(&self) -> Option<Vec<(NaiveDateTime, f64)>> {
        self.inner
            .peak_bounds()
            .map(|bounds| bounds.iter().map(|(t, b)| (*t, *b)).collect())
    }

    /// Ids of jobs that reached their deadline with demand left.
    fn unfinished_jobs(&self) -> Vec<String> {
        self.inner
            .core()
            .retired_jobs()
            .iter()
            .filter(|retired| retired.missed_deadline())
            .map(|retired| retired.job.id.clone())
            .collect()
    }

    fn realized_peak(&self) -> f64 {
        self.inner.realized_peak()
    }

    fn stats(&self) -> SchedulerStats {
        self.inner.stats()
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn __repr__(&self) -> String {
        let stats = self.inner.stats();
        format!(
            "Scheduler(name={:?}, jobs_admitted={}, jobs_unfinished={})",
            self.inner.name(),
            stats.jobs_admitted,
            stats.jobs_unfinished
        )
    }
}

/// The evpeak.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Core data types
    m.add_class::<JobRequest>()?;
    m.add_class::<SchedulerStats>()?;
    m.add_class::<PyScheduler>()?;

    // Config types
    m.add_class::<SchedulerConfig>()?;
    m.add("POLICY_NAMES", POLICY_NAMES.to_vec())?;

    // Algorithms
    m.add_function(wrap_pyfunction!(compute_optimal_peak, m)?)?;

    Ok(())
}
