//! Offline optimal peak via linear programming.
//!
//! The union of all job windows is cut into fixed-width slots. Every job gets
//! one rate variable per slot-aligned piece of its window, bounded by its max
//! rate. Each job must receive exactly its deliverable demand, and the sum of
//! the rate variables in a slot may not exceed the peak variable, which is
//! minimized. The continuous relaxation is exact, so no integrality is needed.

use chrono::{Duration, NaiveDateTime};
use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem, Variable};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::DEFAULT_SLOT_LENGTH_SECS;
use crate::log_debug;
use crate::models::{hours_between, seconds_between, Job, SECS_PER_HOUR};

/// Errors reported by a peak solver backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PeakSolverError {
    #[error("peak LP is infeasible")]
    Infeasible,
    #[error("peak LP is unbounded")]
    Unbounded,
    #[error("slot length must be a positive number of seconds, got {0}")]
    InvalidSlotLength(f64),
}

/// Reject slot widths the discretization cannot step through.
pub fn check_slot_length(slot_length_secs: f64) -> Result<(), PeakSolverError> {
    if slot_length_secs.is_finite() && slot_length_secs > 0.0 {
        Ok(())
    } else {
        Err(PeakSolverError::InvalidSlotLength(slot_length_secs))
    }
}

/// One job as seen by the solver: its remaining window, demand and rate cap.
#[derive(Clone, Debug, PartialEq)]
pub struct PeakJob {
    pub window_start: NaiveDateTime,
    pub deadline: NaiveDateTime,
    pub demand_kwh: f64,
    pub max_rate_kw: f64,
}

impl PeakJob {
    /// Demand capped at what the job can physically draw inside its window.
    pub fn deliverable_kwh(&self) -> f64 {
        let window_hours = hours_between(self.window_start, self.deadline);
        self.demand_kwh
            .min(self.max_rate_kw * window_hours)
            .max(0.0)
    }
}

impl From<&Job> for PeakJob {
    fn from(job: &Job) -> Self {
        Self {
            window_start: job.processed_up_to,
            deadline: job.deadline,
            demand_kwh: job.remaining_kwh,
            max_rate_kw: job.max_rate_kw,
        }
    }
}

/// Minimum peak and the aggregate rate the optimal assignment draws per slot.
#[derive(Clone, Debug, Default)]
pub struct PeakSolution {
    pub peak: f64,
    /// Slot start -> summed rate of all jobs in that slot.
    pub slot_rates: BTreeMap<NaiveDateTime, f64>,
}

/// Computes the minimum achievable peak for a finite job set.
pub trait PeakSolver: Send {
    fn solve(&self, jobs: &[PeakJob]) -> Result<PeakSolution, PeakSolverError>;
}

/// `PeakSolver` backed by a simplex LP.
#[derive(Clone, Debug)]
pub struct LinearProgramSolver {
    slot_length_secs: f64,
    verbosity: u8,
}

impl Default for LinearProgramSolver {
    fn default() -> Self {
        Self::new(DEFAULT_SLOT_LENGTH_SECS, 0)
    }
}

impl LinearProgramSolver {
    pub fn new(slot_length_secs: f64, verbosity: u8) -> Self {
        Self {
            slot_length_secs,
            verbosity,
        }
    }

    fn slot_start(&self, horizon_start: NaiveDateTime, slot: usize) -> NaiveDateTime {
        let offset_micros = (slot as f64 * self.slot_length_secs * 1e6).round() as i64;
        horizon_start + Duration::microseconds(offset_micros)
    }
}

impl PeakSolver for LinearProgramSolver {
    fn solve(&self, jobs: &[PeakJob]) -> Result<PeakSolution, PeakSolverError> {
        check_slot_length(self.slot_length_secs)?;

        let windows: Vec<&PeakJob> = jobs
            .iter()
            .filter(|job| job.deadline > job.window_start)
            .collect();

        let horizon_start = windows.iter().map(|job| job.window_start).min();
        let horizon_end = windows.iter().map(|job| job.deadline).max();
        let (horizon_start, horizon_end) = match (horizon_start, horizon_end) {
            (Some(start), Some(end)) => (start, end),
            _ => return Ok(PeakSolution::default()),
        };

        let slot_len = self.slot_length_secs;
        let num_slots = (seconds_between(horizon_start, horizon_end) / slot_len).ceil() as usize;

        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let peak = problem.add_var(1.0, (0.0, f64::INFINITY));
        let mut slot_vars: Vec<Vec<Variable>> = vec![Vec::new(); num_slots];
        let mut num_rate_vars = 0usize;

        for job in &windows {
            let demand = job.deliverable_kwh();
            if demand <= 0.0 {
                continue;
            }

            let start_sec = seconds_between(horizon_start, job.window_start);
            let end_sec = seconds_between(horizon_start, job.deadline);
            let mut slot = (start_sec / slot_len).floor() as usize;
            let mut lo = start_sec;
            let mut energy = LinearExpr::empty();

            while lo < end_sec {
                let hi = ((slot + 1) as f64 * slot_len).min(end_sec);
                if hi > lo {
                    let rate = problem.add_var(0.0, (0.0, job.max_rate_kw));
                    energy.add(rate, (hi - lo) / SECS_PER_HOUR);
                    slot_vars[slot.min(num_slots - 1)].push(rate);
                    num_rate_vars += 1;
                    lo = hi;
                }
                slot += 1;
            }

            problem.add_constraint(energy, ComparisonOp::Eq, demand);
        }

        for vars in slot_vars.iter().filter(|vars| !vars.is_empty()) {
            let mut load = LinearExpr::empty();
            for &rate in vars {
                load.add(rate, 1.0);
            }
            load.add(peak, -1.0);
            problem.add_constraint(load, ComparisonOp::Le, 0.0);
        }

        log_debug!(
            self.verbosity,
            "  Peak LP: {} jobs, {} slots, {} rate variables",
            windows.len(),
            num_slots,
            num_rate_vars
        );

        let solution = problem.solve().map_err(|err| match err {
            minilp::Error::Infeasible => PeakSolverError::Infeasible,
            minilp::Error::Unbounded => PeakSolverError::Unbounded,
        })?;

        let slot_rates = slot_vars
            .iter()
            .enumerate()
            .map(|(slot, vars)| {
                let total: f64 = vars.iter().map(|&rate| solution[rate]).sum();
                (self.slot_start(horizon_start, slot), total)
            })
            .collect();

        Ok(PeakSolution {
            peak: solution[peak],
            slot_rates,
        })
    }
}
