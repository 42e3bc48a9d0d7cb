//! Offline optimum over the jobs revealed so far.

use chrono::NaiveDateTime;

use crate::config::SchedulerConfig;
use crate::log_decisions;
use crate::peak::{LinearProgramSolver, PeakJob, PeakSolver};

use super::core::{Allocation, Scheduler, SchedulerCore, SchedulerError};

/// Solves the peak LP over every admitted job that has arrived by the
/// scheduled instant and records the optimal aggregate rate per slot.
///
/// Scheduling once at or past the last deadline yields the offline optimum
/// for the whole batch.
pub struct OracleScheduler<S: PeakSolver = LinearProgramSolver> {
    core: SchedulerCore,
    solver: S,
    optimal_peak: Option<f64>,
}

impl OracleScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        let solver = LinearProgramSolver::new(config.slot_length_secs, config.verbosity);
        Self::with_solver(config, solver)
    }
}

impl<S: PeakSolver> OracleScheduler<S> {
    pub fn with_solver(config: &SchedulerConfig, solver: S) -> Self {
        Self {
            core: SchedulerCore::new(config.verbosity),
            solver,
            optimal_peak: None,
        }
    }

    /// Peak of the most recent solve.
    pub fn optimal_peak(&self) -> Option<f64> {
        self.optimal_peak
    }
}

impl<S: PeakSolver> Scheduler for OracleScheduler<S> {
    fn core(&self) -> &SchedulerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SchedulerCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        "Offline optimal scheduler"
    }

    fn allocate(&mut self, instant: NaiveDateTime) -> Result<Allocation, SchedulerError> {
        let revealed: Vec<PeakJob> = self
            .core
            .admitted_jobs()
            .iter()
            .filter(|job| job.arrival_time <= instant)
            .map(PeakJob::from)
            .collect();

        let solution = self.solver.solve(&revealed)?;
        log_decisions!(
            self.core.verbosity(),
            "{} at {}: optimal peak {:.3} kW over {} jobs, {} slots",
            self.name(),
            instant,
            solution.peak,
            revealed.len(),
            solution.slot_rates.len()
        );

        self.optimal_peak = Some(solution.peak);
        Ok(Allocation::Slots(solution.slot_rates))
    }
}
