//! Online fair-share scheduling (greedy and eps variants).
//!
//! On every `schedule(t)` the engine:
//! 1. Replays the interval since the previous instant under the budget chosen
//!    back then. The replay is event driven: an allocation is held until a job
//!    arrives, finishes or hits its deadline, or until two urgency batches
//!    meet, and is then recomputed.
//! 2. Sweeps finished and expired jobs.
//! 3. Derives a new budget from the LP peak and records the allocation it
//!    produces at `t`.
//!
//! Allocation serves urgency batches most urgent first at full rate. The batch
//! at which the budget runs out gets a single fraction of its members' max
//! rates, and later batches get nothing.

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

use crate::config::{SchedulerConfig, DEMAND_EPSILON, MIN_STEP_SECS, RATE_EPSILON};
use crate::interner::JobKey;
use crate::models::{seconds_between, Job, SECS_PER_HOUR};
use crate::peak::{LinearProgramSolver, PeakJob, PeakSolver};
use crate::{log_debug, log_decisions, log_steps};

use super::core::{Allocation, Scheduler, SchedulerCore, SchedulerError};
use super::urgency::{batch_by_urgency, progress_deadline, sort_by_urgency};

/// Which job set the LP bound is computed over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundSource {
    /// Live jobs with their remaining demand and remaining window (greedy).
    LiveJobs,
    /// Every job as originally admitted (eps).
    AdmittedJobs,
}

/// Working copy of a job during replay. Times are seconds from the origin.
#[derive(Clone, Debug)]
struct SimJob {
    /// Position in the live set.
    index: usize,
    key: JobKey,
    arrival: f64,
    deadline: f64,
    remaining_kwh: f64,
    max_rate_kw: f64,
    progress: f64,
}

impl SimJob {
    fn new(index: usize, job: &Job, origin: NaiveDateTime) -> Self {
        let deadline = seconds_between(origin, job.deadline);
        Self {
            index,
            key: job.key,
            arrival: seconds_between(origin, job.processed_up_to).max(0.0),
            deadline,
            remaining_kwh: job.remaining_kwh,
            max_rate_kw: job.max_rate_kw,
            progress: progress_deadline(deadline, job.remaining_kwh, job.max_rate_kw),
        }
    }

    fn is_present(&self, now: f64) -> bool {
        self.arrival <= now && self.deadline > now && self.remaining_kwh > DEMAND_EPSILON
    }

    /// Charge at `fraction` of max rate for `secs`.
    fn charge(&mut self, fraction: f64, secs: f64) {
        self.progress += fraction * secs;
        let delivered = self.max_rate_kw * fraction * secs / SECS_PER_HOUR;
        self.remaining_kwh = (self.remaining_kwh - delivered).max(0.0);
    }
}

/// One allocation and how long it stays valid.
struct FairShare {
    /// (sim job index, fraction of max rate)
    fractions: Vec<(usize, f64)>,
    valid_for: f64,
}

fn fair_share(
    jobs: &[SimJob],
    now: f64,
    budget: f64,
    verbosity: u8,
) -> Result<FairShare, SchedulerError> {
    let mut present: Vec<usize> = (0..jobs.len()).filter(|&i| jobs[i].is_present(now)).collect();
    sort_by_urgency(&mut present, |i| jobs[i].progress);
    let batches = batch_by_urgency(&present, |i| jobs[i].progress)?;

    let mut remaining_budget = budget;
    let mut valid_for = f64::INFINITY;
    let mut fractions = Vec::with_capacity(present.len());
    let mut previous: Option<f64> = None;

    for (pos, batch) in batches.iter().enumerate() {
        let batch_max: f64 = batch.members.iter().map(|&i| jobs[i].max_rate_kw).sum();
        let fraction = if batch_max <= remaining_budget {
            1.0
        } else {
            (remaining_budget / batch_max).max(0.0)
        };

        // The full-rate batch ahead gains on this one at (1 - fraction).
        if fraction < 1.0 - RATE_EPSILON {
            if let Some(prev) = previous {
                valid_for = valid_for.min((batch.progress_deadline - prev) / (1.0 - fraction));
            }
        }
        previous = Some(batch.progress_deadline);

        for &i in &batch.members {
            fractions.push((i, fraction));
            let job = &jobs[i];
            if fraction > 0.0 {
                let finish = job.remaining_kwh / (job.max_rate_kw * fraction) * SECS_PER_HOUR;
                valid_for = valid_for.min(finish).min(job.deadline - now);
            }
        }

        log_debug!(
            verbosity,
            "      batch pd={:.1}s size={} max={:.3} kW fraction={:.4}",
            batch.progress_deadline,
            batch.members.len(),
            batch_max,
            fraction
        );

        remaining_budget -= batch_max;
        if remaining_budget <= RATE_EPSILON {
            // This batch gains on the unserved one behind it at `fraction`.
            if let Some(next) = batches.get(pos + 1) {
                if fraction > 0.0 {
                    valid_for = valid_for
                        .min((next.progress_deadline - batch.progress_deadline) / fraction);
                }
            }
            break;
        }
    }

    Ok(FairShare {
        fractions,
        valid_for,
    })
}

/// Replay `horizon` seconds under `budget`. Returns the number of steps taken.
fn simulate(
    jobs: &mut [SimJob],
    budget: f64,
    horizon: f64,
    verbosity: u8,
) -> Result<usize, SchedulerError> {
    let mut now = 0.0;
    let mut steps = 0;

    while now < horizon {
        let share = fair_share(jobs, now, budget, verbosity)?;
        let next_arrival = jobs
            .iter()
            .map(|job| job.arrival)
            .filter(|&arrival| arrival > now)
            .fold(horizon, f64::min);

        let step = (next_arrival - now).min(share.valid_for).max(MIN_STEP_SECS);
        let end = (now + step).min(horizon);
        let elapsed = end - now;

        for &(i, fraction) in &share.fractions {
            jobs[i].charge(fraction, elapsed);
        }

        log_steps!(
            verbosity,
            "    step {:.1}s -> {:.1}s: {} jobs served",
            now,
            end,
            share.fractions.len()
        );

        now = end;
        steps += 1;
    }

    Ok(steps)
}

/// Online scheduler that shares an LP-derived budget by urgency.
pub struct GreedyScheduler<S: PeakSolver = LinearProgramSolver> {
    core: SchedulerCore,
    solver: S,
    config: SchedulerConfig,
    bound_source: BoundSource,
    /// Budget chosen at each scheduled instant.
    peak_bounds: BTreeMap<NaiveDateTime, f64>,
}

impl GreedyScheduler {
    /// Greedy variant: bound from the live jobs.
    pub fn new(config: SchedulerConfig) -> Self {
        let solver = LinearProgramSolver::new(config.slot_length_secs, config.verbosity);
        Self::with_solver(config, BoundSource::LiveJobs, solver)
    }

    /// Eps variant: bound from every job as admitted.
    pub fn eps(config: SchedulerConfig) -> Self {
        let solver = LinearProgramSolver::new(config.slot_length_secs, config.verbosity);
        Self::with_solver(config, BoundSource::AdmittedJobs, solver)
    }
}

impl<S: PeakSolver> GreedyScheduler<S> {
    pub fn with_solver(config: SchedulerConfig, bound_source: BoundSource, solver: S) -> Self {
        Self {
            core: SchedulerCore::new(config.verbosity),
            solver,
            config,
            bound_source,
            peak_bounds: BTreeMap::new(),
        }
    }

    pub fn bound_source(&self) -> BoundSource {
        self.bound_source
    }

    pub fn peak_bound_at(&self, instant: NaiveDateTime) -> Option<f64> {
        self.peak_bounds.get(&instant).copied()
    }

    /// Replay the live jobs from `from` to `to` under `budget`.
    fn advance(
        &mut self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        budget: f64,
    ) -> Result<(), SchedulerError> {
        let horizon = seconds_between(from, to);
        if horizon <= 0.0 {
            return Ok(());
        }

        let mut sim: Vec<SimJob> = self
            .core
            .live_jobs()
            .iter()
            .enumerate()
            .filter(|(_, job)| job.processed_up_to < to)
            .map(|(index, job)| SimJob::new(index, job, from))
            .collect();

        let steps = simulate(&mut sim, budget, horizon, self.config.verbosity)?;
        log_steps!(
            self.config.verbosity,
            "  Replayed {} -> {} in {} steps",
            from,
            to,
            steps
        );

        let live = self.core.live_jobs_mut();
        for job in &sim {
            live[job.index].remaining_kwh = job.remaining_kwh;
        }
        Ok(())
    }

    /// min(total max rate of live jobs, slack * scale * LP peak)
    fn derive_budget(&self) -> Result<f64, SchedulerError> {
        let jobs: Vec<PeakJob> = match self.bound_source {
            BoundSource::LiveJobs => self.core.live_jobs().iter().map(PeakJob::from).collect(),
            BoundSource::AdmittedJobs => self
                .core
                .admitted_jobs()
                .iter()
                .map(PeakJob::from)
                .collect(),
        };
        let scaled_peak = self.solver.solve(&jobs)?.peak * self.config.scale_factor;
        let total_max: f64 = self.core.live_jobs().iter().map(|job| job.max_rate_kw).sum();
        Ok(total_max.min(self.config.peak_slack * scaled_peak))
    }

    /// Rates the fair-share policy assigns at `instant` under `budget`.
    fn rates_at_instant(
        &self,
        instant: NaiveDateTime,
        budget: f64,
    ) -> Result<FxHashMap<JobKey, f64>, SchedulerError> {
        let sim: Vec<SimJob> = self
            .core
            .live_jobs()
            .iter()
            .enumerate()
            .map(|(index, job)| SimJob::new(index, job, instant))
            .collect();
        let share = fair_share(&sim, 0.0, budget, self.config.verbosity)?;

        let mut rates: FxHashMap<JobKey, f64> = sim
            .iter()
            .filter(|job| job.is_present(0.0))
            .map(|job| (job.key, 0.0))
            .collect();
        for (i, fraction) in share.fractions {
            rates.insert(sim[i].key, fraction * sim[i].max_rate_kw);
        }
        Ok(rates)
    }
}

impl<S: PeakSolver> Scheduler for GreedyScheduler<S> {
    fn core(&self) -> &SchedulerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SchedulerCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        match self.bound_source {
            BoundSource::LiveJobs => "Greedy scheduler",
            BoundSource::AdmittedJobs => "Eps scheduler",
        }
    }

    fn allocate(&mut self, instant: NaiveDateTime) -> Result<Allocation, SchedulerError> {
        if let Some(last) = self.core.last_schedule_time() {
            if let Some(&budget) = self.peak_bounds.get(&last) {
                self.advance(last, instant, budget)?;
            }
        }

        let outcome = self.core.sweep(instant);
        let budget = self.derive_budget()?;
        self.peak_bounds.insert(instant, budget);
        let rates = self.rates_at_instant(instant, budget)?;

        log_decisions!(
            self.config.verbosity,
            "{} at {}: budget {:.3} kW, drawing {:.3} kW across {} live jobs ({} finished, {} expired)",
            self.name(),
            instant,
            budget,
            rates.values().sum::<f64>(),
            self.core.live_jobs().len(),
            outcome.completed,
            outcome.expired
        );

        Ok(Allocation::Rates(rates))
    }

    fn peak_bounds(&self) -> Option<&BTreeMap<NaiveDateTime, f64>> {
        Some(&self.peak_bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobRequest;
    use crate::peak::{PeakSolution, PeakSolverError};
    use chrono::{Duration, NaiveDate};

    const TOL: f64 = 1e-6;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 4, 18)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn request(
        id: &str,
        arrival: NaiveDateTime,
        deadline: NaiveDateTime,
        demand: f64,
        rate: f64,
    ) -> JobRequest {
        JobRequest::new(id.to_string(), arrival, deadline, demand, rate, None)
    }

    fn remaining(scheduler: &impl Scheduler, id: &str) -> f64 {
        scheduler
            .core()
            .live_jobs()
            .iter()
            .find(|job| job.id == id)
            .map(|job| job.remaining_kwh)
            .unwrap()
    }

    fn rate(scheduler: &impl Scheduler, instant: NaiveDateTime, id: &str) -> f64 {
        scheduler
            .core()
            .rates_at(instant)
            .unwrap()
            .into_iter()
            .find(|(job_id, _)| job_id == id)
            .map(|(_, rate)| rate)
            .unwrap()
    }

    /// Solver returning a constant peak, to pin budgets in tests.
    struct FixedPeak(f64);

    impl PeakSolver for FixedPeak {
        fn solve(&self, _jobs: &[PeakJob]) -> Result<PeakSolution, PeakSolverError> {
            Ok(PeakSolution {
                peak: self.0,
                slot_rates: BTreeMap::new(),
            })
        }
    }

    struct Infeasible;

    impl PeakSolver for Infeasible {
        fn solve(&self, _jobs: &[PeakJob]) -> Result<PeakSolution, PeakSolverError> {
            Err(PeakSolverError::Infeasible)
        }
    }

    fn reference_batch(config: SchedulerConfig) -> GreedyScheduler {
        let mut scheduler = GreedyScheduler::new(config);
        scheduler
            .add_job(&request("j1", at(0, 0), at(2, 15), 3.0, 2.0))
            .unwrap();
        scheduler
            .add_job(&request("j2", at(0, 0), at(3, 0), 6.0, 2.0))
            .unwrap();
        scheduler
    }

    #[test]
    fn test_budget_capped_by_total_max_rate() {
        let mut scheduler = reference_batch(SchedulerConfig::default());
        scheduler.schedule(at(0, 0)).unwrap();

        // 1.4 * 10/3 exceeds the 4 kW the two jobs can draw.
        assert!((scheduler.peak_bound_at(at(0, 0)).unwrap() - 4.0).abs() < TOL);
        assert!((scheduler.total_charging_rate_at(at(0, 0)).unwrap() - 4.0).abs() < TOL);
        assert!((rate(&scheduler, at(0, 0), "j1") - 2.0).abs() < TOL);
        assert!((rate(&scheduler, at(0, 0), "j2") - 2.0).abs() < TOL);
    }

    #[test]
    fn test_scaled_budget_serves_most_urgent_first() {
        let mut scheduler = reference_batch(SchedulerConfig::with_scale(0.5));
        scheduler.schedule(at(0, 0)).unwrap();

        let bound = 1.4 * 0.5 * 10.0 / 3.0;
        assert!((scheduler.peak_bound_at(at(0, 0)).unwrap() - bound).abs() < TOL);
        assert!(scheduler.total_charging_rate_at(at(0, 0)).unwrap() <= bound + 1e-3);
        // j2 has no laxity and is served in full; j1 gets what is left.
        assert!((rate(&scheduler, at(0, 0), "j2") - 2.0).abs() < TOL);
        assert!((rate(&scheduler, at(0, 0), "j1") - (bound - 2.0)).abs() < TOL);
    }

    #[test]
    fn test_replay_delivers_energy_and_rebounds() {
        let mut scheduler = reference_batch(SchedulerConfig::default());
        scheduler.schedule(at(0, 0)).unwrap();
        scheduler.schedule(at(1, 0)).unwrap();

        assert!((remaining(&scheduler, "j1") - 1.0).abs() < TOL);
        assert!((remaining(&scheduler, "j2") - 4.0).abs() < TOL);

        // From 1:00: j2 needs its full 2 kW, j1 spreads 1 kWh over 1.25h.
        let bound = scheduler.peak_bound_at(at(1, 0)).unwrap();
        assert!((bound - 1.4 * 2.8).abs() < 1e-5);

        let j1 = &scheduler.core().live_jobs()[0];
        assert_eq!(j1.arrival_time, at(0, 0));
        assert_eq!(j1.processed_up_to, at(1, 0));
    }

    #[test]
    fn test_tied_jobs_share_equally() {
        let mut scheduler = GreedyScheduler::new(SchedulerConfig::default());
        scheduler
            .add_job(&request("a", at(0, 0), at(4, 0), 4.0, 2.0))
            .unwrap();
        scheduler
            .add_job(&request("b", at(0, 0), at(4, 0), 4.0, 2.0))
            .unwrap();
        scheduler.schedule(at(0, 0)).unwrap();

        // LP peak 2 kW -> budget 2.8 kW over 4 kW of capacity.
        assert!((rate(&scheduler, at(0, 0), "a") - 1.4).abs() < TOL);
        assert!((rate(&scheduler, at(0, 0), "b") - 1.4).abs() < TOL);

        scheduler.schedule(at(1, 0)).unwrap();
        assert!((remaining(&scheduler, "a") - 2.6).abs() < TOL);
        assert!((remaining(&scheduler, "b") - 2.6).abs() < TOL);
    }

    #[test]
    fn test_full_rate_batch_catches_fractional_batch() {
        let config = SchedulerConfig {
            peak_slack: 1.0,
            ..SchedulerConfig::default()
        };
        let mut scheduler =
            GreedyScheduler::with_solver(config, BoundSource::LiveJobs, FixedPeak(2.2));
        scheduler
            .add_job(&request("a", at(0, 0), at(4, 0), 4.0, 2.0))
            .unwrap();
        scheduler
            .add_job(&request("b", at(0, 0), at(4, 0), 0.5, 2.0))
            .unwrap();
        scheduler.schedule(at(0, 0)).unwrap();
        assert!((rate(&scheduler, at(0, 0), "a") - 2.0).abs() < TOL);
        assert!((rate(&scheduler, at(0, 0), "b") - 0.2).abs() < TOL);

        // a's progress deadline (2h) meets b's (3.75h) after 7000s; both then
        // split the 2.2 kW budget for the remaining 200s.
        scheduler.schedule(at(2, 0)).unwrap();
        assert!((remaining(&scheduler, "a") - 0.05).abs() < 1e-4);
        assert!((remaining(&scheduler, "b") - 0.05).abs() < 1e-4);
    }

    #[test]
    fn test_arrival_splits_replay_interval() {
        let mut scheduler = GreedyScheduler::new(SchedulerConfig::default());
        scheduler
            .add_job(&request("a", at(0, 0), at(4, 0), 2.0, 2.0))
            .unwrap();
        scheduler.schedule(at(0, 0)).unwrap();
        assert!((scheduler.peak_bound_at(at(0, 0)).unwrap() - 0.7).abs() < TOL);

        scheduler
            .add_job(&request("b", at(0, 30), at(2, 0), 1.0, 2.0))
            .unwrap();
        scheduler.schedule(at(1, 0)).unwrap();

        // a alone for 30 min, then the more urgent b takes the whole budget.
        assert!((remaining(&scheduler, "a") - 1.65).abs() < TOL);
        assert!((remaining(&scheduler, "b") - 0.65).abs() < TOL);
    }

    #[test]
    fn test_expired_job_counted_unfinished() {
        let mut scheduler = GreedyScheduler::new(SchedulerConfig::default());
        scheduler
            .add_job(&request("short", at(0, 0), at(1, 0), 5.0, 2.0))
            .unwrap();
        scheduler.schedule(at(0, 0)).unwrap();
        assert!((scheduler.peak_bound_at(at(0, 0)).unwrap() - 2.0).abs() < TOL);

        scheduler.schedule(at(1, 0)).unwrap();

        assert!(scheduler.core().live_jobs().is_empty());
        assert_eq!(scheduler.stats().jobs_admitted, 1);
        assert_eq!(scheduler.stats().jobs_unfinished, 1);
        assert_eq!(scheduler.peak_bound_at(at(1, 0)), Some(0.0));
        assert_eq!(scheduler.total_charging_rate_at(at(1, 0)), Some(0.0));
    }

    #[test]
    fn test_completed_job_removed() {
        let mut scheduler = GreedyScheduler::new(SchedulerConfig::default());
        scheduler
            .add_job(&request("ev", at(0, 0), at(2, 0), 1.0, 2.0))
            .unwrap();
        scheduler.schedule(at(0, 0)).unwrap();
        scheduler.schedule(at(1, 0)).unwrap();
        assert!((remaining(&scheduler, "ev") - 0.3).abs() < TOL);
        assert!((scheduler.peak_bound_at(at(1, 0)).unwrap() - 0.42).abs() < TOL);

        scheduler.schedule(at(2, 0)).unwrap();
        assert!(scheduler.core().live_jobs().is_empty());
        assert_eq!(scheduler.stats().jobs_unfinished, 0);
    }

    #[test]
    fn test_eps_bounds_from_admitted_jobs() {
        let mut greedy = GreedyScheduler::new(SchedulerConfig::default());
        let mut eps = GreedyScheduler::eps(SchedulerConfig::default());
        for scheduler in [&mut greedy, &mut eps] {
            scheduler
                .add_job(&request("ev", at(0, 0), at(2, 0), 1.0, 2.0))
                .unwrap();
            scheduler.schedule(at(0, 0)).unwrap();
            scheduler.schedule(at(1, 0)).unwrap();
        }

        assert_eq!(greedy.name(), "Greedy scheduler");
        assert_eq!(eps.name(), "Eps scheduler");
        assert_eq!(eps.bound_source(), BoundSource::AdmittedJobs);
        assert!((greedy.peak_bound_at(at(1, 0)).unwrap() - 0.42).abs() < TOL);
        assert!((eps.peak_bound_at(at(1, 0)).unwrap() - 0.7).abs() < TOL);
    }

    #[test]
    fn test_schedule_out_of_order_rejected() {
        let mut scheduler = reference_batch(SchedulerConfig::default());
        scheduler.schedule(at(1, 0)).unwrap();
        let err = scheduler.schedule(at(0, 30)).unwrap_err();
        assert!(matches!(err, SchedulerError::ScheduleOrder { .. }));
        assert!(scheduler.total_charging_rate_at(at(0, 30)).is_none());
    }

    #[test]
    fn test_solver_failure_propagates() {
        let mut scheduler = GreedyScheduler::with_solver(
            SchedulerConfig::default(),
            BoundSource::LiveJobs,
            Infeasible,
        );
        scheduler
            .add_job(&request("ev", at(0, 0), at(2, 0), 1.0, 2.0))
            .unwrap();
        assert_eq!(
            scheduler.schedule(at(0, 0)),
            Err(SchedulerError::Solver(PeakSolverError::Infeasible))
        );
    }

    #[test]
    fn test_day_of_arrivals_invariants() {
        let arrivals = [
            request("s1", at(0, 0), at(3, 0), 6.0, 3.0),
            request("s2", at(0, 20), at(2, 0), 4.0, 3.0),
            request("s3", at(0, 45), at(5, 0), 10.0, 6.6),
            // Needs 1.5h at full rate inside a 30 min window.
            request("s4", at(1, 10), at(1, 40), 3.0, 2.0),
            request("s5", at(2, 0), at(6, 0), 8.0, 7.0),
        ];

        for config in [SchedulerConfig::default(), SchedulerConfig::with_scale(1.1)] {
            let mut schedulers = [
                GreedyScheduler::new(config.clone()),
                GreedyScheduler::eps(config.clone()),
            ];
            for scheduler in schedulers.iter_mut() {
                let mut next = 0;
                let mut last_remaining: FxHashMap<String, f64> = FxHashMap::default();

                for step in 0..=24 {
                    let instant = at(0, 0) + Duration::minutes(15 * step);
                    while next < arrivals.len() && arrivals[next].arrival_time <= instant {
                        scheduler.add_job(&arrivals[next]).unwrap();
                        next += 1;
                    }
                    scheduler.schedule(instant).unwrap();

                    let total = scheduler.total_charging_rate_at(instant).unwrap();
                    let bound = scheduler.peak_bound_at(instant).unwrap();
                    assert!(total <= bound + 1e-9, "{} > {} at {}", total, bound, instant);

                    for job in scheduler.core().live_jobs() {
                        if let Some(&before) = last_remaining.get(&job.id) {
                            assert!(job.remaining_kwh <= before + 1e-12);
                        }
                        assert!(job.remaining_kwh >= 0.0);
                        last_remaining.insert(job.id.clone(), job.remaining_kwh);
                    }
                }

                assert!(scheduler.core().live_jobs().is_empty());
                let retired = scheduler.core().retired_jobs();
                assert_eq!(retired.len(), arrivals.len());

                // Every job leaves either charged or counted as unfinished.
                for r in retired {
                    assert!(r.job.remaining_kwh <= last_remaining[&r.job.id] + 1e-12);
                    if r.missed_deadline() {
                        assert!(r.job.remaining_kwh > DEMAND_EPSILON);
                        assert!(r.job.deadline <= r.retired_at);
                    } else {
                        assert!(r.job.remaining_kwh <= DEMAND_EPSILON);
                    }
                }
                let missed = retired.iter().filter(|r| r.missed_deadline()).count();

                let stats = scheduler.stats();
                assert_eq!(stats.jobs_admitted, 5);
                assert_eq!(stats.jobs_unfinished, missed);
                // s4 cannot be served in its window.
                let s4 = retired.iter().find(|r| r.job.id == "s4").unwrap();
                assert!(s4.missed_deadline());
            }
        }
    }
}
