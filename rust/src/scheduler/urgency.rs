//! Progress-deadline ordering and fair-share batching.
//!
//! A job's progress deadline is the latest instant at which it could start
//! charging at full rate and still finish on time. Smaller = more urgent.
//! Times here are seconds relative to the simulation origin.

use std::cmp::Ordering;

use crate::config::URGENCY_TIE_SECS;
use crate::models::SECS_PER_HOUR;

use super::core::SchedulerError;

/// Deadline minus the full-rate time still needed.
#[inline]
pub fn progress_deadline(deadline_secs: f64, remaining_kwh: f64, max_rate_kw: f64) -> f64 {
    deadline_secs - remaining_kwh / max_rate_kw * SECS_PER_HOUR
}

/// Compare f64 values for sorting, treating incomparable values as equal.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Sort job indices most urgent first; equal urgency keeps admission order.
pub fn sort_by_urgency(indices: &mut [usize], progress: impl Fn(usize) -> f64) {
    indices.sort_by(|&a, &b| cmp_f64(progress(a), progress(b)).then(a.cmp(&b)));
}

/// Jobs sharing (within `URGENCY_TIE_SECS`) one progress deadline.
#[derive(Clone, Debug, PartialEq)]
pub struct UrgencyBatch {
    /// Progress deadline of the batch's first member.
    pub progress_deadline: f64,
    pub members: Vec<usize>,
}

/// Split an urgency-sorted index list into batches.
///
/// Each job joins the current batch if it lies within the tie window of the
/// batch's first member, and opens a new batch if it lies beyond it. A job
/// before the window means the input was not sorted.
pub fn batch_by_urgency(
    ordered: &[usize],
    progress: impl Fn(usize) -> f64,
) -> Result<Vec<UrgencyBatch>, SchedulerError> {
    let mut batches: Vec<UrgencyBatch> = Vec::new();

    for &idx in ordered {
        let pd = progress(idx);
        match batches.last_mut() {
            Some(batch) if pd > batch.progress_deadline + URGENCY_TIE_SECS => {
                batches.push(UrgencyBatch {
                    progress_deadline: pd,
                    members: vec![idx],
                });
            }
            Some(batch) if pd > batch.progress_deadline - URGENCY_TIE_SECS => {
                batch.members.push(idx);
            }
            Some(batch) => {
                return Err(SchedulerError::UrgencyOrder {
                    previous: batch.progress_deadline,
                    found: pd,
                });
            }
            None => batches.push(UrgencyBatch {
                progress_deadline: pd,
                members: vec![idx],
            }),
        }
    }

    Ok(batches)
}
