//! Edge expansion shared by both engines.
//!
//! Turning a stop's scheduled events and transfers into candidate arrivals
//! is the same work whichever engine drives it. Bad feed data (unresolved
//! trips or routes, unparseable times, calls that arrive before they depart)
//! is counted in `skipped` and otherwise ignored.

use tracing::trace;

use crate::domain::{Minutes, StopId, StopTime, Transfer, parse_time};
use crate::timetable::StopTimeEvent;

/// A candidate arrival at `stop`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Candidate {
    pub stop: StopId,
    pub arrival: Minutes,
}

/// Arrivals downstream of `event` for a traveller ready to board at `ready`.
///
/// The event is boardable when its departure is no earlier than `ready`.
/// Each later call of the trip yields its absolute arrival time.
pub(crate) fn ride(event: &StopTimeEvent, ready: Minutes, skipped: &mut usize) -> Vec<Candidate> {
    if !event.is_resolved() {
        *skipped += 1;
        trace!(
            stop = %event.stop_time.stop_id,
            trip = %event.stop_time.trip_id,
            "Skipping stop time with unresolved trip or route"
        );
        return Vec::new();
    }

    let Ok(departure) = parse_time(&event.stop_time.departure_time) else {
        *skipped += 1;
        return Vec::new();
    };
    if departure < ready {
        return Vec::new();
    }

    event
        .downstream()
        .filter_map(|call| match arrival_of(call) {
            Some(arrival) if arrival >= departure => Some(Candidate {
                stop: call.stop_id.clone(),
                arrival,
            }),
            _ => {
                *skipped += 1;
                None
            }
        })
        .collect()
}

/// Downstream candidates under the clock-increment cost model.
///
/// Each later call adds its arrival clock value to `cost`. There is no
/// boarding check because `cost` is not a time of day under this model.
pub(crate) fn ride_clock_increment(
    event: &StopTimeEvent,
    cost: Minutes,
    skipped: &mut usize,
) -> Vec<Candidate> {
    if !event.is_resolved() {
        *skipped += 1;
        return Vec::new();
    }

    event
        .downstream()
        .filter_map(|call| match arrival_of(call) {
            Some(clock) => Some(Candidate {
                stop: call.stop_id.clone(),
                arrival: cost + clock,
            }),
            None => {
                *skipped += 1;
                None
            }
        })
        .collect()
}

/// Arrival via a transfer, or `None` for a self transfer.
pub(crate) fn walk(transfer: &Transfer, ready: Minutes) -> Option<Candidate> {
    if transfer.is_self_loop() || !ready.is_finite() {
        return None;
    }
    Some(Candidate {
        stop: transfer.to.clone(),
        arrival: ready + transfer.min_transfer_mins(),
    })
}

/// Arrival time of a call, falling back to its departure when the arrival
/// field is blank (common for non-timepoint rows).
fn arrival_of(call: &StopTime) -> Option<Minutes> {
    let text = if call.arrival_time.trim().is_empty() {
        &call.departure_time
    } else {
        &call.arrival_time
    };
    parse_time(text).ok()
}
