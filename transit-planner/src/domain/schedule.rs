//! Routes, trips, stop times and transfers.
//!
//! These are plain read-only records owned by the timetable store. Times on
//! a [`StopTime`] stay as feed text; the engines parse them through
//! [`parse_time`](super::parse_time) and treat failures as bad data.

use super::{RouteId, StopId, TripId};

/// A route, e.g. one bus line.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: RouteId,
    pub agency_id: Option<String>,
    pub short_name: String,
    pub long_name: String,
}

impl Route {
    pub fn new(id: RouteId, short_name: impl Into<String>) -> Self {
        Self {
            id,
            agency_id: None,
            short_name: short_name.into(),
            long_name: String::new(),
        }
    }

    /// Human-readable label, preferring the short name.
    pub fn display_name(&self) -> &str {
        if self.short_name.is_empty() {
            &self.long_name
        } else {
            &self.short_name
        }
    }
}

/// One scheduled run of a route.
///
/// The calling pattern lives in the trip's stop times, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    pub id: TripId,
    pub route_id: RouteId,
}

impl Trip {
    pub fn new(id: TripId, route_id: RouteId) -> Self {
        Self { id, route_id }
    }
}

/// A scheduled arrival/departure of one trip at one stop.
#[derive(Debug, Clone, PartialEq)]
pub struct StopTime {
    pub trip_id: TripId,
    pub stop_id: StopId,
    pub sequence: u32,
    pub arrival_time: String,
    pub departure_time: String,
}

impl StopTime {
    pub fn new(
        trip_id: TripId,
        stop_id: StopId,
        sequence: u32,
        arrival_time: impl Into<String>,
        departure_time: impl Into<String>,
    ) -> Self {
        Self {
            trip_id,
            stop_id,
            sequence,
            arrival_time: arrival_time.into(),
            departure_time: departure_time.into(),
        }
    }
}

/// Error returned when a transfer duration is unusable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid transfer {from} -> {to}: duration {minutes} must be finite and non-negative")]
pub struct InvalidTransfer {
    pub from: StopId,
    pub to: StopId,
    pub minutes: f64,
}

/// A directed foot connection with a minimum duration.
///
/// Transfers may be asymmetric; A→B says nothing about B→A.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub from: StopId,
    pub to: StopId,
    min_transfer_mins: f64,
}

impl Transfer {
    /// Create a transfer. The duration must be finite and non-negative.
    pub fn new(from: StopId, to: StopId, min_transfer_mins: f64) -> Result<Self, InvalidTransfer> {
        if !min_transfer_mins.is_finite() || min_transfer_mins < 0.0 {
            return Err(InvalidTransfer {
                from,
                to,
                minutes: min_transfer_mins,
            });
        }
        Ok(Self {
            from,
            to,
            min_transfer_mins,
        })
    }

    /// Minimum transfer duration in minutes.
    pub fn min_transfer_mins(&self) -> f64 {
        self.min_transfer_mins
    }

    /// Returns true for a transfer back to the same stop.
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}
