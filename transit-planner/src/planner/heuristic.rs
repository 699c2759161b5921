//! Lower-bound estimates for the best-first engine.
//!
//! A heuristic must never overestimate the remaining travel time, otherwise
//! the best-first engine may settle the destination too early and report a
//! later arrival than the optimum. Stop identifiers are opaque feed strings,
//! so anything computed from the ids themselves carries no such guarantee;
//! the only informed estimate offered here is geographic.

use std::collections::HashMap;

use crate::domain::{Coordinate, Minutes, StopId};

/// Admissible lower bound on the minutes needed from `from` to `to`.
pub trait Heuristic: Send + Sync {
    fn estimate(&self, from: &StopId, to: &StopId) -> Minutes;
}

/// Always zero, which turns A* into plain Dijkstra.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroHeuristic;

impl Heuristic for ZeroHeuristic {
    fn estimate(&self, _from: &StopId, _to: &StopId) -> Minutes {
        Minutes::ZERO
    }
}

/// Straight-line distance divided by a top speed.
///
/// Admissible as long as no trip or transfer in the network covers ground
/// faster than `max_speed_kmh`. Stops without a coordinate estimate zero.
#[derive(Debug, Clone)]
pub struct GreatCircle {
    coordinates: HashMap<StopId, Coordinate>,
    max_speed_kmh: f64,
}

impl GreatCircle {
    /// Create the heuristic. A non-positive or non-finite speed disables it
    /// (every estimate is zero).
    pub fn new(coordinates: HashMap<StopId, Coordinate>, max_speed_kmh: f64) -> Self {
        Self {
            coordinates,
            max_speed_kmh,
        }
    }
}

impl Heuristic for GreatCircle {
    fn estimate(&self, from: &StopId, to: &StopId) -> Minutes {
        if !self.max_speed_kmh.is_finite() || self.max_speed_kmh <= 0.0 {
            return Minutes::ZERO;
        }
        let (Some(a), Some(b)) = (self.coordinates.get(from), self.coordinates.get(to)) else {
            return Minutes::ZERO;
        };
        let hours = a.distance_km(*b) / self.max_speed_kmh;
        Minutes::new(hours * 60.0).unwrap_or(Minutes::ZERO)
    }
}
