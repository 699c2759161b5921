//! Per-search label state.
//!
//! A [`LabelStore`] is created at the start of one search and dropped at its
//! end. It records, per stop, the best arrival found so far and the stop it
//! was reached from. Labels only ever improve: [`LabelStore::relax`] accepts a
//! candidate only when it is strictly earlier, which is also what keeps the
//! round engine from looping and the predecessor chains acyclic.

use std::collections::{HashMap, HashSet};

use crate::domain::{Minutes, StopId};

/// Best-known arrival at one stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub arrival: Minutes,
    /// `None` only for the origin.
    pub predecessor: Option<StopId>,
}

/// Arrival labels, predecessors and settled markers for one search.
#[derive(Debug, Default)]
pub struct LabelStore {
    labels: HashMap<StopId, Label>,
    settled: HashSet<StopId>,
    relaxations: usize,
}

impl LabelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label the origin with the departure time and no predecessor.
    pub fn init_origin(&mut self, origin: &StopId, departure: Minutes) {
        self.labels.insert(
            origin.clone(),
            Label {
                arrival: departure,
                predecessor: None,
            },
        );
    }

    /// Best arrival at `stop`, or [`Minutes::INFINITY`] if unknown.
    pub fn arrival(&self, stop: &StopId) -> Minutes {
        self.labels
            .get(stop)
            .map_or(Minutes::INFINITY, |l| l.arrival)
    }

    pub fn get(&self, stop: &StopId) -> Option<&Label> {
        self.labels.get(stop)
    }

    fn is_origin(&self, stop: &StopId) -> bool {
        self.labels.get(stop).is_some_and(|l| l.predecessor.is_none())
    }

    pub fn contains(&self, stop: &StopId) -> bool {
        self.labels.contains_key(stop)
    }

    /// Predecessor of `stop`. `None` both for the origin and unknown stops.
    pub fn predecessor(&self, stop: &StopId) -> Option<&StopId> {
        self.labels.get(stop).and_then(|l| l.predecessor.as_ref())
    }

    /// Improve the label of `stop` if `arrival` is strictly earlier.
    ///
    /// Returns true when the label changed. A candidate reached from the
    /// stop itself is refused, so a zero-length self transfer can never turn
    /// a stop into its own predecessor. The origin label is fixed.
    pub fn relax(&mut self, stop: &StopId, arrival: Minutes, from: &StopId) -> bool {
        if stop == from || arrival >= self.arrival(stop) || self.is_origin(stop) {
            return false;
        }
        self.labels.insert(
            stop.clone(),
            Label {
                arrival,
                predecessor: Some(from.clone()),
            },
        );
        self.relaxations += 1;
        true
    }

    /// Give a label-less stop a baseline label.
    ///
    /// Does nothing if the stop already has one. Returns true when it seeded.
    pub fn seed(&mut self, stop: &StopId, arrival: Minutes, from: &StopId) -> bool {
        if self.labels.contains_key(stop) || stop == from {
            return false;
        }
        self.labels.insert(
            stop.clone(),
            Label {
                arrival,
                predecessor: Some(from.clone()),
            },
        );
        true
    }

    /// Mark `stop` settled. Returns false if it already was.
    pub fn settle(&mut self, stop: &StopId) -> bool {
        self.settled.insert(stop.clone())
    }

    pub fn is_settled(&self, stop: &StopId) -> bool {
        self.settled.contains(stop)
    }

    /// Number of labelled stops.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of successful relaxations so far.
    pub fn relaxations(&self) -> usize {
        self.relaxations
    }
}
