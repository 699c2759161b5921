//! Best-first label-setting search (Dijkstra / A*).
//!
//! A single open set ordered by cost plus heuristic. Relaxing a stop pushes
//! a fresh entry instead of updating one in place, so the heap holds stale
//! duplicates; an entry for an already-settled stop is discarded when
//! popped. Popping the destination ends the search.
//!
//! # Cost models
//!
//! [`CostModel::AbsoluteArrival`] treats cost as the arrival time of day and
//! only boards departures at or after it, which makes the result the
//! earliest arrival and identical to the round engine's.
//!
//! [`CostModel::ClockIncrement`] adds each downstream call's arrival clock
//! value to the running cost. It is kept as an alternative edge weighting:
//! the weights are non-negative so the search is well formed, but the cost
//! it minimises is not a time of day and its answers generally differ from
//! the round engine's.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use futures::future::try_join;
use tracing::{debug, trace};

use crate::domain::{Minutes, StopId};
use crate::timetable::TimetablePort;

use super::config::SearchConfig;
use super::expand::{self, Candidate};
use super::fetch::{self, KnownStops};
use super::heuristic::{Heuristic, ZeroHeuristic};
use super::labels::LabelStore;
use super::search::{RouteQuery, SearchError, SearchStats, SearchStrategy};

/// How a scheduled ride contributes to the running cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostModel {
    /// Cost is the absolute arrival time of day.
    #[default]
    AbsoluteArrival,
    /// Cost grows by the arrival clock value of each ride.
    ClockIncrement,
}

/// Open-set entry, ordered by key then cost then stop.
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueueEntry {
    key: Minutes,
    cost: Minutes,
    stop: StopId,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.cost.cmp(&other.cost))
            .then_with(|| self.stop.cmp(&other.stop))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Best-first engine, generic over its heuristic.
#[derive(Debug, Clone, Default)]
pub struct BestFirst<H = ZeroHeuristic> {
    heuristic: H,
    cost_model: CostModel,
}

impl BestFirst<ZeroHeuristic> {
    /// Plain Dijkstra with the absolute-arrival cost model.
    pub fn dijkstra() -> Self {
        Self::default()
    }
}

impl<H: Heuristic> BestFirst<H> {
    /// A* with the given heuristic.
    pub fn with_heuristic(heuristic: H) -> Self {
        Self {
            heuristic,
            cost_model: CostModel::default(),
        }
    }

    /// Switch the cost model.
    pub fn cost_model(mut self, cost_model: CostModel) -> Self {
        self.cost_model = cost_model;
        self
    }

    fn entry(&self, stop: StopId, cost: Minutes, destination: &StopId) -> Reverse<QueueEntry> {
        let key = cost + self.heuristic.estimate(&stop, destination);
        Reverse(QueueEntry { key, cost, stop })
    }
}

impl<H: Heuristic> SearchStrategy for BestFirst<H> {
    fn name(&self) -> &'static str {
        "best-first"
    }

    async fn run<P: TimetablePort>(
        &self,
        port: &P,
        query: &RouteQuery,
        config: &SearchConfig,
        labels: &mut LabelStore,
    ) -> Result<SearchStats, SearchError> {
        let mut stats = SearchStats::default();
        let mut known = KnownStops::new();
        known.insert(query.origin.clone());
        known.insert(query.destination.clone());

        labels.init_origin(&query.origin, query.departure);
        let mut open: BinaryHeap<Reverse<QueueEntry>> = BinaryHeap::new();
        open.push(self.entry(query.origin.clone(), query.departure, &query.destination));

        while let Some(Reverse(QueueEntry { cost, stop, .. })) = open.pop() {
            if labels.is_settled(&stop) {
                continue;
            }
            if stats.iterations >= config.max_iterations {
                return Err(SearchError::SearchBudgetExceeded {
                    limit: config.max_iterations,
                    unit: "iterations",
                });
            }
            stats.iterations += 1;
            labels.settle(&stop);

            if stop == query.destination {
                stats.relaxations = labels.relaxations();
                stats.labelled_stops = labels.len();
                debug!(
                    iterations = stats.iterations,
                    skipped = stats.skipped,
                    cost = %cost,
                    "Best-first reached destination"
                );
                return Ok(stats);
            }

            let single = std::slice::from_ref(&stop);
            let mut fetch_stats = SearchStats::default();
            let mut transfer_stats = SearchStats::default();
            let (mut events, mut transfers) = try_join(
                fetch::stop_times(port, single, config, &mut fetch_stats),
                fetch::transfers(port, single, config, &mut transfer_stats),
            )
            .await?;
            stats.fetches += fetch_stats.fetches + transfer_stats.fetches;

            let events = events.pop().map(|(_, e)| e).unwrap_or_default();
            let transfers = transfers.pop().map(|(_, t)| t).unwrap_or_default();

            let mut candidates: Vec<Candidate> = Vec::new();
            for event in &events {
                let rides = match self.cost_model {
                    CostModel::AbsoluteArrival => expand::ride(event, cost, &mut stats.skipped),
                    CostModel::ClockIncrement => {
                        expand::ride_clock_increment(event, cost, &mut stats.skipped)
                    }
                };
                candidates.extend(rides);
            }
            candidates.extend(transfers.iter().filter_map(|t| expand::walk(t, cost)));

            known
                .resolve(port, candidates.iter().map(|c| &c.stop), config, &mut stats)
                .await?;

            for candidate in candidates {
                if !known.exists(&candidate.stop) {
                    stats.skipped += 1;
                    continue;
                }
                if labels.is_settled(&candidate.stop) {
                    continue;
                }
                if labels.relax(&candidate.stop, candidate.arrival, &stop) {
                    trace!(
                        stop = %candidate.stop,
                        from = %stop,
                        cost = %candidate.arrival,
                        "Pushed"
                    );
                    open.push(self.entry(candidate.stop, candidate.arrival, &query.destination));
                }
            }
        }

        stats.relaxations = labels.relaxations();
        stats.labelled_stops = labels.len();
        debug!(
            iterations = stats.iterations,
            skipped = stats.skipped,
            "Best-first exhausted without reaching destination"
        );
        Err(SearchError::NoRouteFound {
            origin: query.origin.clone(),
            destination: query.destination.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(s: &str) -> StopId {
        StopId::parse(s).unwrap()
    }

    fn mins(m: f64) -> Minutes {
        Minutes::new(m).unwrap()
    }

    #[test]
    fn queue_pops_lowest_key_first() {
        let mut heap = BinaryHeap::new();
        heap.push(Reverse(QueueEntry {
            key: mins(30.0),
            cost: mins(10.0),
            stop: stop("A"),
        }));
        heap.push(Reverse(QueueEntry {
            key: mins(20.0),
            cost: mins(20.0),
            stop: stop("B"),
        }));
        heap.push(Reverse(QueueEntry {
            key: mins(20.0),
            cost: mins(15.0),
            stop: stop("C"),
        }));

        let order: Vec<String> = std::iter::from_fn(|| heap.pop())
            .map(|Reverse(e)| e.stop.to_string())
            .collect();
        assert_eq!(order, vec!["C", "B", "A"]);
    }

    #[test]
    fn default_is_dijkstra_with_absolute_costs() {
        let engine = BestFirst::dijkstra();
        assert_eq!(engine.cost_model, CostModel::AbsoluteArrival);
        let engine = engine.cost_model(CostModel::ClockIncrement);
        assert_eq!(engine.cost_model, CostModel::ClockIncrement);
        assert_eq!(engine.name(), "best-first");
    }
}
