//! Round-based relaxation (RAPTOR-style).
//!
//! Each round extends every known journey by one more trip or transfer.
//! Round `n` starts from the stops whose labels improved in round `n - 1`
//! (the marked stops), fetches their stop times and transfers, and relaxes
//! every reachable stop. The search ends when a round improves nothing.
//!
//! Termination relies on the strict-improvement rule in
//! [`LabelStore::relax`]: a stop is only re-marked when its arrival gets
//! strictly earlier, and arrivals are bounded below by the departure time.
//! `SearchConfig::max_rounds` caps the loop regardless.
//!
//! When two edges produce exactly the same arrival at a stop in one round,
//! the predecessor is whichever was relaxed first. That order follows the
//! fetch order and is not part of the contract.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::domain::StopId;
use crate::timetable::TimetablePort;

use super::config::SearchConfig;
use super::expand::{self, Candidate};
use super::fetch::{self, KnownStops};
use super::labels::LabelStore;
use super::search::{RouteQuery, SearchError, SearchStats, SearchStrategy};

/// Round-based relaxation engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundRelaxation;

impl SearchStrategy for RoundRelaxation {
    fn name(&self) -> &'static str {
        "round-relaxation"
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
        let mut marked: BTreeSet<StopId> = BTreeSet::from([query.origin.clone()]);

        while !marked.is_empty() {
            if stats.rounds >= config.max_rounds {
                return Err(SearchError::SearchBudgetExceeded {
                    limit: config.max_rounds,
                    unit: "rounds",
                });
            }
            stats.rounds += 1;

            // Stops marked through a transfer before any scheduled arrival is
            // known get a baseline label.
            for stop in &marked {
                labels.seed(stop, query.departure, &query.origin);
            }

            let frontier: Vec<StopId> = marked.iter().cloned().collect();
            let mut next: BTreeSet<StopId> = BTreeSet::new();

            // Scheduled trips
            let timetables = fetch::stop_times(port, &frontier, config, &mut stats).await?;
            let mut rides: Vec<(StopId, Candidate)> = Vec::new();
            for (stop, events) in &timetables {
                let ready = labels.arrival(stop);
                for event in events {
                    for candidate in expand::ride(event, ready, &mut stats.skipped) {
                        rides.push((stop.clone(), candidate));
                    }
                }
            }
            known
                .resolve(port, rides.iter().map(|(_, c)| &c.stop), config, &mut stats)
                .await?;
            relax_all(labels, &known, rides, &mut next, &mut stats);

            // Transfers, from arrivals as they stand after the trip step
            let transfers = fetch::transfers(port, &frontier, config, &mut stats).await?;
            let mut walks: Vec<(StopId, Candidate)> = Vec::new();
            for (stop, edges) in &transfers {
                let ready = labels.arrival(stop);
                walks.extend(
                    edges
                        .iter()
                        .filter_map(|t| expand::walk(t, ready))
                        .map(|c| (stop.clone(), c)),
                );
            }
            known
                .resolve(port, walks.iter().map(|(_, c)| &c.stop), config, &mut stats)
                .await?;
            relax_all(labels, &known, walks, &mut next, &mut stats);

            debug!(
                round = stats.rounds,
                frontier = frontier.len(),
                improved = next.len(),
                "Round complete"
            );

            marked = next;
        }

        stats.relaxations = labels.relaxations();
        stats.labelled_stops = labels.len();
        debug!(
            rounds = stats.rounds,
            skipped = stats.skipped,
            reached = labels.contains(&query.destination),
            "Round relaxation finished"
        );
        Ok(stats)
    }
}

/// Apply candidates in order, marking every stop that improved.
fn relax_all(
    labels: &mut LabelStore,
    known: &KnownStops,
    candidates: Vec<(StopId, Candidate)>,
    marked: &mut BTreeSet<StopId>,
    stats: &mut SearchStats,
) {
    for (from, candidate) in candidates {
        if !known.exists(&candidate.stop) {
            stats.skipped += 1;
            continue;
        }
        if labels.relax(&candidate.stop, candidate.arrival, &from) {
            trace!(
                stop = %candidate.stop,
                from = %from,
                arrival = %candidate.arrival,
                "Relaxed"
            );
            marked.insert(candidate.stop);
        }
    }
}
