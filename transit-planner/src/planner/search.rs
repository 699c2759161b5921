//! Earliest-arrival route search.
//!
//! [`Planner`] validates a query, runs one of the engines against a
//! [`TimetablePort`] and turns the resulting labels into an [`Itinerary`].
//! Each call owns a fresh [`LabelStore`], so one planner can serve any
//! number of concurrent searches.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::{InvalidId, Minutes, StopId, TimeError, parse_time};
use crate::timetable::TimetablePort;

use super::best_first::BestFirst;
use super::config::SearchConfig;
use super::heuristic::{GreatCircle, ZeroHeuristic};
use super::labels::LabelStore;
use super::path::{self, Itinerary};
use super::raptor::RoundRelaxation;
use super::result::RouteResult;

/// Error from route search.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    /// Origin or destination is blank or unknown to the timetable
    #[error("invalid stop: {0}")]
    InvalidStop(String),

    /// Departure time could not be parsed
    #[error("invalid departure time: {0}")]
    InvalidTimeFormat(#[from] TimeError),

    /// The destination was never reached
    #[error("no route found from {origin} to {destination}")]
    NoRouteFound { origin: StopId, destination: StopId },

    /// Predecessor links do not lead back to the origin
    #[error("path reconstruction failed: {0}")]
    PathReconstruction(String),

    /// Round or iteration cap hit before the search finished
    #[error("search budget exceeded: more than {limit} {unit}")]
    SearchBudgetExceeded { limit: usize, unit: &'static str },

    /// The timetable failed to answer a lookup
    #[error("failed to fetch {what} for {stop}: {message}")]
    Fetch {
        stop: StopId,
        what: &'static str,
        message: String,
    },

    /// Search timed out
    #[error("search timed out after {0:?}")]
    Timeout(Duration),
}

impl SearchError {
    /// Short machine-readable name for the error.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::InvalidStop(_) => "invalid_stop",
            SearchError::InvalidTimeFormat(_) => "invalid_time_format",
            SearchError::NoRouteFound { .. } => "no_route_found",
            SearchError::PathReconstruction(_) => "path_reconstruction",
            SearchError::SearchBudgetExceeded { .. } => "search_budget_exceeded",
            SearchError::Fetch { .. } => "fetch",
            SearchError::Timeout(_) => "timeout",
        }
    }
}

impl From<InvalidId> for SearchError {
    fn from(e: InvalidId) -> Self {
        SearchError::InvalidStop(e.to_string())
    }
}

/// Counters collected while a search runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Rounds run by the round engine.
    pub rounds: usize,

    /// Queue pops by the best-first engine.
    pub iterations: usize,

    /// Labels improved.
    pub relaxations: usize,

    /// Stop times, calls and transfers ignored as bad data.
    pub skipped: usize,

    /// Timetable lookups issued.
    pub fetches: usize,

    /// Stops holding a label when the search ended.
    pub labelled_stops: usize,
}

/// A validated route query.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteQuery {
    pub origin: StopId,
    pub destination: StopId,
    pub departure: Minutes,
    /// Departure as the caller wrote it, echoed back in results.
    pub departure_text: String,
}

impl RouteQuery {
    /// Parse raw inputs. Nothing about the timetable is checked yet.
    pub fn parse(origin: &str, destination: &str, departure: &str) -> Result<Self, SearchError> {
        Ok(Self {
            origin: StopId::parse(origin)?,
            destination: StopId::parse(destination)?,
            departure: parse_time(departure)?,
            departure_text: departure.trim().to_string(),
        })
    }
}

/// A search engine.
///
/// `run` labels stops starting from `query.origin` at `query.departure`.
/// It returns once the destination's label is final or no label can
/// improve further; the caller reconstructs the path. The search future is
/// `Send`, so a search can be spawned onto a multi-threaded runtime.
pub trait SearchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn run<P: TimetablePort>(
        &self,
        port: &P,
        query: &RouteQuery,
        config: &SearchConfig,
        labels: &mut LabelStore,
    ) -> impl Future<Output = Result<SearchStats, SearchError>> + Send;
}

/// Engine chosen at runtime.
#[derive(Debug, Clone)]
pub enum Strategy {
    RoundRelaxation(RoundRelaxation),
    Dijkstra(BestFirst<ZeroHeuristic>),
    AStar(BestFirst<GreatCircle>),
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::RoundRelaxation(RoundRelaxation)
    }
}

impl SearchStrategy for Strategy {
    fn name(&self) -> &'static str {
        match self {
            Strategy::RoundRelaxation(s) => s.name(),
            Strategy::Dijkstra(s) => s.name(),
            Strategy::AStar(s) => s.name(),
        }
    }

    async fn run<P: TimetablePort>(
        &self,
        port: &P,
        query: &RouteQuery,
        config: &SearchConfig,
        labels: &mut LabelStore,
    ) -> Result<SearchStats, SearchError> {
        match self {
            Strategy::RoundRelaxation(s) => s.run(port, query, config, labels).await,
            Strategy::Dijkstra(s) => s.run(port, query, config, labels).await,
            Strategy::AStar(s) => s.run(port, query, config, labels).await,
        }
    }
}

/// A successful search.
#[derive(Debug, Clone)]
pub struct RouteFound {
    pub itinerary: Itinerary,
    pub stats: SearchStats,
}

/// Route planner over a timetable port.
pub struct Planner<'a, P: TimetablePort> {
    port: &'a P,
    config: &'a SearchConfig,
}

impl<'a, P: TimetablePort> Planner<'a, P> {
    /// Create a new planner.
    pub fn new(port: &'a P, config: &'a SearchConfig) -> Self {
        Self { port, config }
    }

    /// Find the earliest-arrival route for `query`.
    pub async fn find_route<S: SearchStrategy>(
        &self,
        query: &RouteQuery,
        strategy: &S,
    ) -> Result<RouteFound, SearchError> {
        for stop in [&query.origin, &query.destination] {
            let exists = self
                .port
                .stop_exists(stop)
                .await
                .map_err(|e| SearchError::Fetch {
                    stop: stop.clone(),
                    what: "stop existence",
                    message: e.to_string(),
                })?;
            if !exists {
                return Err(SearchError::InvalidStop(format!("unknown stop {stop}")));
            }
        }

        debug!(
            origin = %query.origin,
            destination = %query.destination,
            departure = %query.departure,
            strategy = strategy.name(),
            "Starting search"
        );

        let mut labels = LabelStore::new();
        let run = strategy.run(self.port, query, self.config, &mut labels);
        let stats = match self.config.timeout() {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| SearchError::Timeout(limit))??,
            None => run.await?,
        };

        let itinerary = path::reconstruct(&labels, &query.origin, &query.destination)?;

        info!(
            origin = %query.origin,
            destination = %query.destination,
            arrival = %itinerary.arrival,
            stops = itinerary.stops.len(),
            rounds = stats.rounds,
            iterations = stats.iterations,
            skipped = stats.skipped,
            "Route found"
        );
        if stats.skipped > 0 {
            warn!(
                skipped = stats.skipped,
                "Ignored timetable rows with missing references or bad times"
            );
        }

        Ok(RouteFound { itinerary, stats })
    }

    /// Search from raw inputs and report the outcome as a [`RouteResult`].
    ///
    /// Never fails: every error becomes a failure result.
    pub async fn route_result<S: SearchStrategy>(
        &self,
        origin: &str,
        destination: &str,
        departure: &str,
        strategy: &S,
    ) -> RouteResult {
        let query = match RouteQuery::parse(origin, destination, departure) {
            Ok(query) => query,
            Err(e) => {
                warn!(error = %e, "Rejected route query");
                return RouteResult::failed(&e);
            }
        };

        match self.find_route(&query, strategy).await {
            Ok(found) => RouteResult::found(&query, &found),
            Err(e) => {
                warn!(
                    origin = %query.origin,
                    destination = %query.destination,
                    kind = e.kind(),
                    error = %e,
                    "Route search failed"
                );
                RouteResult::failed(&e)
            }
        }
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod search_tests;
