//! Timetable access.
//!
//! The engines never see the store directly. They go through
//! [`TimetablePort`], three read-only lookups keyed by stop. This keeps the
//! planner testable with in-memory data and lets a cache sit in front of a
//! slower backend.

mod cache;
pub mod gtfs;
mod memory;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::{Route, StopId, StopTime, Transfer, Trip};

pub use cache::{CacheConfig, CachedTimetable};
pub use memory::{InMemoryTimetable, TimetableBuilder};

/// Errors from a timetable backend or loader.
#[derive(Debug, thiserror::Error)]
pub enum TimetableError {
    /// Reading a feed file failed
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A feed file is not valid CSV (header-level failure)
    #[error("CSV error in {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    /// A required feed file is absent
    #[error("missing required file {0}")]
    MissingFile(String),

    /// The backing store failed to answer
    #[error("timetable backend error: {0}")]
    Backend(String),
}

/// One scheduled calling event at a stop, with its trip resolved.
///
/// `trip` and `route` are `None` when the feed references a trip or route
/// that does not exist. Such events are still returned so the engines can
/// count them; they carry an empty calling pattern.
#[derive(Debug, Clone)]
pub struct StopTimeEvent {
    /// The call at the queried stop.
    pub stop_time: StopTime,

    pub trip: Option<Arc<Trip>>,

    pub route: Option<Arc<Route>>,

    /// Every call of the trip ordered by sequence, this one included.
    pub calls: Arc<[StopTime]>,
}

impl StopTimeEvent {
    /// Returns true when both trip and route resolved.
    pub fn is_resolved(&self) -> bool {
        self.trip.is_some() && self.route.is_some()
    }

    /// Calls of the same trip after this one.
    pub fn downstream(&self) -> impl Iterator<Item = &StopTime> + '_ {
        let sequence = self.stop_time.sequence;
        self.calls.iter().filter(move |c| c.sequence > sequence)
    }
}

/// Read interface the planner needs from the timetable store.
///
/// Empty results are valid answers, not errors. Implementations must be
/// safe to query from several searches at once, including searches running
/// on other tasks, so the returned futures are `Send`. Implementors can
/// still write the methods as `async fn`.
pub trait TimetablePort: Send + Sync {
    /// Whether the stop exists.
    fn stop_exists(
        &self,
        stop: &StopId,
    ) -> impl Future<Output = Result<bool, TimetableError>> + Send;

    /// Every scheduled calling event at `stop`.
    fn stop_times_at(
        &self,
        stop: &StopId,
    ) -> impl Future<Output = Result<Vec<StopTimeEvent>, TimetableError>> + Send;

    /// Transfers originating at `stop`.
    fn transfers_from(
        &self,
        stop: &StopId,
    ) -> impl Future<Output = Result<Vec<Transfer>, TimetableError>> + Send;
}
