//! Batched timetable lookups.
//!
//! The only concurrency in a search is here: lookups for several stops are
//! issued together with `join_all` and awaited as a group before any label
//! is touched. Callers therefore always relax against a label set that no
//! in-flight fetch can observe half-updated.

use std::collections::HashMap;
use std::future::Future;

use futures::future::join_all;
use tracing::trace;

use crate::domain::{StopId, Transfer};
use crate::timetable::{StopTimeEvent, TimetableError, TimetablePort};

use super::config::SearchConfig;
use super::search::{SearchError, SearchStats};

/// Run `fetch` for every stop, `batch_size` at a time.
///
/// Results come back in input order. The first failure aborts the search.
async fn fan_out<'a, T, F, Fut>(
    stops: &'a [StopId],
    what: &'static str,
    config: &SearchConfig,
    stats: &mut SearchStats,
    fetch: F,
) -> Result<Vec<(StopId, T)>, SearchError>
where
    F: Fn(&'a StopId) -> Fut,
    Fut: Future<Output = Result<T, TimetableError>>,
{
    let mut out = Vec::with_capacity(stops.len());

    for batch in stops.chunks(config.batch_size()) {
        let futures: Vec<_> = batch
            .iter()
            .map(|stop| {
                let fut = fetch(stop);
                async move { (stop, fut.await) }
            })
            .collect();

        let results = join_all(futures).await;
        stats.fetches += results.len();

        for (stop, result) in results {
            match result {
                Ok(value) => out.push((stop.clone(), value)),
                Err(e) => {
                    return Err(SearchError::Fetch {
                        stop: stop.clone(),
                        what,
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    trace!(stops = stops.len(), what, "Fetched batch");
    Ok(out)
}

/// Stop times for each stop.
pub(crate) async fn stop_times<P: TimetablePort>(
    port: &P,
    stops: &[StopId],
    config: &SearchConfig,
    stats: &mut SearchStats,
) -> Result<Vec<(StopId, Vec<StopTimeEvent>)>, SearchError> {
    fan_out(stops, "stop times", config, stats, move |s| port.stop_times_at(s)).await
}

/// Transfers from each stop.
pub(crate) async fn transfers<P: TimetablePort>(
    port: &P,
    stops: &[StopId],
    config: &SearchConfig,
    stats: &mut SearchStats,
) -> Result<Vec<(StopId, Vec<Transfer>)>, SearchError> {
    fan_out(stops, "transfers", config, stats, move |s| port.transfers_from(s)).await
}

/// Per-search memo of which stops exist in the timetable.
///
/// Stop times and transfers may reference stops the store does not know.
/// Those targets are skipped, so every new target is checked once.
#[derive(Debug, Default)]
pub(crate) struct KnownStops {
    known: HashMap<StopId, bool>,
}

impl KnownStops {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a stop already known to exist (e.g. validated endpoints).
    pub(crate) fn insert(&mut self, stop: StopId) {
        self.known.insert(stop, true);
    }

    /// Look up every stop not yet in the memo.
    pub(crate) async fn resolve<'s, P, I>(
        &mut self,
        port: &P,
        stops: I,
        config: &SearchConfig,
        stats: &mut SearchStats,
    ) -> Result<(), SearchError>
    where
        P: TimetablePort,
        I: IntoIterator<Item = &'s StopId>,
    {
        let mut missing: Vec<StopId> = stops
            .into_iter()
            .filter(|s| !self.known.contains_key(*s))
            .cloned()
            .collect();
        missing.sort();
        missing.dedup();
        if missing.is_empty() {
            return Ok(());
        }

        let answers = fan_out(&missing, "stop existence", config, stats, move |s| {
            port.stop_exists(s)
        })
        .await?;
        self.known.extend(answers);
        Ok(())
    }

    /// Whether `stop` exists. Unresolved stops count as missing.
    pub(crate) fn exists(&self, stop: &StopId) -> bool {
        self.known.get(stop).copied().unwrap_or(false)
    }
}
