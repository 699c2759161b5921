//! In-memory timetable store.
//!
//! Holds a whole feed in hash maps indexed the way the planner queries it:
//! stop times by stop (with their trip's calling pattern attached) and
//! transfers by origin stop.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::domain::{
    Coordinate, Minutes, Route, RouteId, Stop, StopId, StopTime, Transfer, Trip, TripId,
    parse_time,
};

use super::{StopTimeEvent, TimetableError, TimetablePort};

/// A read-only timetable held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTimetable {
    stops: HashMap<StopId, Stop>,
    trips: HashMap<TripId, Arc<Trip>>,
    events_by_stop: HashMap<StopId, Vec<StopTimeEvent>>,
    transfers_by_stop: HashMap<StopId, Vec<Transfer>>,
}

impl InMemoryTimetable {
    /// Look up a stop.
    pub fn stop(&self, id: &StopId) -> Option<&Stop> {
        self.stops.get(id)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }

    /// Number of stop-time rows across all stops.
    pub fn stop_time_count(&self) -> usize {
        self.events_by_stop.values().map(Vec::len).sum()
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers_by_stop.values().map(Vec::len).sum()
    }

    /// Stops whose name contains `name`, ignoring case, ordered by id.
    ///
    /// A blank `name` matches every stop. At most `limit` stops come back.
    pub fn find_stops(&self, name: &str, limit: usize) -> Vec<&Stop> {
        let needle = name.trim().to_lowercase();
        let mut found: Vec<&Stop> = self
            .stops
            .values()
            .filter(|s| needle.is_empty() || s.name.to_lowercase().contains(&needle))
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found.truncate(limit);
        found
    }

    /// Every call at `stop`, earliest arrival first.
    ///
    /// A blank arrival falls back to the departure. Calls with no usable
    /// time sort last; ties go by trip id.
    pub fn stop_timetable(&self, stop: &StopId) -> Vec<&StopTimeEvent> {
        let mut events: Vec<&StopTimeEvent> = self
            .events_by_stop
            .get(stop)
            .map(|events| events.iter().collect())
            .unwrap_or_default();
        events.sort_by(|a, b| {
            let (ka, kb) = (sort_time(a), sort_time(b));
            ka.is_none()
                .cmp(&kb.is_none())
                .then_with(|| ka.cmp(&kb))
                .then_with(|| a.stop_time.trip_id.cmp(&b.stop_time.trip_id))
        });
        events
    }

    /// Coordinates of every stop that has one.
    pub fn coordinates(&self) -> HashMap<StopId, Coordinate> {
        self.stops
            .values()
            .filter_map(|s| s.location.map(|loc| (s.id.clone(), loc)))
            .collect()
    }
}

fn sort_time(event: &StopTimeEvent) -> Option<Minutes> {
    let st = &event.stop_time;
    let text = if st.arrival_time.trim().is_empty() {
        &st.departure_time
    } else {
        &st.arrival_time
    };
    parse_time(text).ok()
}

impl TimetablePort for InMemoryTimetable {
    async fn stop_exists(&self, stop: &StopId) -> Result<bool, TimetableError> {
        Ok(self.stops.contains_key(stop))
    }

    async fn stop_times_at(&self, stop: &StopId) -> Result<Vec<StopTimeEvent>, TimetableError> {
        Ok(self.events_by_stop.get(stop).cloned().unwrap_or_default())
    }

    async fn transfers_from(&self, stop: &StopId) -> Result<Vec<Transfer>, TimetableError> {
        Ok(self.transfers_by_stop.get(stop).cloned().unwrap_or_default())
    }
}

/// Builder for [`InMemoryTimetable`].
///
/// The `insert_*` methods take typed records (used by the feed loader). The
/// fluent methods take string ids for compact test fixtures; rows with a
/// blank id or a bad transfer duration are dropped with a warning.
///
/// ```
/// use transit_planner::timetable::TimetableBuilder;
///
/// let timetable = TimetableBuilder::new()
///     .stop("A", "Alpha")
///     .stop("B", "Beta")
///     .route("R1", "IC 1")
///     .trip("T1", "R1")
///     .call("T1", "A", 1, "08:00", "08:00")
///     .call("T1", "B", 2, "08:20", "08:21")
///     .transfer("B", "A", 4.0)
///     .build();
///
/// assert_eq!(timetable.stop_count(), 2);
/// assert_eq!(timetable.stop_time_count(), 2);
/// assert_eq!(timetable.transfer_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct TimetableBuilder {
    stops: HashMap<StopId, Stop>,
    routes: HashMap<RouteId, Route>,
    trips: HashMap<TripId, Trip>,
    stop_times: Vec<StopTime>,
    transfers: Vec<Transfer>,
}

impl TimetableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_stop(&mut self, stop: Stop) {
        self.stops.insert(stop.id.clone(), stop);
    }

    pub fn insert_route(&mut self, route: Route) {
        self.routes.insert(route.id.clone(), route);
    }

    pub fn insert_trip(&mut self, trip: Trip) {
        self.trips.insert(trip.id.clone(), trip);
    }

    pub fn insert_stop_time(&mut self, stop_time: StopTime) {
        self.stop_times.push(stop_time);
    }

    pub fn insert_transfer(&mut self, transfer: Transfer) {
        self.transfers.push(transfer);
    }

    /// Add a stop without a location.
    pub fn stop(mut self, id: &str, name: &str) -> Self {
        match StopId::parse(id) {
            Ok(id) => self.insert_stop(Stop::new(id, name)),
            Err(e) => warn!(error = %e, "Ignoring stop"),
        }
        self
    }

    /// Add a stop with a coordinate.
    pub fn stop_at(mut self, id: &str, name: &str, lat: f64, lon: f64) -> Self {
        match StopId::parse(id) {
            Ok(id) => self.insert_stop(Stop::new(id, name).with_location(lat, lon)),
            Err(e) => warn!(error = %e, "Ignoring stop"),
        }
        self
    }

    pub fn route(mut self, id: &str, short_name: &str) -> Self {
        match RouteId::parse(id) {
            Ok(id) => self.insert_route(Route::new(id, short_name)),
            Err(e) => warn!(error = %e, "Ignoring route"),
        }
        self
    }

    pub fn trip(mut self, id: &str, route_id: &str) -> Self {
        match (TripId::parse(id), RouteId::parse(route_id)) {
            (Ok(id), Ok(route_id)) => self.insert_trip(Trip::new(id, route_id)),
            _ => warn!(trip = id, route = route_id, "Ignoring trip with blank id"),
        }
        self
    }

    /// Add one call of a trip.
    pub fn call(
        mut self,
        trip_id: &str,
        stop_id: &str,
        sequence: u32,
        arrival: &str,
        departure: &str,
    ) -> Self {
        match (TripId::parse(trip_id), StopId::parse(stop_id)) {
            (Ok(trip), Ok(stop)) => {
                self.insert_stop_time(StopTime::new(trip, stop, sequence, arrival, departure))
            }
            _ => warn!(trip = trip_id, stop = stop_id, "Ignoring stop time with blank id"),
        }
        self
    }

    pub fn transfer(mut self, from: &str, to: &str, min_transfer_mins: f64) -> Self {
        let transfer = StopId::parse(from)
            .and_then(|f| StopId::parse(to).map(|t| (f, t)))
            .map_err(|e| e.to_string())
            .and_then(|(f, t)| Transfer::new(f, t, min_transfer_mins).map_err(|e| e.to_string()));
        match transfer {
            Ok(t) => self.insert_transfer(t),
            Err(e) => warn!(error = %e, "Ignoring transfer"),
        }
        self
    }

    /// Index everything into an [`InMemoryTimetable`].
    ///
    /// Dangling trip or route references are kept; they surface as
    /// unresolved [`StopTimeEvent`]s.
    pub fn build(self) -> InMemoryTimetable {
        let routes: HashMap<RouteId, Arc<Route>> = self
            .routes
            .into_iter()
            .map(|(id, r)| (id, Arc::new(r)))
            .collect();
        let trips: HashMap<TripId, Arc<Trip>> = self
            .trips
            .into_iter()
            .map(|(id, t)| (id, Arc::new(t)))
            .collect();

        let mut by_trip: HashMap<TripId, Vec<StopTime>> = HashMap::new();
        for st in &self.stop_times {
            by_trip.entry(st.trip_id.clone()).or_default().push(st.clone());
        }
        let patterns: HashMap<TripId, Arc<[StopTime]>> = by_trip
            .into_iter()
            .map(|(trip_id, mut calls)| {
                calls.sort_by_key(|c| c.sequence);
                (trip_id, Arc::from(calls))
            })
            .collect();

        let empty: Arc<[StopTime]> = Arc::from(Vec::new());
        let mut events_by_stop: HashMap<StopId, Vec<StopTimeEvent>> = HashMap::new();
        for st in self.stop_times {
            let trip = trips.get(&st.trip_id).cloned();
            let route = trip.as_ref().and_then(|t| routes.get(&t.route_id).cloned());
            let calls = match &trip {
                Some(_) => patterns.get(&st.trip_id).cloned().unwrap_or_else(|| empty.clone()),
                None => empty.clone(),
            };
            events_by_stop
                .entry(st.stop_id.clone())
                .or_default()
                .push(StopTimeEvent {
                    stop_time: st,
                    trip,
                    route,
                    calls,
                });
        }

        let mut transfers_by_stop: HashMap<StopId, Vec<Transfer>> = HashMap::new();
        for t in self.transfers {
            transfers_by_stop.entry(t.from.clone()).or_default().push(t);
        }

        InMemoryTimetable {
            stops: self.stops,
            trips,
            events_by_stop,
            transfers_by_stop,
        }
    }
}
