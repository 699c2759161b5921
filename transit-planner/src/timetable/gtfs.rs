//! GTFS directory loader.
//!
//! Reads an unpacked GTFS feed into an [`InMemoryTimetable`].
//!
//! # Files
//!
//! | File             | Required | Columns used                                              |
//! |------------------|----------|-----------------------------------------------------------|
//! | `stops.txt`      | yes      | `stop_id`, `stop_name`, `stop_lat`, `stop_lon`            |
//! | `routes.txt`     | yes      | `route_id`, `agency_id`, `route_short_name`, `route_long_name` |
//! | `trips.txt`      | yes      | `route_id`, `trip_id`                                     |
//! | `stop_times.txt` | yes      | `trip_id`, `arrival_time`, `departure_time`, `stop_id`, `stop_sequence` |
//! | `transfers.txt`  | no       | `from_stop_id`, `to_stop_id`, `min_transfer_time` (seconds) |
//!
//! Feeds in the wild are messy, so parsing is lenient: a UTF-8 byte order
//! mark on the header row is stripped, unknown columns are ignored, and rows
//! that fail to deserialise are skipped and counted rather than aborting the
//! load. Times are not validated here; the planner skips unparseable ones.

use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::domain::{Route, RouteId, Stop, StopId, StopTime, Transfer, Trip, TripId};

use super::{InMemoryTimetable, TimetableBuilder, TimetableError};

// ── CSV records ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StopRecord {
    stop_id: StopId,
    #[serde(default)]
    stop_name: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    stop_lat: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    stop_lon: Option<f64>,
}

#[derive(Deserialize)]
struct RouteRecord {
    route_id: RouteId,
    #[serde(default)]
    agency_id: Option<String>,
    #[serde(default)]
    route_short_name: String,
    #[serde(default)]
    route_long_name: String,
}

#[derive(Deserialize)]
struct TripRecord {
    route_id: RouteId,
    trip_id: TripId,
}

#[derive(Deserialize)]
struct StopTimeRecord {
    trip_id: TripId,
    #[serde(default)]
    arrival_time: String,
    #[serde(default)]
    departure_time: String,
    stop_id: StopId,
    stop_sequence: u32,
}

#[derive(Deserialize)]
struct TransferRecord {
    from_stop_id: StopId,
    to_stop_id: StopId,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    min_transfer_time: Option<f64>,
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Row counts from a load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub stops: usize,
    pub routes: usize,
    pub trips: usize,
    pub stop_times: usize,
    pub transfers: usize,
    /// Rows dropped because they failed to deserialise.
    pub skipped_rows: usize,
}

/// Load a GTFS feed from an unpacked directory.
pub fn load_dir(dir: &Path) -> Result<(InMemoryTimetable, LoadReport), TimetableError> {
    let mut report = LoadReport::default();
    let mut builder = TimetableBuilder::new();

    let stops: Vec<StopRecord> = read_file(dir, "stops.txt", true, &mut report.skipped_rows)?;
    report.stops = stops.len();
    for r in stops {
        let mut stop = Stop::new(r.stop_id, r.stop_name);
        if let (Some(lat), Some(lon)) = (r.stop_lat, r.stop_lon) {
            stop = stop.with_location(lat, lon);
        }
        builder.insert_stop(stop);
    }

    let routes: Vec<RouteRecord> = read_file(dir, "routes.txt", true, &mut report.skipped_rows)?;
    report.routes = routes.len();
    for r in routes {
        builder.insert_route(Route {
            id: r.route_id,
            agency_id: r.agency_id.filter(|a| !a.is_empty()),
            short_name: r.route_short_name,
            long_name: r.route_long_name,
        });
    }

    let trips: Vec<TripRecord> = read_file(dir, "trips.txt", true, &mut report.skipped_rows)?;
    report.trips = trips.len();
    for r in trips {
        builder.insert_trip(Trip::new(r.trip_id, r.route_id));
    }

    let stop_times: Vec<StopTimeRecord> =
        read_file(dir, "stop_times.txt", true, &mut report.skipped_rows)?;
    report.stop_times = stop_times.len();
    for r in stop_times {
        builder.insert_stop_time(StopTime::new(
            r.trip_id,
            r.stop_id,
            r.stop_sequence,
            r.arrival_time,
            r.departure_time,
        ));
    }

    let transfers: Vec<TransferRecord> =
        read_file(dir, "transfers.txt", false, &mut report.skipped_rows)?;
    for r in transfers {
        let minutes = r.min_transfer_time.unwrap_or(0.0) / 60.0;
        match Transfer::new(r.from_stop_id, r.to_stop_id, minutes) {
            Ok(t) => {
                builder.insert_transfer(t);
                report.transfers += 1;
            }
            Err(e) => {
                warn!(error = %e, "Skipping transfer");
                report.skipped_rows += 1;
            }
        }
    }

    info!(
        stops = report.stops,
        routes = report.routes,
        trips = report.trips,
        stop_times = report.stop_times,
        transfers = report.transfers,
        skipped = report.skipped_rows,
        "Loaded GTFS feed"
    );

    Ok((builder.build(), report))
}

/// Deserialise every row of a CSV source, skipping rows that fail.
///
/// Useful for testing with an in-memory reader.
pub fn read_records<T, R>(
    reader: R,
    file_name: &str,
    skipped: &mut usize,
) -> Result<Vec<T>, TimetableError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|source| TimetableError::Csv {
            file: file_name.to_string(),
            source,
        })?
        .clone();
    csv_reader.set_headers(strip_bom(&headers));

    let mut records = Vec::new();
    for (line, row) in csv_reader.deserialize::<T>().enumerate() {
        match row {
            Ok(record) => records.push(record),
            Err(e) => {
                *skipped += 1;
                debug!(file = file_name, row = line + 1, error = %e, "Skipping row");
            }
        }
    }

    Ok(records)
}

fn read_file<T: DeserializeOwned>(
    dir: &Path,
    file_name: &str,
    required: bool,
    skipped: &mut usize,
) -> Result<Vec<T>, TimetableError> {
    let path = dir.join(file_name);
    if !path.is_file() {
        if required {
            return Err(TimetableError::MissingFile(file_name.to_string()));
        }
        return Ok(Vec::new());
    }

    let file = std::fs::File::open(&path).map_err(|source| TimetableError::Io {
        path: path.clone(),
        source,
    })?;

    let before = *skipped;
    let records = read_records(file, file_name, skipped)?;
    if *skipped > before {
        warn!(
            file = file_name,
            skipped = *skipped - before,
            "Skipped malformed rows"
        );
    }
    Ok(records)
}

fn strip_bom(headers: &StringRecord) -> StringRecord {
    headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}'))
        .collect()
}
