//! Domain types for the transit planner.
//!
//! These types model the read-only timetable (stops, routes, trips, stop
//! times, transfers) and the time codec. Identifiers and transfers enforce
//! their invariants at construction time, so code that receives them can
//! trust their validity.

mod ids;
mod schedule;
mod stop;
mod time;

pub use ids::{InvalidId, RouteId, StopId, TripId};
pub use schedule::{InvalidTransfer, Route, StopTime, Transfer, Trip};
pub use stop::{Coordinate, Stop};
pub use time::{Minutes, TimeError, format_time, parse_time};
