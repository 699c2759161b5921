//! Earliest-arrival route planning.
//!
//! Two engines compute the same thing, the earliest time each stop can be
//! reached from an origin at a departure time:
//!
//! - [`RoundRelaxation`] works in rounds, one more trip or transfer per
//!   round, fetching the timetable for all improved stops at once.
//! - [`BestFirst`] settles stops in cost order (Dijkstra, or A* with a
//!   [`Heuristic`]).
//!
//! Both write into a per-search [`LabelStore`]; [`reconstruct`] walks its
//! predecessor links to produce the stop sequence.

mod best_first;
mod config;
mod expand;
mod fetch;
mod heuristic;
mod labels;
mod path;
mod raptor;
mod result;
mod search;

pub use best_first::{BestFirst, CostModel};
pub use config::SearchConfig;
pub use heuristic::{GreatCircle, Heuristic, ZeroHeuristic};
pub use labels::{Label, LabelStore};
pub use path::{Itinerary, reconstruct};
pub use raptor::RoundRelaxation;
pub use result::{RouteFailure, RouteResult, RouteSuccess};
pub use search::{
    Planner, RouteFound, RouteQuery, SearchError, SearchStats, SearchStrategy, Strategy,
};
