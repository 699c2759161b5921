//! Earliest-arrival route planner for GTFS timetables.
//!
//! Answers: "leaving this stop at this time, what is the earliest I can
//! reach that stop, and through which stops?"

pub mod domain;
pub mod planner;
pub mod timetable;
