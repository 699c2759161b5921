//! Outward-facing search outcome.

use serde::Serialize;

use crate::domain::StopId;

use super::search::{RouteFound, RouteQuery, SearchError};

/// Outcome of a route request, serialised as a flat JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RouteResult {
    Found(RouteSuccess),
    Failed(RouteFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSuccess {
    pub success: bool,
    pub message: String,
    pub route: Vec<StopId>,
    /// The departure as given in the request.
    pub departure_time: String,
    /// `HH:MM:SS`.
    pub arrival_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteFailure {
    pub success: bool,
    pub message: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl RouteResult {
    pub fn found(query: &RouteQuery, found: &RouteFound) -> Self {
        RouteResult::Found(RouteSuccess {
            success: true,
            message: "Fastest route found!".to_string(),
            route: found.itinerary.stops.clone(),
            departure_time: query.departure_text.clone(),
            arrival_time: found.itinerary.arrival_time(),
        })
    }

    pub fn failed(error: &SearchError) -> Self {
        let (message, error_detail) = match error {
            SearchError::NoRouteFound { .. } => ("No route found", None),
            SearchError::InvalidStop(_) | SearchError::InvalidTimeFormat(_) => {
                ("Invalid route request", Some(error.to_string()))
            }
            _ => (
                "Error occurred while finding route",
                Some(error.to_string()),
            ),
        };
        RouteResult::Failed(RouteFailure {
            success: false,
            message: message.to_string(),
            kind: error.kind(),
            error_detail,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RouteResult::Found(_))
    }
}
