//! Path reconstruction from predecessor links.

use std::collections::HashSet;

use crate::domain::{Minutes, StopId, format_time};

use super::labels::LabelStore;
use super::search::SearchError;

/// An ordered sequence of stops from origin to destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Itinerary {
    pub stops: Vec<StopId>,
    pub arrival: Minutes,
}

impl Itinerary {
    /// First stop, or `None` for an itinerary built with no stops.
    pub fn origin(&self) -> Option<&StopId> {
        self.stops.first()
    }

    pub fn destination(&self) -> Option<&StopId> {
        self.stops.last()
    }

    /// Arrival as `HH:MM:SS`.
    pub fn arrival_time(&self) -> String {
        format_time(self.arrival)
    }
}

/// Walk predecessors from `destination` back to `origin`.
///
/// Fails with [`SearchError::PathReconstruction`] if the chain revisits a
/// stop or ends anywhere other than the origin. An unlabelled destination is
/// [`SearchError::NoRouteFound`].
pub fn reconstruct(
    labels: &LabelStore,
    origin: &StopId,
    destination: &StopId,
) -> Result<Itinerary, SearchError> {
    let label = labels.get(destination).ok_or_else(|| SearchError::NoRouteFound {
        origin: origin.clone(),
        destination: destination.clone(),
    })?;
    let arrival = label.arrival;

    let mut path = vec![destination.clone()];
    let mut seen: HashSet<&StopId> = HashSet::from([destination]);
    let mut current = destination;

    while current != origin {
        let Some(label) = labels.get(current) else {
            return Err(SearchError::PathReconstruction(format!(
                "no label for {current} on the way back from {destination}"
            )));
        };
        let Some(prev) = label.predecessor.as_ref() else {
            return Err(SearchError::PathReconstruction(format!(
                "chain from {destination} ends at {current}, not at origin {origin}"
            )));
        };
        if !seen.insert(prev) {
            return Err(SearchError::PathReconstruction(format!(
                "predecessor cycle through {prev}"
            )));
        }
        path.push(prev.clone());
        current = prev;
    }

    path.reverse();
    Ok(Itinerary {
        stops: path,
        arrival,
    })
}
