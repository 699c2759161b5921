//! Scenario tests for the planner and both engines.

use super::*;
use crate::domain::Transfer;
use crate::planner::CostModel;
use crate::timetable::{
    CacheConfig, CachedTimetable, InMemoryTimetable, StopTimeEvent, TimetableBuilder,
    TimetableError,
};
use std::sync::{Arc, Mutex};

fn stop(s: &str) -> StopId {
    StopId::parse(s).unwrap()
}

fn ids(found: &RouteFound) -> Vec<&str> {
    found.itinerary.stops.iter().map(StopId::as_str).collect()
}

fn query(origin: &str, destination: &str, departure: &str) -> RouteQuery {
    RouteQuery::parse(origin, destination, departure).unwrap()
}

/// A --T1--> B --walk 5--> C, with stops roughly 11 km apart.
fn scenario() -> TimetableBuilder {
    TimetableBuilder::new()
        .stop_at("A", "Alpha", 0.0, 0.0)
        .stop_at("B", "Beta", 0.0, 0.1)
        .stop_at("C", "Gamma", 0.0, 0.2)
        .route("R1", "1")
        .trip("T1", "R1")
        .call("T1", "A", 1, "08:00", "08:00")
        .call("T1", "B", 2, "08:20", "08:20")
        .transfer("B", "C", 5.0)
}

fn engines(tt: &InMemoryTimetable) -> Vec<Strategy> {
    vec![
        Strategy::RoundRelaxation(RoundRelaxation),
        Strategy::Dijkstra(BestFirst::dijkstra()),
        Strategy::AStar(BestFirst::with_heuristic(GreatCircle::new(
            tt.coordinates(),
            200.0,
        ))),
    ]
}

/// Mock port for testing: counts calls and can fail or stall.
struct MockPort {
    inner: InMemoryTimetable,
    fail_stop_times_at: Option<StopId>,
    delay: Option<Duration>,
    call_count: Mutex<usize>,
}

impl MockPort {
    fn new(inner: InMemoryTimetable) -> Self {
        Self {
            inner,
            fail_stop_times_at: None,
            delay: None,
            call_count: Mutex::new(0),
        }
    }

    fn failing_at(mut self, stop_id: &str) -> Self {
        self.fail_stop_times_at = Some(stop(stop_id));
        self
    }

    fn stalling(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl TimetablePort for MockPort {
    async fn stop_exists(&self, stop: &StopId) -> Result<bool, TimetableError> {
        *self.call_count.lock().unwrap() += 1;
        self.inner.stop_exists(stop).await
    }

    async fn stop_times_at(&self, stop: &StopId) -> Result<Vec<StopTimeEvent>, TimetableError> {
        *self.call_count.lock().unwrap() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_stop_times_at.as_ref() == Some(stop) {
            return Err(TimetableError::Backend("connection reset".into()));
        }
        self.inner.stop_times_at(stop).await
    }

    async fn transfers_from(&self, stop: &StopId) -> Result<Vec<Transfer>, TimetableError> {
        *self.call_count.lock().unwrap() += 1;
        self.inner.transfers_from(stop).await
    }
}

#[tokio::test]
async fn all_engines_find_trip_then_transfer() {
    let tt = scenario().build();
    let config = SearchConfig::default();
    let planner = Planner::new(&tt, &config);

    for engine in engines(&tt) {
        let found = planner
            .find_route(&query("A", "C", "08:00"), &engine)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec!["A", "B", "C"], "{}", engine.name());
        assert_eq!(found.itinerary.arrival_time(), "08:25:00");
    }
}

#[tokio::test]
async fn round_engine_stops_when_nothing_improves() {
    let tt = scenario().build();
    let config = SearchConfig::default();
    let planner = Planner::new(&tt, &config);

    let found = planner
        .find_route(&query("A", "C", "08:00"), &RoundRelaxation)
        .await
        .unwrap();
    // B by trip, C by transfer, then an empty round
    assert_eq!(found.stats.rounds, 3);
    assert_eq!(found.stats.relaxations, 2);
    assert_eq!(found.stats.labelled_stops, 3);
    assert_eq!(found.stats.skipped, 0);
}

#[tokio::test]
async fn best_first_stops_at_destination() {
    let tt = scenario().build();
    let config = SearchConfig::default();
    let planner = Planner::new(&tt, &config);

    let found = planner
        .find_route(&query("A", "C", "08:00"), &BestFirst::dijkstra())
        .await
        .unwrap();
    assert_eq!(found.stats.iterations, 3);
    assert_eq!(found.stats.rounds, 0);
}

#[tokio::test]
async fn direct_trip_beats_earlier_leg() {
    let tt = scenario()
        .trip("T2", "R1")
        .call("T2", "A", 1, "08:05", "08:05")
        .call("T2", "C", 2, "08:15", "08:15")
        .build();
    let config = SearchConfig::default();
    let planner = Planner::new(&tt, &config);

    for engine in engines(&tt) {
        let found = planner
            .find_route(&query("A", "C", "08:00"), &engine)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec!["A", "C"], "{}", engine.name());
        assert_eq!(found.itinerary.arrival_time(), "08:15:00");
    }
}

#[tokio::test]
async fn missed_departure_means_no_route() {
    let tt = scenario().build();
    let config = SearchConfig::default();
    let planner = Planner::new(&tt, &config);

    for engine in engines(&tt) {
        let err = planner
            .find_route(&query("A", "C", "08:01"), &engine)
            .await
            .unwrap_err();
        assert!(
            matches!(err, SearchError::NoRouteFound { .. }),
            "{}: {err:?}",
            engine.name()
        );
    }
}

#[tokio::test]
async fn disconnected_stops_have_no_route() {
    let tt = scenario().stop("Z", "Zeta").build();
    let config = SearchConfig::default();
    let planner = Planner::new(&tt, &config);

    for engine in engines(&tt) {
        let err = planner
            .find_route(&query("A", "Z", "08:00"), &engine)
            .await
            .unwrap_err();
        match err {
            SearchError::NoRouteFound {
                origin,
                destination,
            } => {
                assert_eq!(origin, stop("A"));
                assert_eq!(destination, stop("Z"));
            }
            other => panic!("{}: unexpected error: {other:?}", engine.name()),
        }
    }
}

#[tokio::test]
async fn origin_is_destination() {
    let tt = scenario().build();
    let config = SearchConfig::default();
    let planner = Planner::new(&tt, &config);

    for engine in engines(&tt) {
        let found = planner
            .find_route(&query("B", "B", "07:30"), &engine)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec!["B"]);
        assert_eq!(found.itinerary.arrival_time(), "07:30:00");
    }
}

#[tokio::test]
async fn missing_references_are_skipped() {
    let tt = scenario()
        .trip("T2", "NO_SUCH_ROUTE")
        .call("T2", "A", 1, "08:01", "08:01")
        .call("T2", "C", 2, "08:02", "08:02")
        .call("NO_SUCH_TRIP", "A", 1, "08:01", "08:01")
        .call("T1", "NOWHERE", 3, "08:30", "08:30")
        .build();
    let config = SearchConfig::default();
    let planner = Planner::new(&tt, &config);

    for engine in engines(&tt) {
        let found = planner
            .find_route(&query("A", "C", "08:00"), &engine)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec!["A", "B", "C"], "{}", engine.name());
        assert_eq!(found.itinerary.arrival_time(), "08:25:00");
        assert!(found.stats.skipped >= 3, "{}", engine.name());
    }
}

#[tokio::test]
async fn zero_minute_self_transfer_is_harmless() {
    let tt = scenario()
        .transfer("B", "B", 0.0)
        .transfer("C", "C", 0.0)
        .build();
    let config = SearchConfig::default();
    let planner = Planner::new(&tt, &config);

    for engine in engines(&tt) {
        let found = planner
            .find_route(&query("A", "C", "08:00"), &engine)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec!["A", "B", "C"], "{}", engine.name());
    }
}

#[tokio::test]
async fn round_budget_exceeded() {
    let tt = scenario().build();
    let config = SearchConfig::new(1, 1_000, 16, None);
    let planner = Planner::new(&tt, &config);

    let err = planner
        .find_route(&query("A", "C", "08:00"), &RoundRelaxation)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SearchError::SearchBudgetExceeded {
            limit: 1,
            unit: "rounds"
        }
    ));
}

#[tokio::test]
async fn iteration_budget_exceeded() {
    let tt = scenario().build();
    let config = SearchConfig::new(64, 1, 16, None);
    let planner = Planner::new(&tt, &config);

    let err = planner
        .find_route(&query("A", "C", "08:00"), &BestFirst::dijkstra())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SearchError::SearchBudgetExceeded {
            limit: 1,
            unit: "iterations"
        }
    ));
    assert_eq!(err.kind(), "search_budget_exceeded");
}

#[tokio::test]
async fn invalid_inputs_rejected() {
    let tt = scenario().build();
    let config = SearchConfig::default();
    let planner = Planner::new(&tt, &config);

    assert!(matches!(
        RouteQuery::parse("  ", "C", "08:00"),
        Err(SearchError::InvalidStop(_))
    ));
    assert!(matches!(
        RouteQuery::parse("A", "C", "8am"),
        Err(SearchError::InvalidTimeFormat(_))
    ));

    let err = planner
        .find_route(&query("A", "Q", "08:00"), &RoundRelaxation)
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidStop(_)));

    let err = planner
        .find_route(&query("Q", "C", "08:00"), &BestFirst::dijkstra())
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidStop(_)));
}

#[tokio::test]
async fn fetch_failure_aborts_search() {
    let port = MockPort::new(scenario().build()).failing_at("B");
    let config = SearchConfig::default();
    let planner = Planner::new(&port, &config);

    let engines: Vec<Strategy> = vec![
        Strategy::RoundRelaxation(RoundRelaxation),
        Strategy::Dijkstra(BestFirst::dijkstra()),
    ];
    for engine in engines {
        let err = planner
            .find_route(&query("A", "C", "08:00"), &engine)
            .await
            .unwrap_err();
        match err {
            SearchError::Fetch { stop, what, .. } => {
                assert_eq!(stop.as_str(), "B");
                assert_eq!(what, "stop times");
            }
            other => panic!("{}: unexpected error: {other:?}", engine.name()),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn slow_timetable_times_out() {
    let port = MockPort::new(scenario().build()).stalling(Duration::from_secs(3600));
    let config = SearchConfig::new(64, 1_000, 16, Some(1));
    let planner = Planner::new(&port, &config);

    let err = planner
        .find_route(&query("A", "C", "08:00"), &RoundRelaxation)
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Timeout(d) if d == Duration::from_secs(1)));
    assert_eq!(err.kind(), "timeout");
}

#[tokio::test]
async fn clock_increment_ignores_boarding_time() {
    // T0 leaves before the requested departure.
    let tt = scenario()
        .trip("T0", "R1")
        .call("T0", "A", 1, "07:00", "07:00")
        .call("T0", "C", 2, "07:10", "07:10")
        .build();
    let config = SearchConfig::default();
    let planner = Planner::new(&tt, &config);

    let absolute = planner
        .find_route(&query("A", "C", "08:00"), &BestFirst::dijkstra())
        .await
        .unwrap();
    assert_eq!(ids(&absolute), vec!["A", "B", "C"]);
    assert_eq!(absolute.itinerary.arrival_time(), "08:25:00");

    let clock = BestFirst::dijkstra().cost_model(CostModel::ClockIncrement);
    let found = planner
        .find_route(&query("A", "C", "08:00"), &clock)
        .await
        .unwrap();
    // 08:00 + 07:10 on the clock
    assert_eq!(ids(&found), vec!["A", "C"]);
    assert_eq!(found.itinerary.arrival_time(), "15:10:00");
}

#[tokio::test]
async fn cached_port_serves_repeat_searches() {
    let cached = CachedTimetable::new(MockPort::new(scenario().build()), &CacheConfig::default());
    let config = SearchConfig::default();
    let planner = Planner::new(&cached, &config);
    let q = query("A", "C", "08:00");

    let first = planner.find_route(&q, &RoundRelaxation).await.unwrap();
    let calls = cached.inner().call_count();
    assert!(calls > 0);

    let second = planner.find_route(&q, &RoundRelaxation).await.unwrap();
    assert_eq!(cached.inner().call_count(), calls);
    assert_eq!(first.itinerary, second.itinerary);
}

#[tokio::test]
async fn concurrent_searches_share_a_port() {
    let tt = scenario().build();
    let config = SearchConfig::default();
    let planner = Planner::new(&tt, &config);
    let to_c = query("A", "C", "08:00");
    let to_b = query("A", "B", "08:00");

    let (c, b) = futures::future::join(
        planner.find_route(&to_c, &RoundRelaxation),
        planner.find_route(&to_b, &BestFirst::dijkstra()),
    )
    .await;
    assert_eq!(c.unwrap().itinerary.arrival_time(), "08:25:00");
    assert_eq!(b.unwrap().itinerary.arrival_time(), "08:20:00");
}

fn spawn_search<P: TimetablePort + 'static>(
    port: Arc<P>,
    query: RouteQuery,
) -> tokio::task::JoinHandle<Result<RouteFound, SearchError>> {
    tokio::spawn(async move {
        let config = SearchConfig::default();
        let planner = Planner::new(port.as_ref(), &config);
        planner.find_route(&query, &Strategy::default()).await
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn searches_run_on_spawned_tasks() {
    let port = Arc::new(MockPort::new(scenario().build()));

    let to_c = spawn_search(port.clone(), query("A", "C", "08:00"));
    let to_b = spawn_search(port.clone(), query("A", "B", "08:00"));

    let c = to_c.await.unwrap().unwrap();
    let b = to_b.await.unwrap().unwrap();
    assert_eq!(ids(&c), vec!["A", "B", "C"]);
    assert_eq!(c.itinerary.arrival_time(), "08:25:00");
    assert_eq!(b.itinerary.arrival_time(), "08:20:00");
    assert!(port.call_count() > 0);
}

#[tokio::test]
async fn route_result_shapes() {
    let tt = scenario().build();
    let config = SearchConfig::default();
    let planner = Planner::new(&tt, &config);

    let ok = planner
        .route_result("A", "C", "08:00", &RoundRelaxation)
        .await;
    assert_eq!(
        serde_json::to_value(&ok).unwrap(),
        serde_json::json!({
            "success": true,
            "message": "Fastest route found!",
            "route": ["A", "B", "C"],
            "departureTime": "08:00",
            "arrivalTime": "08:25:00",
        })
    );

    let bad_time = planner
        .route_result("A", "C", "25", &RoundRelaxation)
        .await;
    let json = serde_json::to_value(&bad_time).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["kind"], "invalid_time_format");
    assert!(json["errorDetail"].is_string());

    let no_route = planner
        .route_result("A", "C", "09:00", &BestFirst::dijkstra())
        .await;
    assert!(!no_route.is_success());
    let json = serde_json::to_value(&no_route).unwrap();
    assert_eq!(json["message"], "No route found");
    assert!(json.get("errorDetail").is_none());
}

mod proptests {
    use super::{
        BestFirst, InMemoryTimetable, Planner, RoundRelaxation, RouteQuery, SearchConfig,
        SearchError, TimetableBuilder,
    };
    use futures::executor::block_on;
    use proptest::prelude::*;
    use std::collections::HashSet;

    const STOPS: usize = 5;

    fn hhmm(minutes: u32) -> String {
        format!("{:02}:{:02}", minutes / 60, minutes % 60)
    }

    type TripShape = (Vec<usize>, u32, Vec<u32>);

    fn build(trips: &[TripShape], transfers: &[(usize, usize, u32)]) -> InMemoryTimetable {
        let mut builder = TimetableBuilder::new().route("R", "R");
        for i in 0..STOPS {
            builder = builder.stop(&format!("S{i}"), &format!("Stop {i}"));
        }
        for (n, (stops, start, hops)) in trips.iter().enumerate() {
            let trip = format!("T{n}");
            builder = builder.trip(&trip, "R");
            let mut t = *start;
            for (seq, s) in stops.iter().enumerate() {
                let at = hhmm(t);
                builder = builder.call(&trip, &format!("S{s}"), seq as u32 + 1, &at, &at);
                t += hops[seq];
            }
        }
        for (from, to, mins) in transfers {
            builder = builder.transfer(&format!("S{from}"), &format!("S{to}"), f64::from(*mins));
        }
        builder.build()
    }

    fn trip_shape() -> impl proptest::strategy::Strategy<Value = TripShape> {
        (
            prop::collection::vec(0..STOPS, 2..5),
            300u32..900,
            prop::collection::vec(1u32..60, 5),
        )
    }

    proptest! {
        /// Both engines agree on the earliest arrival, and every
        /// reconstructed path runs origin to destination without revisits.
        #[test]
        fn engines_agree(
            trips in prop::collection::vec(trip_shape(), 0..8),
            transfers in prop::collection::vec((0..STOPS, 0..STOPS, 0u32..30), 0..6),
            origin in 0..STOPS,
            destination in 0..STOPS,
            departure in 300u32..900,
        ) {
            let tt = build(&trips, &transfers);
            let config = SearchConfig::new(64, 100_000, 4, None);
            let planner = Planner::new(&tt, &config);
            let query = RouteQuery::parse(
                &format!("S{origin}"),
                &format!("S{destination}"),
                &hhmm(departure),
            )
            .unwrap();

            let rounds = block_on(planner.find_route(&query, &RoundRelaxation));
            let dijkstra = block_on(planner.find_route(&query, &BestFirst::dijkstra()));

            match (rounds, dijkstra) {
                (Ok(a), Ok(b)) => {
                    prop_assert_eq!(a.itinerary.arrival, b.itinerary.arrival);
                    prop_assert!(a.itinerary.arrival >= query.departure);
                    for found in [&a, &b] {
                        let stops = &found.itinerary.stops;
                        prop_assert_eq!(stops.first(), Some(&query.origin));
                        prop_assert_eq!(stops.last(), Some(&query.destination));
                        let unique: HashSet<_> = stops.iter().collect();
                        prop_assert_eq!(unique.len(), stops.len());
                    }
                }
                (Err(SearchError::NoRouteFound { .. }), Err(SearchError::NoRouteFound { .. })) => {}
                (a, b) => prop_assert!(
                    false,
                    "engines disagree: {:?} vs {:?}",
                    a.map(|f| f.itinerary),
                    b.map(|f| f.itinerary)
                ),
            }
        }
    }
}
