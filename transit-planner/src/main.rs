use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use transit_planner::domain::StopId;
use transit_planner::planner::{
    BestFirst, CostModel, GreatCircle, Planner, RoundRelaxation, SearchConfig, Strategy,
};
use transit_planner::timetable::{InMemoryTimetable, StopTimeEvent, gtfs};

#[derive(Parser)]
#[command(name = "transit-planner")]
#[command(about = "Earliest-arrival route search over a GTFS feed", long_about = None)]
struct Cli {
    /// Directory holding stops.txt, routes.txt, trips.txt, stop_times.txt
    /// and optionally transfers.txt
    gtfs_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find the earliest-arrival route between two stops
    Route(RouteArgs),
    /// List stops whose name contains a search string
    Stops {
        /// Case-insensitive name fragment (omit to list every stop)
        name: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Show every call at a stop, earliest arrival first
    Timetable {
        /// Stop id
        stop: String,
    },
}

#[derive(Args)]
struct RouteArgs {
    /// Origin stop id
    origin: String,

    /// Destination stop id
    destination: String,

    /// Departure time as HH:MM or HH:MM:SS (defaults to now)
    #[arg(short, long)]
    time: Option<String>,

    #[arg(short, long, value_enum, default_value_t = Engine::Raptor)]
    strategy: Engine,

    /// Top speed assumed by the astar heuristic
    #[arg(long, default_value_t = 120.0)]
    max_speed_kmh: f64,

    /// Cost model for the best-first engines
    #[arg(long, value_enum, default_value_t = Cost::Absolute)]
    cost_model: Cost,

    #[arg(long)]
    max_rounds: Option<usize>,

    /// Queue pop limit for the best-first engines
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Wall-clock limit in seconds (0 disables it)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Engine {
    Raptor,
    Dijkstra,
    Astar,
}

#[derive(Clone, Copy, ValueEnum)]
enum Cost {
    Absolute,
    Clock,
}

impl From<Cost> for CostModel {
    fn from(cost: Cost) -> Self {
        match cost {
            Cost::Absolute => CostModel::AbsoluteArrival,
            Cost::Clock => CostModel::ClockIncrement,
        }
    }
}

#[derive(Serialize)]
struct StopRow<'a> {
    stop_id: &'a StopId,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lon: Option<f64>,
}

#[derive(Serialize)]
struct TimetableRow<'a> {
    trip_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    route: Option<&'a str>,
    stop_sequence: u32,
    arrival_time: &'a str,
    departure_time: &'a str,
}

impl<'a> From<&'a StopTimeEvent> for TimetableRow<'a> {
    fn from(event: &'a StopTimeEvent) -> Self {
        let st = &event.stop_time;
        Self {
            trip_id: st.trip_id.as_str(),
            route: event.route.as_deref().map(|r| r.display_name()),
            stop_sequence: st.sequence,
            arrival_time: &st.arrival_time,
            departure_time: &st.departure_time,
        }
    }
}

fn strategy(args: &RouteArgs, timetable: &InMemoryTimetable) -> Strategy {
    match args.strategy {
        Engine::Raptor => Strategy::RoundRelaxation(RoundRelaxation),
        Engine::Dijkstra => {
            Strategy::Dijkstra(BestFirst::dijkstra().cost_model(args.cost_model.into()))
        }
        Engine::Astar => {
            let heuristic = GreatCircle::new(timetable.coordinates(), args.max_speed_kmh);
            Strategy::AStar(BestFirst::with_heuristic(heuristic).cost_model(args.cost_model.into()))
        }
    }
}

fn search_config(args: &RouteArgs) -> SearchConfig {
    let mut config = SearchConfig::default();
    if let Some(max_rounds) = args.max_rounds {
        config.max_rounds = max_rounds;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.max_iterations = max_iterations;
    }
    match args.timeout_secs {
        Some(0) => config.timeout_secs = None,
        Some(secs) => config.timeout_secs = Some(secs),
        None => {}
    }
    config
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> bool {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            true
        }
        Err(e) => {
            error!(error = %e, "Failed to serialise output");
            false
        }
    }
}

async fn route(timetable: &InMemoryTimetable, args: &RouteArgs) -> ExitCode {
    let strategy = strategy(args, timetable);
    let config = search_config(args);
    let departure = args
        .time
        .clone()
        .unwrap_or_else(|| chrono::Local::now().format("%H:%M:%S").to_string());

    let planner = Planner::new(timetable, &config);
    let result = planner
        .route_result(&args.origin, &args.destination, &departure, &strategy)
        .await;

    if print_json(&result) && result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn stops(timetable: &InMemoryTimetable, name: Option<&str>, limit: usize) -> ExitCode {
    let rows: Vec<StopRow<'_>> = timetable
        .find_stops(name.unwrap_or_default(), limit)
        .into_iter()
        .map(|s| StopRow {
            stop_id: &s.id,
            name: &s.name,
            lat: s.location.map(|c| c.lat),
            lon: s.location.map(|c| c.lon),
        })
        .collect();

    if print_json(&rows) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn timetable_at(timetable: &InMemoryTimetable, stop: &str) -> ExitCode {
    let stop = match StopId::parse(stop) {
        Ok(id) if timetable.stop(&id).is_some() => id,
        Ok(id) => {
            error!(stop = %id, "Unknown stop");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!(error = %e, "Invalid stop id");
            return ExitCode::FAILURE;
        }
    };

    let rows: Vec<TimetableRow<'_>> = timetable
        .stop_timetable(&stop)
        .into_iter()
        .map(TimetableRow::from)
        .collect();

    if print_json(&rows) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (timetable, report) = match gtfs::load_dir(&cli.gtfs_dir) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(dir = %cli.gtfs_dir.display(), error = %e, "Failed to load GTFS feed");
            return ExitCode::FAILURE;
        }
    };
    info!(
        stops = timetable.stop_count(),
        routes = report.routes,
        trips = timetable.trip_count(),
        stop_times = timetable.stop_time_count(),
        transfers = timetable.transfer_count(),
        skipped_rows = report.skipped_rows,
        "Loaded timetable"
    );

    match &cli.command {
        Command::Route(args) => route(&timetable, args).await,
        Command::Stops { name, limit } => stops(&timetable, name.as_deref(), *limit),
        Command::Timetable { stop } => timetable_at(&timetable, stop),
    }
}
