use std::path::PathBuf;

use clap::Parser;
use saferoute::{
    aggregate::RouteAnnotator,
    engine::{PathFinder, RoadGraph},
    geocode::parse_lat_lon,
    graph::GraphConfig,
    models::Coordinate,
    risk::{RandomDecisions, RiskClassifier, RiskConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Annotate the shortest route between two points with segment risk"
)]
struct Args {
    /// Road graph JSON (a `.json.zst` sibling is preferred when present)
    #[arg(long, default_value = "backend/data/sample_graph.json")]
    graph: PathBuf,

    /// Start as `lat,lon`
    #[arg(long, value_parser = parse_coordinate)]
    start: Coordinate,

    #[arg(long, value_parser = parse_coordinate)]
    end: Coordinate,

    /// Visibility score added to every segment
    #[arg(long, default_value_t = 0)]
    visibility: u32,

    /// Seed for the simulated hazards
    #[arg(long)]
    seed: Option<u64>,

    /// Disable simulated hazards entirely
    #[arg(long)]
    deterministic: bool,
}

fn parse_coordinate(value: &str) -> Result<Coordinate, String> {
    parse_lat_lon(value).ok_or_else(|| format!("expected lat,lon but got {value:?}"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let graph = RoadGraph::from_file(&args.graph, GraphConfig::default())?;
    tracing::info!("loaded {} nodes from {:?}", graph.node_count(), args.graph);

    let risk = if args.deterministic {
        RiskConfig::deterministic()
    } else {
        RiskConfig::default()
    };
    let classifier = RiskClassifier::new(risk);
    let decisions = match args.seed {
        Some(seed) => RandomDecisions::seeded(seed),
        None => RandomDecisions::from_entropy(),
    };

    let path = graph.shortest_path(args.start, args.end)?;
    let summary = RouteAnnotator::new(&classifier, decisions, args.visibility).aggregate(&path, &graph)?;
    tracing::info!(
        "{} segment(s), {} high risk, {:.2} km",
        summary.segments.len(),
        summary.stats.high,
        summary.total_distance_km
    );

    println!("{}", serde_json::to_string_pretty(&summary.into_response())?);
    Ok(())
}
