use std::sync::Arc;

use saferoute::{
    AppState, config::AppConfig, create_router, engine::RoadGraph, geocode::Geocoder,
    risk::RiskClassifier,
    visibility::{EdgeDensityVisibility, FixedVisibility, VisibilityScorer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "saferoute=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let graph = RoadGraph::from_file(&config.graph_path, config.graph)?;
    tracing::info!(
        "loaded road graph from {} ({} nodes)",
        config.graph_path.display(),
        graph.node_count()
    );

    let geocoder = match config.geocoder.clone() {
        Some(params) => {
            tracing::info!("geocoding free-text locations via {}", params.base_url);
            Some(Arc::new(Geocoder::new(params)?))
        }
        None => {
            tracing::warn!("geocoder disabled, only lat,lon endpoints are accepted");
            None
        }
    };
    if let Some(seed) = config.risk_seed {
        tracing::warn!("hazard simulation pinned to seed {seed}");
    }

    let visibility: Arc<dyn VisibilityScorer> = match config.visibility_edge_density {
        Some(percent) => Arc::new(EdgeDensityVisibility { percent }),
        None => Arc::new(FixedVisibility(config.visibility_score)),
    };
    tracing::info!("route visibility score {}", visibility.score());

    let state = AppState {
        graph: Arc::new(graph),
        classifier: Arc::new(RiskClassifier::new(config.risk.clone())),
        visibility,
        geocoder,
        risk_seed: config.risk_seed,
    };
    let app = create_router(state);

    tracing::info!("starting saferoute on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
