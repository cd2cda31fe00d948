use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use safewalk::config::{Config, ProviderKind};
use safewalk::provider::{DynProvider, MapboxProvider, WalkGraph};
use safewalk::safety::DangerZones;
use safewalk::search::SafeRouteSearch;
use safewalk::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("safewalk=debug".parse()?),
        )
        .init();

    let config = Config::from_env()?;

    // 1. Routing provider
    let provider: DynProvider = match config.provider {
        ProviderKind::Mapbox => Arc::new(MapboxProvider::new(
            config.mapbox_access_token.clone(),
            config.mapbox_api_base.clone(),
            config.provider_timeout,
        )?),
        ProviderKind::Graph => {
            let path = config.osm_pbf_path.clone();
            let graph = tokio::task::spawn_blocking(move || WalkGraph::from_pbf(path))
                .await?
                .with_context(|| {
                    format!("failed to load {}", config.osm_pbf_path.display())
                })?;
            Arc::new(graph)
        }
    };

    // 2. Danger zones
    let default_zones = DangerZones::new(config.danger_zones.clone(), config.danger_radius_km)?;
    tracing::info!(
        "Using {} provider with {} default danger zones ({} km radius)",
        provider.name(),
        default_zones.len(),
        default_zones.radius_km()
    );

    let state = Arc::new(AppState {
        search: SafeRouteSearch::new(provider, config.search_settings()),
        default_zones,
    });

    // 3. Serve
    let app = server::router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("API server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
