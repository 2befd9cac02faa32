//! Petri arena tick-engine server.

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Petri Tick Engine v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  World radius: {}", config.world.radius);
    info!("  Grid cell: {}", config.world.grid_cell_size);
    info!("  Tick rate: {} Hz", config.engine.tps);

    let (engine, handle) = server::Engine::new(config);
    // The session gateway attaches here: it pushes `player:*` messages into
    // `handle.sender()` and fans `handle.subscribe()` out to its sockets.
    let _handle = handle;

    server::run_engine_loop(engine).await;
    Ok(())
}
