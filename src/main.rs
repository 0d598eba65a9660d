//! Broadside Match Server
//!
//! Binds the WebSocket listener and serves matches until Ctrl-C.

use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use broadside::{GameServer, ServerConfig, VERSION};

#[cfg(feature = "debug-tracing")]
const DEFAULT_FILTER: &str = "debug";
#[cfg(not(feature = "debug-tracing"))]
const DEFAULT_FILTER: &str = "info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = ServerConfig::from_env()?;
    info!("Broadside Server v{}", VERSION);
    info!(
        "Max connections: {}, outbound buffer: {}",
        config.max_connections, config.outbound_buffer
    );
    if let Some(seed) = config.rng_seed {
        info!("Using fixed RNG seed {}", seed);
    }

    let server = GameServer::new(config);

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
            server.shutdown();
        }
    }

    Ok(())
}
