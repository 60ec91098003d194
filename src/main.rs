//! Gateway entry point: CLI parsing, logging setup, config loading and
//! the serve loop.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_gateway::lifecycle::Shutdown;
use api_gateway::{config, observability, GatewayServer};

#[derive(Parser)]
#[command(name = "api-gateway")]
#[command(about = "HTTP reverse-proxy gateway with a radix-tree router", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    config: PathBuf,

    /// Write each method's routing tree as a Graphviz DOT file into
    /// this directory after startup.
    #[arg(long, value_name = "DIR")]
    dump_routes: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = config::load_config(&cli.config)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "api_gateway={},tower_http=warn",
                    config.observability.log_level
                ))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-gateway starting");
    tracing::info!(
        bind_address = %config.server.listen_address(),
        routes = config.routes.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = GatewayServer::new(config)?;

    if let Some(dir) = &cli.dump_routes {
        std::fs::create_dir_all(dir)?;
        for method in server.router().methods() {
            let path = dir.join(format!("routes-{}.dot", method.to_lowercase()));
            let mut file = std::fs::File::create(&path)?;
            server.router().write_dot(method, &mut file)?;
            tracing::info!(method = %method, file = %path.display(), "Routing tree dumped");
        }
    }

    let bind_address: std::net::SocketAddr = server.config().server.listen_address().parse()?;
    let listener = TcpListener::bind(bind_address).await?;
    let shutdown = Shutdown::new();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
