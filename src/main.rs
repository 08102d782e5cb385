//! ToDo backend (v1)
//!
//! A small item-tracking service built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ handlers ──▶ Arc<dyn Store> ◀── retention task
//!                                                        │              (periodic)
//!                                    ┌───────────────────┼───────────────────┐
//!                                    ▼                   ▼                   ▼
//!                              MemoryStore         DocumentStore        TableStore
//!                              (in process)       (revisioned REST)   (object store)
//! ```
//!
//! The backend is chosen once at startup from the platform's service
//! bindings; with none bound the service keeps items in memory.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use todo_backend::config::{load_config, AppConfig};
use todo_backend::http::HttpServer;
use todo_backend::lifecycle::Shutdown;
use todo_backend::observability::{logging, metrics};
use todo_backend::store::{factory, StoreFactory};

#[derive(Parser, Debug)]
#[command(name = "todo-backend", version, about = "ToDo item storage service")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listener address, overriding the configured one
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = AppConfig::default();
            todo_backend::config::loader::apply_env_overrides(
                &mut config,
                std::env::var("PORT").ok().as_deref(),
            );
            config
        }
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("todo-backend v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        retention_ceiling = config.retention.ceiling,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let store_factory = StoreFactory::from_env(config.store.clone(), config.retention.clone());
    let store = factory::instance(&store_factory, &shutdown).await;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&config, store);
    let server_shutdown = shutdown.subscribe();

    let signal = tokio::spawn(async move {
        shutdown.trigger_on_ctrl_c().await;
    });

    server.run(listener, server_shutdown).await?;
    signal.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}
