use anyhow::{Context, Result};
use clap::Parser;
use mentorship::{
    api,
    config::{self, Config, ConfigOverrides, StoreBackend},
    logging,
    relationship::RelationshipService,
    store::{EntityStore, InMemoryStore, MongoStore},
};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Serve the mentor/student relationship API over HTTP.
#[derive(Parser)]
#[command(name = "mentorship", version, about)]
struct Cli {
    /// Port to listen on (overrides SERVER_PORT / PORT).
    #[arg(long)]
    port: Option<u16>,
    /// Entity store backend (overrides STORE_BACKEND).
    #[arg(long, value_enum)]
    store: Option<StoreBackend>,
    /// MongoDB database name (overrides MONGODB_DATABASE).
    #[arg(long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init_config(ConfigOverrides {
        server_port: cli.port,
        store_backend: cli.store,
        mongodb_database: cli.database,
    })
    .context("failed to load configuration")?;
    logging::init_tracing();

    let store = open_store(config).await?;
    let service = Arc::new(RelationshipService::new(
        store.clone(),
        config.bulk_assign_on_missing,
    ));
    let app = api::create_router(service);

    let (listener, port) = bind_listener(config.server_port)
        .await
        .context("failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    store.close().await;
    served.context("HTTP server terminated unexpectedly")
}

async fn open_store(config: &Config) -> Result<Arc<dyn EntityStore>> {
    match config.store_backend {
        StoreBackend::Mongo => {
            let uri = config.require_mongodb_uri()?;
            let store = MongoStore::connect(uri, &config.mongodb_database)
                .await
                .inspect_err(|err| tracing::error!(error = %err, "MongoDB unreachable at startup"))
                .context("failed to connect to MongoDB")?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; records are lost on exit");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}

async fn bind_listener(configured: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = configured {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4100..=4199;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4100-4199",
    ))
}
