use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use kimp_core::KimpService;
use kimp_server::{create_router, Cli, ServerError};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "kimp-server failed");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run() -> Result<(), ServerError> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    let service = Arc::new(KimpService::from_config(&config, None)?);
    let app = create_router(service);

    let listener = TcpListener::bind(cli.bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: cli.bind,
            source,
        })?;
    info!(
        addr = %cli.bind,
        timeout_ms = config.timeout_ms,
        cache_ttl_ms = config.cache_ttl_ms,
        "kimp-server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("kimp-server stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kimp_server=info,kimp_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
