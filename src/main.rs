//! race_server binary: loads the catalog, then serves the race API until a
//! shutdown signal arrives.

mod app;
mod catalog;
mod config;
mod http;
mod race;
mod util;

use std::future::pending;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::AppState;
use crate::config::Config;
use crate::http::build_router;
use crate::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    init_tracing(&config);
    init_server_time();

    info!(
        addr = %config.server_addr,
        data_file = %config.data_file.display(),
        tick_ms = config.tick_period.as_millis() as u64,
        "Starting race server"
    );

    // Tracks without segments get them now, before any race can use them
    let catalog = catalog::prepare_data_file(&config.data_file, &mut rand::thread_rng())?;
    info!(
        cars = catalog.cars.len(),
        tracks = catalog.tracks.len(),
        "Catalog ready"
    );

    let listener = TcpListener::bind(config.server_addr).await?;
    let router = build_router(AppState::new(config.clone(), catalog)?);

    info!(addr = %config.server_addr, "Listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// `RUST_LOG` wins over `LOG_LEVEL`. `LOG_FORMAT=json` switches to one JSON
/// object per line.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let (text, json) = if config.log_json {
        (None, Some(fmt::layer().json().with_current_span(false)))
    } else {
        (Some(fmt::layer().with_target(true)), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed is
/// logged and never fires, so the server keeps running on the other one.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Ctrl+C handler unavailable");
            pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable");
                pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<()>();

    let signal = tokio::select! {
        _ = ctrl_c => "ctrl-c",
        _ = terminate => "terminate",
    };
    info!(signal, "Draining connections before exit");
}
