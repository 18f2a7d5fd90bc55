//! Audio Shelf server binary.
//!
//! Serves a browsable audio library from a local directory or an
//! S3-compatible bucket. Protected routes pass through the shared-secret
//! cookie check and path validation before reaching the listing, redirect
//! and byte-range audio handlers.

mod assets;
mod auth;
mod config;
mod error;
mod http;
mod listing;
mod logging;
mod pages;
mod path;
mod range;
mod storage;

use axum_server::Handle;
use clap::Parser;
use shadow_rs::shadow;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

use crate::assets::AssetVersion;
use crate::auth::AuthGate;
use crate::config::{Args, Config, SHUTDOWN_GRACE_SECS};
use crate::storage::{StorageBackend, StorageRouter};

shadow!(build);

/// Starts the server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    logging::init_logging();

    let args = Args::parse();
    let config = Config::load(&args).inspect_err(|err| error!("failed loading config: {err}"))?;

    let storage = StorageRouter::from_config(&config.storage).map_err(|err| {
        error!("failed initializing storage: {err}");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string())
    })?;
    match storage.backend() {
        StorageBackend::Local(store) => {
            info!(root = %store.root_path().display(), "using local storage");
        }
        StorageBackend::ObjectStore(_) => {
            info!(bucket = config.storage.bucket.as_deref(), "using object storage");
        }
    }

    let assets = Arc::new(AssetVersion::generate());
    let app = http::build_router(
        Arc::new(storage),
        Arc::new(AuthGate::new(&config.secret)),
        assets,
    );

    let host = args
        .host
        .parse::<IpAddr>()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let addr = SocketAddr::new(host, args.port);
    let handle = Handle::new();

    info!("Starting HTTP server at {}", addr);

    tokio::spawn(shutdown_signal(handle.clone()));
    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(SHUTDOWN_GRACE_SECS)));
}
