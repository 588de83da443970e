//! pitchbox-server - audio-to-MIDI transcription service
//!
//! Accepts an uploaded audio file over HTTP, runs it through the Basic
//! Pitch transcription model, and returns the detected notes as a Standard
//! MIDI File, base64-encoded in JSON (`POST /predict`) or as a raw
//! download (`POST /predict/file`).

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pitchbox_model::PitchModel;
use pitchbox_server::config::Args;
use pitchbox_server::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pitchbox=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting pitchbox-server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Model: {}", args.model_path.display());

    // Load the transcription model once; every request shares it read-only.
    let model_path = args.model_path.clone();
    let model = tokio::task::spawn_blocking(move || PitchModel::load(&model_path))
        .await
        .context("model load task failed")?
        .context("failed to load transcription model")?;

    let state = AppState::new(Arc::new(model));
    let app = build_router(state);

    let addr = SocketAddr::from((args.bind, args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    info!("Listening on http://{addr}");
    info!("Health check: http://{addr}/health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
