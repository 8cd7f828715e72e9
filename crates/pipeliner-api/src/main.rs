//! Pipeliner server entry point.
//!
//! Loads `.env`, parses flags, initializes tracing and serves the
//! configuration-extension endpoint until Ctrl+C or SIGTERM.

mod cli;
mod http;
mod state;

use anyhow::anyhow;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Flags read from the environment may come from `.env`.
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    pipeliner_observe::tracing_setup::init_tracing(cli.debug, cli.otel)
        .map_err(|e| anyhow!("failed to initialize tracing: {e}"))?;

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "loaded environment file"),
        Err(e) if e.not_found() => tracing::debug!("no .env file found"),
        Err(e) => tracing::warn!(error = %e, "failed to load .env file"),
    }

    let state = AppState::init(cli.into_config()).await?;

    let listener = tokio::net::TcpListener::bind(&state.config.listen_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "pipeliner listening");

    #[cfg(unix)]
    let _reload = state
        .auth
        .clone()
        .map(|auth| tokio::spawn(reload_key_on_hangup(auth, state.shutdown.clone())));

    let router = http::router::build_router(state.clone());

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(state.shutdown.clone()))
        .await?;

    tracing::info!("server stopped");
    pipeliner_observe::tracing_setup::shutdown_tracing();

    Ok(())
}

/// Re-read the public key file on every SIGHUP until shutdown.
#[cfg(unix)]
async fn reload_key_on_hangup(
    auth: pipeliner_infra::signature::AuthContext,
    shutdown: CancellationToken,
) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            tracing::warn!(error = %e, "failed to install SIGHUP handler, key reload disabled");
            return;
        }
    };

    loop {
        tokio::select! {
            received = hangup.recv() => {
                if received.is_none() {
                    return;
                }
                tracing::info!(path = %auth.keys().path().display(), "SIGHUP received, reloading public key");
                // Failures are logged by the store; the previous key stays active.
                let _ = auth.keys().reload().await;
            }
            _ = shutdown.cancelled() => return,
        }
    }
}

/// Wait for Ctrl+C or SIGTERM, then cancel in-flight builds.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, cancelling running builds");
    shutdown.cancel();
}
