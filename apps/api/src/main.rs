mod config;
mod errors;
mod intake;
mod mailer;
mod response;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::intake::upload::UploadStore;
use crate::mailer::SmtpMailer;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; only malformed values fail here
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting careers site v{} ({:?})",
        env!("CARGO_PKG_VERSION"),
        config.environment
    );

    // Temp upload directory, swept of anything a previous run left behind
    let uploads = UploadStore::new(&config.upload_dir);
    let purged = uploads
        .prepare()
        .await
        .with_context(|| format!("Failed to prepare {}", config.upload_dir.display()))?;
    if purged > 0 {
        warn!(purged, "removed leftover uploads from a previous run");
    }
    info!("Upload directory: {}", uploads.dir().display());

    // Mail transport, verified per request rather than at startup
    let mailer = SmtpMailer::new(&config.mail).context("Invalid mail configuration")?;
    info!(
        "SMTP transport configured ({}:{}, recipient {})",
        config.mail.smtp_host, config.mail.smtp_port, config.mail.to_email
    );

    let state = AppState {
        config: config.clone(),
        mailer: Arc::new(mailer),
        uploads,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.socket_addr()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
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

    info!("Shutdown signal received");
}
