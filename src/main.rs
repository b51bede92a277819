// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mindful_server::{
    api::router,
    config::{AppConfig, LogFormat, TlsSettings},
    error::set_diagnostic_mode,
    mail::LogMailer,
    state::AppState,
    storage::{DocumentStore, JsonFileStore, MemoryStore},
};

/// Used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// How long in-flight requests get to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

/// Cancel `token` on Ctrl-C or SIGTERM.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
    tracing::info!("Shutdown signal received");
    token.cancel();
}

async fn serve_plain(app: Router, addr: SocketAddr, token: CancellationToken) {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!(%addr, "Mindful server listening on http (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(token.cancelled_owned())
        .await
        .expect("HTTP server failed");
}

async fn serve_tls(app: Router, addr: SocketAddr, tls: TlsSettings, token: CancellationToken) {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .expect("Failed to load TLS certificate and key");

    let handle = Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        token.cancelled().await;
        shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    tracing::info!(%addr, "Mindful server listening on https (docs at /docs)");
    axum_server::bind_rustls(addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .expect("HTTPS server failed");
}

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(config.log_format);
    set_diagnostic_mode(!config.environment.is_production());

    let store: Arc<dyn DocumentStore> = match &config.data_dir {
        Some(dir) => {
            tracing::info!(data_dir = %dir.display(), "Using the JSON file store");
            Arc::new(JsonFileStore::open(dir).expect("Failed to open data directory"))
        }
        None => {
            tracing::warn!("DATA_DIR not set; documents live in memory only");
            Arc::new(MemoryStore::new())
        }
    };
    // Reset links are echoed to the log outside production. In production
    // the log mailer refuses delivery and password recovery answers 500.
    let mailer = Arc::new(LogMailer::new(!config.environment.is_production()));
    if config.environment.is_production() {
        tracing::warn!("No mail transport configured; password reset requests will fail");
    }

    let addr = config.bind_addr().expect("Failed to parse bind address");
    let tls = config.tls.clone();
    let state = AppState::new(config, store, mailer).expect("Failed to initialize auth service");
    let app = router(state);

    let token = CancellationToken::new();
    tokio::spawn(shutdown_signal(token.clone()));

    match tls {
        Some(tls) => serve_tls(app, addr, tls, token).await,
        None => serve_plain(app, addr, token).await,
    }
    tracing::info!("Server stopped");
}
