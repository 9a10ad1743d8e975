use tenantdb_admin::api::{router, AppState};
use tenantdb_admin::audit::AuditLog;
use tenantdb_admin::config::{Config, DEFAULT_KEY_USER};
use tenantdb_admin::pool::PoolManager;
use tenantdb_admin::security::ApiKeyStore;

use std::sync::Arc;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env file if present, before anything reads it
    let dotenv_result = dotenvy::dotenv();

    let config = Config::from_env()?;

    std::fs::create_dir_all(&config.log_dir).unwrap_or_else(|e| {
        eprintln!(
            "Warning: Could not create log directory {:?}: {}",
            config.log_dir, e
        );
    });

    // Daily rotated JSON file next to console output
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "tenantdb-admin.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tenantdb_admin=debug")),
        )
        .with(fmt::layer().with_target(true))
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .json()
                .with_writer(non_blocking),
        )
        .init();

    debug!("Logging initialized - log directory: {:?}", config.log_dir);
    if let Err(e) = dotenv_result {
        debug!("No .env file loaded: {}", e);
    }

    let socket_addr = config.socket_addr()?;

    info!("Starting TenantDB Admin on {}", socket_addr);
    info!("Max pool connections: {}", config.max_connections);
    info!("Audit log: {:?}", config.audit_log_path);

    let pool_manager = Arc::new(PoolManager::new(&config).await?);

    let api_keys = Arc::new(ApiKeyStore::from_pairs(&config.api_keys));
    if api_keys.is_empty() {
        let key = api_keys.generate(DEFAULT_KEY_USER);
        warn!(
            "No API_KEYS configured; generated a key for '{}': {}",
            DEFAULT_KEY_USER, key
        );
    } else {
        info!("Loaded {} API keys", api_keys.len());
    }

    let audit = Arc::new(AuditLog::new(config.audit_log_path.clone()));
    let state = Arc::new(AppState::new(pool_manager, audit, api_keys));

    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&socket_addr).await?;
    info!("Server listening on {}", socket_addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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

    info!("Received shutdown signal");
}
