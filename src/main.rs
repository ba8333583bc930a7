//! KasiLend Backend Server
//!
//! HTTP server for loan applications, approvals, interest calculations
//! and stokvela member schedules.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use kasilend_server::auth::AuthService;
use kasilend_server::config::{Config, StoreBackend};
use kasilend_server::engine::LoanEngine;
use kasilend_server::routes;
use kasilend_server::services::{AuditLog, StokvelaService, UserService};
use kasilend_server::state::AppState;
use kasilend_server::storage::{DocumentStore, HttpDocumentStore, MemoryDocumentStore};
use kasilend_server::store::{CollectionStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "starting up");

    let store: Arc<dyn CollectionStore> = match config.store_backend {
        StoreBackend::Postgres => {
            // from_env already rejected a missing DATABASE_URL for this backend
            let database_url = match config.database_url.as_deref() {
                Some(url) => url,
                None => {
                    eprintln!("DATABASE_URL is required for the postgres backend");
                    std::process::exit(1);
                }
            };
            if let Some(masked) = config.database_url_masked() {
                tracing::info!(url = %masked, "connecting to database");
            }
            let pool = match PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(database_url)
                .await
            {
                Ok(pool) => pool,
                Err(e) => {
                    eprintln!("Failed to connect to database: {}", e);
                    std::process::exit(1);
                }
            };
            tracing::info!("database connected");
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let documents: Arc<dyn DocumentStore> = match &config.storage_api_url {
        Some(base_url) => Arc::new(HttpDocumentStore::new(
            base_url.clone(),
            config.storage_api_key.clone(),
        )),
        None => {
            tracing::warn!("STORAGE_API_URL not set; documents are kept in memory");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    let audit = AuditLog::new(store.clone());
    let users = Arc::new(UserService::new(store.clone(), audit.clone()));
    let auth = Arc::new(AuthService::new(
        users.clone(),
        audit.clone(),
        config.jwt_secret.clone(),
        config.jwt_access_token_ttl_seconds,
        config.jwt_refresh_token_ttl_days,
    ));
    let stokvela = Arc::new(StokvelaService::new(store.clone()));
    let engine = Arc::new(LoanEngine::new(
        store.clone(),
        documents,
        audit.clone(),
        config.interest_rate,
        config.storage_bucket.clone(),
    ));

    let state = AppState::new(engine, users, auth, stokvela, audit);

    let app = routes::api_router(state).layer(configure_cors(&config));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server shutdown complete");
}

fn configure_cors(config: &Config) -> CorsLayer {
    let allowed = config.cors_allowed_origins.as_deref().unwrap_or_default();
    if allowed.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => tracing::error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
