//! Tollgate Auth Server
//!
//! Serves two surfaces over one `AuthService`:
//! - Public HTTP/JSON API (sign-up, sign-in, validate, refresh, permissions, confirm)
//! - Peer gRPC `Validate` for other services
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TG_CONFIG` | - | Optional TOML config file |
//! | `TG_HTTP_BIND` | `0.0.0.0:8080` | Public HTTP listen address |
//! | `TG_RPC_BIND` | `0.0.0.0:5300` | Peer gRPC listen address |
//! | `TG_STORE_BACKEND` / `DATABASE_URL` | `postgres` | `postgres` or `memory`, and the connection URL |
//! | `TG_NOTIFY_BACKEND` / `MESSAGE_QUEUE_URL` | `amqp` | `amqp` or `log`, and the broker URL |
//! | `TG_CONFIRM_BASE_URL` / `CONFIRM_ADDRESS` | `http://localhost:8080/confirm` | Confirmation link prefix |
//! | `TG_LOG_JSON` | `false` | Emit JSON logs |
//!
//! See `tg-config` for the full list, including token lifetimes and hashing cost.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{response::Json, routing::get, Router};
use tokio::{net::TcpListener, signal, sync::watch};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tg_auth::api::{auth_router, AuthApiDoc, AuthState};
use tg_auth::store::{CredentialStore, MemoryCredentialStore, MemoryTokenStore, PostgresStore, TokenStore};
use tg_auth::{AuthService, PasswordService, TokenIssuer};
use tg_config::{AuthServerConfig, NotifyBackend, StoreBackend};
use tg_notify::{AmqpDispatcher, LogDispatcher, NotificationDispatcher};
use tg_rpc::AuthRpcService;

#[tokio::main]
async fn main() -> Result<()> {
    tg_common::logging::init();

    info!("Starting Tollgate Auth Server");

    let config = AuthServerConfig::load().context("loading configuration")?;

    let (users, tokens) = open_stores(&config).await?;
    let notifier = open_dispatcher(&config).await?;

    let auth_service = Arc::new(AuthService::new(
        users,
        tokens,
        TokenIssuer::from_config(&config.tokens),
        PasswordService::from_config(&config.hashing)?,
        notifier,
        config.confirm.base_url.clone(),
    ));
    info!("Auth service initialized");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Public HTTP API
    let app = Router::new()
        .merge(auth_router(AuthState::new(auth_service.clone())))
        .route("/health", get(health_handler))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", AuthApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let http_listener = TcpListener::bind(&config.http.bind)
        .await
        .with_context(|| format!("binding HTTP listener on {}", config.http.bind))?;
    info!("HTTP API listening on http://{}", config.http.bind);

    let mut http_shutdown = shutdown_rx.clone();
    let http_server = tokio::spawn(async move {
        axum::serve(http_listener, app)
            .with_graceful_shutdown(async move {
                let _ = http_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    // Peer gRPC
    let rpc_addr: SocketAddr = config
        .rpc
        .bind
        .parse()
        .with_context(|| format!("invalid rpc bind address {}", config.rpc.bind))?;
    info!("Peer gRPC listening on {}", rpc_addr);

    let mut rpc_shutdown = shutdown_rx;
    let rpc_server = tokio::spawn(
        tonic::transport::Server::builder()
            .add_service(AuthRpcService::new(auth_service).into_server())
            .serve_with_shutdown(rpc_addr, async move {
                let _ = rpc_shutdown.wait_for(|stop| *stop).await;
            }),
    );

    shutdown_signal().await;
    info!("Shutdown signal received, draining");
    let _ = shutdown_tx.send(true);

    http_server.await?.context("HTTP server")?;
    rpc_server.await?.context("gRPC server")?;

    info!("Tollgate Auth Server stopped");
    Ok(())
}

async fn open_stores(
    config: &AuthServerConfig,
) -> Result<(Arc<dyn CredentialStore>, Arc<dyn TokenStore>)> {
    match config.store.backend {
        StoreBackend::Postgres => {
            info!("Connecting to PostgreSQL");
            let store = Arc::new(
                PostgresStore::connect(&config.store.url, config.store.max_connections)
                    .await
                    .context("connecting to PostgreSQL")?,
            );
            store.init_schema().await.context("initializing schema")?;
            let users: Arc<dyn CredentialStore> = store.clone();
            let tokens: Arc<dyn TokenStore> = store;
            Ok((users, tokens))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory stores; all accounts are lost on restart");
            let users: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
            let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
            Ok((users, tokens))
        }
    }
}

async fn open_dispatcher(config: &AuthServerConfig) -> Result<Arc<dyn NotificationDispatcher>> {
    let dispatcher: Arc<dyn NotificationDispatcher> = match config.notify.backend {
        NotifyBackend::Amqp => {
            let dispatcher = AmqpDispatcher::connect(&config.notify.url, config.notify.queue.clone())
                .await
                .context("connecting to message broker")?;
            info!(queue = %config.notify.queue, "AMQP dispatcher ready");
            Arc::new(dispatcher)
        }
        NotifyBackend::Log => {
            warn!("Using log dispatcher; confirmation links are only written to the log");
            Arc::new(LogDispatcher::new())
        }
    };
    Ok(dispatcher)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION")
    }))
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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
}
