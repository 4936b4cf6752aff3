//! Gatehouse Auth Server
//!
//! REST service for registration, login, refresh-token rotation and logout.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use gatehouse_core::TokenConfig;
use gatehouse_core::config::{DEFAULT_ACCESS_EXPIRATION, DEFAULT_REFRESH_EXPIRATION};
use gatehouse_server::auth::TokenIssuer;
use gatehouse_server::http::{AppState, build_router};
use gatehouse_server::service::AuthService;
use gatehouse_server::storage::AuthDatabase;

#[derive(Parser)]
#[command(name = "gatehouse-server")]
#[command(version, about = "Gatehouse auth server - users, sessions and JWT token pairs")]
struct Args {
    /// Interface to bind.
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 3000, env = "PORT")]
    port: u16,

    /// Path to SQLite database file (default: ~/.gatehouse/auth.db).
    #[arg(long, env = "DATABASE_PATH")]
    db_path: Option<PathBuf>,

    /// Secret for signing access tokens.
    #[arg(long, env = "JWT_ACCESS_SECRET", hide_env_values = true)]
    jwt_access_secret: String,

    /// Secret for signing refresh tokens. Must differ from the access secret.
    #[arg(long, env = "JWT_REFRESH_SECRET", hide_env_values = true)]
    jwt_refresh_secret: String,

    /// Access token lifetime, e.g. `900`, `15m`, `1h`.
    #[arg(long, default_value = DEFAULT_ACCESS_EXPIRATION, env = "JWT_ACCESS_EXPIRATION")]
    jwt_access_expiration: String,

    /// Refresh token lifetime, e.g. `7d`, `30d`.
    #[arg(long, default_value = DEFAULT_REFRESH_EXPIRATION, env = "JWT_REFRESH_EXPIRATION")]
    jwt_refresh_expiration: String,

    /// Take client IPs from `X-Forwarded-For` (only behind a trusted proxy).
    #[arg(long, env = "TRUST_PROXY")]
    trust_proxy: bool,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    gatehouse_core::tracing_init::init_tracing(
        "gatehouse_server=info,tower_http=info",
        args.log_json,
    );

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %args.host,
        port = args.port,
        "Starting gatehouse-server"
    );

    let tokens = TokenConfig::new(
        args.jwt_access_secret,
        args.jwt_refresh_secret,
        &args.jwt_access_expiration,
        &args.jwt_refresh_expiration,
    )?;
    info!(
        access_ttl_secs = tokens.access_ttl.as_secs(),
        refresh_ttl_secs = tokens.refresh_ttl.as_secs(),
        "Token configuration loaded"
    );

    let db_path = match args.db_path {
        Some(path) => path,
        None => gatehouse_core::config::database_path()
            .context("cannot determine home directory; pass --db-path")?,
    };
    let db = AuthDatabase::open(&db_path).await?;

    let issuer = Arc::new(TokenIssuer::new(&tokens)?);
    let state = AppState {
        auth: Arc::new(AuthService::new(db, issuer)),
        trust_proxy: args.trust_proxy,
    };

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", args.host, args.port))?;
    info!(addr = %listener.local_addr()?, "Auth server listening");

    axum::serve(
        listener,
        build_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Auth server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
