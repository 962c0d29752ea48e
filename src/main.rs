use campus_auth::config::Config;
use campus_auth::router::{AuthState, auth_router};
use campus_auth::{AuthenticationService, CredentialVerifier, PoolManager};
use mimalloc::MiMalloc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        listen_addr = %cfg.listen_addr,
        loglevel = %cfg.loglevel,
        pool_min = cfg.pool.min_connections,
        pool_max = cfg.pool.max_connections
    );
    if cfg.admin_key.is_empty() {
        warn!("CAMPUS_ADMIN_KEY is not set; bulk password resets are disabled");
    }

    let pool = Arc::new(PoolManager::new(&cfg.database_url, cfg.pool.clone())?);
    // A database that is down at boot is tolerated; the first request retries.
    match pool.init().await {
        Ok(()) => info!("database connectivity verified"),
        Err(e) => warn!(error = %e, "database unavailable at startup; will retry on first use"),
    }

    let verifier = CredentialVerifier::new(&cfg.hashing)?;
    let service = AuthenticationService::new(pool.clone(), verifier, cfg.admin_key.clone());
    let app = auth_router(AuthState::new(service).with_trusted_proxy(cfg.trust_proxy_headers));

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    pool.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
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
                warn!(error = %e, "failed to listen for SIGTERM");
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
    info!("shutdown signal received");
}
