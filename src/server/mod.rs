//! HTTP front end over the rate cache.

pub mod error;
pub mod form;
pub mod handlers;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::core::config::AppConfig;
use crate::core::{RateCache, RateProvider};
use crate::providers::exchangerate_api::ExchangeRateApiProvider;
use crate::scheduler::{self, RefreshHandle};

/// Shared handler state. The cache is the only mutable state in the service.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<RateCache>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/currencies",
            get(handlers::currencies).fallback(handlers::method_not_allowed),
        )
        .route(
            "/convert",
            post(handlers::convert).fallback(handlers::method_not_allowed),
        )
        .route(
            "/manual-convert",
            post(handlers::manual_convert).fallback(handlers::method_not_allowed),
        )
        .fallback(handlers::not_found)
        .layer(CatchPanicLayer::custom(handlers::panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builds the rate cache backed by the configured upstream provider.
pub fn build_cache(config: &AppConfig) -> Result<Arc<RateCache>> {
    let provider = ExchangeRateApiProvider::from_config(&config.provider)?;
    cache_with_provider(config, Arc::new(provider))
}

fn cache_with_provider(
    config: &AppConfig,
    provider: Arc<dyn RateProvider>,
) -> Result<Arc<RateCache>> {
    Ok(Arc::new(RateCache::new(
        provider,
        &config.base_currency,
        config.fetch_budget()?,
    )))
}

/// Loads the first table, then starts the periodic refresh.
async fn prepare(cache: &Arc<RateCache>, refresh_interval: Duration) -> RefreshHandle {
    scheduler::refresh_once(cache).await;
    scheduler::spawn_refresh_loop(
        Arc::clone(cache),
        refresh_interval,
        Instant::now() + refresh_interval,
    )
}

/// Information about a running server
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub host: String,
    pub port: u16,
}

impl ServerInfo {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// A server running in the background. Dropping it stops both the server and the refresh loop.
pub struct ServerHandle {
    pub info: ServerInfo,
    pub cache: Arc<RateCache>,
    _refresh: RefreshHandle,
    server: JoinHandle<()>,
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn serve<F>(listener: TcpListener, cache: Arc<RateCache>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(AppState { cache });
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Runs the service until Ctrl-C.
///
/// Failing to bind the listening socket is the only fatal startup error; a failed
/// first refresh is logged and the server starts with an empty cache.
pub async fn run_server(config: AppConfig) -> Result<()> {
    config.validate_for_server()?;
    let cache = build_cache(&config)?;

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    info!("Server listening on {}", bind_address);

    let _refresh = prepare(&cache, config.refresh_interval()).await;
    serve(listener, cache, shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

/// Starts the service on a random port in the background, using `provider` for rates.
pub async fn start_server_with_random_port(
    config: &AppConfig,
    provider: Arc<dyn RateProvider>,
) -> Result<ServerHandle> {
    let cache = cache_with_provider(config, provider)?;

    let listener = TcpListener::bind(format!("{}:0", config.server.host))
        .await
        .context("Failed to bind random port")?;
    let actual_addr = listener.local_addr()?;
    let info = ServerInfo {
        host: config.server.host.clone(),
        port: actual_addr.port(),
    };
    info!("Started server on {} (random port)", info.url());

    let refresh = prepare(&cache, config.refresh_interval()).await;
    let server_cache = Arc::clone(&cache);
    let server = tokio::spawn(async move {
        if let Err(e) = serve(listener, server_cache, std::future::pending()).await {
            error!("Server error: {:#}", e);
        }
    });

    Ok(ServerHandle {
        info,
        cache,
        _refresh: refresh,
        server,
    })
}
