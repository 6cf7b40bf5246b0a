//! HTTP surface for Frugal

mod health;

use std::net::SocketAddr;

use axum::Router;
use frugal_config::Config;
use frugal_llm::RouterState;
use tower_http::trace::TraceLayer;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the router state or any backend client fails to
    /// initialize
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let state = RouterState::from_config(config)?;
        Ok(Self::with_state(config, state))
    }

    /// Build the server around an existing router state
    pub fn with_state(config: &Config, state: RouterState) -> Self {
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)));

        let mut app = frugal_llm::router_routes(state.clone());

        if config.server.health.enabled {
            let health = Router::new()
                .route(&config.server.health.path, axum::routing::get(health::health_handler))
                .with_state(state);
            app = app.merge(health);
        }

        app = app.layer(TraceLayer::new_for_http());

        Self {
            router: app,
            listen_address,
        }
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
