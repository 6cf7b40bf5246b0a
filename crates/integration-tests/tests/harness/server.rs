//! Test server wrapper that starts Frugal on a random port

use std::net::SocketAddr;

use frugal_config::Config;
use frugal_server::Server;
use tokio_util::sync::CancellationToken;

/// A running test server instance
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
}

impl TestServer {
    /// Start a test server with the given configuration
    ///
    /// Binds to port 0 for automatic port assignment
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        let server = Server::new(&config)?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        // Bind the listener here so we know the actual port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        tokio::spawn(async move {
            axum::serve(listener, server.into_router())
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            addr,
            shutdown,
            client: reqwest::Client::new(),
        })
    }

    /// Base URL of the running test server
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Send a prompt to the chat endpoint
    pub async fn chat(&self, prompt: &str) -> reqwest::Response {
        self.chat_body(serde_json::json!({ "prompt": prompt })).await
    }

    /// Send an arbitrary JSON body to the chat endpoint
    pub async fn chat_body(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/v1/chat"))
            .json(&body)
            .send()
            .await
            .expect("chat request")
    }

    /// Fetch the ledger report
    pub async fn stats(&self) -> serde_json::Value {
        self.client
            .get(self.url("/api/v1/stats"))
            .send()
            .await
            .expect("stats request")
            .json()
            .await
            .expect("stats body")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
