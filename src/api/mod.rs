//! HTTP and WebSocket surface for the Herald relay

pub mod health;
pub mod speech;
pub mod stream;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::config::Config;
use crate::voice::{RecognizerConfig, SpeechBackend, Synthesizer};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Upstream streaming recognizer used by relay sessions
    pub recognizer: Arc<dyn SpeechBackend>,
    /// Fixed per-stream recognition parameters
    pub recognizer_config: RecognizerConfig,
    /// Upstream one-shot synthesizer
    pub synthesizer: Arc<dyn Synthesizer>,
    /// How long an idle upstream stream stays open before release
    pub stream_idle_timeout: Duration,
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a server from loaded configuration and upstream clients
    #[must_use]
    pub fn new(
        config: &Config,
        recognizer: Arc<dyn SpeechBackend>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        let state = Arc::new(ApiState {
            recognizer,
            recognizer_config: config.recognizer.clone(),
            synthesizer,
            stream_idle_timeout: config.stream_idle_timeout,
        });

        Self {
            state,
            port: config.server.port,
        }
    }

    /// Build the router with all routes
    fn router(&self) -> Router {
        let router = Router::new()
            .merge(stream::router(self.state.clone()))
            .merge(speech::router(self.state.clone()))
            .merge(health::router());

        // CORS for cross-origin browser clients
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind server: {e}")))?;

        tracing::info!(port = self.port, "server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("server error: {e}")))?;

        Ok(())
    }
}
