use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use frog_core::config::GatewayConfig;
use frog_core::{EventBus, FrogError};
use frog_engine::{ContextBuilder, WorkflowRunner};

use crate::routes;
use crate::state::AppState;

/// HTTP gateway built on axum.
pub struct GatewayServer {
    config: GatewayConfig,
    runner: Arc<WorkflowRunner>,
    contexts: Arc<ContextBuilder>,
    event_bus: Arc<EventBus>,
    run_log_dir: Option<PathBuf>,
}

impl GatewayServer {
    /// `runner` should publish on `event_bus` for run logs to see its events.
    pub fn new(
        config: GatewayConfig,
        runner: Arc<WorkflowRunner>,
        contexts: Arc<ContextBuilder>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            config,
            runner,
            contexts,
            event_bus,
            run_log_dir: None,
        }
    }

    /// Write a JSONL log per run under `dir`.
    pub fn with_run_logs(mut self, dir: PathBuf) -> Self {
        self.run_log_dir = Some(dir);
        self
    }

    fn state(&self, shutdown: CancellationToken) -> Arc<AppState> {
        Arc::new(AppState {
            config: self.config.clone(),
            runner: self.runner.clone(),
            contexts: self.contexts.clone(),
            event_bus: self.event_bus.clone(),
            run_log_dir: self.run_log_dir.clone(),
            shutdown,
        })
    }

    pub fn router(&self, shutdown: CancellationToken) -> Router {
        Router::new()
            .route("/", get(routes::root))
            .route("/health", get(routes::health))
            .route("/v1/tools", get(routes::list_tools))
            .route("/v1/workflows/run", post(routes::run_workflow))
            .layer(CorsLayer::permissive())
            .with_state(self.state(shutdown))
    }

    /// Run the gateway server until the cancellation token is triggered.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let app = self.router(shutdown.clone());

        let listener = TcpListener::bind(&self.config.bind)
            .await
            .map_err(|e| FrogError::Gateway(format!("cannot bind {}: {}", self.config.bind, e)))?;
        info!(bind = %self.config.bind, "Gateway listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Gateway shut down");
        Ok(())
    }
}
