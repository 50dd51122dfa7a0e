use axum::{middleware::from_fn, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::ServerConfig;
use crate::pipeline::Pipeline;
use crate::scheduler::SchedulerStatus;

pub mod handlers;
pub mod middleware;
pub mod responses;

pub use handlers::{health_check, run_pipeline, RunParams};
pub use responses::*;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub scheduler: Option<SchedulerStatus>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            scheduler: None,
            started_at: Instant::now(),
        }
    }

    /// Report the cron scheduler's counters on `/health`.
    pub fn with_scheduler(mut self, status: SchedulerStatus) -> Self {
        self.scheduler = Some(status);
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/run", get(run_pipeline))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(from_fn(middleware::request_logging))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn serve(config: &ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
