use axum::{
    Router,
    routing::{get, post},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::driver::{BatchRunner, Limits, PacingProfile};
use crate::ledger::Ledger;
use crate::page_source::SourceFactory;
use crate::status::StatusBoard;

pub mod handlers;
pub mod models;

/// Shared state of the tracking API. At most one batch runs at a time; its
/// cancellation token lives in `cancel` while it is active.
pub struct AppState<F: SourceFactory> {
    pub runner: Arc<BatchRunner<F>>,
    pub ledger: Arc<Ledger>,
    pub status: Arc<StatusBoard>,
    pub export_dir: PathBuf,
    pub limits: Limits,
    pub pacing: PacingProfile,
    pub cancel: Mutex<Option<CancellationToken>>,
}

impl<F: SourceFactory> AppState<F> {
    pub fn new(
        runner: Arc<BatchRunner<F>>,
        ledger: Arc<Ledger>,
        export_dir: impl Into<PathBuf>,
        limits: Limits,
    ) -> Self {
        Self {
            status: runner.status().clone(),
            runner,
            ledger,
            export_dir: export_dir.into(),
            limits,
            pacing: PacingProfile::none(),
            cancel: Mutex::new(None),
        }
    }

    pub fn with_pacing(mut self, pacing: PacingProfile) -> Self {
        self.pacing = pacing;
        self
    }
}

pub fn create_router<F: SourceFactory>(state: Arc<AppState<F>>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/start-tracking", post(handlers::start_tracking::<F>))
        .route("/api/tracking-status", get(handlers::tracking_status::<F>))
        .route("/api/results", get(handlers::results::<F>))
        .route("/api/download-csv", get(handlers::download_csv::<F>))
        .route("/api/cancel", post(handlers::cancel::<F>))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(cors)
}
