use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::aggregator::BatchSummary;
use crate::driver::{self, Limits, TrackJob};
use crate::error::LedgerError;
use crate::page_source::SourceFactory;
use crate::presets;
use crate::status::StatusSnapshot;

use super::AppState;
use super::models::{
    ErrorResponse, ExportResponse, PLACEHOLDER_BUSINESS, PLACEHOLDER_LOCATION, ResultsResponse,
    StartRequest, StatusResponse,
};

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn required(value: Option<&str>, placeholder: &str, what: &str) -> Result<String, String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() && v != placeholder => Ok(v.to_string()),
        _ => Err(format!("Please enter a {what}")),
    }
}

/// Expands a start request into the batch's jobs.
pub fn plan_jobs(request: &StartRequest, limits: Limits) -> Result<Vec<TrackJob>, String> {
    if request.choice.trim() == "5" {
        let business = required(request.business.as_deref(), PLACEHOLDER_BUSINESS, "business name")?;
        let location = required(request.location.as_deref(), PLACEHOLDER_LOCATION, "location")?;
        let keywords: Vec<String> = request
            .keywords
            .as_deref()
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        if keywords.is_empty() {
            return Err("Please enter at least one keyword".to_string());
        }
        return driver::custom_jobs(&business, &[], &location, &keywords, limits)
            .map_err(|e| e.to_string());
    }

    let key = presets::choice_key(&request.choice)
        .ok_or_else(|| format!("Invalid choice '{}'", request.choice.trim()))?;
    driver::preset_jobs(&presets::select(key), &presets::default_keywords(), limits)
        .map_err(|e| e.to_string())
}

pub async fn start_tracking<F: SourceFactory>(
    State(state): State<Arc<AppState<F>>>,
    Json(request): Json<StartRequest>,
) -> Response {
    let jobs = match plan_jobs(&request, state.limits) {
        Ok(jobs) => jobs,
        Err(message) => return error(StatusCode::BAD_REQUEST, message),
    };

    let mut cancel_slot = state.cancel.lock().await;
    if !state.status.try_start(jobs.len()).await {
        return error(StatusCode::BAD_REQUEST, "Tracking already in progress");
    }
    let token = CancellationToken::new();
    *cancel_slot = Some(token.clone());
    drop(cancel_slot);

    tracing::info!(choice = %request.choice, jobs = jobs.len(), "tracking started");

    let preset = presets::choice_key(&request.choice);
    let pacing = state.pacing.for_preset(preset);

    let state = state.clone();
    tokio::spawn(async move {
        let findings = state.runner.clone().run_paced(jobs, pacing, token).await;
        let summary = BatchSummary::from_findings(&findings);
        state.status.log(summary.to_string()).await;
        let mut cancel_slot = state.cancel.lock().await;
        cancel_slot.take();
        state.status.finish().await;
        drop(cancel_slot);
        tracing::info!(
            found = summary.found,
            total = summary.total,
            "tracking finished"
        );
    });

    Json(StatusResponse {
        status: "started".to_string(),
    })
    .into_response()
}

pub async fn tracking_status<F: SourceFactory>(
    State(state): State<Arc<AppState<F>>>,
) -> Json<StatusSnapshot> {
    Json(state.status.snapshot().await)
}

pub async fn results<F: SourceFactory>(State(state): State<Arc<AppState<F>>>) -> Json<ResultsResponse> {
    let findings = match state.ledger.load() {
        Ok(findings) => findings,
        Err(LedgerError::Missing(_)) => return Json(ResultsResponse::empty("No results file found")),
        Err(e) => {
            log::warn!("failed to read ledger: {e}");
            return Json(ResultsResponse::empty(format!("Error reading CSV: {e}")));
        }
    };

    let summary = BatchSummary::from_findings(&findings);
    Json(ResultsResponse {
        error: None,
        found: summary.found,
        total: summary.total,
        success_rate: summary.success_rate,
        data: findings,
    })
}

pub async fn download_csv<F: SourceFactory>(State(state): State<Arc<AppState<F>>>) -> Response {
    if !state.ledger.exists() {
        return (
            StatusCode::NOT_FOUND,
            Json(ExportResponse {
                filename: None,
                success: false,
                message: "No results file found".to_string(),
            }),
        )
            .into_response();
    }

    match state.ledger.export(&state.export_dir) {
        Ok(path) => Json(ExportResponse {
            filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            success: true,
            message: "CSV exported successfully".to_string(),
        })
        .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ExportResponse {
                filename: None,
                success: false,
                message: format!("Export failed: {e}"),
            }),
        )
            .into_response(),
    }
}

pub async fn cancel<F: SourceFactory>(State(state): State<Arc<AppState<F>>>) -> Response {
    match state.cancel.lock().await.as_ref() {
        Some(token) => {
            token.cancel();
            tracing::info!("tracking cancellation requested");
            Json(StatusResponse {
                status: "cancelling".to_string(),
            })
            .into_response()
        }
        None => error(StatusCode::CONFLICT, "No tracking in progress"),
    }
}

pub async fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "Endpoint not found")
}
