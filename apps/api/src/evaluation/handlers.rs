//! Axum route handlers for the Evaluation API.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::fetcher::is_drive_link;
use crate::evaluation::history::{EvaluationReport, HistoryEntry};
use crate::evaluation::models::{EvaluationOutcome, EvaluationRequest, MatchBand};
use crate::state::AppState;

/// Job descriptions shorter than this get an advisory.
const MIN_JD_WORDS: usize = 20;
const DEFAULT_RECENT_LIMIT: usize = 3;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct BandView {
    pub band: MatchBand,
    pub label: &'static str,
}

impl From<MatchBand> for BandView {
    fn from(band: MatchBand) -> Self {
        Self {
            band,
            label: band.label(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub outcome: EvaluationOutcome,
    pub band: Option<BandView>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/evaluations
///
/// Runs one evaluation. Pipeline failures are returned as a `failed`
/// outcome with 200; only blank input is rejected.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Json(request): Json<EvaluationRequest>,
) -> Result<Json<EvaluateResponse>, AppError> {
    if request.job_description.trim().is_empty() || request.resume_url.trim().is_empty() {
        return Err(AppError::Validation(
            "Please provide both job description and resume link.".to_string(),
        ));
    }

    let warnings = input_advisories(&request);
    for w in &warnings {
        warn!("Input advisory: {w}");
    }

    info!("Evaluating resume from {}", request.resume_url);
    let outcome = state.evaluator.evaluate(&request).await;
    let entry = state.history.record(outcome).await;

    Ok(Json(EvaluateResponse {
        band: entry.outcome.band().map(BandView::from),
        id: entry.id,
        timestamp: entry.timestamp,
        outcome: entry.outcome,
        warnings,
    }))
}

/// GET /api/v1/evaluations?limit=N
pub async fn handle_recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<HistoryEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Json(state.history.recent(limit).await)
}

/// GET /api/v1/evaluations/:id/report
///
/// Pretty-printed JSON report served as an attachment.
pub async fn handle_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let entry = state
        .history
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Evaluation {id} not found")))?;

    let now = Utc::now();
    let report = EvaluationReport::for_entry(&entry);
    let body = serde_json::to_string_pretty(&report)
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("report serialization")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    EvaluationReport::file_name(now)
                ),
            ),
        ],
        body,
    ))
}

/// Non-blocking hints about the inputs.
pub fn input_advisories(request: &EvaluationRequest) -> Vec<String> {
    let mut warnings = Vec::new();
    if !is_drive_link(&request.resume_url) {
        warnings.push("Please ensure you're using a Google Drive link".to_string());
    }
    if request.job_description.split_whitespace().count() < MIN_JD_WORDS {
        warnings.push(
            "Consider adding more details to the job description for better analysis"
                .to_string(),
        );
    }
    warnings
}
