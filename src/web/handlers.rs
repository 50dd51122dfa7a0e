use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;

use super::{AppState, HealthResponse, RunDiagnostics};
use crate::pipeline::{RunOptions, RunOutcome};
use crate::AppError;

pub const NO_NEW_ITEMS: &str = "No new items found.";

/// Raw query parameters of `GET /api/run`; everything arrives as text.
#[derive(Debug, Default, Deserialize)]
pub struct RunParams {
    pub include: Option<String>,
    pub exclude: Option<String>,
    pub max: Option<String>,
    pub debug: Option<String>,
    pub dedupe: Option<String>,
    pub reset: Option<String>,
    pub test: Option<String>,
}

impl RunParams {
    pub fn into_options(self) -> Result<RunOptions, AppError> {
        let max = match self.max.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
                AppError::Validation(format!("max must be a non-negative integer, got '{}'", raw))
            })?),
        };

        Ok(RunOptions {
            include: self.include.unwrap_or_default().to_lowercase(),
            exclude: self.exclude.unwrap_or_default().to_lowercase(),
            max,
            debug: parse_flag("debug", self.debug.as_deref(), false)?,
            dedupe: parse_flag("dedupe", self.dedupe.as_deref(), true)?,
            reset: parse_flag("reset", self.reset.as_deref(), false)?,
            test: parse_flag("test", self.test.as_deref(), false)?,
        })
    }
}

/// `1/true/yes` and `0/false/no`, case-insensitive. Absent or empty keeps the default.
fn parse_flag(name: &str, value: Option<&str>, default: bool) -> Result<bool, AppError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(AppError::Validation(format!(
            "{} must be one of 1/true/yes or 0/false/no, got '{}'",
            name, other
        ))),
    }
}

pub async fn run_pipeline(
    State(state): State<AppState>,
    Query(params): Query<RunParams>,
) -> Result<Response, AppError> {
    let options = params.into_options()?;
    let debug = options.debug;

    let outcome = state.pipeline.run(options).await.map_err(|e| {
        tracing::error!(error = %e, "Run failed");
        e
    })?;

    let response = match outcome {
        RunOutcome::NoNewItems(report) if debug => Json(RunDiagnostics {
            message: NO_NEW_ITEMS.to_string(),
            report,
            sample: None,
        })
        .into_response(),
        RunOutcome::NoNewItems(_) => NO_NEW_ITEMS.into_response(),
        RunOutcome::TestSample(report, sample) => Json(RunDiagnostics {
            message: "Test mode: returning items without sending a notification.".to_string(),
            report,
            sample: Some(sample),
        })
        .into_response(),
        RunOutcome::Delivered(report, _, receipt) => {
            let message = format!("Message sent via {}.", receipt.channel);
            if debug {
                Json(RunDiagnostics {
                    message,
                    report,
                    sample: None,
                })
                .into_response()
            } else {
                message.into_response()
            }
        }
    };

    Ok(response)
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let scheduler = match &state.scheduler {
        Some(status) => Some(status.snapshot().await),
        None => None,
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        sources: state.pipeline.sources().len(),
        channel: state.pipeline.channel().to_string(),
        scheduler,
    })
}
