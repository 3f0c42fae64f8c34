//! `POST /functions/v1/critical-values-monitor` — one monitor run on demand.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{run_blocking, timestamp_now, ApiContext};
use crate::monitor::{run_monitor, MonitorReport};

#[derive(Serialize)]
pub struct MonitorResponse {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: String,
    pub report: MonitorReport,
}

pub async fn run(State(ctx): State<ApiContext>) -> Result<Json<MonitorResponse>, ApiError> {
    let core = ctx.core.clone();
    let report = run_blocking(move || Ok(run_monitor(core.store(), core.thresholds())?)).await?;

    Ok(Json(MonitorResponse {
        success: true,
        message: "Critical values monitoring completed",
        timestamp: timestamp_now(),
        report,
    }))
}
