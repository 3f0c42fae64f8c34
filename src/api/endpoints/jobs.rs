//! OCR job management: list, inspect, retry, promote, download, delete.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{run_blocking, ApiContext, DataEnvelope};
use crate::models::OcrJob;
use crate::pipeline::Promoted;

#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    pub player_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PromoteRequest {
    #[serde(default)]
    pub promoted_by: Option<Uuid>,
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid ID format: {raw}")))
}

/// `GET /api/ocr-jobs`
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<JobListQuery>,
) -> Result<Json<DataEnvelope<Vec<OcrJob>>>, ApiError> {
    let pipeline = ctx.core.pipeline().clone();
    let jobs = run_blocking(move || Ok(pipeline.list_jobs(query.player_id.as_ref())?)).await?;
    Ok(Json(DataEnvelope::new(jobs)))
}

/// `GET /api/ocr-jobs/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(job_id): Path<String>,
) -> Result<Json<DataEnvelope<OcrJob>>, ApiError> {
    let id = parse_id(&job_id)?;
    let pipeline = ctx.core.pipeline().clone();
    let job = run_blocking(move || Ok(pipeline.get_job(&id)?)).await?;
    Ok(Json(DataEnvelope::new(job)))
}

/// `POST /api/ocr-jobs/:id/retry`
pub async fn retry(
    State(ctx): State<ApiContext>,
    Path(job_id): Path<String>,
) -> Result<Json<DataEnvelope<OcrJob>>, ApiError> {
    let id = parse_id(&job_id)?;
    let pipeline = ctx.core.pipeline().clone();
    let job = run_blocking(move || Ok(pipeline.retry_job(&id)?)).await?;
    Ok(Json(DataEnvelope::new(job)))
}

/// `POST /api/ocr-jobs/:id/promote`
pub async fn promote(
    State(ctx): State<ApiContext>,
    Path(job_id): Path<String>,
    body: Option<Json<PromoteRequest>>,
) -> Result<Json<DataEnvelope<Promoted>>, ApiError> {
    let id = parse_id(&job_id)?;
    let promoted_by = body.and_then(|Json(b)| b.promoted_by);
    let pipeline = ctx.core.pipeline().clone();
    let record = run_blocking(move || Ok(pipeline.promote_job(&id, promoted_by)?)).await?;
    Ok(Json(DataEnvelope::new(record)))
}

/// `DELETE /api/ocr-jobs/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(job_id): Path<String>,
) -> Result<Json<DataEnvelope<OcrJob>>, ApiError> {
    let id = parse_id(&job_id)?;
    let pipeline = ctx.core.pipeline().clone();
    let removed = run_blocking(move || Ok(pipeline.delete_job(&id)?)).await?;
    Ok(Json(DataEnvelope::new(removed)))
}

/// `GET /api/ocr-jobs/:id/file` — the originally uploaded bytes.
pub async fn file(
    State(ctx): State<ApiContext>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&job_id)?;
    let pipeline = ctx.core.pipeline().clone();
    let original = run_blocking(move || Ok(pipeline.download_original(&id)?)).await?;

    let content_type = mime_guess::from_path(&original.filename)
        .first_or_octet_stream()
        .to_string();
    let disposition = format!(
        "attachment; filename=\"{}\"",
        original.filename.replace('"', "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(original.bytes),
    )
        .into_response())
}
