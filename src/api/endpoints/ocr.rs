//! OCR function endpoints.
//!
//! `POST /functions/v1/ocr-processing` runs recognition on a stored file
//! without creating a job. `POST /functions/v1/ocr-document-processor`
//! takes a base64 data URL, stores it and runs it through the job pipeline.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::{ApiError, OCR_PROCESSING_ERROR, OCR_PROCESSING_FAILED};
use crate::api::types::{run_blocking, timestamp_now, ApiContext, DataEnvelope};
use crate::models::{DocumentType, OcrJob};
use crate::pipeline::extraction::ExtractedData;
use crate::pipeline::{OcrError, OcrRequest};

// ── ocr-processing ──────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ProcessingRequest {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub player_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub file_path: String,
    pub raw_text: String,
    pub confidence_score: f64,
    pub extracted_data: ExtractedData,
    /// Milliseconds.
    pub processing_time: i64,
    pub timestamp: String,
}

/// `POST /functions/v1/ocr-processing`
pub async fn process(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ProcessingRequest>, JsonRejection>,
) -> Result<Json<DataEnvelope<ProcessingResult>>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest {
        code: OCR_PROCESSING_ERROR,
        message: e.body_text(),
    })?;
    let file_path = payload
        .file_path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest {
            code: OCR_PROCESSING_ERROR,
            message: OcrError::MissingFilePath.to_string(),
        })?;
    let request = OcrRequest {
        file_path,
        document_type: DocumentType::from_tag(payload.document_type.as_deref().unwrap_or_default()),
        player_id: payload.player_id,
    };

    let ocr = ctx.core.ocr().clone();
    let output = run_blocking(move || {
        let output = ocr.recognize(&request).map_err(|e| match e {
            OcrError::MissingFilePath => ApiError::BadRequest {
                code: OCR_PROCESSING_ERROR,
                message: e.to_string(),
            },
            other => ApiError::Failed {
                code: OCR_PROCESSING_ERROR,
                message: other.to_string(),
            },
        })?;
        Ok((request.file_path, output))
    })
    .await?;

    let (file_path, output) = output;
    tracing::info!(
        file_path = %file_path,
        confidence = output.confidence,
        "OCR processing request served"
    );
    Ok(Json(DataEnvelope::new(ProcessingResult {
        success: true,
        file_path,
        raw_text: output.raw_text,
        confidence_score: output.confidence,
        extracted_data: output.extracted_data,
        processing_time: output.processing_time_ms,
        timestamp: timestamp_now(),
    })))
}

// ── ocr-document-processor ──────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentProcessorRequest {
    #[serde(default)]
    pub document_data: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub player_id: Option<Uuid>,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

/// `POST /functions/v1/ocr-document-processor`
pub async fn process_document(
    State(ctx): State<ApiContext>,
    payload: Result<Json<DocumentProcessorRequest>, JsonRejection>,
) -> Result<Json<DataEnvelope<OcrJob>>, ApiError> {
    let Json(payload) = payload.map_err(|e| failed_request(e.body_text()))?;

    let (document_data, file_name) = match (payload.document_data, payload.file_name) {
        (Some(data), Some(name)) if !data.is_empty() && !name.trim().is_empty() => (data, name),
        _ => return Err(failed_request("Document data and filename are required")),
    };

    let (mime, bytes) = decode_data_url(&document_data).map_err(failed_request)?;
    if let Some(mime) = mime {
        if !(mime.starts_with("image/") || mime.contains("pdf")) {
            return Err(failed_request("Unsupported file type for OCR processing"));
        }
    }

    let document_type = DocumentType::from_tag(payload.document_type.as_deref().unwrap_or_default());
    let pipeline = ctx.core.pipeline().clone();
    let job = run_blocking(move || {
        pipeline
            .upload_and_submit(
                payload.player_id,
                document_type,
                &file_name,
                &bytes,
                payload.created_by,
            )
            .map_err(|e| ApiError::from_pipeline(OCR_PROCESSING_FAILED, e))
    })
    .await?;

    Ok(Json(DataEnvelope::new(job)))
}

fn failed_request(message: impl Into<String>) -> ApiError {
    ApiError::BadRequest {
        code: OCR_PROCESSING_FAILED,
        message: message.into(),
    }
}

/// Split `data:<mime>;base64,<payload>` into its mime type and bytes.
/// A bare base64 string has no mime type.
fn decode_data_url(data_url: &str) -> Result<(Option<String>, Vec<u8>), String> {
    let (mime, base64_data) = match data_url.find(',') {
        Some(idx) => {
            let header = &data_url[..idx];
            let mime = header
                .strip_prefix("data:")
                .and_then(|rest| rest.split(';').next())
                .filter(|m| !m.is_empty())
                .map(str::to_string);
            (mime, &data_url[idx + 1..])
        }
        None => (None, data_url),
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(base64_data.trim())
        .map_err(|e| format!("Base64 decode failed: {e}"))?;
    Ok((mime, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_data_url_with_mime() {
        let (mime, bytes) = decode_data_url("data:image/jpeg;base64,/9j/4AAQ").unwrap();
        assert_eq!(mime.as_deref(), Some("image/jpeg"));
        assert_eq!(bytes[0], 0xFF);
    }

    #[test]
    fn decode_data_url_raw_base64() {
        let raw = base64::engine::general_purpose::STANDARD.encode(b"hello");
        let (mime, bytes) = decode_data_url(&raw).unwrap();
        assert_eq!(mime, None);
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn decode_data_url_invalid_base64() {
        assert!(decode_data_url("data:application/pdf;base64,not-valid!!!").is_err());
    }
}
