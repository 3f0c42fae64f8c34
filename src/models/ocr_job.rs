use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DocumentType, OcrStatus};
use crate::pipeline::extraction::ExtractedData;

/// One document submitted for digitization.
///
/// `raw_text`, `extracted_data`, `confidence_score` and `processing_time_ms`
/// are only set once the job reaches `Completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrJob {
    pub id: Uuid,
    pub player_id: Uuid,
    pub document_type: DocumentType,
    pub file_path: String,
    pub original_filename: String,
    pub status: OcrStatus,
    pub raw_text: Option<String>,
    pub extracted_data: Option<ExtractedData>,
    pub confidence_score: Option<f64>,
    pub processing_time_ms: Option<i64>,
    pub created_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl OcrJob {
    pub fn new(
        player_id: Uuid,
        document_type: DocumentType,
        file_path: &str,
        original_filename: &str,
    ) -> Self {
        let now = crate::db::now_utc();
        Self {
            id: Uuid::new_v4(),
            player_id,
            document_type,
            file_path: file_path.to_string(),
            original_filename: original_filename.to_string(),
            status: OcrStatus::Pending,
            raw_text: None,
            extracted_data: None,
            confidence_score: None,
            processing_time_ms: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}
