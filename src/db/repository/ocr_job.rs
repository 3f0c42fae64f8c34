use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{expect_one, opt_uuid};
use crate::db::{format_timestamp, now_utc, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::{DocumentType, OcrJob, OcrStatus};
use crate::pipeline::extraction::ExtractedData;

const OCR_JOB_COLUMNS: &str = "id, player_id, document_type, file_path, original_filename,
     ocr_status, raw_text, extracted_data, confidence_score, processing_time_ms, created_by,
     created_at, updated_at";

struct OcrJobRow {
    id: String,
    player_id: String,
    document_type: String,
    file_path: String,
    original_filename: String,
    ocr_status: String,
    raw_text: Option<String>,
    extracted_data: Option<String>,
    confidence_score: Option<f64>,
    processing_time_ms: Option<i64>,
    created_by: Option<String>,
    created_at: String,
    updated_at: String,
}

impl OcrJobRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            player_id: row.get(1)?,
            document_type: row.get(2)?,
            file_path: row.get(3)?,
            original_filename: row.get(4)?,
            ocr_status: row.get(5)?,
            raw_text: row.get(6)?,
            extracted_data: row.get(7)?,
            confidence_score: row.get(8)?,
            processing_time_ms: row.get(9)?,
            created_by: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn into_job(self) -> Result<OcrJob, DatabaseError> {
        let extracted_data = match self.extracted_data {
            Some(json) => Some(serde_json::from_str::<ExtractedData>(&json)?),
            None => None,
        };
        Ok(OcrJob {
            id: parse_uuid(&self.id)?,
            player_id: parse_uuid(&self.player_id)?,
            document_type: DocumentType::from_str(&self.document_type)?,
            file_path: self.file_path,
            original_filename: self.original_filename,
            status: OcrStatus::from_str(&self.ocr_status)?,
            raw_text: self.raw_text,
            extracted_data,
            confidence_score: self.confidence_score,
            processing_time_ms: self.processing_time_ms,
            created_by: opt_uuid(self.created_by)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

pub fn insert_ocr_job(conn: &Connection, job: &OcrJob) -> Result<(), DatabaseError> {
    let extracted = job
        .extracted_data
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    conn.execute(
        &format!(
            "INSERT INTO ocr_jobs ({OCR_JOB_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ),
        params![
            job.id.to_string(),
            job.player_id.to_string(),
            job.document_type.as_str(),
            job.file_path,
            job.original_filename,
            job.status.as_str(),
            job.raw_text,
            extracted,
            job.confidence_score,
            job.processing_time_ms,
            job.created_by.map(|id| id.to_string()),
            format_timestamp(&job.created_at),
            format_timestamp(&job.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_ocr_job(conn: &Connection, id: &Uuid) -> Result<Option<OcrJob>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT {OCR_JOB_COLUMNS} FROM ocr_jobs WHERE id = ?1"))?;
    let mut rows = stmt.query_map(params![id.to_string()], OcrJobRow::read)?;
    match rows.next() {
        Some(row) => Ok(Some(row?.into_job()?)),
        None => Ok(None),
    }
}

/// Newest first, optionally narrowed to one player.
pub fn list_ocr_jobs(
    conn: &Connection,
    player_id: Option<&Uuid>,
) -> Result<Vec<OcrJob>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {OCR_JOB_COLUMNS} FROM ocr_jobs
         WHERE ?1 IS NULL OR player_id = ?1
         ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map(params![player_id.map(|id| id.to_string())], OcrJobRow::read)?;

    let mut jobs = Vec::new();
    for row in rows {
        jobs.push(row?.into_job()?);
    }
    Ok(jobs)
}

/// Statuses a job may be in when it moves to `to`, as a JSON array for
/// `json_each`.
fn sources_of(to: OcrStatus) -> Result<String, DatabaseError> {
    let sources: Vec<&str> = OcrStatus::ALL
        .iter()
        .filter(|from| from.can_transition_to(to))
        .map(|from| from.as_str())
        .collect();
    Ok(serde_json::to_string(&sources)?)
}

/// Zero rows changed: either the job is gone or it has moved on.
fn transition_miss(conn: &Connection, id: &Uuid, to: OcrStatus) -> DatabaseError {
    match get_ocr_job(conn, id) {
        Ok(Some(job)) => DatabaseError::StatusConflict {
            entity_type: "OcrJob".into(),
            id: id.to_string(),
            current: job.status.as_str().into(),
            requested: to.as_str().into(),
        },
        Ok(None) => DatabaseError::NotFound {
            entity_type: "OcrJob".into(),
            id: id.to_string(),
        },
        Err(e) => e,
    }
}

/// Move a job to `status` and clear any previous results.
///
/// The update only applies when the stored status may legally move to
/// `status`; otherwise `StatusConflict`.
pub fn set_ocr_job_status(
    conn: &Connection,
    id: &Uuid,
    status: OcrStatus,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE ocr_jobs SET ocr_status = ?1, raw_text = NULL, extracted_data = NULL,
         confidence_score = NULL, processing_time_ms = NULL, updated_at = ?2
         WHERE id = ?3 AND ocr_status IN (SELECT value FROM json_each(?4))",
        params![
            status.as_str(),
            format_timestamp(&now_utc()),
            id.to_string(),
            sources_of(status)?,
        ],
    )?;
    if affected == 0 {
        return Err(transition_miss(conn, id, status));
    }
    Ok(())
}

/// Store recognition results and mark a `processing` job completed.
pub fn complete_ocr_job(
    conn: &Connection,
    id: &Uuid,
    raw_text: &str,
    extracted: &ExtractedData,
    confidence_score: f64,
    processing_time_ms: i64,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE ocr_jobs SET ocr_status = ?1, raw_text = ?2, extracted_data = ?3,
         confidence_score = ?4, processing_time_ms = ?5, updated_at = ?6
         WHERE id = ?7 AND ocr_status = ?8",
        params![
            OcrStatus::Completed.as_str(),
            raw_text,
            serde_json::to_string(extracted)?,
            confidence_score,
            processing_time_ms,
            format_timestamp(&now_utc()),
            id.to_string(),
            OcrStatus::Processing.as_str(),
        ],
    )?;
    if affected == 0 {
        return Err(transition_miss(conn, id, OcrStatus::Completed));
    }
    Ok(())
}

pub fn delete_ocr_job(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let affected = conn.execute("DELETE FROM ocr_jobs WHERE id = ?1", params![id.to_string()])?;
    expect_one(affected, "OcrJob", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::test_support::*;
    use crate::pipeline::extraction::extract;

    fn pending_job(conn: &Connection) -> OcrJob {
        let player = make_player(conn, "Paul", "Richter");
        let job = OcrJob::new(
            player.id,
            DocumentType::PhysioAssessment,
            &format!("ocr/{}/1700000000000.pdf", player.id),
            "befund.pdf",
        );
        insert_ocr_job(conn, &job).unwrap();
        job
    }

    #[test]
    fn insert_and_get_job() {
        let conn = test_db();
        let job = pending_job(&conn);
        let loaded = get_ocr_job(&conn, &job.id).unwrap().unwrap();
        assert_eq!(loaded, job);
        assert_eq!(loaded.status, OcrStatus::Pending);
    }

    #[test]
    fn complete_stores_results() {
        let conn = test_db();
        let job = pending_job(&conn);
        let text = "Schmerzstärke: 7\nDiagnose: Lumbalgie";
        let data = extract(text, DocumentType::PhysioAssessment);

        set_ocr_job_status(&conn, &job.id, OcrStatus::Processing).unwrap();
        complete_ocr_job(&conn, &job.id, text, &data, 0.92, 2000).unwrap();

        let loaded = get_ocr_job(&conn, &job.id).unwrap().unwrap();
        assert_eq!(loaded.status, OcrStatus::Completed);
        assert_eq!(loaded.raw_text.as_deref(), Some(text));
        assert_eq!(loaded.extracted_data, Some(data));
        assert_eq!(loaded.confidence_score, Some(0.92));
        assert_eq!(loaded.processing_time_ms, Some(2000));
    }

    #[test]
    fn failing_clears_results() {
        let conn = test_db();
        let job = pending_job(&conn);
        let data = extract("Diagnose: X", DocumentType::Generic);
        set_ocr_job_status(&conn, &job.id, OcrStatus::Processing).unwrap();
        complete_ocr_job(&conn, &job.id, "Diagnose: X", &data, 0.8, 10).unwrap();
        set_ocr_job_status(&conn, &job.id, OcrStatus::Processing).unwrap_err();

        let job = pending_job(&conn);
        set_ocr_job_status(&conn, &job.id, OcrStatus::Processing).unwrap();
        set_ocr_job_status(&conn, &job.id, OcrStatus::Failed).unwrap();

        let loaded = get_ocr_job(&conn, &job.id).unwrap().unwrap();
        assert_eq!(loaded.status, OcrStatus::Failed);
        assert!(loaded.raw_text.is_none());
        assert!(loaded.extracted_data.is_none());
    }

    #[test]
    fn second_claim_on_a_job_is_rejected() {
        let conn = test_db();
        let job = pending_job(&conn);
        set_ocr_job_status(&conn, &job.id, OcrStatus::Processing).unwrap();

        let err = set_ocr_job_status(&conn, &job.id, OcrStatus::Processing).unwrap_err();
        match err {
            DatabaseError::StatusConflict { current, requested, .. } => {
                assert_eq!(current, "processing");
                assert_eq!(requested, "processing");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            get_ocr_job(&conn, &job.id).unwrap().unwrap().status,
            OcrStatus::Processing
        );
    }

    #[test]
    fn only_processing_jobs_complete() {
        let conn = test_db();
        let job = pending_job(&conn);
        let data = extract("Diagnose: X", DocumentType::Generic);
        assert!(matches!(
            complete_ocr_job(&conn, &job.id, "Diagnose: X", &data, 0.8, 10),
            Err(DatabaseError::StatusConflict { .. })
        ));
        assert!(matches!(
            set_ocr_job_status(&conn, &Uuid::new_v4(), OcrStatus::Processing),
            Err(DatabaseError::NotFound { .. })
        ));
        let loaded = get_ocr_job(&conn, &job.id).unwrap().unwrap();
        assert_eq!(loaded.status, OcrStatus::Pending);
        assert!(loaded.raw_text.is_none());
    }

    #[test]
    fn list_filters_by_player() {
        let conn = test_db();
        let job = pending_job(&conn);
        pending_job(&conn);

        assert_eq!(list_ocr_jobs(&conn, None).unwrap().len(), 2);
        let mine = list_ocr_jobs(&conn, Some(&job.player_id)).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, job.id);
    }

    #[test]
    fn delete_removes_row() {
        let conn = test_db();
        let job = pending_job(&conn);
        delete_ocr_job(&conn, &job.id).unwrap();
        assert!(get_ocr_job(&conn, &job.id).unwrap().is_none());
        assert!(matches!(
            delete_ocr_job(&conn, &job.id),
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
