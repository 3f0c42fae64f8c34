//! OCR job pipeline: intake, processing, retry, deletion and promotion.
//!
//! A job moves `pending → processing → completed | failed`. The only way
//! back is an operator retry from `failed`. Processing runs synchronously
//! on the caller's thread; HTTP handlers call in via `spawn_blocking`.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::extraction::{DocumentDetails, ExtractedData};
use super::ocr::{OcrError, OcrRequest, OcrService};
use crate::db::{repository, DatabaseError};
use crate::models::*;
use crate::storage::{stored_name, FileStore, StorageError};
use crate::store::RecordStore;

const UNSUPPORTED_FILE_TYPE: &str = "Unsupported file type for OCR processing";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    #[error("OCR job not found: {0}")]
    NotFound(Uuid),

    #[error("OCR job cannot move from {from} to {to}")]
    InvalidTransition { from: OcrStatus, to: OcrStatus },

    #[error("OCR job {id} is {status}, not completed")]
    NotCompleted { id: Uuid, status: OcrStatus },

    #[error("Documents of type {0} cannot be turned into records")]
    NotPromotable(DocumentType),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),
}

/// Intake request for a file that is already in the file store.
#[derive(Debug, Clone)]
pub struct NewOcrJob {
    pub player_id: Option<Uuid>,
    pub document_type: DocumentType,
    pub file_path: String,
    pub original_filename: String,
    pub created_by: Option<Uuid>,
}

/// Record created from a completed job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum Promoted {
    PhysioAssessment(PhysioAssessment),
    MedicalTreatment(MedicalTreatment),
}

#[derive(Debug, Clone)]
pub struct OriginalFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Only images and PDFs go through recognition.
pub fn is_supported_file(filename: &str) -> bool {
    mime_guess::from_path(filename)
        .first()
        .map(|mime| mime.type_() == mime_guess::mime::IMAGE || mime.subtype() == mime_guess::mime::PDF)
        .unwrap_or(false)
}

/// Storage reference for a fresh upload: `ocr/<player_id>/<unix_millis>-<nonce>.<ext>`.
pub fn upload_path(player_id: &Uuid, filename: &str, millis: i64, nonce: &Uuid) -> String {
    format!("ocr/{player_id}/{}", stored_name(filename, millis, nonce))
}

// ═══════════════════════════════════════════════════════════
// OcrPipeline
// ═══════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct OcrPipeline {
    store: Arc<RecordStore>,
    files: Arc<dyn FileStore>,
    ocr: Arc<dyn OcrService>,
}

impl OcrPipeline {
    pub fn new(store: Arc<RecordStore>, files: Arc<dyn FileStore>, ocr: Arc<dyn OcrService>) -> Self {
        Self { store, files, ocr }
    }

    pub fn get_job(&self, id: &Uuid) -> Result<OcrJob, PipelineError> {
        self.store
            .read(|conn| repository::get_ocr_job(conn, id))?
            .ok_or(PipelineError::NotFound(*id))
    }

    /// Newest first, optionally for one player.
    pub fn list_jobs(&self, player_id: Option<&Uuid>) -> Result<Vec<OcrJob>, PipelineError> {
        Ok(self.store.read(|conn| repository::list_ocr_jobs(conn, player_id))?)
    }

    fn validate(&self, player_id: Option<Uuid>, filename: &str) -> Result<Uuid, PipelineError> {
        let player_id =
            player_id.ok_or_else(|| PipelineError::Validation("player_id ist erforderlich".into()))?;
        let known = self.store.read(|conn| repository::get_player(conn, &player_id))?;
        if known.is_none() {
            return Err(PipelineError::Validation(format!("Unknown player: {player_id}")));
        }
        if !is_supported_file(filename) {
            return Err(PipelineError::Validation(UNSUPPORTED_FILE_TYPE.into()));
        }
        Ok(player_id)
    }

    /// Validate and insert a `pending` job without processing it.
    pub fn create_job(&self, new: NewOcrJob) -> Result<OcrJob, PipelineError> {
        if new.file_path.trim().is_empty() {
            return Err(PipelineError::Validation(OcrError::MissingFilePath.to_string()));
        }
        let player_id = self.validate(new.player_id, &new.original_filename)?;

        let mut job = OcrJob::new(player_id, new.document_type, &new.file_path, &new.original_filename);
        job.created_by = new.created_by;
        let job = self.store.create_ocr_job(job)?;
        tracing::info!(
            job_id = %job.id,
            player_id = %player_id,
            document_type = job.document_type.as_str(),
            "OCR job created"
        );
        Ok(job)
    }

    /// Create the job and process it right away.
    ///
    /// A processing failure is returned, the job row stays as `failed`.
    pub fn submit(&self, new: NewOcrJob) -> Result<OcrJob, PipelineError> {
        let job = self.create_job(new)?;
        self.process_job(&job.id)
    }

    /// Store `bytes` under a fresh `ocr/...` path, then submit.
    pub fn upload_and_submit(
        &self,
        player_id: Option<Uuid>,
        document_type: DocumentType,
        original_filename: &str,
        bytes: &[u8],
        created_by: Option<Uuid>,
    ) -> Result<OcrJob, PipelineError> {
        let player_id = self.validate(player_id, original_filename)?;
        let path = upload_path(
            &player_id,
            original_filename,
            chrono::Utc::now().timestamp_millis(),
            &Uuid::new_v4(),
        );
        let reference = self.files.upload(&path, bytes)?;

        let job = match self.create_job(NewOcrJob {
            player_id: Some(player_id),
            document_type,
            file_path: reference.clone(),
            original_filename: original_filename.to_string(),
            created_by,
        }) {
            Ok(job) => job,
            Err(e) => {
                if let Err(cleanup) = self.files.delete(&reference) {
                    tracing::warn!(file_path = %reference, error = %cleanup, "Upload orphaned");
                }
                return Err(e);
            }
        };
        self.process_job(&job.id)
    }

    /// Run recognition for a `pending` or `failed` job.
    pub fn process_job(&self, id: &Uuid) -> Result<OcrJob, PipelineError> {
        let job = self.get_job(id)?;
        if !job.status.can_transition_to(OcrStatus::Processing) {
            return Err(PipelineError::InvalidTransition {
                from: job.status,
                to: OcrStatus::Processing,
            });
        }
        // A concurrent run may have claimed the job since the read above.
        if let Err(e) = self.store.set_ocr_job_status(id, OcrStatus::Processing) {
            return Err(status_error(id, OcrStatus::Processing, e));
        }
        tracing::info!(job_id = %id, "OCR processing started");

        match self.recognize(&job) {
            Ok(completed) => {
                tracing::info!(
                    job_id = %id,
                    confidence = completed.confidence_score.unwrap_or_default(),
                    processing_time_ms = completed.processing_time_ms.unwrap_or_default(),
                    "OCR processing completed"
                );
                self.notify_creator(&completed);
                Ok(completed)
            }
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "OCR processing failed");
                if let Err(mark) = self.store.set_ocr_job_status(id, OcrStatus::Failed) {
                    tracing::error!(job_id = %id, error = %mark, "Could not mark OCR job failed");
                }
                Err(e)
            }
        }
    }

    /// Manual retry. Only `failed` jobs qualify.
    pub fn retry_job(&self, id: &Uuid) -> Result<OcrJob, PipelineError> {
        let job = self.get_job(id)?;
        if job.status != OcrStatus::Failed {
            return Err(PipelineError::InvalidTransition {
                from: job.status,
                to: OcrStatus::Processing,
            });
        }
        self.process_job(id)
    }

    fn recognize(&self, job: &OcrJob) -> Result<OcrJob, PipelineError> {
        let output = self.ocr.recognize(&OcrRequest {
            file_path: job.file_path.clone(),
            document_type: job.document_type,
            player_id: Some(job.player_id),
        })?;
        self.store
            .complete_ocr_job(
                &job.id,
                &output.raw_text,
                &output.extracted_data,
                output.confidence,
                output.processing_time_ms,
            )
            .map_err(|e| status_error(&job.id, OcrStatus::Completed, e))
    }

    fn notify_creator(&self, job: &OcrJob) {
        let Some(recipient_id) = job.created_by else {
            return;
        };
        let result = self.store.create_notification(NewNotification {
            recipient_id,
            notification_type: NotificationType::NewDocument,
            title: "Dokument digitalisiert".into(),
            message: format!("{} wurde erfolgreich verarbeitet", job.original_filename),
            priority: Priority::Low,
            action_required: false,
            related_table: Some(Table::OcrJobs),
            related_id: Some(job.id),
            metadata: serde_json::json!({
                "original_filename": job.original_filename,
                "document_type": job.document_type,
                "confidence_score": job.confidence_score,
            }),
        });
        if let Err(e) = result {
            tracing::warn!(job_id = %job.id, error = %e, "Completion notification not sent");
        }
    }

    /// Delete the row, then the file. A file that cannot be removed is
    /// left behind and logged.
    pub fn delete_job(&self, id: &Uuid) -> Result<OcrJob, PipelineError> {
        let removed = self.store.delete_ocr_job(id).map_err(|e| match e {
            DatabaseError::NotFound { .. } => PipelineError::NotFound(*id),
            other => other.into(),
        })?;
        if let Err(e) = self.files.delete(&removed.file_path) {
            tracing::warn!(job_id = %id, file_path = %removed.file_path, error = %e, "OCR file orphaned");
        }
        tracing::info!(job_id = %id, "OCR job deleted");
        Ok(removed)
    }

    pub fn download_original(&self, id: &Uuid) -> Result<OriginalFile, PipelineError> {
        let job = self.get_job(id)?;
        let bytes = self.files.download(&job.file_path)?;
        Ok(OriginalFile {
            filename: job.original_filename,
            bytes,
        })
    }

    /// Turn a completed job into a physio assessment or medical treatment.
    ///
    /// Not idempotent: each call inserts a new record.
    pub fn promote_job(&self, id: &Uuid, promoted_by: Option<Uuid>) -> Result<Promoted, PipelineError> {
        let job = self.get_job(id)?;
        let data = match (&job.status, &job.extracted_data) {
            (OcrStatus::Completed, Some(data)) => data,
            _ => {
                return Err(PipelineError::NotCompleted {
                    id: job.id,
                    status: job.status,
                })
            }
        };

        let promoted = match job.document_type {
            DocumentType::PhysioAssessment => Promoted::PhysioAssessment(
                self.store
                    .create_physio_assessment(assessment_from(&job, data, promoted_by))?,
            ),
            DocumentType::MedicalReport => Promoted::MedicalTreatment(
                self.store
                    .create_medical_treatment(treatment_from(&job, data, promoted_by))?,
            ),
            other => return Err(PipelineError::NotPromotable(other)),
        };
        tracing::info!(job_id = %id, document_type = job.document_type.as_str(), "OCR job promoted");
        Ok(promoted)
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn record_date(data: &ExtractedData) -> chrono::NaiveDate {
    data.document_date()
        .unwrap_or_else(|| chrono::Utc::now().date_naive())
}

fn status_error(id: &Uuid, to: OcrStatus, err: DatabaseError) -> PipelineError {
    match err {
        DatabaseError::StatusConflict { current, .. } => match current.parse::<OcrStatus>() {
            Ok(from) => PipelineError::InvalidTransition { from, to },
            Err(e) => e.into(),
        },
        DatabaseError::NotFound { .. } => PipelineError::NotFound(*id),
        other => other.into(),
    }
}

fn assessment_from(job: &OcrJob, data: &ExtractedData, therapist_id: Option<Uuid>) -> PhysioAssessment {
    let mut assessment = PhysioAssessment::new(job.player_id, record_date(data));
    assessment.therapist_id = therapist_id;
    assessment.anamnesis.diagnosis = non_empty(&data.diagnosis);
    if let DocumentDetails::PhysioAssessment(fields) = &data.details {
        assessment.pain_intensity = Some(fields.pain_level.clamp(0, 10));
        assessment.anamnesis.mobility_assessment = non_empty(&fields.mobility_assessment);
        assessment.anamnesis.therapy_goals = non_empty(&fields.therapy_goals);
    }
    assessment
}

fn treatment_from(job: &OcrJob, data: &ExtractedData, created_by: Option<Uuid>) -> MedicalTreatment {
    let mut treatment = MedicalTreatment::new(job.player_id, record_date(data));
    treatment.created_by = created_by;
    treatment.diagnosis = non_empty(&data.diagnosis);
    treatment.treatment_notes = Some(format!("OCR-Import: {}", job.original_filename));
    if let DocumentDetails::MedicalReport(fields) = &data.details {
        treatment.icd10_code = fields.icd10_codes.first().cloned();
        treatment.therapy_recommendations = non_empty(&fields.recommendations);
    }
    treatment
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::db::repository::test_support::{make_player, make_profile};
    use crate::feed::Change;
    use crate::pipeline::ocr::{OcrOutput, SimulatedOcr};
    use crate::storage::LocalFileStore;

    /// Fails until switched on, then delegates to the simulator.
    struct SwitchableOcr {
        healthy: AtomicBool,
        inner: SimulatedOcr,
    }

    impl SwitchableOcr {
        fn failing() -> Self {
            Self {
                healthy: AtomicBool::new(false),
                inner: SimulatedOcr::new(Duration::ZERO),
            }
        }
    }

    impl OcrService for SwitchableOcr {
        fn recognize(&self, request: &OcrRequest) -> Result<OcrOutput, OcrError> {
            if self.healthy.load(Ordering::SeqCst) {
                self.inner.recognize(request)
            } else {
                Err(OcrError::Upstream {
                    status: 503,
                    body: "busy".into(),
                })
            }
        }
    }

    /// Another worker moves the job on while recognition runs.
    struct PreemptedOcr {
        store: Arc<RecordStore>,
        inner: SimulatedOcr,
    }

    impl OcrService for PreemptedOcr {
        fn recognize(&self, request: &OcrRequest) -> Result<OcrOutput, OcrError> {
            let jobs = self.store.read(|c| repository::list_ocr_jobs(c, None)).unwrap();
            for job in jobs.iter().filter(|j| j.file_path == request.file_path) {
                self.store.set_ocr_job_status(&job.id, OcrStatus::Failed).unwrap();
            }
            self.inner.recognize(request)
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<RecordStore>,
        files: Arc<LocalFileStore>,
        pipeline: OcrPipeline,
        player: Player,
    }

    fn fixture_with(ocr: Arc<dyn OcrService>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordStore::open_in_memory().unwrap());
        let files = Arc::new(LocalFileStore::new(dir.path()).unwrap());
        let player = store.read(|c| Ok(make_player(c, "Max", "Mustermann"))).unwrap();
        let pipeline = OcrPipeline::new(store.clone(), files.clone(), ocr);
        Fixture {
            _dir: dir,
            store,
            files,
            pipeline,
            player,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(SimulatedOcr::new(Duration::ZERO)))
    }

    fn new_job(player_id: Uuid, document_type: DocumentType) -> NewOcrJob {
        NewOcrJob {
            player_id: Some(player_id),
            document_type,
            file_path: format!("ocr/{player_id}/1.pdf"),
            original_filename: "befund.pdf".into(),
            created_by: None,
        }
    }

    #[test]
    fn upload_path_uses_last_extension() {
        let id = Uuid::nil();
        let nonce = Uuid::nil();
        assert_eq!(
            upload_path(&id, "scan.final.PNG", 1700000000000, &nonce),
            format!("ocr/{id}/1700000000000-{nonce}.PNG")
        );
    }

    #[test]
    fn only_images_and_pdfs_are_supported() {
        assert!(is_supported_file("befund.pdf"));
        assert!(is_supported_file("foto.JPG"));
        assert!(is_supported_file("scan.png"));
        assert!(!is_supported_file("bericht.docx"));
        assert!(!is_supported_file("bericht.doc"));
        assert!(!is_supported_file("ohne_endung"));
    }

    #[test]
    fn submit_completes_with_results() {
        let f = fixture();
        let job = f
            .pipeline
            .submit(new_job(f.player.id, DocumentType::PhysioAssessment))
            .unwrap();

        assert_eq!(job.status, OcrStatus::Completed);
        assert_eq!(job.confidence_score, Some(0.92));
        assert!(job.raw_text.as_deref().unwrap().contains("Schmerzstärke"));
        let data = job.extracted_data.unwrap();
        assert_eq!(data.diagnosis, "Lumbalgie, akut");
    }

    #[test]
    fn failure_marks_job_failed_without_results() {
        let f = fixture_with(Arc::new(SwitchableOcr::failing()));
        let err = f
            .pipeline
            .submit(new_job(f.player.id, DocumentType::MedicalReport))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Ocr(OcrError::Upstream { status: 503, .. })));

        let jobs = f.pipeline.list_jobs(Some(&f.player.id)).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, OcrStatus::Failed);
        assert!(jobs[0].raw_text.is_none());
        assert!(jobs[0].extracted_data.is_none());
        assert!(jobs[0].confidence_score.is_none());
    }

    #[test]
    fn retry_recovers_failed_job() {
        let ocr = Arc::new(SwitchableOcr::failing());
        let f = fixture_with(ocr.clone());
        let job = f
            .pipeline
            .create_job(new_job(f.player.id, DocumentType::Generic))
            .unwrap();
        assert!(f.pipeline.process_job(&job.id).is_err());

        ocr.healthy.store(true, Ordering::SeqCst);
        let retried = f.pipeline.retry_job(&job.id).unwrap();
        assert_eq!(retried.status, OcrStatus::Completed);
        assert_eq!(retried.confidence_score, Some(0.80));
    }

    #[test]
    fn completed_job_cannot_be_reprocessed() {
        let f = fixture();
        let job = f
            .pipeline
            .submit(new_job(f.player.id, DocumentType::Generic))
            .unwrap();
        assert!(matches!(
            f.pipeline.process_job(&job.id),
            Err(PipelineError::InvalidTransition {
                from: OcrStatus::Completed,
                to: OcrStatus::Processing
            })
        ));
        assert!(matches!(
            f.pipeline.retry_job(&job.id),
            Err(PipelineError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn validation_rejects_before_insert() {
        let f = fixture();

        let mut missing_file = new_job(f.player.id, DocumentType::Generic);
        missing_file.file_path = String::new();
        let mut missing_player = new_job(f.player.id, DocumentType::Generic);
        missing_player.player_id = None;
        let unknown_player = new_job(Uuid::new_v4(), DocumentType::Generic);
        let mut word_file = new_job(f.player.id, DocumentType::Generic);
        word_file.original_filename = "bericht.docx".into();

        for bad in [missing_file, missing_player, unknown_player, word_file] {
            assert!(matches!(f.pipeline.create_job(bad), Err(PipelineError::Validation(_))));
        }
        assert!(f.pipeline.list_jobs(None).unwrap().is_empty());
    }

    #[test]
    fn unsupported_file_message() {
        let f = fixture();
        let mut job = new_job(f.player.id, DocumentType::Generic);
        job.original_filename = "bericht.doc".into();
        let err = f.pipeline.create_job(job).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file type for OCR processing");
    }

    #[test]
    fn status_changes_reach_subscribers() {
        let f = fixture();
        let mut sub = f.store.feed().subscribe::<OcrJob>(None);
        f.pipeline
            .submit(new_job(f.player.id, DocumentType::Radiology))
            .unwrap();

        let mut statuses = Vec::new();
        while let Some(change) = sub.try_next().unwrap() {
            match change {
                Change::Insert(job) | Change::Update(job) => statuses.push(job.status),
                Change::Delete { .. } => {}
            }
        }
        assert_eq!(
            statuses,
            vec![OcrStatus::Pending, OcrStatus::Processing, OcrStatus::Completed]
        );
    }

    #[test]
    fn creator_is_notified_on_completion() {
        let f = fixture();
        let trainer = f
            .store
            .read(|c| Ok(make_profile(c, "Tina Trainer", Role::Trainer)))
            .unwrap();
        let mut new = new_job(f.player.id, DocumentType::LabResults);
        new.created_by = Some(trainer.id);
        let job = f.pipeline.submit(new).unwrap();

        let inbox = f
            .store
            .read(|c| repository::list_notifications_for_recipient(c, &trainer.id, 10))
            .unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].notification_type, NotificationType::NewDocument);
        assert_eq!(inbox[0].related_id, Some(job.id));
    }

    #[test]
    fn stale_completion_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordStore::open_in_memory().unwrap());
        let files = Arc::new(LocalFileStore::new(dir.path()).unwrap());
        let ocr = Arc::new(PreemptedOcr {
            store: store.clone(),
            inner: SimulatedOcr::new(Duration::ZERO),
        });
        let pipeline = OcrPipeline::new(store.clone(), files, ocr);
        let (player, trainer) = store
            .read(|c| {
                Ok((
                    make_player(c, "Max", "Mustermann"),
                    make_profile(c, "Tina Trainer", Role::Trainer),
                ))
            })
            .unwrap();

        let mut new = new_job(player.id, DocumentType::LabResults);
        new.created_by = Some(trainer.id);
        let err = pipeline.submit(new).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidTransition {
                from: OcrStatus::Failed,
                to: OcrStatus::Completed
            }
        ));

        let jobs = pipeline.list_jobs(None).unwrap();
        assert_eq!(jobs[0].status, OcrStatus::Failed);
        assert!(jobs[0].raw_text.is_none());
        let inbox = store
            .read(|c| repository::list_notifications_for_recipient(c, &trainer.id, 10))
            .unwrap();
        assert!(inbox.is_empty());
    }

    #[test]
    fn upload_stores_file_and_processes() {
        let f = fixture();
        let job = f
            .pipeline
            .upload_and_submit(
                Some(f.player.id),
                DocumentType::MedicalReport,
                "arztbrief.pdf",
                b"%PDF-1.4",
                None,
            )
            .unwrap();

        let prefix = format!("ocr/{}/", f.player.id);
        assert!(job.file_path.starts_with(&prefix));
        assert!(job.file_path.ends_with(".pdf"));
        assert_eq!(job.status, OcrStatus::Completed);

        let original = f.pipeline.download_original(&job.id).unwrap();
        assert_eq!(original.filename, "arztbrief.pdf");
        assert_eq!(original.bytes, b"%PDF-1.4");
    }

    #[test]
    fn back_to_back_uploads_keep_their_own_files() {
        let f = fixture();
        let jobs: Vec<OcrJob> = (0..50u8)
            .map(|i| {
                f.pipeline
                    .upload_and_submit(Some(f.player.id), DocumentType::Generic, "scan.pdf", &[i], None)
                    .unwrap()
            })
            .collect();

        let paths: std::collections::HashSet<_> = jobs.iter().map(|j| j.file_path.clone()).collect();
        assert_eq!(paths.len(), jobs.len());
        for (i, job) in jobs.iter().enumerate() {
            let original = f.pipeline.download_original(&job.id).unwrap();
            assert_eq!(original.bytes, vec![i as u8]);
        }

        f.pipeline.delete_job(&jobs[0].id).unwrap();
        assert_eq!(f.pipeline.download_original(&jobs[1].id).unwrap().bytes, vec![1]);
    }

    #[test]
    fn rejected_upload_stores_nothing() {
        let f = fixture();
        let err = f
            .pipeline
            .upload_and_submit(Some(f.player.id), DocumentType::Generic, "notiz.docx", b"x", None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(!f.files.root().join("ocr").exists());
    }

    #[test]
    fn delete_removes_row_and_file() {
        let f = fixture();
        let job = f
            .pipeline
            .upload_and_submit(Some(f.player.id), DocumentType::Generic, "scan.png", b"png", None)
            .unwrap();
        let on_disk = f.files.root().join(&job.file_path);
        assert!(on_disk.exists());

        f.pipeline.delete_job(&job.id).unwrap();
        assert!(!on_disk.exists());
        assert!(matches!(f.pipeline.get_job(&job.id), Err(PipelineError::NotFound(_))));
    }

    #[test]
    fn delete_survives_missing_file() {
        let f = fixture();
        let job = f
            .pipeline
            .create_job(new_job(f.player.id, DocumentType::Generic))
            .unwrap();
        // Never uploaded: the row goes, the missing file is only logged.
        let removed = f.pipeline.delete_job(&job.id).unwrap();
        assert_eq!(removed.id, job.id);
        assert!(matches!(f.pipeline.delete_job(&job.id), Err(PipelineError::NotFound(_))));
    }

    #[test]
    fn promote_physio_creates_assessment() {
        let f = fixture();
        let job = f
            .pipeline
            .submit(new_job(f.player.id, DocumentType::PhysioAssessment))
            .unwrap();
        let therapist = Uuid::new_v4();

        let Promoted::PhysioAssessment(assessment) =
            f.pipeline.promote_job(&job.id, Some(therapist)).unwrap()
        else {
            panic!("expected an assessment");
        };
        assert_eq!(assessment.player_id, f.player.id);
        assert_eq!(assessment.date_of_assessment, chrono::Utc::now().date_naive());
        assert_eq!(assessment.pain_intensity, Some(6));
        assert_eq!(assessment.anamnesis.diagnosis.as_deref(), Some("Lumbalgie, akut"));
        assert_eq!(assessment.therapist_id, Some(therapist));
    }

    #[test]
    fn promote_report_creates_treatment() {
        let f = fixture();
        let job = f
            .pipeline
            .submit(new_job(f.player.id, DocumentType::MedicalReport))
            .unwrap();

        let Promoted::MedicalTreatment(treatment) = f.pipeline.promote_job(&job.id, None).unwrap()
        else {
            panic!("expected a treatment");
        };
        assert_eq!(treatment.icd10_code.as_deref(), Some("S93.4"));
        assert_eq!(treatment.treatment_notes.as_deref(), Some("OCR-Import: befund.pdf"));
        assert_eq!(
            treatment.therapy_recommendations.as_deref(),
            Some("Physiotherapie nach Abschwellung")
        );

        // Not idempotent.
        f.pipeline.promote_job(&job.id, None).unwrap();
        let treatments = f
            .store
            .read(|c| repository::list_medical_treatments_for_player(c, &f.player.id))
            .unwrap();
        assert_eq!(treatments.len(), 2);
    }

    #[test]
    fn promote_rejects_other_types_and_unfinished_jobs() {
        let f = fixture();
        let lab = f
            .pipeline
            .submit(new_job(f.player.id, DocumentType::LabResults))
            .unwrap();
        assert!(matches!(
            f.pipeline.promote_job(&lab.id, None),
            Err(PipelineError::NotPromotable(DocumentType::LabResults))
        ));

        let pending = f
            .pipeline
            .create_job(new_job(f.player.id, DocumentType::PhysioAssessment))
            .unwrap();
        assert!(matches!(
            f.pipeline.promote_job(&pending.id, None),
            Err(PipelineError::NotCompleted { .. })
        ));
    }
}
