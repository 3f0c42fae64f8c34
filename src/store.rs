//! Record store: the single SQLite connection plus the change feed.
//!
//! Every write goes through here so that the feed sees exactly what was
//! committed. Reads borrow the connection through [`RecordStore::read`].

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{self, repository, DatabaseError};
use crate::feed::{ChangeFeed, ChangeOp};
use crate::models::*;
use crate::pipeline::extraction::ExtractedData;

pub struct RecordStore {
    conn: Mutex<Connection>,
    feed: ChangeFeed,
}

impl RecordStore {
    pub fn new(conn: Connection, feed: ChangeFeed) -> Self {
        Self {
            conn: Mutex::new(conn),
            feed,
        }
    }

    /// Open (and migrate) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_database(path)?, ChangeFeed::default()))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(db::open_memory_database()?, ChangeFeed::default()))
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    /// Run a read-only query against the connection.
    pub fn read<R>(
        &self,
        f: impl FnOnce(&Connection) -> Result<R, DatabaseError>,
    ) -> Result<R, DatabaseError> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// The row is committed at this point; a feed failure only costs
    /// live subscribers one event.
    fn publish<T: Record>(&self, op: ChangeOp, record: &T) {
        if let Err(e) = self.feed.publish(op, record) {
            tracing::warn!(table = T::TABLE.as_str(), id = %record.id(), error = %e, "Change not published");
        }
    }

    fn insert<T: Record>(
        &self,
        record: T,
        write: impl FnOnce(&Connection, &T) -> Result<(), DatabaseError>,
    ) -> Result<T, DatabaseError> {
        write(&*self.lock()?, &record)?;
        self.publish(ChangeOp::Insert, &record);
        Ok(record)
    }

    fn update<T: Record>(
        &self,
        write: impl FnOnce(&Connection) -> Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        let record = write(&*self.lock()?)?;
        self.publish(ChangeOp::Update, &record);
        Ok(record)
    }

    fn not_found(entity_type: &str, id: &Uuid) -> DatabaseError {
        DatabaseError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    // ── Players ─────────────────────────────────────────────

    pub fn create_player(&self, player: Player) -> Result<Player, DatabaseError> {
        self.insert(player, repository::insert_player)
    }

    pub fn update_player(&self, player: &Player) -> Result<Player, DatabaseError> {
        self.update(|conn| repository::update_player(conn, player))
    }

    pub fn deactivate_player(&self, id: &Uuid) -> Result<Player, DatabaseError> {
        self.update(|conn| repository::deactivate_player(conn, id))
    }

    // ── Profiles ────────────────────────────────────────────

    pub fn create_profile(&self, profile: Profile) -> Result<Profile, DatabaseError> {
        self.insert(profile, repository::insert_profile)
    }

    // ── CMJ tests ───────────────────────────────────────────

    pub fn create_cmj_test(&self, test: CmjTest) -> Result<CmjTest, DatabaseError> {
        self.insert(test, repository::insert_cmj_test)
    }

    pub fn update_cmj_test(&self, test: &CmjTest) -> Result<CmjTest, DatabaseError> {
        self.update(|conn| {
            repository::update_cmj_test(conn, test)?;
            Ok(test.clone())
        })
    }

    // ── Physiotherapy ───────────────────────────────────────

    pub fn create_physio_assessment(
        &self,
        assessment: PhysioAssessment,
    ) -> Result<PhysioAssessment, DatabaseError> {
        self.insert(assessment, repository::insert_physio_assessment)
    }

    pub fn update_physio_assessment(
        &self,
        assessment: &PhysioAssessment,
    ) -> Result<PhysioAssessment, DatabaseError> {
        self.update(|conn| repository::update_physio_assessment(conn, assessment))
    }

    pub fn add_documentation_entry(
        &self,
        entry: DocumentationEntry,
    ) -> Result<DocumentationEntry, DatabaseError> {
        self.insert(entry, repository::insert_documentation_entry)
    }

    // ── Treatments and documents ────────────────────────────

    pub fn create_medical_treatment(
        &self,
        treatment: MedicalTreatment,
    ) -> Result<MedicalTreatment, DatabaseError> {
        self.insert(treatment, repository::insert_medical_treatment)
    }

    pub fn update_medical_treatment(
        &self,
        treatment: &MedicalTreatment,
    ) -> Result<MedicalTreatment, DatabaseError> {
        self.update(|conn| repository::update_medical_treatment(conn, treatment))
    }

    pub fn create_medical_document(
        &self,
        document: MedicalDocument,
    ) -> Result<MedicalDocument, DatabaseError> {
        self.insert(document, repository::insert_medical_document)
    }

    /// Returns the removed row so the caller can clean up its file.
    pub fn delete_medical_document(&self, id: &Uuid) -> Result<MedicalDocument, DatabaseError> {
        let removed = {
            let conn = self.lock()?;
            let document = repository::get_medical_document(&conn, id)?
                .ok_or_else(|| Self::not_found("MedicalDocument", id))?;
            repository::delete_medical_document(&conn, id)?;
            document
        };
        self.publish(ChangeOp::Delete, &removed);
        Ok(removed)
    }

    // ── Appointments ────────────────────────────────────────

    pub fn create_appointment(&self, appointment: Appointment) -> Result<Appointment, DatabaseError> {
        self.insert(appointment, repository::insert_appointment)
    }

    pub fn set_appointment_status(
        &self,
        id: &Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, DatabaseError> {
        self.update(|conn| {
            repository::set_appointment_status(conn, id, status)?;
            repository::get_appointment(conn, id)?.ok_or_else(|| Self::not_found("Appointment", id))
        })
    }

    // ── OCR jobs ────────────────────────────────────────────

    pub fn create_ocr_job(&self, job: OcrJob) -> Result<OcrJob, DatabaseError> {
        self.insert(job, repository::insert_ocr_job)
    }

    pub fn set_ocr_job_status(&self, id: &Uuid, status: OcrStatus) -> Result<OcrJob, DatabaseError> {
        self.update(|conn| {
            repository::set_ocr_job_status(conn, id, status)?;
            repository::get_ocr_job(conn, id)?.ok_or_else(|| Self::not_found("OcrJob", id))
        })
    }

    pub fn complete_ocr_job(
        &self,
        id: &Uuid,
        raw_text: &str,
        extracted: &ExtractedData,
        confidence_score: f64,
        processing_time_ms: i64,
    ) -> Result<OcrJob, DatabaseError> {
        self.update(|conn| {
            repository::complete_ocr_job(
                conn,
                id,
                raw_text,
                extracted,
                confidence_score,
                processing_time_ms,
            )?;
            repository::get_ocr_job(conn, id)?.ok_or_else(|| Self::not_found("OcrJob", id))
        })
    }

    pub fn delete_ocr_job(&self, id: &Uuid) -> Result<OcrJob, DatabaseError> {
        let removed = {
            let conn = self.lock()?;
            let job = repository::get_ocr_job(&conn, id)?
                .ok_or_else(|| Self::not_found("OcrJob", id))?;
            repository::delete_ocr_job(&conn, id)?;
            job
        };
        self.publish(ChangeOp::Delete, &removed);
        Ok(removed)
    }

    // ── Notifications ───────────────────────────────────────

    pub fn create_notification(&self, new: NewNotification) -> Result<Notification, DatabaseError> {
        self.insert(new.into_notification(), repository::insert_notification)
    }

    pub fn mark_notification_read(&self, id: &Uuid) -> Result<Notification, DatabaseError> {
        self.update(|conn| repository::mark_notification_read(conn, id))
    }

    /// Returns the rows that changed.
    pub fn mark_all_notifications_read(
        &self,
        recipient_id: &Uuid,
    ) -> Result<Vec<Notification>, DatabaseError> {
        let updated = {
            let conn = self.lock()?;
            let ids = repository::mark_all_notifications_read(&conn, recipient_id)?;
            let mut rows = Vec::with_capacity(ids.len());
            for id in &ids {
                if let Some(row) = repository::get_notification(&conn, id)? {
                    rows.push(row);
                }
            }
            rows
        };
        for row in &updated {
            self.publish(ChangeOp::Update, row);
        }
        Ok(updated)
    }
}
