use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{expect_one, opt_date, opt_uuid};
use crate::db::{format_timestamp, now_utc, parse_date, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::{MedicalDocument, MedicalTreatment};

const TREATMENT_COLUMNS: &str = "id, player_id, treatment_date, treating_doctor,
     hospital_or_practice, icd10_code, diagnosis, treatment_measures, therapy_recommendations,
     prognosis, follow_up_date, treatment_notes, created_by, created_at, updated_at";

struct TreatmentRow {
    id: String,
    player_id: String,
    treatment_date: String,
    treating_doctor: Option<String>,
    hospital_or_practice: Option<String>,
    icd10_code: Option<String>,
    diagnosis: Option<String>,
    treatment_measures: Option<String>,
    therapy_recommendations: Option<String>,
    prognosis: Option<String>,
    follow_up_date: Option<String>,
    treatment_notes: Option<String>,
    created_by: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TreatmentRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            player_id: row.get(1)?,
            treatment_date: row.get(2)?,
            treating_doctor: row.get(3)?,
            hospital_or_practice: row.get(4)?,
            icd10_code: row.get(5)?,
            diagnosis: row.get(6)?,
            treatment_measures: row.get(7)?,
            therapy_recommendations: row.get(8)?,
            prognosis: row.get(9)?,
            follow_up_date: row.get(10)?,
            treatment_notes: row.get(11)?,
            created_by: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    fn into_treatment(self) -> Result<MedicalTreatment, DatabaseError> {
        Ok(MedicalTreatment {
            id: parse_uuid(&self.id)?,
            player_id: parse_uuid(&self.player_id)?,
            treatment_date: parse_date(&self.treatment_date)?,
            treating_doctor: self.treating_doctor,
            hospital_or_practice: self.hospital_or_practice,
            icd10_code: self.icd10_code,
            diagnosis: self.diagnosis,
            treatment_measures: self.treatment_measures,
            therapy_recommendations: self.therapy_recommendations,
            prognosis: self.prognosis,
            follow_up_date: opt_date(self.follow_up_date)?,
            treatment_notes: self.treatment_notes,
            created_by: opt_uuid(self.created_by)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

pub fn insert_medical_treatment(
    conn: &Connection,
    treatment: &MedicalTreatment,
) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO medical_treatments ({TREATMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
        ),
        params![
            treatment.id.to_string(),
            treatment.player_id.to_string(),
            treatment.treatment_date.to_string(),
            treatment.treating_doctor,
            treatment.hospital_or_practice,
            treatment.icd10_code,
            treatment.diagnosis,
            treatment.treatment_measures,
            treatment.therapy_recommendations,
            treatment.prognosis,
            treatment.follow_up_date.map(|d| d.to_string()),
            treatment.treatment_notes,
            treatment.created_by.map(|id| id.to_string()),
            format_timestamp(&treatment.created_at),
            format_timestamp(&treatment.updated_at),
        ],
    )?;
    Ok(())
}

pub fn update_medical_treatment(
    conn: &Connection,
    treatment: &MedicalTreatment,
) -> Result<MedicalTreatment, DatabaseError> {
    let mut updated = treatment.clone();
    updated.updated_at = now_utc();
    let affected = conn.execute(
        "UPDATE medical_treatments SET treatment_date = ?1, treating_doctor = ?2,
         hospital_or_practice = ?3, icd10_code = ?4, diagnosis = ?5, treatment_measures = ?6,
         therapy_recommendations = ?7, prognosis = ?8, follow_up_date = ?9,
         treatment_notes = ?10, updated_at = ?11
         WHERE id = ?12",
        params![
            updated.treatment_date.to_string(),
            updated.treating_doctor,
            updated.hospital_or_practice,
            updated.icd10_code,
            updated.diagnosis,
            updated.treatment_measures,
            updated.therapy_recommendations,
            updated.prognosis,
            updated.follow_up_date.map(|d| d.to_string()),
            updated.treatment_notes,
            format_timestamp(&updated.updated_at),
            updated.id.to_string(),
        ],
    )?;
    expect_one(affected, "MedicalTreatment", &updated.id)?;
    Ok(updated)
}

pub fn get_medical_treatment(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<MedicalTreatment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TREATMENT_COLUMNS} FROM medical_treatments WHERE id = ?1"
    ))?;
    let mut rows = stmt.query_map(params![id.to_string()], TreatmentRow::read)?;
    match rows.next() {
        Some(row) => Ok(Some(row?.into_treatment()?)),
        None => Ok(None),
    }
}

pub fn list_medical_treatments_for_player(
    conn: &Connection,
    player_id: &Uuid,
) -> Result<Vec<MedicalTreatment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TREATMENT_COLUMNS} FROM medical_treatments WHERE player_id = ?1
         ORDER BY treatment_date DESC, created_at DESC"
    ))?;
    let rows = stmt.query_map(params![player_id.to_string()], TreatmentRow::read)?;

    let mut treatments = Vec::new();
    for row in rows {
        treatments.push(row?.into_treatment()?);
    }
    Ok(treatments)
}

// ═══════════════════════════════════════════════════════════
// Medical documents
// ═══════════════════════════════════════════════════════════

const DOCUMENT_COLUMNS: &str = "id, player_id, treatment_id, document_type, document_name,
     file_path, upload_date, uploaded_by, notes";

struct DocumentRow {
    id: String,
    player_id: String,
    treatment_id: Option<String>,
    document_type: String,
    document_name: String,
    file_path: String,
    upload_date: String,
    uploaded_by: Option<String>,
    notes: Option<String>,
}

impl DocumentRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            player_id: row.get(1)?,
            treatment_id: row.get(2)?,
            document_type: row.get(3)?,
            document_name: row.get(4)?,
            file_path: row.get(5)?,
            upload_date: row.get(6)?,
            uploaded_by: row.get(7)?,
            notes: row.get(8)?,
        })
    }

    fn into_document(self) -> Result<MedicalDocument, DatabaseError> {
        Ok(MedicalDocument {
            id: parse_uuid(&self.id)?,
            player_id: parse_uuid(&self.player_id)?,
            treatment_id: opt_uuid(self.treatment_id)?,
            document_type: self.document_type,
            document_name: self.document_name,
            file_path: self.file_path,
            upload_date: parse_date(&self.upload_date)?,
            uploaded_by: opt_uuid(self.uploaded_by)?,
            notes: self.notes,
        })
    }
}

pub fn insert_medical_document(
    conn: &Connection,
    document: &MedicalDocument,
) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO medical_documents ({DOCUMENT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ),
        params![
            document.id.to_string(),
            document.player_id.to_string(),
            document.treatment_id.map(|id| id.to_string()),
            document.document_type,
            document.document_name,
            document.file_path,
            document.upload_date.to_string(),
            document.uploaded_by.map(|id| id.to_string()),
            document.notes,
        ],
    )?;
    Ok(())
}

pub fn get_medical_document(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<MedicalDocument>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM medical_documents WHERE id = ?1"
    ))?;
    let mut rows = stmt.query_map(params![id.to_string()], DocumentRow::read)?;
    match rows.next() {
        Some(row) => Ok(Some(row?.into_document()?)),
        None => Ok(None),
    }
}

pub fn list_medical_documents_for_player(
    conn: &Connection,
    player_id: &Uuid,
) -> Result<Vec<MedicalDocument>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM medical_documents WHERE player_id = ?1
         ORDER BY upload_date DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map(params![player_id.to_string()], DocumentRow::read)?;

    let mut documents = Vec::new();
    for row in rows {
        documents.push(row?.into_document()?);
    }
    Ok(documents)
}

pub fn delete_medical_document(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM medical_documents WHERE id = ?1",
        params![id.to_string()],
    )?;
    expect_one(affected, "MedicalDocument", id)
}
