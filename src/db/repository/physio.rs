use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{expect_one, opt_uuid};
use crate::db::{format_timestamp, now_utc, parse_date, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::{Anamnesis, DocumentationEntry, PhysioAssessment};

const ASSESSMENT_COLUMNS: &str = "a.id, a.player_id, a.therapist_id, a.date_of_assessment,
     a.pain_intensity, a.created_at, a.updated_at,
     a.diagnosis, a.secondary_diagnosis, a.medications, a.recreational_activities,
     a.social_history, a.current_occupation, a.current_complaints, a.complaints_in_daily_life,
     a.complaints_since_when, a.frequency_of_complaints, a.triggered_by, a.relieved_by,
     a.previous_treatments, a.previous_therapies, a.inspection_findings, a.palpation_findings,
     a.mobility_assessment, a.pain_description, a.specific_findings, a.therapy_goals";

struct AssessmentRow {
    id: String,
    player_id: String,
    therapist_id: Option<String>,
    date_of_assessment: String,
    pain_intensity: Option<i32>,
    created_at: String,
    updated_at: String,
    anamnesis: Anamnesis,
}

impl AssessmentRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            player_id: row.get(1)?,
            therapist_id: row.get(2)?,
            date_of_assessment: row.get(3)?,
            pain_intensity: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            anamnesis: Anamnesis {
                diagnosis: row.get(7)?,
                secondary_diagnosis: row.get(8)?,
                medications: row.get(9)?,
                recreational_activities: row.get(10)?,
                social_history: row.get(11)?,
                current_occupation: row.get(12)?,
                current_complaints: row.get(13)?,
                complaints_in_daily_life: row.get(14)?,
                complaints_since_when: row.get(15)?,
                frequency_of_complaints: row.get(16)?,
                triggered_by: row.get(17)?,
                relieved_by: row.get(18)?,
                previous_treatments: row.get(19)?,
                previous_therapies: row.get(20)?,
                inspection_findings: row.get(21)?,
                palpation_findings: row.get(22)?,
                mobility_assessment: row.get(23)?,
                pain_description: row.get(24)?,
                specific_findings: row.get(25)?,
                therapy_goals: row.get(26)?,
            },
        })
    }

    fn into_assessment(self) -> Result<PhysioAssessment, DatabaseError> {
        Ok(PhysioAssessment {
            id: parse_uuid(&self.id)?,
            player_id: parse_uuid(&self.player_id)?,
            therapist_id: opt_uuid(self.therapist_id)?,
            date_of_assessment: parse_date(&self.date_of_assessment)?,
            anamnesis: self.anamnesis,
            pain_intensity: self.pain_intensity,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn check_pain(assessment: &PhysioAssessment) -> Result<(), DatabaseError> {
    match assessment.pain_intensity {
        Some(p) if !(0..=10).contains(&p) => Err(DatabaseError::ConstraintViolation(format!(
            "pain_intensity must be within 0..=10, got {p}"
        ))),
        _ => Ok(()),
    }
}

pub fn insert_physio_assessment(
    conn: &Connection,
    assessment: &PhysioAssessment,
) -> Result<(), DatabaseError> {
    check_pain(assessment)?;
    let a = &assessment.anamnesis;
    conn.execute(
        "INSERT INTO physio_assessments (id, player_id, therapist_id, date_of_assessment,
         pain_intensity, created_at, updated_at,
         diagnosis, secondary_diagnosis, medications, recreational_activities,
         social_history, current_occupation, current_complaints, complaints_in_daily_life,
         complaints_since_when, frequency_of_complaints, triggered_by, relieved_by,
         previous_treatments, previous_therapies, inspection_findings, palpation_findings,
         mobility_assessment, pain_description, specific_findings, therapy_goals)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                 ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)",
        params![
            assessment.id.to_string(),
            assessment.player_id.to_string(),
            assessment.therapist_id.map(|id| id.to_string()),
            assessment.date_of_assessment.to_string(),
            assessment.pain_intensity,
            format_timestamp(&assessment.created_at),
            format_timestamp(&assessment.updated_at),
            a.diagnosis,
            a.secondary_diagnosis,
            a.medications,
            a.recreational_activities,
            a.social_history,
            a.current_occupation,
            a.current_complaints,
            a.complaints_in_daily_life,
            a.complaints_since_when,
            a.frequency_of_complaints,
            a.triggered_by,
            a.relieved_by,
            a.previous_treatments,
            a.previous_therapies,
            a.inspection_findings,
            a.palpation_findings,
            a.mobility_assessment,
            a.pain_description,
            a.specific_findings,
            a.therapy_goals,
        ],
    )?;
    Ok(())
}

/// Replace all editable fields. Returns the row as stored.
pub fn update_physio_assessment(
    conn: &Connection,
    assessment: &PhysioAssessment,
) -> Result<PhysioAssessment, DatabaseError> {
    check_pain(assessment)?;
    let mut updated = assessment.clone();
    updated.updated_at = now_utc();
    let a = &updated.anamnesis;
    let affected = conn.execute(
        "UPDATE physio_assessments SET therapist_id = ?1, date_of_assessment = ?2,
         pain_intensity = ?3, updated_at = ?4,
         diagnosis = ?5, secondary_diagnosis = ?6, medications = ?7,
         recreational_activities = ?8, social_history = ?9, current_occupation = ?10,
         current_complaints = ?11, complaints_in_daily_life = ?12, complaints_since_when = ?13,
         frequency_of_complaints = ?14, triggered_by = ?15, relieved_by = ?16,
         previous_treatments = ?17, previous_therapies = ?18, inspection_findings = ?19,
         palpation_findings = ?20, mobility_assessment = ?21, pain_description = ?22,
         specific_findings = ?23, therapy_goals = ?24
         WHERE id = ?25",
        params![
            updated.therapist_id.map(|id| id.to_string()),
            updated.date_of_assessment.to_string(),
            updated.pain_intensity,
            format_timestamp(&updated.updated_at),
            a.diagnosis,
            a.secondary_diagnosis,
            a.medications,
            a.recreational_activities,
            a.social_history,
            a.current_occupation,
            a.current_complaints,
            a.complaints_in_daily_life,
            a.complaints_since_when,
            a.frequency_of_complaints,
            a.triggered_by,
            a.relieved_by,
            a.previous_treatments,
            a.previous_therapies,
            a.inspection_findings,
            a.palpation_findings,
            a.mobility_assessment,
            a.pain_description,
            a.specific_findings,
            a.therapy_goals,
            updated.id.to_string(),
        ],
    )?;
    expect_one(affected, "PhysioAssessment", &updated.id)?;
    Ok(updated)
}

pub fn get_physio_assessment(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<PhysioAssessment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ASSESSMENT_COLUMNS} FROM physio_assessments a WHERE a.id = ?1"
    ))?;
    let mut rows = stmt.query_map(params![id.to_string()], AssessmentRow::read)?;
    match rows.next() {
        Some(row) => Ok(Some(row?.into_assessment()?)),
        None => Ok(None),
    }
}

pub fn list_physio_assessments_for_player(
    conn: &Connection,
    player_id: &Uuid,
) -> Result<Vec<PhysioAssessment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ASSESSMENT_COLUMNS} FROM physio_assessments a WHERE a.player_id = ?1
         ORDER BY a.date_of_assessment DESC, a.created_at DESC"
    ))?;
    let rows = stmt.query_map(params![player_id.to_string()], AssessmentRow::read)?;

    let mut assessments = Vec::new();
    for row in rows {
        assessments.push(row?.into_assessment()?);
    }
    Ok(assessments)
}

/// An assessment joined with the assessed player's display name.
#[derive(Debug, Clone)]
pub struct AssessmentWithPlayer {
    pub assessment: PhysioAssessment,
    pub player_name: String,
}

/// Assessments with `pain_intensity >= threshold`, joined with player names.
pub fn list_physio_assessments_with_pain_at_least(
    conn: &Connection,
    threshold: i32,
) -> Result<Vec<AssessmentWithPlayer>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ASSESSMENT_COLUMNS}, p.first_name || ' ' || p.last_name
         FROM physio_assessments a JOIN players p ON p.id = a.player_id
         WHERE a.pain_intensity >= ?1
         ORDER BY a.created_at, a.id"
    ))?;
    let rows = stmt.query_map(params![threshold], |row| {
        Ok((AssessmentRow::read(row)?, row.get::<_, String>(27)?))
    })?;

    let mut found = Vec::new();
    for row in rows {
        let (assessment, player_name) = row?;
        found.push(AssessmentWithPlayer {
            assessment: assessment.into_assessment()?,
            player_name,
        });
    }
    Ok(found)
}

// ═══════════════════════════════════════════════════════════
// Documentation entries (append-only)
// ═══════════════════════════════════════════════════════════

pub fn insert_documentation_entry(
    conn: &Connection,
    entry: &DocumentationEntry,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO physio_documentation (id, assessment_id, date, notes, therapist_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.id.to_string(),
            entry.assessment_id.to_string(),
            entry.date.to_string(),
            entry.notes,
            entry.therapist_id.map(|id| id.to_string()),
            format_timestamp(&entry.created_at),
        ],
    )?;
    Ok(())
}

/// Newest entry first.
pub fn list_documentation_entries(
    conn: &Connection,
    assessment_id: &Uuid,
) -> Result<Vec<DocumentationEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, assessment_id, date, notes, therapist_id, created_at
         FROM physio_documentation WHERE assessment_id = ?1
         ORDER BY date DESC, created_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map(params![assessment_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, assessment_id, date, notes, therapist_id, created_at) = row?;
        entries.push(DocumentationEntry {
            id: parse_uuid(&id)?,
            assessment_id: parse_uuid(&assessment_id)?,
            date: parse_date(&date)?,
            notes,
            therapist_id: opt_uuid(therapist_id)?,
            created_at: parse_timestamp(&created_at)?,
        });
    }
    Ok(entries)
}
