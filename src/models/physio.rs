use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Physiotherapy intake ("Eingangsbefund").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Anamnesis {
    pub diagnosis: Option<String>,
    pub secondary_diagnosis: Option<String>,
    pub medications: Option<String>,
    pub recreational_activities: Option<String>,
    pub social_history: Option<String>,
    pub current_occupation: Option<String>,
    pub current_complaints: Option<String>,
    pub complaints_in_daily_life: Option<String>,
    pub complaints_since_when: Option<String>,
    pub frequency_of_complaints: Option<String>,
    pub triggered_by: Option<String>,
    pub relieved_by: Option<String>,
    pub previous_treatments: Option<String>,
    pub previous_therapies: Option<String>,
    pub inspection_findings: Option<String>,
    pub palpation_findings: Option<String>,
    pub mobility_assessment: Option<String>,
    pub pain_description: Option<String>,
    pub specific_findings: Option<String>,
    pub therapy_goals: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysioAssessment {
    pub id: Uuid,
    pub player_id: Uuid,
    pub therapist_id: Option<Uuid>,
    pub date_of_assessment: NaiveDate,
    #[serde(flatten)]
    pub anamnesis: Anamnesis,
    /// 0..=10, drives the high-pain alert.
    pub pain_intensity: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PhysioAssessment {
    pub fn new(player_id: Uuid, date_of_assessment: NaiveDate) -> Self {
        let now = crate::db::now_utc();
        Self {
            id: Uuid::new_v4(),
            player_id,
            therapist_id: None,
            date_of_assessment,
            anamnesis: Anamnesis::default(),
            pain_intensity: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Follow-up note on an assessment. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentationEntry {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub date: NaiveDate,
    pub notes: String,
    pub therapist_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

impl DocumentationEntry {
    pub fn new(assessment_id: Uuid, date: NaiveDate, notes: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            assessment_id,
            date,
            notes: notes.to_string(),
            therapist_id: None,
            created_at: crate::db::now_utc(),
        }
    }
}
