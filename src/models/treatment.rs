use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalTreatment {
    pub id: Uuid,
    pub player_id: Uuid,
    pub treatment_date: NaiveDate,
    pub treating_doctor: Option<String>,
    pub hospital_or_practice: Option<String>,
    pub icd10_code: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment_measures: Option<String>,
    pub therapy_recommendations: Option<String>,
    pub prognosis: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub treatment_notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl MedicalTreatment {
    pub fn new(player_id: Uuid, treatment_date: NaiveDate) -> Self {
        let now = crate::db::now_utc();
        Self {
            id: Uuid::new_v4(),
            player_id,
            treatment_date,
            treating_doctor: None,
            hospital_or_practice: None,
            icd10_code: None,
            diagnosis: None,
            treatment_measures: None,
            therapy_recommendations: None,
            prognosis: None,
            follow_up_date: None,
            treatment_notes: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// File attachment metadata. The bytes live in the file store under `file_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalDocument {
    pub id: Uuid,
    pub player_id: Uuid,
    pub treatment_id: Option<Uuid>,
    pub document_type: String,
    pub document_name: String,
    pub file_path: String,
    pub upload_date: NaiveDate,
    pub uploaded_by: Option<Uuid>,
    pub notes: Option<String>,
}
