use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub jersey_number: Option<i32>,
    pub position: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Player {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        let now = crate::db::now_utc();
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            date_of_birth: None,
            jersey_number: None,
            position: None,
            height: None,
            weight: None,
            emergency_contact: None,
            emergency_phone: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// "First Last", as shown in alert messages.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
