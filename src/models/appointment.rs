use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub player_id: Uuid,
    pub staff_id: Uuid,
    /// UTC.
    pub appointment_date: NaiveDateTime,
    pub appointment_type: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Appointment {
    pub fn new(
        player_id: Uuid,
        staff_id: Uuid,
        appointment_date: NaiveDateTime,
        appointment_type: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id,
            staff_id,
            appointment_date,
            appointment_type: appointment_type.to_string(),
            status: AppointmentStatus::Scheduled,
            notes: None,
            created_at: crate::db::now_utc(),
        }
    }
}
