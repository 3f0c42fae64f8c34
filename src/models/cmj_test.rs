use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Counter movement jump test. `rsi_score` drives the low-RSI alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmjTest {
    pub id: Uuid,
    pub player_id: Uuid,
    pub test_date: NaiveDate,
    pub jump_height_cm: Option<f64>,
    pub flight_time_ms: Option<f64>,
    pub ground_contact_time_ms: Option<f64>,
    pub balance_left_percent: Option<f64>,
    pub balance_right_percent: Option<f64>,
    pub peak_force_n: Option<f64>,
    pub power_watts: Option<f64>,
    pub rsi_score: Option<f64>,
    pub notes: Option<String>,
    pub tested_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
}

impl CmjTest {
    pub fn new(player_id: Uuid, test_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            player_id,
            test_date,
            jump_height_cm: None,
            flight_time_ms: None,
            ground_contact_time_ms: None,
            balance_left_percent: None,
            balance_right_percent: None,
            peak_force_n: None,
            power_watts: None,
            rsi_score: None,
            notes: None,
            tested_by: None,
            created_at: crate::db::now_utc(),
        }
    }
}
