use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Role;

/// A staff member. Identity is owned by the external auth service; this row
/// only carries what the app needs for gating and alert routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Profile {
    pub fn new(email: &str, full_name: &str, role: Role) -> Self {
        let now = crate::db::now_utc();
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            role,
            phone: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
