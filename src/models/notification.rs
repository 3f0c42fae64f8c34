use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{NotificationType, Priority, Table};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub is_read: bool,
    pub read_at: Option<NaiveDateTime>,
    pub action_required: bool,
    pub action_taken: bool,
    pub related_table: Option<Table>,
    pub related_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub created_at: NaiveDateTime,
    pub expires_at: Option<NaiveDateTime>,
}

/// Insert payload: everything the writer decides. Read state starts unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub action_required: bool,
    pub related_table: Option<Table>,
    pub related_id: Option<Uuid>,
    pub metadata: serde_json::Value,
}

impl NewNotification {
    pub fn into_notification(self) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            recipient_id: self.recipient_id,
            sender_id: None,
            notification_type: self.notification_type,
            title: self.title,
            message: self.message,
            priority: self.priority,
            is_read: false,
            read_at: None,
            action_required: self.action_required,
            action_taken: false,
            related_table: self.related_table,
            related_id: self.related_id,
            metadata: self.metadata,
            created_at: crate::db::now_utc(),
            expires_at: None,
        }
    }
}
