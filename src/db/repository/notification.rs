use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{expect_one, opt_timestamp, opt_uuid};
use crate::db::{format_timestamp, now_utc, parse_timestamp, parse_uuid, DatabaseError};
use crate::models::{Notification, NotificationType, Priority, Table};

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, sender_id, notification_type, title,
     message, priority, is_read, read_at, action_required, action_taken, related_table,
     related_id, metadata, created_at, expires_at";

struct NotificationRow {
    id: String,
    recipient_id: String,
    sender_id: Option<String>,
    notification_type: String,
    title: String,
    message: String,
    priority: String,
    is_read: i32,
    read_at: Option<String>,
    action_required: i32,
    action_taken: i32,
    related_table: Option<String>,
    related_id: Option<String>,
    metadata: String,
    created_at: String,
    expires_at: Option<String>,
}

impl NotificationRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            recipient_id: row.get(1)?,
            sender_id: row.get(2)?,
            notification_type: row.get(3)?,
            title: row.get(4)?,
            message: row.get(5)?,
            priority: row.get(6)?,
            is_read: row.get(7)?,
            read_at: row.get(8)?,
            action_required: row.get(9)?,
            action_taken: row.get(10)?,
            related_table: row.get(11)?,
            related_id: row.get(12)?,
            metadata: row.get(13)?,
            created_at: row.get(14)?,
            expires_at: row.get(15)?,
        })
    }

    fn into_notification(self) -> Result<Notification, DatabaseError> {
        Ok(Notification {
            id: parse_uuid(&self.id)?,
            recipient_id: parse_uuid(&self.recipient_id)?,
            sender_id: opt_uuid(self.sender_id)?,
            notification_type: NotificationType::from_str(&self.notification_type)?,
            title: self.title,
            message: self.message,
            priority: Priority::from_str(&self.priority)?,
            is_read: self.is_read != 0,
            read_at: opt_timestamp(self.read_at)?,
            action_required: self.action_required != 0,
            action_taken: self.action_taken != 0,
            related_table: self.related_table.as_deref().map(Table::from_str).transpose()?,
            related_id: opt_uuid(self.related_id)?,
            metadata: serde_json::from_str(&self.metadata)?,
            created_at: parse_timestamp(&self.created_at)?,
            expires_at: opt_timestamp(self.expires_at)?,
        })
    }
}

pub fn insert_notification(
    conn: &Connection,
    notification: &Notification,
) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO notifications ({NOTIFICATION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
        ),
        params![
            notification.id.to_string(),
            notification.recipient_id.to_string(),
            notification.sender_id.map(|id| id.to_string()),
            notification.notification_type.as_str(),
            notification.title,
            notification.message,
            notification.priority.as_str(),
            notification.is_read as i32,
            notification.read_at.as_ref().map(format_timestamp),
            notification.action_required as i32,
            notification.action_taken as i32,
            notification.related_table.map(|t| t.as_str()),
            notification.related_id.map(|id| id.to_string()),
            serde_json::to_string(&notification.metadata)?,
            format_timestamp(&notification.created_at),
            notification.expires_at.as_ref().map(format_timestamp),
        ],
    )?;
    Ok(())
}

pub fn get_notification(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<Notification>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"
    ))?;
    let mut rows = stmt.query_map(params![id.to_string()], NotificationRow::read)?;
    match rows.next() {
        Some(row) => Ok(Some(row?.into_notification()?)),
        None => Ok(None),
    }
}

/// Whether any notification already points at this row with this type.
/// This is the monitor's dedup check.
pub fn notification_exists_for(
    conn: &Connection,
    related_table: Table,
    related_id: &Uuid,
    notification_type: NotificationType,
) -> Result<bool, DatabaseError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM notifications
         WHERE related_table = ?1 AND related_id = ?2 AND notification_type = ?3)",
        params![
            related_table.as_str(),
            related_id.to_string(),
            notification_type.as_str()
        ],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// The `limit` most recent notifications for one recipient, newest first.
pub fn list_notifications_for_recipient(
    conn: &Connection,
    recipient_id: &Uuid,
    limit: usize,
) -> Result<Vec<Notification>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE recipient_id = ?1
         ORDER BY created_at DESC, rowid DESC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(
        params![recipient_id.to_string(), limit as i64],
        NotificationRow::read,
    )?;

    let mut notifications = Vec::new();
    for row in rows {
        notifications.push(row?.into_notification()?);
    }
    Ok(notifications)
}

/// Returns the updated row.
pub fn mark_notification_read(
    conn: &Connection,
    id: &Uuid,
) -> Result<Notification, DatabaseError> {
    let affected = conn.execute(
        "UPDATE notifications SET is_read = 1, read_at = COALESCE(read_at, ?1) WHERE id = ?2",
        params![format_timestamp(&now_utc()), id.to_string()],
    )?;
    expect_one(affected, "Notification", id)?;
    get_notification(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Notification".into(),
        id: id.to_string(),
    })
}

/// Mark every unread notification of a recipient. Returns the ids touched.
pub fn mark_all_notifications_read(
    conn: &Connection,
    recipient_id: &Uuid,
) -> Result<Vec<Uuid>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT id FROM notifications WHERE recipient_id = ?1 AND is_read = 0")?;
    let ids = stmt
        .query_map(params![recipient_id.to_string()], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    conn.execute(
        "UPDATE notifications SET is_read = 1, read_at = ?1
         WHERE recipient_id = ?2 AND is_read = 0",
        params![format_timestamp(&now_utc()), recipient_id.to_string()],
    )?;

    ids.iter().map(|id| parse_uuid(id)).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;
    use crate::db::repository::test_support::*;
    use crate::models::{NewNotification, Role};

    fn alert(recipient: Uuid, related_id: Uuid) -> Notification {
        NewNotification {
            recipient_id: recipient,
            notification_type: NotificationType::CriticalValue,
            title: "Kritischer RSI-Score erkannt".into(),
            message: "Max Mustermann: RSI-Score von 1.2 liegt unter dem kritischen Wert von 1.5"
                .into(),
            priority: Priority::High,
            action_required: true,
            related_table: Some(Table::CmjTests),
            related_id: Some(related_id),
            metadata: json!({"rsi_score": 1.2}),
        }
        .into_notification()
    }

    #[test]
    fn insert_and_get_notification() {
        let conn = test_db();
        let trainer = make_profile(&conn, "Trainer One", Role::Trainer);
        let n = alert(trainer.id, Uuid::new_v4());
        insert_notification(&conn, &n).unwrap();
        assert_eq!(get_notification(&conn, &n.id).unwrap(), Some(n));
    }

    #[test]
    fn exists_for_matches_table_id_and_type() {
        let conn = test_db();
        let related = Uuid::new_v4();
        insert_notification(&conn, &alert(Uuid::new_v4(), related)).unwrap();

        assert!(notification_exists_for(&conn, Table::CmjTests, &related, NotificationType::CriticalValue).unwrap());
        assert!(!notification_exists_for(&conn, Table::CmjTests, &related, NotificationType::AppointmentOverdue).unwrap());
        assert!(!notification_exists_for(&conn, Table::PhysioAssessments, &related, NotificationType::CriticalValue).unwrap());
    }

    #[test]
    fn list_is_newest_first_and_limited() {
        let conn = test_db();
        let recipient = Uuid::new_v4();
        let base = now_utc();
        for i in 0..5 {
            let mut n = alert(recipient, Uuid::new_v4());
            n.created_at = base + Duration::seconds(i);
            n.title = format!("n{i}");
            insert_notification(&conn, &n).unwrap();
        }
        insert_notification(&conn, &alert(Uuid::new_v4(), Uuid::new_v4())).unwrap();

        let listed = list_notifications_for_recipient(&conn, &recipient, 3).unwrap();
        let titles: Vec<&str> = listed.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["n4", "n3", "n2"]);
    }

    #[test]
    fn mark_read_sets_timestamp_once() {
        let conn = test_db();
        let n = alert(Uuid::new_v4(), Uuid::new_v4());
        insert_notification(&conn, &n).unwrap();

        let first = mark_notification_read(&conn, &n.id).unwrap();
        assert!(first.is_read);
        assert!(first.read_at.is_some());
        let second = mark_notification_read(&conn, &n.id).unwrap();
        assert_eq!(second.read_at, first.read_at);
    }

    #[test]
    fn mark_all_read_only_touches_unread_of_recipient() {
        let conn = test_db();
        let recipient = Uuid::new_v4();
        let a = alert(recipient, Uuid::new_v4());
        let b = alert(recipient, Uuid::new_v4());
        let other = alert(Uuid::new_v4(), Uuid::new_v4());
        for n in [&a, &b, &other] {
            insert_notification(&conn, n).unwrap();
        }
        mark_notification_read(&conn, &a.id).unwrap();

        let touched = mark_all_notifications_read(&conn, &recipient).unwrap();
        assert_eq!(touched, vec![b.id]);
        assert!(!get_notification(&conn, &other.id).unwrap().unwrap().is_read);
    }
}
