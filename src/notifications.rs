//! Notification center: one recipient's inbox, kept live from the feed.

use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::feed::{Change, FeedError, Filter};
use crate::models::Notification;
use crate::session_cache::{LiveTable, SessionCacheError};
use crate::store::RecordStore;

/// How many notifications the inbox holds.
pub const INBOX_SIZE: usize = 50;

pub struct NotificationCenter {
    recipient_id: Uuid,
    inbox: LiveTable<Notification>,
}

impl NotificationCenter {
    /// Load the latest notifications for `recipient_id` and start following
    /// changes addressed to them.
    pub fn open(store: &RecordStore, recipient_id: Uuid) -> Result<Self, DatabaseError> {
        let inbox = LiveTable::open(
            store,
            Some(Filter::eq("recipient_id", recipient_id.to_string())),
            Some(INBOX_SIZE),
            move |conn| repository::list_notifications_for_recipient(conn, &recipient_id, INBOX_SIZE),
        )?;
        Ok(Self {
            recipient_id,
            inbox,
        })
    }

    pub fn recipient_id(&self) -> Uuid {
        self.recipient_id
    }

    /// Newest first.
    pub fn notifications(&self) -> &[Notification] {
        self.inbox.rows()
    }

    pub fn unread_count(&self) -> usize {
        self.inbox.rows().iter().filter(|n| !n.is_read).count()
    }

    pub fn mark_read(&mut self, store: &RecordStore, id: &Uuid) -> Result<(), DatabaseError> {
        let updated = store.mark_notification_read(id)?;
        self.inbox.apply(Change::Update(updated));
        Ok(())
    }

    pub fn mark_all_read(&mut self, store: &RecordStore) -> Result<usize, DatabaseError> {
        let updated = store.mark_all_notifications_read(&self.recipient_id)?;
        let count = updated.len();
        for row in updated {
            self.inbox.apply(Change::Update(row));
        }
        Ok(count)
    }

    /// Apply buffered feed changes.
    pub fn sync(&mut self, store: &RecordStore) -> Result<usize, SessionCacheError> {
        self.inbox.sync(store)
    }

    /// Wait for the next change addressed to this recipient.
    pub async fn next_change(&mut self) -> Result<(), FeedError> {
        self.inbox.next_change().await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::{NewNotification, NotificationType, Priority};

    fn send(store: &RecordStore, recipient: Uuid, title: &str) -> Notification {
        store
            .create_notification(NewNotification {
                recipient_id: recipient,
                notification_type: NotificationType::CriticalValue,
                title: title.into(),
                message: "Test".into(),
                priority: Priority::High,
                action_required: true,
                related_table: None,
                related_id: None,
                metadata: json!({}),
            })
            .unwrap()
    }

    #[test]
    fn opens_with_existing_notifications() {
        let store = RecordStore::open_in_memory().unwrap();
        let me = Uuid::new_v4();
        send(&store, me, "alt");
        send(&store, Uuid::new_v4(), "fremd");

        let center = NotificationCenter::open(&store, me).unwrap();
        assert_eq!(center.notifications().len(), 1);
        assert_eq!(center.unread_count(), 1);
    }

    #[test]
    fn live_inserts_only_for_recipient() {
        let store = RecordStore::open_in_memory().unwrap();
        let me = Uuid::new_v4();
        let mut center = NotificationCenter::open(&store, me).unwrap();

        send(&store, Uuid::new_v4(), "fremd");
        let mine = send(&store, me, "neu");
        center.sync(&store).unwrap();

        assert_eq!(center.notifications().len(), 1);
        assert_eq!(center.notifications()[0].id, mine.id);
    }

    #[test]
    fn mark_read_and_mark_all_read_update_unread_count() {
        let store = RecordStore::open_in_memory().unwrap();
        let me = Uuid::new_v4();
        let a = send(&store, me, "a");
        send(&store, me, "b");
        send(&store, me, "c");
        let mut center = NotificationCenter::open(&store, me).unwrap();
        assert_eq!(center.unread_count(), 3);

        center.mark_read(&store, &a.id).unwrap();
        assert_eq!(center.unread_count(), 2);

        assert_eq!(center.mark_all_read(&store).unwrap(), 2);
        assert_eq!(center.unread_count(), 0);

        // Echoes of our own writes arrive through the feed and change nothing.
        center.sync(&store).unwrap();
        assert_eq!(center.unread_count(), 0);
        assert_eq!(center.notifications().len(), 3);
    }

    #[test]
    fn inbox_is_capped() {
        let store = RecordStore::open_in_memory().unwrap();
        let me = Uuid::new_v4();
        let mut center = NotificationCenter::open(&store, me).unwrap();
        for i in 0..(INBOX_SIZE + 5) {
            send(&store, me, &format!("n{i}"));
        }
        center.sync(&store).unwrap();
        assert_eq!(center.notifications().len(), INBOX_SIZE);
        assert_eq!(center.notifications()[0].title, format!("n{}", INBOX_SIZE + 4));
    }
}
