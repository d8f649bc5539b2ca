use chrono::Utc;
use std::rc::Rc;

use crate::error::{BoardError, Result};
use crate::models::{NewNotification, Notification, User, random_token};
use crate::repository::{KeyValueStore, Repository, keys};

/// Sink for notifications emitted by state changes elsewhere on the board.
pub trait Notifier {
    /// Returns the stored notification, or `None` when nobody is signed in.
    fn notify(&mut self, notification: NewNotification) -> Result<Option<Notification>>;
}

/// Notification inbox of the signed-in user.
///
/// Each user's list lives under its own key, newest first. Notifications
/// addressed to someone else are written straight into that user's list and
/// show up when they sign in.
pub struct NotificationStore {
    store: Rc<dyn KeyValueStore>,
    owner: Option<String>,
    items: Vec<Notification>,
}

impl NotificationStore {
    pub fn load(store: Rc<dyn KeyValueStore>, user: Option<&User>) -> Result<Self> {
        let mut notifications = Self {
            store,
            owner: None,
            items: Vec::new(),
        };
        notifications.switch_user(user)?;
        Ok(notifications)
    }

    fn repository(&self, user_id: &str) -> Repository<Vec<Notification>> {
        Repository::new(self.store.clone(), keys::notifications(user_id))
    }

    /// A user's stored list. An unreadable list is logged and replaced by an empty one.
    fn load_inbox(&self, user_id: &str) -> Result<Vec<Notification>> {
        match self.repository(user_id).load() {
            Ok(items) => Ok(items.unwrap_or_default()),
            Err(BoardError::Serialization(e)) => {
                tracing::warn!(%user_id, error = %e, "unreadable notifications, starting empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Replaces the visible list with `user`'s, or empties it when signed out.
    pub fn switch_user(&mut self, user: Option<&User>) -> Result<()> {
        match user {
            Some(user) => {
                self.items = self.load_inbox(&user.id)?;
                self.owner = Some(user.id.clone());
            }
            None => {
                self.owner = None;
                self.items.clear();
            }
        }
        Ok(())
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.items
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    pub fn add_notification(&mut self, new: NewNotification) -> Result<Option<Notification>> {
        let Some(owner) = self.owner.as_deref() else {
            tracing::debug!(recipient = %new.user_id, "no signed-in user, dropping notification");
            return Ok(None);
        };

        let notification = Notification {
            id: random_token(13),
            user_id: new.user_id,
            kind: new.kind,
            title: new.title,
            message: new.message,
            read: false,
            created_at: Utc::now(),
            data: new.data,
        };

        if notification.user_id == owner {
            self.items.insert(0, notification.clone());
            self.persist()?;
        } else {
            let mut theirs = self.load_inbox(&notification.user_id)?;
            theirs.insert(0, notification.clone());
            self.repository(&notification.user_id).save(&theirs)?;
        }
        tracing::info!(
            recipient = %notification.user_id,
            kind = %notification.kind,
            "notification added"
        );
        Ok(Some(notification))
    }

    /// Returns whether a matching notification was found.
    pub fn mark_as_read(&mut self, id: &str) -> Result<bool> {
        let Some(notification) = self.items.iter_mut().find(|n| n.id == id) else {
            return Ok(false);
        };
        notification.read = true;
        self.persist()?;
        Ok(true)
    }

    pub fn mark_all_as_read(&mut self) -> Result<()> {
        for notification in &mut self.items {
            notification.read = true;
        }
        self.persist()
    }

    pub fn clear_notifications(&mut self) -> Result<()> {
        self.items.clear();
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        match &self.owner {
            Some(owner) => self.repository(owner).save(&self.items),
            None => Ok(()),
        }
    }
}

impl Notifier for NotificationStore {
    fn notify(&mut self, notification: NewNotification) -> Result<Option<Notification>> {
        self.add_notification(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NotificationData, NotificationKind};
    use crate::repository::MemoryStore;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            name: id.to_uppercase(),
            created_at: Utc::now(),
        }
    }

    fn note(to: &str, title: &str) -> NewNotification {
        NewNotification {
            user_id: to.to_string(),
            kind: NotificationKind::System,
            title: title.to_string(),
            message: format!("{} body", title),
            data: None,
        }
    }

    #[test]
    fn test_add_is_noop_when_signed_out() {
        let kv = Rc::new(MemoryStore::default());
        let mut store = NotificationStore::load(kv.clone(), None).unwrap();

        assert!(store.add_notification(note("u1", "hello")).unwrap().is_none());
        assert!(store.notifications().is_empty());
        assert!(kv.raw(&keys::notifications("u1")).is_none());
    }

    #[test]
    fn test_add_prepends_unread_notification() {
        let kv = Rc::new(MemoryStore::default());
        let u1 = user("u1");
        let mut store = NotificationStore::load(kv, Some(&u1)).unwrap();

        store.add_notification(note("u1", "first")).unwrap();
        let second = store.add_notification(note("u1", "second")).unwrap().unwrap();

        assert_eq!(store.notifications().len(), 2);
        assert_eq!(store.notifications()[0].id, second.id);
        assert_eq!(store.notifications()[0].title, "second");
        assert!(!store.notifications()[0].read);
        assert_eq!(store.unread_count(), 2);
    }

    #[test]
    fn test_mark_as_read_and_mark_all() {
        let kv = Rc::new(MemoryStore::default());
        let u1 = user("u1");
        let mut store = NotificationStore::load(kv, Some(&u1)).unwrap();
        let first = store.add_notification(note("u1", "a")).unwrap().unwrap();
        store.add_notification(note("u1", "b")).unwrap();
        store.add_notification(note("u1", "c")).unwrap();

        assert!(store.mark_as_read(&first.id).unwrap());
        assert_eq!(store.unread_count(), 2);
        assert!(!store.mark_as_read("missing").unwrap());
        assert_eq!(store.unread_count(), 2);

        store.mark_all_as_read().unwrap();
        assert_eq!(store.unread_count(), 0);
        assert_eq!(store.notifications().len(), 3);
    }

    #[test]
    fn test_clear_empties_and_persists() {
        let kv = Rc::new(MemoryStore::default());
        let u1 = user("u1");
        let mut store = NotificationStore::load(kv.clone(), Some(&u1)).unwrap();
        store.add_notification(note("u1", "a")).unwrap();

        store.clear_notifications().unwrap();
        assert!(store.notifications().is_empty());
        assert_eq!(kv.raw(&keys::notifications("u1")).as_deref(), Some("[]"));
    }

    #[test]
    fn test_notification_for_other_user_lands_in_their_list() {
        let kv = Rc::new(MemoryStore::default());
        let (u1, u2) = (user("u1"), user("u2"));
        let mut store = NotificationStore::load(kv, Some(&u2)).unwrap();

        store
            .add_notification(NewNotification {
                data: Some(NotificationData {
                    job_id: Some(2),
                    application_id: Some(5),
                    status: None,
                }),
                ..note("u1", "New Job Application")
            })
            .unwrap();
        // u2 does not see it
        assert!(store.notifications().is_empty());

        store.switch_user(Some(&u1)).unwrap();
        assert_eq!(store.notifications().len(), 1);
        assert_eq!(store.notifications()[0].title, "New Job Application");
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn test_unreadable_recipient_list_is_replaced() {
        let kv = Rc::new(MemoryStore::default());
        let u2 = user("u2");
        kv.set(&keys::notifications("u1"), "{broken").unwrap();
        let mut store = NotificationStore::load(kv.clone(), Some(&u2)).unwrap();

        let sent = store.add_notification(note("u1", "hello")).unwrap().unwrap();

        let raw = kv.raw(&keys::notifications("u1")).unwrap();
        let stored: Vec<Notification> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, sent.id);
    }

    #[test]
    fn test_switching_users_switches_visible_list() {
        let kv = Rc::new(MemoryStore::default());
        let (u1, u2) = (user("u1"), user("u2"));
        let mut store = NotificationStore::load(kv.clone(), Some(&u1)).unwrap();
        store.add_notification(note("u1", "for u1")).unwrap();

        store.switch_user(Some(&u2)).unwrap();
        assert!(store.notifications().is_empty());
        assert_eq!(store.unread_count(), 0);

        store.switch_user(None).unwrap();
        assert!(store.notifications().is_empty());

        let reloaded = NotificationStore::load(kv, Some(&u1)).unwrap();
        assert_eq!(reloaded.notifications()[0].title, "for u1");
    }
}
