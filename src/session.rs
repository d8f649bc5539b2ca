use chrono::Utc;
use std::rc::Rc;

use crate::error::{BoardError, Result};
use crate::models::{StoredUser, User, random_token};
use crate::repository::{KeyValueStore, Repository, keys};

/// Where the caller should take the user after an auth transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Home,
}

/// Signed-in identity plus the registered-users collection.
pub struct SessionStore {
    users: Repository<Vec<StoredUser>>,
    session: Repository<User>,
    current: Option<User>,
}

impl SessionStore {
    /// Restores the persisted session. A corrupt session record counts as signed out.
    pub fn load(store: Rc<dyn KeyValueStore>) -> Result<Self> {
        let users = Repository::new(store.clone(), keys::USERS);
        let session = Repository::new(store, keys::SESSION_USER);
        let current = match session.load() {
            Ok(user) => user,
            Err(BoardError::Serialization(e)) => {
                tracing::warn!(key = session.key(), error = %e, "discarding unreadable session");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            users,
            session,
            current,
        })
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    fn stored_users(&self) -> Result<Vec<StoredUser>> {
        Ok(self.users.load()?.unwrap_or_default())
    }

    pub fn sign_up(&mut self, email: &str, password: &str, name: &str) -> Result<Navigation> {
        let mut users = self.stored_users()?;
        if users.iter().any(|u| u.user.email == email) {
            return Err(BoardError::DuplicateUser);
        }

        let user = User {
            id: random_token(13),
            email: email.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        users.push(StoredUser {
            user: user.clone(),
            password: password.to_string(),
        });
        self.users.save(&users)?;
        self.session.save(&user)?;
        tracing::info!(user_id = %user.id, "signed up");
        self.current = Some(user);
        Ok(Navigation::Home)
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> Result<Navigation> {
        let user = self
            .stored_users()?
            .into_iter()
            .find(|u| u.user.email == email && u.password == password)
            .map(|stored| stored.user)
            .ok_or(BoardError::InvalidCredentials)?;

        self.session.save(&user)?;
        tracing::info!(user_id = %user.id, "signed in");
        self.current = Some(user);
        Ok(Navigation::Home)
    }

    pub fn sign_out(&mut self) -> Result<Navigation> {
        if let Some(user) = self.current.take() {
            tracing::info!(user_id = %user.id, "signed out");
        }
        self.session.clear()?;
        Ok(Navigation::Home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryStore;

    fn store() -> Rc<MemoryStore> {
        Rc::new(MemoryStore::default())
    }

    #[test]
    fn test_sign_up_sets_session_and_persists_both_collections() {
        let kv = store();
        let mut session = SessionStore::load(kv.clone()).unwrap();

        let nav = session.sign_up("ada@example.com", "secret", "Ada").unwrap();
        assert_eq!(nav, Navigation::Home);

        let user = session.current_user().unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.name, "Ada");
        assert_eq!(user.id.len(), 13);

        let users = kv.raw(keys::USERS).unwrap();
        assert!(users.contains("\"password\":\"secret\""));
        let persisted = kv.raw(keys::SESSION_USER).unwrap();
        assert!(!persisted.contains("secret"));
    }

    #[test]
    fn test_duplicate_email_is_rejected() {
        let kv = store();
        let mut session = SessionStore::load(kv.clone()).unwrap();
        session.sign_up("ada@example.com", "secret", "Ada").unwrap();
        session.sign_out().unwrap();

        let err = session
            .sign_up("ada@example.com", "other", "Imposter")
            .unwrap_err();
        assert!(matches!(err, BoardError::DuplicateUser));
        assert!(session.current_user().is_none());
    }

    #[test]
    fn test_sign_in_requires_matching_password() {
        let kv = store();
        let mut session = SessionStore::load(kv.clone()).unwrap();
        session.sign_up("ada@example.com", "secret", "Ada").unwrap();
        let id = session.current_user().unwrap().id.clone();
        session.sign_out().unwrap();

        let err = session.sign_in("ada@example.com", "wrong").unwrap_err();
        assert!(matches!(err, BoardError::InvalidCredentials));
        let err = session.sign_in("nobody@example.com", "secret").unwrap_err();
        assert!(matches!(err, BoardError::InvalidCredentials));

        session.sign_in("ada@example.com", "secret").unwrap();
        assert_eq!(session.current_user().unwrap().id, id);
    }

    #[test]
    fn test_sign_out_clears_persisted_session() {
        let kv = store();
        let mut session = SessionStore::load(kv.clone()).unwrap();
        session.sign_up("ada@example.com", "secret", "Ada").unwrap();

        assert_eq!(session.sign_out().unwrap(), Navigation::Home);
        assert!(session.current_user().is_none());
        assert!(kv.raw(keys::SESSION_USER).is_none());
        // registered users survive sign-out
        assert!(kv.raw(keys::USERS).is_some());
    }

    #[test]
    fn test_session_is_restored_on_load() {
        let kv = store();
        {
            let mut session = SessionStore::load(kv.clone()).unwrap();
            session.sign_up("ada@example.com", "secret", "Ada").unwrap();
        }
        let restored = SessionStore::load(kv).unwrap();
        assert_eq!(restored.current_user().unwrap().name, "Ada");
    }

    #[test]
    fn test_corrupt_session_counts_as_signed_out() {
        let kv = store();
        kv.set(keys::SESSION_USER, "{broken").unwrap();
        let session = SessionStore::load(kv).unwrap();
        assert!(session.current_user().is_none());
    }
}
