//! Typed persistence over a string key/value store.
//!
//! Every store owns one or more [`Repository`] handles and calls
//! [`Repository::save`] after each mutation, mirroring its whole collection
//! under a single key.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::Result;

/// Storage keys of the persisted layout.
pub mod keys {
    pub const SESSION_USER: &str = "web3jobs_user";
    pub const USERS: &str = "web3jobs_users";
    pub const JOBS: &str = "web3jobs";
    pub const APPLICATIONS: &str = "web3jobs_applications";
    pub const WALLET: &str = "web3jobs_wallet";

    pub fn notifications(user_id: &str) -> String {
        format!("web3jobs_notifications_{}", user_id)
    }
}

/// Origin-scoped string store: the local-storage analogue.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// JSON-encoded value of type `T` stored under one key.
pub struct Repository<T> {
    store: Rc<dyn KeyValueStore>,
    key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> Repository<T> {
    pub fn new(store: Rc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// `None` when nothing was ever saved under this key.
    pub fn load(&self) -> Result<Option<T>> {
        match self.store.get(&self.key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn save(&self, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(&self.key, &raw)?;
        tracing::trace!(key = %self.key, bytes = raw.len(), "saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(&self.key)
    }
}

#[cfg(test)]
pub use memory::MemoryStore;
