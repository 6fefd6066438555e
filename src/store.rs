use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

/// Named keyspaces inside the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Login session id -> serialized [`crate::middleware::auth::SessionUser`].
    Sessions,
    /// Room id -> JSON array of member user ids.
    Rooms,
    /// User id -> serialized [`crate::rooms::RoomSession`].
    RoomSessions,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Sessions,
        Collection::Rooms,
        Collection::RoomSessions,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Sessions => "sessions",
            Collection::Rooms => "rooms",
            Collection::RoomSessions => "room_sessions",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store is shut down")]
    Closed,
    #[error("corrupt {collection} entry for {key}: {source}")]
    Corrupt {
        collection: &'static str,
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Key/value store shared by the HTTP layer and the room service.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, collection: Collection, key: &str, value: String)
        -> Result<(), StoreError>;

    /// Returns whether the key existed.
    async fn delete(&self, collection: Collection, key: &str) -> Result<bool, StoreError>;

    async fn shutdown(&self);
}

/// In-process store, one map per collection.
pub struct MemoryStore {
    pools: DashMap<Collection, DashMap<String, String>>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        let pools = DashMap::new();
        for collection in Collection::ALL {
            tracing::debug!("creating store collection {}", collection.name());
            pools.insert(collection, DashMap::new());
        }
        Self {
            pools,
            closed: AtomicBool::new(false),
        }
    }

    fn check_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<String>, StoreError> {
        self.check_open()?;
        Ok(self
            .pools
            .get(&collection)
            .and_then(|pool| pool.get(key).map(|v| v.clone())))
    }

    async fn set(
        &self,
        collection: Collection,
        key: &str,
        value: String,
    ) -> Result<(), StoreError> {
        self.check_open()?;
        self.pools
            .entry(collection)
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<bool, StoreError> {
        self.check_open()?;
        Ok(self
            .pools
            .get(&collection)
            .is_some_and(|pool| pool.remove(key).is_some()))
    }

    async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for entry in self.pools.iter() {
            tracing::info!("shutting down store collection {}", entry.key().name());
            entry.value().clear();
        }
    }
}
