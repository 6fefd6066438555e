pub mod registry;

use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::gateway::GatewayError;
use crate::store::{Collection, SessionStore, StoreError};
pub use registry::{AlterOp, RoomRegistry};

/// A user's seat in a room, as stored under `room_sessions/{user_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSession {
    pub session_id: String,
    pub room_id: String,
}

/// Random 32-char hex token.
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn decode<T: DeserializeOwned>(
    collection: Collection,
    key: &str,
    raw: &str,
) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|source| StoreError::Corrupt {
        collection: collection.name(),
        key: key.to_string(),
        source,
    })
}

/// Keeps the registry and the local store in step. Every operation calls the
/// registry first and only touches the store once it has agreed.
///
/// Writes to a room's member list are serialized per room, so concurrent
/// callers never lose each other's updates.
#[derive(Clone)]
pub struct RoomService {
    registry: RoomRegistry,
    store: Arc<dyn SessionStore>,
    room_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl RoomService {
    pub fn new(registry: RoomRegistry, store: Arc<dyn SessionStore>) -> Self {
        Self {
            registry,
            store,
            room_locks: Arc::new(DashMap::new()),
        }
    }

    async fn lock_room(&self, room_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .room_locks
            .entry(room_id.to_string())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    pub async fn create_room(&self, room_id: &str) -> Result<(), GatewayError> {
        self.registry.create_room(room_id).await?;
        let _guard = self.lock_room(room_id).await;
        if !self.room_exists(room_id).await? {
            self.save_members(room_id, &[]).await?;
        }
        tracing::info!("created room {room_id}");
        Ok(())
    }

    /// Delete the room remotely, then every member's mapping and the room entry.
    pub async fn delete_room(&self, room_id: &str) -> Result<(), GatewayError> {
        self.registry.delete_room(room_id).await?;

        let _guard = self.lock_room(room_id).await;
        for user_id in self.members(room_id).await? {
            let in_room = self
                .room_session(&user_id)
                .await?
                .is_some_and(|s| s.room_id == room_id);
            if in_room {
                self.store.delete(Collection::RoomSessions, &user_id).await?;
            }
        }
        self.store.delete(Collection::Rooms, room_id).await?;
        tracing::info!("deleted room {room_id}");
        Ok(())
    }

    pub async fn room_exists(&self, room_id: &str) -> Result<bool, GatewayError> {
        Ok(self.store.get(Collection::Rooms, room_id).await?.is_some())
    }

    pub async fn members(&self, room_id: &str) -> Result<Vec<String>, GatewayError> {
        match self.store.get(Collection::Rooms, room_id).await? {
            Some(raw) => Ok(decode(Collection::Rooms, room_id, &raw)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn room_session(&self, user_id: &str) -> Result<Option<RoomSession>, GatewayError> {
        match self.store.get(Collection::RoomSessions, user_id).await? {
            Some(raw) => Ok(Some(decode(Collection::RoomSessions, user_id, &raw)?)),
            None => Ok(None),
        }
    }

    /// Seat each user in turn. Stops at the first failure: users before it
    /// keep their sessions, users after it are never attempted.
    ///
    /// A user already seated in `room_id` keeps their session. A user seated
    /// in another room is unseated there first.
    pub async fn add_users(
        &self,
        room_id: &str,
        user_ids: &[String],
    ) -> Result<Vec<RoomSession>, GatewayError> {
        let mut added = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            match self.room_session(user_id).await? {
                Some(existing) if existing.room_id == room_id => {
                    tracing::debug!("user {user_id} already in room {room_id}");
                    added.push(existing);
                    continue;
                }
                Some(existing) => self.unseat(user_id, &existing).await?,
                None => {}
            }

            let session = RoomSession {
                session_id: generate_session_id(),
                room_id: room_id.to_string(),
            };
            self.registry
                .alter_session(room_id, &session.session_id, AlterOp::AddSession)
                .await?;

            self.store
                .set(
                    Collection::RoomSessions,
                    user_id,
                    serde_json::to_string(&session)?,
                )
                .await?;
            self.update_members(room_id, |members| {
                if !members.contains(user_id) {
                    members.push(user_id.clone());
                }
            })
            .await?;
            tracing::debug!("added user {user_id} to room {room_id}");
            added.push(session);
        }
        Ok(added)
    }

    /// Unseat each user in turn, with the same fail-fast rule as
    /// [`RoomService::add_users`].
    pub async fn remove_users(&self, room_id: &str, user_ids: &[String]) -> Result<(), GatewayError> {
        for user_id in user_ids {
            let session = self
                .room_session(user_id)
                .await?
                .filter(|s| s.room_id == room_id)
                .ok_or_else(|| GatewayError::NoRoomSession {
                    user_id: user_id.clone(),
                    room_id: room_id.to_string(),
                })?;

            self.unseat(user_id, &session).await?;
            tracing::debug!("removed user {user_id} from room {room_id}");
        }
        Ok(())
    }

    /// Drop `session` remotely, then its mapping and the room's member entry.
    async fn unseat(&self, user_id: &str, session: &RoomSession) -> Result<(), GatewayError> {
        self.registry
            .alter_session(&session.room_id, &session.session_id, AlterOp::RemoveSession)
            .await?;

        self.store.delete(Collection::RoomSessions, user_id).await?;
        self.update_members(&session.room_id, |members| members.retain(|m| m != user_id))
            .await
    }

    async fn update_members(
        &self,
        room_id: &str,
        f: impl FnOnce(&mut Vec<String>),
    ) -> Result<(), GatewayError> {
        let _guard = self.lock_room(room_id).await;
        let mut members = self.members(room_id).await?;
        f(&mut members);
        self.save_members(room_id, &members).await
    }

    async fn save_members(&self, room_id: &str, members: &[String]) -> Result<(), GatewayError> {
        self.store
            .set(Collection::Rooms, room_id, serde_json::to_string(members)?)
            .await?;
        Ok(())
    }
}
