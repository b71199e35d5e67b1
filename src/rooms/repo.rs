use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use serde_json::Map;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    store::{filter, Collection, DocumentStore, Filter, Sort, StoreError},
    timestamp, AppError, AppResult,
};

use super::model::Room;

pub const COLLECTION: &str = "rooms";

type RoomLocks = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// The nested sequence a mutation rewrites.
#[derive(Debug, Clone, Copy)]
pub(super) enum Nested {
    Chatters,
    Messages,
}

/// Rooms over the document store. Cheap to clone; clones share the
/// per-room mutation locks.
#[derive(Debug, Clone)]
pub struct RoomRepository {
    rooms: Collection,
    locks: RoomLocks,
}

impl RoomRepository {
    pub async fn new(store: &DocumentStore) -> AppResult<Self> {
        let rooms = store.collection(COLLECTION)?;
        rooms.ensure_unique_index("publicID").await?;

        Ok(Self {
            rooms,
            locks: Default::default(),
        })
    }

    /// Every room, newest first.
    pub async fn list_rooms(&self) -> AppResult<Vec<Room>> {
        let rooms = self
            .rooms
            .find_as(&Filter::new(), Some(&Sort::descending("created")))
            .await?;
        Ok(rooms)
    }

    pub async fn get_room(&self, public_id: &str) -> AppResult<Room> {
        self.rooms
            .find_as::<Room>(&by_public_id(public_id), None)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(format!("room {public_id}")))
    }

    pub async fn create_room(&self, name: &str) -> AppResult<Room> {
        let room = Room {
            public_id: Uuid::now_v7().to_string(),
            name: name.to_owned(),
            created: timestamp::now(),
            chatters: Vec::new(),
            messages: Vec::new(),
        };
        self.rooms.insert_as(&room).await?;

        tracing::info!(room = %room.public_id, name = %room.name, "created room");
        Ok(room)
    }

    /// Succeeds whether or not the room existed.
    pub async fn delete_room(&self, public_id: &str) -> AppResult<()> {
        let removed = self.rooms.remove(&by_public_id(public_id)).await?;
        self.forget(public_id);

        tracing::info!(room = public_id, removed, "deleted room");
        Ok(())
    }

    pub async fn count_rooms(&self) -> AppResult<u64> {
        Ok(self.rooms.count(&Filter::new()).await?)
    }

    pub async fn delete_all_rooms(&self) -> AppResult<u64> {
        let removed = self.rooms.remove(&Filter::new()).await?;
        // Locks still held or awaited stay, so their holders keep excluding each other.
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, lock| Arc::strong_count(lock) > 1);

        tracing::info!(removed, "deleted all rooms");
        Ok(removed)
    }

    /// Runs `change` against the current room while holding that room's lock
    /// and writes the touched sequence back if `change` reports a change.
    pub(super) async fn mutate<F>(&self, public_id: &str, nested: Nested, change: F) -> AppResult<Room>
    where
        F: FnOnce(&mut Room) -> AppResult<bool>,
    {
        let guard = self.lock(public_id).await;

        let mut room = match self.get_room(public_id).await {
            Ok(room) => room,
            Err(err) => {
                drop(guard);
                self.forget(public_id);
                return Err(err);
            }
        };

        if !change(&mut room)? {
            return Ok(room);
        }

        let (field, value) = match nested {
            Nested::Chatters => ("chatters", serde_json::to_value(&room.chatters)),
            Nested::Messages => ("messages", serde_json::to_value(&room.messages)),
        };
        let mut set = Map::new();
        set.insert(field.to_owned(), value.map_err(StoreError::from)?);

        let replaced = self.rooms.update(&by_public_id(public_id), set).await?;
        if replaced == 0 {
            tracing::warn!(room = public_id, field, "room vanished during update");
            return Err(AppError::not_found(format!("room {public_id}")));
        }

        Ok(room)
    }

    async fn lock(&self, public_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(public_id.to_owned())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Drops the room's lock entry unless another task holds or awaits it.
    fn forget(&self, public_id: &str) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(public_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(public_id);
        }
    }
}

fn by_public_id(public_id: &str) -> Filter {
    filter([("publicID", public_id)])
}
