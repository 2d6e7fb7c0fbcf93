//! In-memory registry of active rooms.
//!
//! Rooms are indexed by id and by short code. Each room sits behind its own
//! async mutex, which is the only path through which the room is mutated.
//! The index itself is guarded by a short-lived `RwLock` that is never held
//! across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use caseroom_core::clock::Clock;
use caseroom_core::error::DomainError;
use caseroom_core::rng::DeterministicRng;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::{Room, RoomSeed};

/// Prefix of every room code.
pub const CODE_PREFIX: &str = "CASE-";

/// Number of random characters after the prefix.
pub const CODE_LENGTH: usize = 4;

const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const MAX_CODE_ATTEMPTS: usize = 64;

/// Shared handle to one stored room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    /// Room id.
    pub id: Uuid,
    /// Room code.
    pub code: String,
    room: Arc<Mutex<Room>>,
    summary: Arc<Mutex<()>>,
}

impl RoomHandle {
    /// Locks the room for a read or a mutation.
    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, Room> {
        self.room.lock().await
    }

    /// Serializes summary generation for this room. Independent of the room
    /// lock, so it can be held across a collaborator call.
    pub async fn lock_summary(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.summary.lock().await
    }
}

#[derive(Debug, Default)]
struct Index {
    rooms: HashMap<Uuid, RoomHandle>,
    codes: HashMap<String, Uuid>,
}

/// Registry of all rooms for the lifetime of the process.
#[derive(Debug, Default)]
pub struct RoomStore {
    index: RwLock<Index>,
}

impl RoomStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a room with a fresh id and a code unique among active rooms.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if no unused code was found
    /// within a bounded number of attempts.
    pub fn create_room(
        &self,
        seed: RoomSeed,
        rng: &mut dyn DeterministicRng,
        clock: &dyn Clock,
    ) -> Result<RoomHandle, DomainError> {
        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);

        let code = (0..MAX_CODE_ATTEMPTS)
            .map(|_| generate_code(rng))
            .find(|candidate| !index.codes.contains_key(candidate))
            .ok_or_else(|| {
                DomainError::Infrastructure("could not allocate a unique room code".to_owned())
            })?;

        let id = Uuid::new_v4();
        let room = Room::new(id, code.clone(), seed, clock.now());
        let handle = RoomHandle {
            id,
            code: code.clone(),
            room: Arc::new(Mutex::new(room)),
            summary: Arc::new(Mutex::new(())),
        };
        index.codes.insert(code.clone(), id);
        index.rooms.insert(id, handle.clone());

        info!(room_id = %id, code = %code, "room created");
        Ok(handle)
    }

    /// Looks up a room by id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` on a miss.
    pub fn get(&self, room_id: Uuid) -> Result<RoomHandle, DomainError> {
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        index
            .rooms
            .get(&room_id)
            .cloned()
            .ok_or_else(|| DomainError::RoomNotFound(room_id.to_string()))
    }

    /// Looks up a room by code, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` on a miss.
    pub fn find_by_code(&self, code: &str) -> Result<RoomHandle, DomainError> {
        let normalized = code.trim().to_uppercase();
        let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
        index
            .codes
            .get(&normalized)
            .and_then(|id| index.rooms.get(id))
            .cloned()
            .ok_or_else(|| DomainError::RoomNotFound(normalized))
    }

    /// Number of active rooms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rooms
            .len()
    }

    /// Whether no rooms exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn generate_code(rng: &mut dyn DeterministicRng) -> String {
    let max = u32::try_from(CODE_ALPHABET.len() - 1).unwrap_or(u32::MAX);
    let suffix: String = (0..CODE_LENGTH)
        .map(|_| {
            let pick = usize::try_from(rng.next_u32_range(0, max)).unwrap_or_default();
            char::from(CODE_ALPHABET[pick % CODE_ALPHABET.len()])
        })
        .collect();
    format!("{CODE_PREFIX}{suffix}")
}
