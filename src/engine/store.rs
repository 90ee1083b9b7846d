use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::model::RoomReservations;

/// A room's reservations together with the lock that guards them.
pub type SharedRoomState = Arc<RwLock<RoomReservations>>;

/// Room id → reservations. Entries are created on first booking and only
/// removed by [`Registry::reset`].
pub struct Registry {
    rooms: DashMap<String, SharedRoomState>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn get(&self, room_id: &str) -> Option<SharedRoomState> {
        self.rooms.get(room_id).map(|e| e.value().clone())
    }

    /// Existing state for `room_id`, or a new empty one. Concurrent first access
    /// for the same id installs exactly one state; every caller gets that one.
    pub fn get_or_create(&self, room_id: &str) -> SharedRoomState {
        debug!(room_id, "find or create room reservations");
        if let Some(existing) = self.get(room_id) {
            return existing;
        }
        let mut created = false;
        let state = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                created = true;
                Arc::new(RwLock::new(RoomReservations::new()))
            })
            .value()
            .clone();
        // Shard lock is released above; len() would deadlock inside the closure.
        if created {
            info!(room_id, "created room reservations");
            metrics::gauge!(crate::observability::ROOMS_ACTIVE).set(self.rooms.len() as f64);
        }
        state
    }

    /// Point-in-time copy of the entries, in no particular order. Rooms created
    /// after the call are not included.
    pub fn snapshot(&self) -> Vec<(String, SharedRoomState)> {
        self.rooms
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn reset(&self) {
        self.rooms.clear();
        metrics::gauge!(crate::observability::ROOMS_ACTIVE).set(0.0);
    }
}
