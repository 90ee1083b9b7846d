mod error;
mod mutations;
mod queries;
mod store;
mod validate;
#[cfg(test)]
mod tests;

pub use error::{EngineError, ValidationError};
pub use store::{Registry, SharedRoomState};

use std::time::{Duration, Instant};

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard};
use tracing::warn;

use crate::model::RoomReservations;

/// How long a booking waits for its room before giving up with `ResourceBusy`.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(60);

/// Books rooms and answers availability queries.
///
/// Every room has its own lock: bookings on one room are serialized in lock
/// acquisition order, bookings on different rooms run in parallel. Each engine
/// owns its registry, so independent instances never share state.
pub struct Engine {
    pub(super) registry: Registry,
    pub(super) lock_timeout: Duration,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            registry: Registry::new(),
            lock_timeout,
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Exclusive access to one room, bounded by the lock timeout.
    pub(super) async fn lock_room_write(
        &self,
        room_id: &str,
        rs: SharedRoomState,
    ) -> Result<OwnedRwLockWriteGuard<RoomReservations>, EngineError> {
        let wait_start = Instant::now();
        let acquired = tokio::time::timeout(self.lock_timeout, rs.write_owned()).await;
        metrics::histogram!(crate::observability::LOCK_WAIT_SECONDS)
            .record(wait_start.elapsed().as_secs_f64());
        acquired.map_err(|_| {
            warn!(room_id, timeout = ?self.lock_timeout, "room lock not acquired");
            EngineError::ResourceBusy(room_id.to_string())
        })
    }

    /// Shared access to one room, bounded by the lock timeout.
    pub(super) async fn lock_room_read(
        &self,
        room_id: &str,
        rs: SharedRoomState,
    ) -> Result<OwnedRwLockReadGuard<RoomReservations>, EngineError> {
        tokio::time::timeout(self.lock_timeout, rs.read_owned())
            .await
            .map_err(|_| {
                warn!(room_id, timeout = ?self.lock_timeout, "room read lock not acquired");
                EngineError::ResourceBusy(room_id.to_string())
            })
    }
}
