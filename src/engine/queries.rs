use std::collections::HashMap;

use tracing::{debug, info};

use crate::model::*;

use super::validate::{validate_interval, validate_room_id};
use super::{Engine, EngineError};

impl Engine {
    /// Any room that has no reservation colliding with `[start, end)`.
    ///
    /// Best effort: rooms are inspected one at a time and no lock is held across
    /// the scan, so the room may be booked by someone else right after this
    /// returns. Callers book it and handle a conflict. A room that is locked for
    /// writing at the moment it is visited is skipped, never waited on. Which room
    /// is returned when several qualify is unspecified.
    pub async fn find_available_room(
        &self,
        start: Option<Ms>,
        end: Option<Ms>,
    ) -> Result<Option<String>, EngineError> {
        info!(?start, ?end, "find available room");
        let query = validate_interval(start, end)?;

        for (room_id, rs) in self.registry.snapshot() {
            let Ok(guard) = rs.try_read() else {
                debug!(room_id = %room_id, "room locked, skipped by availability scan");
                continue;
            };
            let free = guard.has_no_conflict(query.start(), query.end())?;
            drop(guard);
            if free {
                info!(room_id = %room_id, interval = %query, "available room found");
                return Ok(Some(room_id));
            }
        }

        info!(interval = %query, "available room not found");
        Ok(None)
    }

    /// Reservations of one room in start order.
    pub async fn list_reservations(&self, room_id: &str) -> Result<Vec<Interval>, EngineError> {
        info!(room_id, "get room reservations");
        let room_id = validate_room_id(Some(room_id))?;
        let rs = self
            .registry
            .get(room_id)
            .ok_or_else(|| EngineError::UnknownResource(room_id.to_string()))?;
        let guard = self.lock_room_read(room_id, rs).await?;
        Ok(guard.as_ordered_list())
    }

    /// Reservations of every known room, each list in start order.
    ///
    /// Each room is read under its lock with the engine's timeout; a room that
    /// stays locked fails the whole listing with `ResourceBusy`.
    pub async fn list_all_reservations(&self) -> Result<HashMap<String, Vec<Interval>>, EngineError> {
        debug!("get all room reservations");
        let snapshot = self.registry.snapshot();
        let mut all = HashMap::with_capacity(snapshot.len());
        for (room_id, rs) in snapshot {
            let intervals = self.lock_room_read(&room_id, rs).await?.as_ordered_list();
            all.insert(room_id, intervals);
        }
        Ok(all)
    }
}
