use tracing::info;

use crate::model::*;
use crate::observability::BOOKINGS_TOTAL;

use super::validate::validate_booking;
use super::{Engine, EngineError};

impl Engine {
    /// Reserve `request.room_id` for the requested interval.
    ///
    /// A collision is not an error: the outcome carries the existing interval
    /// with `is_new == false` and the room is left untouched.
    pub async fn book_room(&self, request: BookingRequest) -> Result<BookingOutcome, EngineError> {
        info!(?request, "room reservation");

        let (room_id, requested) = match validate_booking(&request) {
            Ok(v) => v,
            Err(e) => {
                metrics::counter!(BOOKINGS_TOTAL, "outcome" => "invalid").increment(1);
                return Err(e.into());
            }
        };

        let rs = self.registry.get_or_create(&room_id);
        let mut guard = match self.lock_room_write(&room_id, rs).await {
            Ok(guard) => guard,
            Err(e) => {
                metrics::counter!(BOOKINGS_TOTAL, "outcome" => "busy").increment(1);
                return Err(e);
            }
        };

        if let Some(existing) = guard.find_collision(requested.start(), requested.end())? {
            info!(
                room_id = %room_id,
                requested = %requested,
                collision = %existing,
                "room reservation failed: collision detected"
            );
            metrics::counter!(BOOKINGS_TOTAL, "outcome" => "conflict").increment(1);
            return Ok(BookingOutcome {
                room_id,
                interval: existing,
                is_new: false,
            });
        }

        let added = guard.add(requested.start(), requested.end())?;
        drop(guard);

        info!(room_id = %room_id, interval = %added, "room reservation succeeded");
        metrics::counter!(BOOKINGS_TOTAL, "outcome" => "created").increment(1);
        Ok(BookingOutcome {
            room_id,
            interval: added,
            is_new: true,
        })
    }

    /// Forget every room and reservation.
    pub fn reset(&self) {
        info!(rooms = self.registry.room_count(), "resetting reservations");
        self.registry.reset();
    }
}
