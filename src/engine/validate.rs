use tracing::debug;

use crate::model::*;

use super::error::ValidationError;

/// Trimmed room id, or why it is unusable.
pub(crate) fn validate_room_id(room_id: Option<&str>) -> Result<&str, ValidationError> {
    debug!(?room_id, "validating room id");
    let room_id = room_id.ok_or(ValidationError::MissingRoomId)?;
    let trimmed = room_id.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankRoomId);
    }
    Ok(trimmed)
}

/// Bounds are checked after minute normalization, so a window that collapses
/// into a single minute is rejected here rather than under the room lock.
pub(crate) fn validate_interval(start: Option<Ms>, end: Option<Ms>) -> Result<Interval, IntervalError> {
    debug!(?start, ?end, "validating interval");
    Interval::from_bounds(start, end)
}

pub(crate) fn validate_booking(request: &BookingRequest) -> Result<(String, Interval), ValidationError> {
    let room_id = validate_room_id(request.room_id.as_deref())?;
    let interval =
        validate_interval(request.start, request.end).map_err(ValidationError::Interval)?;
    Ok((room_id.to_string(), interval))
}
