use std::collections::BTreeMap;

use serde::Serialize;

/// Unix milliseconds, UTC.
pub type Ms = i64;

pub const MINUTE_MS: Ms = 60_000;

/// Earliest minute-aligned instant representable as `Ms`.
pub const FIRST_MINUTE: Ms = match Ms::MIN.rem_euclid(MINUTE_MS) {
    0 => Ms::MIN,
    r => Ms::MIN + (MINUTE_MS - r),
};

/// Truncate an instant to the start of its minute. Sub-minute precision is discarded.
/// Instants before [`FIRST_MINUTE`] have no representable minute start and clamp to it.
pub fn truncate_to_minute(t: Ms) -> Ms {
    t.checked_sub(t.rem_euclid(MINUTE_MS)).unwrap_or(FIRST_MINUTE)
}

/// Why a pair of bounds does not form an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalError {
    MissingStart,
    MissingEnd,
    /// Start and end fall into the same minute.
    Empty,
    Reversed,
}

impl std::fmt::Display for IntervalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntervalError::MissingStart => write!(f, "reservation start must be set"),
            IntervalError::MissingEnd => write!(f, "reservation end must be set"),
            IntervalError::Empty => write!(f, "reservation start and end must not be equal"),
            IntervalError::Reversed => write!(f, "reservation start must be before end"),
        }
    }
}

impl std::error::Error for IntervalError {}

/// Half-open interval `[start, end)`, both bounds minute-aligned.
///
/// Construction normalizes and checks `start < end`, so every value of this
/// type is a non-empty interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Interval {
    start: Ms,
    end: Ms,
}

impl Interval {
    pub fn new(start: Ms, end: Ms) -> Result<Self, IntervalError> {
        let start = truncate_to_minute(start);
        let end = truncate_to_minute(end);
        match start.cmp(&end) {
            std::cmp::Ordering::Less => Ok(Self { start, end }),
            std::cmp::Ordering::Equal => Err(IntervalError::Empty),
            std::cmp::Ordering::Greater => Err(IntervalError::Reversed),
        }
    }

    /// Like [`Interval::new`], for bounds that may be absent.
    pub fn from_bounds(start: Option<Ms>, end: Option<Ms>) -> Result<Self, IntervalError> {
        let start = start.ok_or(IntervalError::MissingStart)?;
        let end = end.ok_or(IntervalError::MissingEnd)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> Ms {
        self.start
    }

    pub fn end(&self) -> Ms {
        self.end
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Non-overlapping reservations of a single room, ordered by start.
///
/// Not synchronized: the engine keeps each instance behind its room's lock.
#[derive(Debug, Clone, Default)]
pub struct RoomReservations {
    by_start: BTreeMap<Ms, Interval>,
}

impl RoomReservations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a stored interval colliding with `[start, end)`, if any.
    ///
    /// Stored intervals never overlap each other, so a collision can only be the
    /// predecessor or the successor of the candidate's start. O(log n).
    pub fn find_collision(&self, start: Ms, end: Ms) -> Result<Option<Interval>, IntervalError> {
        let candidate = Interval::new(start, end)?;
        Ok(self.collision_with(&candidate))
    }

    pub fn has_no_conflict(&self, start: Ms, end: Ms) -> Result<bool, IntervalError> {
        Ok(self.find_collision(start, end)?.is_none())
    }

    /// Insert without a collision check. Callers run [`find_collision`](Self::find_collision)
    /// first under the same lock. O(log n).
    pub fn add(&mut self, start: Ms, end: Ms) -> Result<Interval, IntervalError> {
        let interval = Interval::new(start, end)?;
        self.by_start.insert(interval.start, interval);
        Ok(interval)
    }

    /// Owned copy in ascending start order; later mutation does not affect it.
    pub fn as_ordered_list(&self) -> Vec<Interval> {
        self.by_start.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.by_start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_start.is_empty()
    }

    fn collision_with(&self, candidate: &Interval) -> Option<Interval> {
        let predecessor = self.by_start.range(..=candidate.start).next_back();
        if let Some((_, p)) = predecessor
            && p.overlaps(candidate)
        {
            return Some(*p);
        }
        let successor = self.by_start.range(candidate.start..).next();
        if let Some((_, s)) = successor
            && s.overlaps(candidate)
        {
            return Some(*s);
        }
        None
    }
}

/// A booking attempt as it arrives from a client. Any field may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BookingRequest {
    pub room_id: Option<String>,
    pub start: Option<Ms>,
    pub end: Option<Ms>,
}

impl BookingRequest {
    pub fn new(room_id: impl Into<String>, start: Ms, end: Ms) -> Self {
        Self {
            room_id: Some(room_id.into()),
            start: Some(start),
            end: Some(end),
        }
    }
}

/// Result of a booking attempt.
///
/// `is_new == true`: `interval` was recorded. `is_new == false`: `interval` is the
/// existing reservation that blocked the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingOutcome {
    pub room_id: String,
    pub interval: Interval,
    pub is_new: bool,
}
