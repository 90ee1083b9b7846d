use crate::model::IntervalError;

/// Why a booking request was rejected before any locking happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    MissingRoomId,
    BlankRoomId,
    Interval(IntervalError),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::MissingRoomId => write!(f, "room reservation must have a room_id"),
            ValidationError::BlankRoomId => write!(f, "room_id must not be blank"),
            ValidationError::Interval(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    InvalidInterval(IntervalError),
    ValidationFailed(ValidationError),
    UnknownResource(String),
    /// The room's lock was not acquired in time. Safe to retry.
    ResourceBusy(String),
}

impl EngineError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::ResourceBusy(_))
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidInterval(e) => write!(f, "invalid interval: {e}"),
            EngineError::ValidationFailed(e) => {
                write!(f, "room reservation validation failed: {e}")
            }
            EngineError::UnknownResource(id) => write!(f, "room '{id}' not found"),
            EngineError::ResourceBusy(id) => write!(f, "room '{id}' is busy; try again"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::InvalidInterval(e) | EngineError::ValidationFailed(ValidationError::Interval(e)) => {
                Some(e)
            }
            _ => None,
        }
    }
}

impl From<IntervalError> for EngineError {
    fn from(e: IntervalError) -> Self {
        EngineError::InvalidInterval(e)
    }
}

impl From<ValidationError> for EngineError {
    fn from(e: ValidationError) -> Self {
        EngineError::ValidationFailed(e)
    }
}
