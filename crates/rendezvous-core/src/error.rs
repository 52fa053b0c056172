use thiserror::Error;

/// Reasons an input record is rejected before any scanning or model building.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("input is not valid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("at least one person is required")]
    NoPeople,
    #[error("at least one destination is required")]
    NoDestinations,
    #[error("name `{0}` is used more than once")]
    DuplicateName(String),
    #[error("planning horizon must contain at least one hour")]
    EmptyHorizon,
    #[error("availability of `{name}` covers {found} hours, expected {expected}")]
    HorizonMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("availability entries must be 0 or 1 (found {0})")]
    InvalidAvailability(u8),
    #[error("fun score of `{name}` must lie in [0, 10] (found {score})")]
    FunScoreOutOfRange { name: String, score: f64 },
    #[error("location of `{0}` is not finite")]
    NonFiniteLocation(String),
    #[error("activity duration must be at least one hour")]
    ZeroDuration,
    #[error("start timestamp `{value}` is not a valid ISO 8601 date-time")]
    Timestamp {
        value: String,
        #[source]
        source: time::error::Parse,
    },
    #[error("activity windows starting at `{start}` run past the last representable date ({hours} hours needed)")]
    WindowOutOfRange { start: String, hours: i64 },
    #[error("alpha must lie in [0, 1] (found {0})")]
    AlphaOutOfRange(f64),
    #[error("distance references must be finite and distinct (min={min}, max={max})")]
    InvalidDistanceReference { min: f64, max: f64 },
    #[error("only one distance reference is set; set both or neither")]
    PartialDistanceReference,
    #[error("capacity level range must be at least 2 (found {0})")]
    InvalidLevelRange(u32),
    #[error("big-M must be positive and finite (found {0})")]
    InvalidBigM(f64),
    #[error("time limit must be positive and finite (found {0})")]
    InvalidTimeLimit(f64),
}
