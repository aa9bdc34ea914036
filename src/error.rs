use thiserror::Error;

use crate::tune::TuneKey;

/// A tune definition (or the file it came from) could not be accepted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("tune {name:?}: duration must be a positive number of seconds, got {duration}")]
    InvalidDuration { name: String, duration: f64 },

    #[error("zone [{start}, {end}] must lie within [0, 1]")]
    ZoneOutOfRange { start: f64, end: f64 },

    #[error("zone end {end} must be greater than zone start {start}")]
    EmptyZone { start: f64, end: f64 },

    #[error("tune {name:?}: mode bonus must be a finite value >= 0, got {bonus}")]
    InvalidBonus { name: String, bonus: f64 },

    #[error("tune {name:?}: {field} must be >= 0, got {value}")]
    NegativeAmount {
        name: String,
        field: &'static str,
        value: i32,
    },

    #[error("tune {name:?}: key must be between 1 and 4, got {key}")]
    InvalidKey { name: String, key: u8 },

    #[error("tune key {0} is defined more than once")]
    DuplicateKey(TuneKey),

    #[error("tune {name:?}: {source}")]
    InvalidZone {
        name: String,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("health {field} {value} is out of range")]
    InvalidHealth { field: &'static str, value: f64 },

    #[error("snake {field} must be a positive number of seconds, got {value}")]
    InvalidSnake { field: &'static str, value: f64 },

    #[error("unknown tune preset {0:?}")]
    UnknownPreset(String),

    #[error("no valid tune definitions were loaded")]
    EmptyBook,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// An input arrived that the tune state machine cannot act on in its current state.
///
/// These never change state; callers log them and carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("tune {active} is already being held; cannot start tune {requested}")]
    AlreadyHolding { active: TuneKey, requested: TuneKey },

    #[error("no tune is being held")]
    NotHolding,

    #[error("attempt has already been resolved")]
    AlreadyResolved,

    #[error("tune {0} is not defined")]
    UnknownTune(TuneKey),

    #[error("tune {0} is locked in the current mode")]
    TuneLocked(TuneKey),

    #[error("tune input is disabled")]
    InputDisabled,

    #[error("session is not in progress")]
    SessionNotPlaying,
}

/// A heal or damage amount was negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MagnitudeError {
    #[error("{kind} amount must be >= 0, got {value}")]
    Negative { kind: &'static str, value: i32 },
}

/// The session history store failed.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history database: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("history export: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("history row {id}: unreadable {column} value {value:?}")]
    CorruptRow {
        id: i64,
        column: &'static str,
        value: String,
    },
}
