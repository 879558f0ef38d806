//! Error types for the vault engine.

use derive_more::{Display, Error};
use tracing::instrument;

use crate::state::RoomId;

/// Catalog or configuration error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Save/load error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Persistence error: {} at {}:{}", message, file, line)]
pub struct PersistenceError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl PersistenceError {
    /// Creates a new persistence error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<std::io::Error> for PersistenceError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        Self::new(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for PersistenceError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("JSON error: {}", err))
    }
}

/// Error returned by an event listener. Logged by the bus, never propagated.
#[derive(Debug, Clone, Display, Error)]
#[display("Listener error: {} at {}:{}", message, file, line)]
pub struct ListenerError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ListenerError {
    /// Creates a new listener error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Error raised by a path-addressed store mutation.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum StoreError {
    /// The path had no segments.
    #[display("Path is empty")]
    EmptyPath,

    /// The path contained an empty segment (e.g. `rooms..space`).
    #[display("Path '{}' contains an empty segment", _0)]
    EmptySegment(String),

    /// An intermediate value exists but cannot hold children.
    #[display("Cannot descend into '{}': value is not a container", _0)]
    NotAContainer(String),

    /// An array index was out of bounds or not a number.
    #[display("Index '{}' is not valid for the array at '{}'", index, path)]
    BadIndex {
        /// Array path.
        path: String,
        /// Offending segment.
        index: String,
    },
}

impl std::error::Error for StoreError {}

/// Error raised by a progression transition.
///
/// None of these leave persisted progress modified.
#[derive(Debug, Clone, Display)]
pub enum ProgressionError {
    /// The room has not been unlocked yet.
    #[display("Room '{}' is locked", _0)]
    RoomLocked(RoomId),

    /// The catalog cannot serve this screen.
    #[display("{}", _0)]
    Config(ConfigError),

    /// No room is currently entered.
    #[display("No room is active")]
    NoActiveRoom,

    /// The room is entered but no puzzle is loaded.
    #[display("No puzzle is active")]
    NoActivePuzzle,

    /// The active puzzle was already solved; results are immutable.
    #[display("Puzzle '{}' is already solved", _0)]
    AlreadySolved(String),

    /// The submission targets a puzzle that is not the active one.
    #[display("Puzzle '{}' is not active (active: '{}')", submitted, active)]
    StalePuzzle {
        /// Puzzle id the caller submitted for.
        submitted: String,
        /// Puzzle id currently loaded.
        active: String,
    },

    /// The meta-puzzle has not been unlocked.
    #[display("The vault is still locked")]
    MetaLocked,

    /// Every meta-puzzle step has been answered.
    #[display("The vault is already open")]
    MetaComplete,

    /// A store write failed.
    #[display("{}", _0)]
    Store(StoreError),
}

impl std::error::Error for ProgressionError {}

impl From<ConfigError> for ProgressionError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<StoreError> for ProgressionError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
