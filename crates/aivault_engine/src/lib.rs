//! AI Vault engine - progression and state for an escape-room puzzle game
//!
//! Players move through five themed rooms of puzzles. Solving every puzzle
//! in a room unlocks the next room and awards an artifact; the artifacts feed
//! a final multi-step vault puzzle.
//!
//! # Architecture
//!
//! - **Store**: path-addressable JSON state tree with a typed event bus
//! - **Persistence**: redacted saves, fail-soft loads merged onto defaults
//! - **Validator**: pure answer checking for every solution kind
//! - **Progression**: room/puzzle state machine with resume
//! - **Achievements**: badge rules reacting to store events
//! - **Hints**: rate-limited remote routing with authored fallbacks
//!
//! Nothing here is async. Hosts drive the timer, debounce saves, and call
//! remote assistants themselves.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use aivault_engine::{Catalog, PathStore, ProgressionEngine, RoomId, SystemClock, default_state};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = Arc::new(Catalog::from_file("data/puzzles.json".as_ref())?);
//! let mut store = PathStore::new(default_state(catalog.rules().total_hints()));
//! let mut engine = ProgressionEngine::new(catalog, Arc::new(SystemClock::new()));
//! let entry = engine.enter_room(&mut store, RoomId::Space)?;
//! # let _ = entry;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod achievements;
mod catalog;
mod clock;
mod error;
mod evaluation;
mod hints;
mod meta;
mod persistence;
mod progression;
mod state;
mod store;
mod timer;
mod validator;

// Crate-level exports - Errors
pub use error::{
    ConfigError, ListenerError, PersistenceError, ProgressionError, StoreError,
};

// Crate-level exports - State store
pub use store::{
    EventFilter, Listener, PathStore, StatePath, StoreEvent, SubscriptionId, deep_merge,
};

// Crate-level exports - Game state
pub use state::{
    Artifact, DEFAULT_TOTAL_HINTS, OverallProgress, PuzzleResult, RoomId, RoomTime, Screen,
    Settings, default_state,
};
pub use timer::format_duration;

// Crate-level exports - Catalog
pub use catalog::{
    AnswerMode, BadgeDef, Catalog, CharacterConfig, DEFAULT_CHARACTER, DEFAULT_POINTS, Feedback,
    GameRules, HintText, MetaInput, MetaPuzzleConfig, MetaStep, PuzzleConfig, PuzzleKind,
    RoomConfig,
};

// Crate-level exports - Validation
pub use validator::{Solution, Verdict, to_js_string, to_number, validate, validate_detailed};

// Crate-level exports - Progression
pub use progression::invariants::{
    HintBudgetInvariant, Invariant, InvariantSet, InvariantViolation, MetaUnlockInvariant,
    ProgressInvariants, UniqueBadgesInvariant, UnlockChainInvariant,
};
pub use progression::{
    ATTEMPT_PENALTY, MIN_PUZZLE_SCORE, ProgressionEngine, PuzzleToken, PuzzleView, RoomEntry,
    SubmitOutcome, puzzle_score,
};

// Crate-level exports - Achievements
pub use achievements::{
    AchievementEngine, BadgeRule, BadgeStatus, SPEED_THRESHOLD_SECS, Trigger, standard_rules,
};

// Crate-level exports - Hints and prompt evaluation
pub use evaluation::{Evaluation, PromptEvaluation, simulate_prompt_response};
pub use hints::{
    FallbackReason, GENERIC_HINT, Hint, HintContext, HintPolicy, HintRoute, HintSource,
    MAX_HINT_LEVEL, MIN_REMOTE_INTERVAL, fallback_hint, hint_level,
};

// Crate-level exports - Meta-puzzle
pub use meta::{MetaPuzzle, StepOutcome, artifacts, check_step};

// Crate-level exports - Time
pub use clock::{Clock, ManualClock, SystemClock};

// Crate-level exports - Persistence
pub use persistence::{
    FileStorage, MemoryStorage, PersistenceGateway, REDACTED_PATHS, SaveStorage,
};
