//! Typed event channel for the state store.
//!
//! One enum carries every notification so handlers match exhaustively
//! instead of string-comparing event names.

use serde_json::Value;

use super::PathStore;
use crate::error::ListenerError;
use crate::state::{Artifact, PuzzleResult, RoomId, Screen};

/// A notification published by the store.
#[derive(Debug, Clone, PartialEq, strum::IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum StoreEvent {
    /// Generic mutation event, emitted first for every `set`.
    StateChanged {
        /// Path that was written.
        path: String,
        /// New value.
        value: Value,
        /// Value previously at the path, if any.
        old_value: Option<Value>,
    },
    /// Path-specific event (`change:<path>`).
    PathChanged {
        /// Path that was written.
        path: String,
        /// New value.
        value: Value,
        /// Value previously at the path, if any.
        old_value: Option<Value>,
    },
    /// Coarse event for the top-level segment of a nested write.
    SectionChanged {
        /// Top-level segment (e.g. `rooms`).
        section: String,
        /// Full path that was written.
        path: String,
        /// New value.
        value: Value,
    },
    /// A puzzle result was recorded.
    PuzzleSolved {
        /// Room the puzzle belongs to.
        room: RoomId,
        /// Puzzle id.
        puzzle: String,
        /// Recorded result.
        result: PuzzleResult,
    },
    /// A submission was judged incorrect. Nothing was written.
    PuzzleFailed {
        /// Room the puzzle belongs to.
        room: RoomId,
        /// Puzzle id.
        puzzle: String,
        /// Attempts made so far on this puzzle instance.
        attempts: u32,
    },
    /// A room transitioned to completed.
    RoomCompleted {
        /// Completed room.
        room: RoomId,
        /// Artifact awarded.
        artifact: Artifact,
    },
    /// A badge was awarded for the first time.
    BadgeEarned {
        /// Badge id.
        badge: String,
    },
    /// A hint was consumed from the budget.
    HintUsed {
        /// Hints used after this one.
        used: u32,
        /// Hints left.
        remaining: u32,
    },
    /// The current screen changed.
    ScreenChanged {
        /// Previous screen.
        from: Option<Screen>,
        /// New screen.
        to: Screen,
    },
    /// State was replaced by a merged save.
    StateLoaded,
    /// State was replaced by defaults.
    StateReset,
    /// The final vault opened. Emitted once per game.
    GameCompleted,
}

impl StoreEvent {
    /// Returns the event name used in logs.
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// Selects which events a listener receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    /// Every event.
    All,
    /// Generic mutation events only.
    StateChanged,
    /// `change:<path>`: exact path writes plus section events for that top-level key.
    Path(String),
    /// [`StoreEvent::PuzzleSolved`].
    PuzzleSolved,
    /// [`StoreEvent::PuzzleFailed`].
    PuzzleFailed,
    /// [`StoreEvent::RoomCompleted`].
    RoomCompleted,
    /// [`StoreEvent::BadgeEarned`].
    BadgeEarned,
    /// [`StoreEvent::HintUsed`].
    HintUsed,
    /// [`StoreEvent::ScreenChanged`].
    ScreenChanged,
    /// [`StoreEvent::StateLoaded`].
    StateLoaded,
    /// [`StoreEvent::StateReset`].
    StateReset,
    /// [`StoreEvent::GameCompleted`].
    GameCompleted,
}

impl EventFilter {
    /// Returns `true` if `event` passes this filter.
    pub fn matches(&self, event: &StoreEvent) -> bool {
        match (self, event) {
            (Self::All, _) => true,
            (Self::StateChanged, StoreEvent::StateChanged { .. }) => true,
            (Self::Path(wanted), StoreEvent::PathChanged { path, .. }) => wanted == path,
            (Self::Path(wanted), StoreEvent::SectionChanged { section, .. }) => wanted == section,
            (Self::PuzzleSolved, StoreEvent::PuzzleSolved { .. }) => true,
            (Self::PuzzleFailed, StoreEvent::PuzzleFailed { .. }) => true,
            (Self::RoomCompleted, StoreEvent::RoomCompleted { .. }) => true,
            (Self::BadgeEarned, StoreEvent::BadgeEarned { .. }) => true,
            (Self::HintUsed, StoreEvent::HintUsed { .. }) => true,
            (Self::ScreenChanged, StoreEvent::ScreenChanged { .. }) => true,
            (Self::StateLoaded, StoreEvent::StateLoaded) => true,
            (Self::StateReset, StoreEvent::StateReset) => true,
            (Self::GameCompleted, StoreEvent::GameCompleted) => true,
            _ => false,
        }
    }
}

/// Handle returned by [`PathStore::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

/// Receives store events.
///
/// The store passed in is the live store: listeners may read and write it.
/// Events caused by those writes are queued and delivered after the current
/// event has reached every listener.
pub trait Listener {
    /// Handles one event.
    fn on_event(&mut self, event: &StoreEvent, store: &mut PathStore) -> Result<(), ListenerError>;
}

impl<F> Listener for F
where
    F: FnMut(&StoreEvent, &mut PathStore) -> Result<(), ListenerError>,
{
    fn on_event(&mut self, event: &StoreEvent, store: &mut PathStore) -> Result<(), ListenerError> {
        self(event, store)
    }
}

pub(crate) struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) filter: EventFilter,
    pub(crate) listener: Box<dyn Listener>,
}
