//! Badge rules.
//!
//! Rules are predicates over the current state, evaluated when a triggering
//! event arrives. Awarding is a set insert, so evaluating a rule twice is
//! harmless. End-of-game rules only run on [`Trigger::EndOfGame`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::catalog::{BadgeDef, Catalog};
use crate::error::{ListenerError, StoreError};
use crate::state::RoomId;
use crate::store::{EventFilter, PathStore, StoreEvent, SubscriptionId};

/// Room completion time (seconds) under which the speed badge is awarded.
pub const SPEED_THRESHOLD_SECS: u64 = 300;

/// What caused a rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A puzzle in this room was solved.
    PuzzleSolved(RoomId),
    /// This room was completed.
    RoomCompleted(RoomId),
    /// The final vault opened.
    EndOfGame,
}

/// One badge criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadgeRule {
    /// A room finished in under `threshold_secs` of game time.
    Speed {
        /// Badge awarded.
        badge: String,
        /// Exclusive upper bound on room time.
        threshold_secs: u64,
    },
    /// Every puzzle of `room` solved on the first attempt.
    PerfectRoom {
        /// Room inspected.
        room: RoomId,
        /// Badge awarded.
        badge: String,
    },
    /// No hints used by the end of the game.
    NoHints {
        /// Badge awarded.
        badge: String,
    },
    /// The game was finished.
    Completion {
        /// Badge awarded.
        badge: String,
    },
}

impl BadgeRule {
    /// Badge this rule awards.
    pub fn badge(&self) -> &str {
        match self {
            Self::Speed { badge, .. }
            | Self::PerfectRoom { badge, .. }
            | Self::NoHints { badge }
            | Self::Completion { badge } => badge,
        }
    }

    /// Whether `trigger` should evaluate this rule.
    pub fn listens_to(&self, trigger: Trigger) -> bool {
        match (self, trigger) {
            (Self::Speed { .. }, Trigger::RoomCompleted(_)) => true,
            (Self::PerfectRoom { room, .. }, Trigger::PuzzleSolved(r))
            | (Self::PerfectRoom { room, .. }, Trigger::RoomCompleted(r)) => *room == r,
            (Self::NoHints { .. } | Self::Completion { .. }, Trigger::EndOfGame) => true,
            _ => false,
        }
    }

    /// Evaluates the predicate against the current state.
    pub fn satisfied(&self, store: &PathStore, catalog: &Catalog, trigger: Trigger) -> bool {
        match self {
            Self::Speed { threshold_secs, .. } => {
                let Trigger::RoomCompleted(room) = trigger else {
                    return false;
                };
                store.room_timer(room).is_some_and(|time| {
                    time.end
                        .is_some_and(|end| end.saturating_sub(time.start) < *threshold_secs)
                })
            }
            Self::PerfectRoom { room, .. } => {
                let results = store.puzzle_results(*room);
                let required = catalog.room_puzzle_count(*room).max(1);
                results.len() >= required && results.values().all(|r| r.first_attempt())
            }
            Self::NoHints { .. } => store.hints_used() == 0,
            Self::Completion { .. } => true,
        }
    }
}

/// The rule set used by the game.
pub fn standard_rules() -> Vec<BadgeRule> {
    vec![
        BadgeRule::Speed {
            badge: "speed-demon".to_string(),
            threshold_secs: SPEED_THRESHOLD_SECS,
        },
        BadgeRule::PerfectRoom {
            room: RoomId::Space,
            badge: "perfect-logic".to_string(),
        },
        BadgeRule::PerfectRoom {
            room: RoomId::Food,
            badge: "data-master".to_string(),
        },
        BadgeRule::PerfectRoom {
            room: RoomId::Cyber,
            badge: "code-breaker".to_string(),
        },
        BadgeRule::NoHints {
            badge: "no-hints".to_string(),
        },
        BadgeRule::Completion {
            badge: "vault-master".to_string(),
        },
    ]
}

/// A badge definition with its earned flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, derive_getters::Getters)]
pub struct BadgeStatus {
    badge: BadgeDef,
    #[getter(copy)]
    earned: bool,
}

/// Evaluates badge rules in response to store events.
#[derive(Debug, Clone)]
pub struct AchievementEngine {
    catalog: Arc<Catalog>,
    rules: Vec<BadgeRule>,
}

impl AchievementEngine {
    /// Creates an engine with [`standard_rules`].
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_rules(catalog, standard_rules())
    }

    /// Creates an engine with custom rules.
    pub fn with_rules(catalog: Arc<Catalog>, rules: Vec<BadgeRule>) -> Self {
        for rule in &rules {
            if catalog.badge(rule.badge()).is_none() {
                warn!(badge = rule.badge(), "Badge rule has no catalog definition");
            }
        }
        Self { catalog, rules }
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[BadgeRule] {
        &self.rules
    }

    /// Subscribes the engine to the store's progression events.
    #[instrument(skip(self, store))]
    pub fn install(self: &Arc<Self>, store: &mut PathStore) -> Vec<SubscriptionId> {
        [
            EventFilter::PuzzleSolved,
            EventFilter::RoomCompleted,
            EventFilter::GameCompleted,
        ]
        .into_iter()
        .map(|filter| {
            let engine = Arc::clone(self);
            store.subscribe(filter, move |event, store| {
                let trigger = match event {
                    StoreEvent::PuzzleSolved { room, .. } => Trigger::PuzzleSolved(*room),
                    StoreEvent::RoomCompleted { room, .. } => Trigger::RoomCompleted(*room),
                    StoreEvent::GameCompleted => Trigger::EndOfGame,
                    _ => return Ok(()),
                };
                engine
                    .evaluate(store, trigger)
                    .map(|_| ())
                    .map_err(|e| ListenerError::new(e.to_string()))
            })
        })
        .collect()
    }

    /// Evaluates every rule listening to `trigger`. Returns newly earned badges.
    #[instrument(skip(self, store))]
    pub fn evaluate(
        &self,
        store: &mut PathStore,
        trigger: Trigger,
    ) -> Result<Vec<String>, StoreError> {
        let mut awarded = Vec::new();
        for rule in self.rules.iter().filter(|r| r.listens_to(trigger)) {
            if rule.satisfied(store, &self.catalog, trigger) && store.add_badge(rule.badge())? {
                awarded.push(rule.badge().to_string());
            }
        }
        debug!(?awarded, "Badge rules evaluated");
        Ok(awarded)
    }

    /// Runs the end-of-game rules.
    pub fn check_end_game(&self, store: &mut PathStore) -> Result<Vec<String>, StoreError> {
        self.evaluate(store, Trigger::EndOfGame)
    }

    /// Earned badges that have a catalog definition, in earn order.
    pub fn earned_badges(&self, store: &PathStore) -> Vec<BadgeDef> {
        store
            .badges()
            .iter()
            .filter_map(|id| self.catalog.badge(id).cloned())
            .collect()
    }

    /// Every defined badge with its earned flag, in catalog order.
    pub fn all_badges(&self, store: &PathStore) -> Vec<BadgeStatus> {
        let earned = store.badges();
        self.catalog
            .badges()
            .iter()
            .map(|badge| BadgeStatus {
                earned: earned.iter().any(|id| id == badge.id()),
                badge: badge.clone(),
            })
            .collect()
    }
}
