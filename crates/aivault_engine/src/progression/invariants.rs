//! Progress invariants.
//!
//! Logical properties that must hold for any reachable game state. They are
//! checked after every progression transition in debug builds and can be
//! tested on their own.

use std::collections::HashSet;

use crate::state::RoomId;
use crate::store::PathStore;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

impl<S, I1, I2, I3, I4> InvariantSet<S> for (I1, I2, I3, I4)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
    I4: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let violations: Vec<InvariantViolation> = [
            (I1::holds(state), I1::description()),
            (I2::holds(state), I2::description()),
            (I3::holds(state), I3::description()),
            (I4::holds(state), I4::description()),
        ]
        .into_iter()
        .filter(|(holds, _)| !holds)
        .map(|(_, description)| InvariantViolation::new(description))
        .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Room *i+1* is unlocked whenever room *i* is completed, and only the
/// first room starts unlocked.
pub struct UnlockChainInvariant;

impl Invariant<PathStore> for UnlockChainInvariant {
    fn holds(store: &PathStore) -> bool {
        if !store.room_unlocked(RoomId::Space) {
            return false;
        }
        RoomId::ORDER.windows(2).all(|pair| {
            let (prev, next) = (pair[0], pair[1]);
            store.room_completed(prev) == store.room_unlocked(next)
        })
    }

    fn description() -> &'static str {
        "A room is unlocked exactly when the previous room is completed"
    }
}

/// The vault is unlocked iff every room is completed.
pub struct MetaUnlockInvariant;

impl Invariant<PathStore> for MetaUnlockInvariant {
    fn holds(store: &PathStore) -> bool {
        let all_done = RoomId::ORDER.iter().all(|r| store.room_completed(*r));
        store.meta_unlocked() == all_done
    }

    fn description() -> &'static str {
        "The vault is unlocked iff all rooms are completed"
    }
}

/// Hints used never exceed the budget.
pub struct HintBudgetInvariant;

impl Invariant<PathStore> for HintBudgetInvariant {
    fn holds(store: &PathStore) -> bool {
        store.get_u64("hints.used").unwrap_or(0) <= store.get_u64("hints.total").unwrap_or(0)
    }

    fn description() -> &'static str {
        "Hints used never exceed the hint budget"
    }
}

/// Each badge is held at most once.
pub struct UniqueBadgesInvariant;

impl Invariant<PathStore> for UniqueBadgesInvariant {
    fn holds(store: &PathStore) -> bool {
        let badges = store.badges();
        let unique: HashSet<&String> = badges.iter().collect();
        unique.len() == badges.len()
    }

    fn description() -> &'static str {
        "Each badge is held at most once"
    }
}

/// Every progress invariant as a composable set.
pub type ProgressInvariants = (
    UnlockChainInvariant,
    MetaUnlockInvariant,
    HintBudgetInvariant,
    UniqueBadgesInvariant,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DEFAULT_TOTAL_HINTS, default_state};
    use serde_json::json;

    #[test]
    fn test_fresh_game_satisfies_all() {
        let store = PathStore::new(default_state(DEFAULT_TOTAL_HINTS));
        assert!(ProgressInvariants::check_all(&store).is_ok());
    }

    #[test]
    fn test_skipped_unlock_is_reported() {
        let mut store = PathStore::new(default_state(DEFAULT_TOTAL_HINTS));
        store.set("rooms.ethics.unlocked", json!(true)).unwrap();
        let violations = ProgressInvariants::check_all(&store).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].description,
            UnlockChainInvariant::description()
        );
    }

    #[test]
    fn test_duplicate_badges_and_overspent_hints() {
        let mut store = PathStore::new(default_state(2));
        store.set("hints.used", json!(3)).unwrap();
        store.set("badges", json!(["a", "a"])).unwrap();
        assert_eq!(ProgressInvariants::check_all(&store).unwrap_err().len(), 2);
    }
}
