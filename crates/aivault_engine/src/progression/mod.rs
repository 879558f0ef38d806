//! Room and puzzle progression.
//!
//! [`ProgressionEngine`] owns the in-memory part of progression: which room
//! is entered, the puzzle cursor, and the attempt counter of the loaded
//! puzzle. Everything durable lives in the [`PathStore`]. Rejected
//! transitions return before writing anything.

pub mod invariants;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::catalog::{Catalog, PuzzleConfig, RoomConfig};
use crate::clock::Clock;
use crate::error::{ConfigError, ProgressionError};
use crate::hints::HintContext;
use crate::state::{Artifact, PuzzleResult, RoomId};
use crate::store::{PathStore, StoreEvent};
use crate::validator::validate;
use invariants::{InvariantSet, ProgressInvariants};

/// Score never drops below this for a solved puzzle.
pub const MIN_PUZZLE_SCORE: u32 = 10;

/// Points lost per extra attempt.
pub const ATTEMPT_PENALTY: u32 = 20;

/// Score for solving a puzzle worth `points` on attempt number `attempts`.
pub fn puzzle_score(points: u32, attempts: u32) -> u32 {
    points
        .saturating_sub(ATTEMPT_PENALTY.saturating_mul(attempts.saturating_sub(1)))
        .max(MIN_PUZZLE_SCORE)
}

/// Identity of one loaded puzzle instance.
///
/// A fresh token is issued every time a puzzle is loaded, so work started
/// for an earlier instance can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PuzzleToken(u64);

/// A puzzle ready to be played.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct PuzzleView {
    #[getter(copy)]
    room: RoomId,
    #[getter(copy)]
    index: usize,
    #[getter(copy)]
    total: usize,
    puzzle: PuzzleConfig,
    #[getter(copy)]
    token: PuzzleToken,
}

/// Result of entering or advancing within a room.
#[derive(Debug, Clone)]
pub enum RoomEntry {
    /// A puzzle is loaded.
    Puzzle(PuzzleView),
    /// Every puzzle is solved; the room holds this artifact.
    Completed {
        /// Room that is complete.
        room: RoomId,
        /// Artifact collected in the room.
        artifact: Artifact,
    },
}

/// Result of judging a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Solved and recorded. Call [`ProgressionEngine::advance`] next.
    Correct {
        /// Recorded result.
        result: PuzzleResult,
        /// Success message from the catalog.
        feedback: String,
    },
    /// Not solved. Nothing was recorded.
    Incorrect {
        /// Attempts made on this puzzle instance.
        attempts: u32,
        /// Failure message from the catalog.
        feedback: String,
    },
}

#[derive(Debug, Clone)]
struct ActivePuzzle {
    room: RoomId,
    index: usize,
    puzzle_id: String,
    attempts: u32,
    started_at: Duration,
    token: PuzzleToken,
    solved: bool,
}

/// Room/puzzle state machine.
#[derive(Debug)]
pub struct ProgressionEngine {
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
    room: Option<RoomId>,
    cursor: usize,
    active: Option<ActivePuzzle>,
    next_token: u64,
}

impl ProgressionEngine {
    /// Creates an engine with nothing entered.
    pub fn new(catalog: Arc<Catalog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog,
            clock,
            room: None,
            cursor: 0,
            active: None,
            next_token: 0,
        }
    }

    /// The catalog this engine plays.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Entered room, if any.
    pub fn room(&self) -> Option<RoomId> {
        self.room
    }

    /// Puzzle cursor within the entered room. Equals the puzzle count once
    /// the room is complete.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Token of the loaded puzzle.
    pub fn current_token(&self) -> Option<PuzzleToken> {
        self.active.as_ref().map(|a| a.token)
    }

    /// Whether `token` still names the loaded, unsolved puzzle.
    pub fn is_current(&self, token: PuzzleToken) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.token == token && !a.solved)
    }

    /// Attempts made on the loaded puzzle.
    pub fn attempts(&self) -> u32 {
        self.active.as_ref().map_or(0, |a| a.attempts)
    }

    /// The loaded puzzle's configuration.
    pub fn current_puzzle(&self) -> Option<&PuzzleConfig> {
        let active = self.active.as_ref()?;
        self.catalog.puzzle(active.room, &active.puzzle_id)
    }

    /// Enters `room`, resuming at the first unsolved puzzle.
    ///
    /// A room already marked completed short-circuits to its artifact. A room
    /// whose puzzles are all solved but which was never marked completed is
    /// completed now.
    #[instrument(skip(self, store), fields(room = %room))]
    pub fn enter_room(
        &mut self,
        store: &mut PathStore,
        room: RoomId,
    ) -> Result<RoomEntry, ProgressionError> {
        if !store.room_unlocked(room) {
            warn!("Attempt to enter a locked room");
            return Err(ProgressionError::RoomLocked(room));
        }
        let catalog = Arc::clone(&self.catalog);
        let config = catalog.room(room).map_err(|e| {
            warn!(error = %e, "Room cannot be loaded");
            e
        })?;
        let resume_at = resume_index(store, config);
        let total = config.puzzles().len();

        self.detach();
        store.set_current_room(Some(room))?;
        store.set("currentPuzzleIndex", json!(0))?;
        store.start_room_timer(room)?;
        self.room = Some(room);
        self.cursor = resume_at;
        info!(resume_at, total, "Room entered");

        if store.room_completed(room) {
            self.cursor = total;
            let artifact = store
                .room_artifact(room)
                .unwrap_or_else(|| config.artifact().clone());
            debug!("Room already completed");
            return Ok(RoomEntry::Completed { room, artifact });
        }
        self.advance(store)
    }

    /// Leaves the entered room, dropping the loaded puzzle and its attempts.
    #[instrument(skip(self, store))]
    pub fn leave_room(&mut self, store: &mut PathStore) -> Result<(), ProgressionError> {
        self.detach();
        self.room = None;
        self.cursor = 0;
        store.set_current_room(None)?;
        Ok(())
    }

    /// Judges an answer for the loaded puzzle.
    #[instrument(skip(self, store, answer), fields(puzzle = %puzzle_id))]
    pub fn submit_answer(
        &mut self,
        store: &mut PathStore,
        puzzle_id: &str,
        answer: &Value,
    ) -> Result<SubmitOutcome, ProgressionError> {
        let puzzle = self.check_submission(puzzle_id)?.clone();
        let Some(solution) = puzzle.solution() else {
            return Err(ConfigError::new(format!(
                "Puzzle '{}' is judged externally",
                puzzle_id
            ))
            .into());
        };
        let correct = validate(solution, answer);
        self.conclude(store, &puzzle, correct)
    }

    /// Reports an external verdict for the loaded puzzle (prompt puzzles).
    #[instrument(skip(self, store), fields(puzzle = %puzzle_id))]
    pub fn record_outcome(
        &mut self,
        store: &mut PathStore,
        puzzle_id: &str,
        correct: bool,
    ) -> Result<SubmitOutcome, ProgressionError> {
        let puzzle = self.check_submission(puzzle_id)?.clone();
        self.conclude(store, &puzzle, correct)
    }

    /// Loads the next unsolved puzzle at or after the cursor, or completes
    /// the room once every puzzle is solved.
    #[instrument(skip(self, store))]
    pub fn advance(&mut self, store: &mut PathStore) -> Result<RoomEntry, ProgressionError> {
        let room = self.room.ok_or(ProgressionError::NoActiveRoom)?;
        let catalog = Arc::clone(&self.catalog);
        let config = catalog.room(room)?;
        let total = config.puzzles().len();

        while let Some(puzzle) = config.puzzle_at(self.cursor)
            && store
                .puzzle_result(room, puzzle.id())
                .is_some_and(|r| r.solved())
        {
            debug!(index = self.cursor, puzzle = %puzzle.id(), "Skipping solved puzzle");
            self.cursor += 1;
        }

        if let Some(puzzle) = config.puzzle_at(self.cursor) {
            if let Some(active) = &self.active
                && active.index == self.cursor
                && !active.solved
            {
                return Ok(RoomEntry::Puzzle(self.view(room, total, puzzle, active.token)));
            }
            let token = self.load(room, self.cursor, puzzle);
            store.set("currentPuzzleIndex", json!(self.cursor))?;
            debug!(index = self.cursor, puzzle = %puzzle.id(), "Puzzle loaded");
            return Ok(RoomEntry::Puzzle(self.view(room, total, puzzle, token)));
        }

        self.detach();
        let artifact = config.artifact().clone();
        // The speed rule reads the end time when the completion event fires.
        store.stop_room_timer(room)?;
        store.mark_room_completed(room, artifact.clone())?;
        self.check_invariants(store);
        Ok(RoomEntry::Completed { room, artifact })
    }

    /// Context handed to the hint assistant for the loaded puzzle.
    pub fn hint_context(&self) -> Option<HintContext> {
        let active = self.active.as_ref()?;
        let puzzle = self.catalog.puzzle(active.room, &active.puzzle_id)?;
        Some(HintContext::new(
            puzzle.title().clone(),
            puzzle.description().clone(),
            puzzle.difficulty(),
            active.attempts,
            puzzle.hints().clone(),
        ))
    }

    fn check_submission(&self, puzzle_id: &str) -> Result<&PuzzleConfig, ProgressionError> {
        if self.room.is_none() {
            return Err(ProgressionError::NoActiveRoom);
        }
        let active = self.active.as_ref().ok_or(ProgressionError::NoActivePuzzle)?;
        if active.puzzle_id != puzzle_id {
            return Err(ProgressionError::StalePuzzle {
                submitted: puzzle_id.to_string(),
                active: active.puzzle_id.clone(),
            });
        }
        if active.solved {
            return Err(ProgressionError::AlreadySolved(puzzle_id.to_string()));
        }
        self.catalog
            .puzzle(active.room, puzzle_id)
            .ok_or_else(|| {
                ProgressionError::Config(ConfigError::new(format!(
                    "Missing catalog entry for puzzle '{}'",
                    puzzle_id
                )))
            })
    }

    fn conclude(
        &mut self,
        store: &mut PathStore,
        puzzle: &PuzzleConfig,
        correct: bool,
    ) -> Result<SubmitOutcome, ProgressionError> {
        let now = self.clock.now();
        let Some(active) = self.active.as_mut() else {
            return Err(ProgressionError::NoActivePuzzle);
        };
        active.attempts += 1;
        let (room, attempts) = (active.room, active.attempts);

        if !correct {
            debug!(attempts, "Incorrect answer");
            store.emit(StoreEvent::PuzzleFailed {
                room,
                puzzle: puzzle.id().clone(),
                attempts,
            });
            return Ok(SubmitOutcome::Incorrect {
                attempts,
                feedback: puzzle.feedback().failure().clone(),
            });
        }

        let time = now.saturating_sub(active.started_at).as_secs();
        let index = active.index;
        let result =
            PuzzleResult::solved_after(attempts, time, puzzle_score(puzzle.points(), attempts));
        let recorded = store.mark_puzzle_solved(room, puzzle.id(), result.clone())?;
        if let Some(active) = self.active.as_mut() {
            active.solved = true;
        }
        self.cursor = index + 1;
        self.check_invariants(store);

        // Results are immutable: report what the store holds.
        let result = if recorded {
            result
        } else {
            warn!("Puzzle was already solved; reporting the stored result");
            store.puzzle_result(room, puzzle.id()).unwrap_or(result)
        };
        Ok(SubmitOutcome::Correct {
            result,
            feedback: puzzle.feedback().success().clone(),
        })
    }

    fn load(&mut self, room: RoomId, index: usize, puzzle: &PuzzleConfig) -> PuzzleToken {
        let token = PuzzleToken(self.next_token);
        self.next_token += 1;
        self.active = Some(ActivePuzzle {
            room,
            index,
            puzzle_id: puzzle.id().clone(),
            attempts: 0,
            started_at: self.clock.now(),
            token,
            solved: false,
        });
        token
    }

    fn view(&self, room: RoomId, total: usize, puzzle: &PuzzleConfig, token: PuzzleToken) -> PuzzleView {
        PuzzleView {
            room,
            index: self.cursor,
            total,
            puzzle: puzzle.clone(),
            token,
        }
    }

    fn detach(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(puzzle = %active.puzzle_id, "Puzzle detached");
        }
    }

    fn check_invariants(&self, store: &PathStore) {
        if cfg!(debug_assertions)
            && let Err(violations) = ProgressInvariants::check_all(store)
        {
            for violation in violations {
                warn!(invariant = %violation.description, "Invariant violated");
            }
        }
    }
}

/// Length of the contiguous solved prefix of `room`'s puzzles.
fn resume_index(store: &PathStore, room: &RoomConfig) -> usize {
    room.puzzles()
        .iter()
        .take_while(|p| {
            store
                .puzzle_result(room.id(), p.id())
                .is_some_and(|r| r.solved())
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_puzzle_score_floor() {
        assert_eq!(puzzle_score(100, 1), 100);
        assert_eq!(puzzle_score(100, 2), 80);
        assert_eq!(puzzle_score(100, 5), 20);
        assert_eq!(puzzle_score(100, 6), 10);
        assert_eq!(puzzle_score(100, 60), 10);
        assert_eq!(puzzle_score(5, 1), 10);
    }
}
