//! The final vault puzzle.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::catalog::{Catalog, MetaInput, MetaStep};
use crate::error::{ConfigError, ProgressionError};
use crate::state::{Artifact, RoomId};
use crate::store::{PathStore, StoreEvent};
use crate::validator::{to_js_string, to_number};

/// Result of answering one vault step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Wrong answer; the step stays active.
    Incorrect,
    /// Right answer; `next` is the index of the step now active.
    Advanced {
        /// Next step index.
        next: usize,
    },
    /// The last step was answered and the game is complete.
    VaultOpened,
}

/// Whether `answer` satisfies `step`.
pub fn check_step(step: &MetaStep, answer: &Value) -> bool {
    match step.input_type() {
        MetaInput::Slider => {
            let tolerance = step.tolerance().unwrap_or(0.0);
            match (to_number(answer), to_number(step.answer())) {
                (Some(given), Some(expected)) => (given - expected).abs() <= tolerance,
                _ => false,
            }
        }
        MetaInput::Number => match (to_number(answer), to_number(step.answer())) {
            (Some(given), Some(expected)) => given == expected,
            _ => false,
        },
        MetaInput::Text | MetaInput::Choice => {
            to_js_string(answer).trim().to_uppercase() == to_js_string(step.answer()).to_uppercase()
        }
    }
}

/// Artifacts of every room in unlock order; `None` for rooms not completed.
pub fn artifacts(store: &PathStore) -> Vec<(RoomId, Option<Artifact>)> {
    RoomId::ORDER
        .iter()
        .map(|room| (*room, store.room_artifact(*room)))
        .collect()
}

/// A play-through of the vault steps.
#[derive(Debug, Clone)]
pub struct MetaPuzzle {
    catalog: Arc<Catalog>,
    step: usize,
    answers: Vec<Value>,
}

impl MetaPuzzle {
    /// Opens the vault screen. Requires every room to be completed.
    #[instrument(skip(store, catalog))]
    pub fn start(store: &PathStore, catalog: Arc<Catalog>) -> Result<Self, ProgressionError> {
        if !store.meta_unlocked() {
            return Err(ProgressionError::MetaLocked);
        }
        let total = catalog.meta_puzzle().steps().len();
        if total == 0 {
            return Err(ConfigError::new("Meta-puzzle has no steps").into());
        }
        let step = if store.game_complete() { total } else { 0 };
        Ok(Self {
            catalog,
            step,
            answers: Vec::new(),
        })
    }

    /// Index of the active step.
    pub fn step_index(&self) -> usize {
        self.step
    }

    /// Number of steps.
    pub fn total_steps(&self) -> usize {
        self.catalog.meta_puzzle().steps().len()
    }

    /// The active step, or `None` once the vault is open.
    pub fn current_step(&self) -> Option<&MetaStep> {
        self.catalog.meta_puzzle().steps().get(self.step)
    }

    /// Accepted answers so far.
    pub fn answers(&self) -> &[Value] {
        &self.answers
    }

    /// Judges an answer for the active step.
    ///
    /// Answering the last step marks the game complete, stops the timer and
    /// emits [`StoreEvent::GameCompleted`].
    #[instrument(skip(self, store, answer), fields(step = self.step))]
    pub fn submit_step(
        &mut self,
        store: &mut PathStore,
        answer: &Value,
    ) -> Result<StepOutcome, ProgressionError> {
        let catalog = Arc::clone(&self.catalog);
        let Some(step) = catalog.meta_puzzle().steps().get(self.step) else {
            return Err(ProgressionError::MetaComplete);
        };
        if !check_step(step, answer) {
            return Ok(StepOutcome::Incorrect);
        }

        self.answers.push(answer.clone());
        self.step += 1;
        if self.step < self.total_steps() {
            return Ok(StepOutcome::Advanced { next: self.step });
        }

        if store.game_complete() {
            warn!("Vault opened again for a finished game");
            return Ok(StepOutcome::VaultOpened);
        }
        store.set("gameComplete", json!(true))?;
        store.stop_timer()?;
        info!(elapsed = store.elapsed(), "Vault opened");
        store.emit(StoreEvent::GameCompleted);
        Ok(StepOutcome::VaultOpened)
    }
}
