//! A single player's game session.
//!
//! The session owns the state store and wires the engine components to it
//! through explicit handles: progression, achievements, autosave and the
//! hint service. All store mutation happens on the caller's task; only the
//! save writes and remote assistant calls run elsewhere.

use std::sync::Arc;
use std::time::Duration;

use aivault_engine::{
    AchievementEngine, AnswerMode, BadgeDef, BadgeStatus, Catalog, Clock, ConfigError,
    EventFilter, FileStorage, Hint, HintPolicy, MetaPuzzle, PathStore, PersistenceGateway,
    ProgressionEngine, ProgressionError, PromptEvaluation, RoomEntry, RoomId, SaveStorage, Screen,
    StepOutcome, StoreError, SubmitOutcome, SystemClock, default_state, format_duration,
};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::assistant::{AiAssistant, LlmAssistant, resolve_character};
use crate::autosave::AutoSaver;
use crate::game_config::GameConfig;
use crate::hint_service::{HintRequest, HintService, ResolvedHint};
use crate::llm_client::LlmClient;

/// Result of one answer submission.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct Turn {
    outcome: SubmitOutcome,
    /// What the room shows next, once a correct answer has been paced out.
    next: Option<RoomEntry>,
    /// The assistant's reply and grade, for prompt puzzles.
    evaluation: Option<PromptEvaluation>,
}

impl Turn {
    /// Whether the answer was accepted.
    pub fn is_correct(&self) -> bool {
        matches!(self.outcome, SubmitOutcome::Correct { .. })
    }
}

/// Outcome of asking for a hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintOutcome {
    /// A hint to show.
    Shown(Hint),
    /// The hint budget is used up.
    Exhausted,
    /// The puzzle changed while the hint was being fetched.
    Stale,
}

/// One room as listed on the room-select screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, derive_getters::Getters)]
pub struct RoomStatus {
    #[getter(copy)]
    room: RoomId,
    name: String,
    #[getter(copy)]
    unlocked: bool,
    #[getter(copy)]
    completed: bool,
    #[getter(copy)]
    solved: usize,
    #[getter(copy)]
    total: usize,
    /// Catalog problems that keep the room from loading.
    issues: Vec<String>,
}

/// End-of-game summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, derive_getters::Getters)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    #[getter(copy)]
    elapsed_secs: u64,
    elapsed: String,
    #[getter(copy)]
    puzzles_solved: usize,
    #[getter(copy)]
    total_puzzles: usize,
    #[getter(copy)]
    points: u64,
    badges: Vec<BadgeDef>,
    room_times: Vec<(RoomId, u64)>,
    #[getter(copy)]
    complete: bool,
}

/// Game session wiring every component around one [`PathStore`].
#[derive(Debug)]
pub struct GameSession {
    catalog: Arc<Catalog>,
    store: PathStore,
    engine: ProgressionEngine,
    achievements: Arc<AchievementEngine>,
    hints: Arc<HintService>,
    gateway: Arc<PersistenceGateway>,
    autosave: AutoSaver,
    meta: Option<MetaPuzzle>,
    pacing: Duration,
    provider: Option<String>,
    ticked_at: Instant,
}

impl GameSession {
    /// Builds a session from explicit parts. Must run inside a tokio runtime.
    #[instrument(skip_all)]
    pub fn new(
        catalog: Arc<Catalog>,
        storage: Box<dyn SaveStorage>,
        hints: HintService,
        clock: Arc<dyn Clock>,
        config: &GameConfig,
    ) -> Self {
        let defaults = default_state(catalog.rules().total_hints());
        let mut store = PathStore::new(defaults.clone());
        let gateway = Arc::new(PersistenceGateway::new(storage, defaults));

        let achievements = Arc::new(AchievementEngine::new(Arc::clone(&catalog)));
        achievements.install(&mut store);

        let autosave = AutoSaver::spawn(Arc::clone(&gateway), config.autosave_debounce());
        let scheduler = autosave.scheduler();
        store.subscribe(EventFilter::StateChanged, move |_, store| {
            scheduler.schedule(store.snapshot());
            Ok(())
        });
        let scheduler = autosave.scheduler();
        store.subscribe(EventFilter::StateReset, move |_, _| {
            scheduler.cancel();
            Ok(())
        });

        let provider = config
            .ai_provider()
            .as_ref()
            .filter(|_| hints.remote_enabled())
            .map(|p| p.to_string());
        let engine = ProgressionEngine::new(Arc::clone(&catalog), clock);
        info!(remote_hints = hints.remote_enabled(), "Game session created");
        Self {
            catalog,
            store,
            engine,
            achievements,
            hints: Arc::new(hints),
            gateway,
            autosave,
            meta: None,
            pacing: config.pacing(),
            provider,
            ticked_at: Instant::now(),
        }
    }

    /// Builds a session from configuration: file-backed saves and, when a
    /// provider key is available, the remote assistant.
    #[instrument(skip(config), fields(catalog = %config.catalog_path().display()))]
    pub fn from_config(config: &GameConfig) -> Result<Self, ConfigError> {
        let catalog = Arc::new(Catalog::from_file(config.catalog_path())?);
        for (room, issues) in catalog.issues() {
            warn!(room = %room, ?issues, "Room has configuration issues");
        }

        let assistant: Option<Arc<dyn AiAssistant>> = match config.create_llm_config() {
            Ok(Some(llm)) => Some(Arc::new(LlmAssistant::new(LlmClient::new(llm)))),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Remote assistant unavailable; hints stay local");
                None
            }
        };
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let hints = HintService::new(
            HintPolicy::new(Arc::clone(&clock)),
            assistant,
            config.hint_timeout(),
        );
        let storage = Box::new(FileStorage::new(config.save_path()));
        Ok(Self::new(catalog, storage, hints, clock, config))
    }

    /// Loads the save (unless `fresh`) or starts a new game, then opens the
    /// room-select screen and starts the timer. Returns whether a save was
    /// resumed.
    #[instrument(skip(self))]
    pub fn start(&mut self, fresh: bool) -> Result<bool, ProgressionError> {
        let resumed = !fresh && self.gateway.load(&mut self.store);
        if !resumed {
            if fresh {
                self.gateway.clear_save(&mut self.store);
            } else {
                self.store.new_game(self.catalog.rules().total_hints());
            }
        }
        self.store.set_ai_provider(self.provider.as_deref())?;
        let screen = if self.store.game_complete() {
            Screen::End
        } else {
            Screen::RoomSelect
        };
        self.store.navigate(screen)?;
        if !self.store.game_complete() {
            self.store.start_timer()?;
        }
        self.ticked_at = Instant::now();
        info!(resumed, "Game started");
        Ok(resumed)
    }

    /// The state store.
    pub fn store(&self) -> &PathStore {
        &self.store
    }

    /// The progression engine.
    pub fn engine(&self) -> &ProgressionEngine {
        &self.engine
    }

    /// The loaded catalog.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Shared hint service, for resolving hints off the session task.
    pub fn hint_service(&self) -> Arc<HintService> {
        Arc::clone(&self.hints)
    }

    /// The open vault puzzle, if any.
    pub fn meta(&self) -> Option<&MetaPuzzle> {
        self.meta.as_ref()
    }

    /// Every room with its status, in unlock order.
    pub fn rooms(&self) -> Vec<RoomStatus> {
        RoomId::ORDER
            .iter()
            .map(|room| {
                let config = self.catalog.room(*room).ok();
                RoomStatus {
                    room: *room,
                    name: config
                        .map(|c| c.name().clone())
                        .unwrap_or_else(|| room.to_string()),
                    unlocked: self.store.room_unlocked(*room),
                    completed: self.store.room_completed(*room),
                    solved: self.store.room_progress(*room),
                    total: self.catalog.room_puzzle_count(*room),
                    issues: self
                        .catalog
                        .issues()
                        .get(room)
                        .cloned()
                        .unwrap_or_default(),
                }
            })
            .collect()
    }

    /// Enters `room` and switches to the room screen.
    #[instrument(skip(self), fields(room = %room))]
    pub fn enter_room(&mut self, room: RoomId) -> Result<RoomEntry, ProgressionError> {
        let entry = self.engine.enter_room(&mut self.store, room)?;
        self.meta = None;
        self.store.navigate(Screen::Room)?;
        Ok(entry)
    }

    /// Leaves the current room for the room-select screen.
    #[instrument(skip(self))]
    pub fn leave_room(&mut self) -> Result<(), ProgressionError> {
        self.engine.leave_room(&mut self.store)?;
        self.store.navigate(Screen::RoomSelect)?;
        Ok(())
    }

    /// Judges an answer. A correct answer is followed by the pacing pause
    /// and the next puzzle (or the room's completion).
    #[instrument(skip(self, answer), fields(puzzle = %puzzle_id))]
    pub async fn submit_answer(
        &mut self,
        puzzle_id: &str,
        answer: &Value,
    ) -> Result<Turn, ProgressionError> {
        let outcome = self
            .engine
            .submit_answer(&mut self.store, puzzle_id, answer)?;
        self.finish_turn(outcome, None).await
    }

    /// Sends a prompt-puzzle attempt to the assistant and records its verdict.
    #[instrument(skip(self, prompt), fields(puzzle = %puzzle_id))]
    pub async fn submit_prompt(
        &mut self,
        puzzle_id: &str,
        prompt: &str,
    ) -> Result<Turn, ProgressionError> {
        let puzzle = self
            .engine
            .current_puzzle()
            .ok_or(ProgressionError::NoActivePuzzle)?;
        if puzzle.id() != puzzle_id {
            return Err(ProgressionError::StalePuzzle {
                submitted: puzzle_id.to_string(),
                active: puzzle.id().clone(),
            });
        }
        if puzzle.kind().answer_mode() != AnswerMode::ExternalEvaluation {
            return Err(ConfigError::new(format!(
                "Puzzle '{}' takes a direct answer, not a prompt",
                puzzle_id
            ))
            .into());
        }
        let goal = puzzle.description().clone();

        let evaluation = self.hints.evaluate_prompt(prompt, &goal).await;
        let outcome =
            self.engine
                .record_outcome(&mut self.store, puzzle_id, evaluation.meets_goal())?;
        self.finish_turn(outcome, Some(evaluation)).await
    }

    async fn finish_turn(
        &mut self,
        outcome: SubmitOutcome,
        evaluation: Option<PromptEvaluation>,
    ) -> Result<Turn, ProgressionError> {
        let next = match outcome {
            SubmitOutcome::Correct { .. } => {
                tokio::time::sleep(self.pacing).await;
                // The room timer may stop in `advance`.
                self.tick()?;
                let entry = self.engine.advance(&mut self.store)?;
                if let RoomEntry::Completed { room, artifact } = &entry {
                    info!(room = %room, artifact = %artifact.name(), "Room finished");
                }
                Some(entry)
            }
            SubmitOutcome::Incorrect { .. } => None,
        };
        Ok(Turn {
            outcome,
            next,
            evaluation,
        })
    }

    /// Spends one hint from the budget and captures what the assistant needs.
    ///
    /// `Ok(None)` when the budget is exhausted.
    #[instrument(skip(self))]
    pub fn prepare_hint(&mut self) -> Result<Option<HintRequest>, ProgressionError> {
        let (Some(context), Some(token), Some(puzzle), Some(room)) = (
            self.engine.hint_context(),
            self.engine.current_token(),
            self.engine.current_puzzle(),
            self.engine.room(),
        ) else {
            return Err(ProgressionError::NoActivePuzzle);
        };
        let room_character = self
            .catalog
            .room(room)
            .map(|r| r.character().clone())
            .unwrap_or_default();
        let character =
            resolve_character(puzzle.character().as_deref(), &room_character).to_string();

        if !self.store.use_hint()? {
            debug!("Hint refused; budget exhausted");
            return Ok(None);
        }
        Ok(Some(HintRequest::new(token, context, character)))
    }

    /// Accepts a resolved hint if its puzzle is still loaded.
    pub fn accept_hint(&self, resolved: ResolvedHint) -> HintOutcome {
        if self.engine.is_current(resolved.token()) {
            HintOutcome::Shown(resolved.hint().clone())
        } else {
            debug!("Dropping hint for a puzzle that is no longer loaded");
            HintOutcome::Stale
        }
    }

    /// Requests a hint and waits for it.
    pub async fn request_hint(&mut self) -> Result<HintOutcome, ProgressionError> {
        let Some(request) = self.prepare_hint()? else {
            return Ok(HintOutcome::Exhausted);
        };
        let resolved = self.hints.resolve(request).await;
        Ok(self.accept_hint(resolved))
    }

    /// Opens the vault puzzle.
    #[instrument(skip(self))]
    pub fn open_vault(&mut self) -> Result<&MetaPuzzle, ProgressionError> {
        let meta = MetaPuzzle::start(&self.store, Arc::clone(&self.catalog))?;
        if self.engine.room().is_some() {
            self.engine.leave_room(&mut self.store)?;
        }
        self.store.navigate(Screen::Meta)?;
        Ok(self.meta.insert(meta))
    }

    /// Answers the active vault step.
    #[instrument(skip(self, answer))]
    pub fn submit_vault_step(&mut self, answer: &Value) -> Result<StepOutcome, ProgressionError> {
        if self.meta.is_none() {
            self.meta = Some(MetaPuzzle::start(&self.store, Arc::clone(&self.catalog))?);
        }
        let Some(meta) = self.meta.as_mut() else {
            return Err(ProgressionError::MetaLocked);
        };
        let outcome = meta.submit_step(&mut self.store, answer)?;
        if outcome == StepOutcome::VaultOpened {
            self.store.navigate(Screen::End)?;
        }
        Ok(outcome)
    }

    /// Advances the game timer by the whole seconds passed since the last
    /// tick and returns how many were counted. Time spent awaiting a turn is
    /// caught up on the next call.
    pub fn tick(&mut self) -> Result<u64, StoreError> {
        let due = Instant::now()
            .saturating_duration_since(self.ticked_at)
            .as_secs();
        self.ticked_at += Duration::from_secs(due);
        let mut counted = 0;
        for _ in 0..due {
            if self.store.tick_timer()? {
                counted += 1;
            }
        }
        Ok(counted)
    }

    /// Toggles sound effects.
    pub fn set_sound(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.store.set_sound_enabled(enabled)
    }

    /// Toggles music.
    pub fn set_music(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.store.set_music_enabled(enabled)
    }

    /// Every badge with its earned flag.
    pub fn badges(&self) -> Vec<BadgeStatus> {
        self.achievements.all_badges(&self.store)
    }

    /// Summary of the run so far.
    pub fn summary(&self) -> GameSummary {
        summarize(&self.store, &self.catalog, &self.achievements)
    }

    /// Writes the current state immediately.
    pub fn save_now(&self) -> bool {
        self.gateway.save_or_warn(self.store.root())
    }

    /// Flushes pending saves and stops background work.
    #[instrument(skip(self))]
    pub async fn shutdown(self) {
        self.autosave.shutdown().await;
        info!("Game session closed");
    }
}

/// Builds a summary from any state tree, e.g. one read from a save file.
pub fn summarize(
    store: &PathStore,
    catalog: &Catalog,
    achievements: &AchievementEngine,
) -> GameSummary {
    let progress = store.overall_progress(catalog.total_puzzles());
    GameSummary {
        elapsed_secs: store.elapsed(),
        elapsed: format_duration(store.elapsed()),
        puzzles_solved: *progress.puzzles_solved(),
        total_puzzles: *progress.total_puzzles(),
        points: store.score_points(),
        badges: achievements.earned_badges(store),
        room_times: store
            .room_timers()
            .keys()
            .map(|room| (*room, store.room_time(*room)))
            .collect(),
        complete: store.game_complete(),
    }
}
