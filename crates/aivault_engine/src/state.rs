//! Game state schema and the game-level helpers layered over [`PathStore`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::store::{PathStore, StoreEvent};

/// Hint budget used when the catalog does not set one.
pub const DEFAULT_TOTAL_HINTS: u32 = 10;

/// The five themed rooms, in unlock order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RoomId {
    /// Space station logic room.
    Space,
    /// Food data room.
    Food,
    /// AI ethics room.
    Ethics,
    /// Green energy room.
    Green,
    /// Cyber security room.
    Cyber,
}

impl RoomId {
    /// Fixed unlock order.
    pub const ORDER: [RoomId; 5] = [
        RoomId::Space,
        RoomId::Food,
        RoomId::Ethics,
        RoomId::Green,
        RoomId::Cyber,
    ];

    /// Returns the room unlocked by completing this one.
    pub fn next(self) -> Option<RoomId> {
        Self::ORDER.get(self.index() + 1).copied()
    }

    /// Position in the unlock order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Lowercase identifier used in state paths.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Top-level screens.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Screen {
    /// Title screen.
    Title,
    /// Settings screen.
    Settings,
    /// Room picker.
    RoomSelect,
    /// Inside a room.
    Room,
    /// Final vault.
    Meta,
    /// End summary.
    End,
}

/// Immutable record of a solved puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(rename_all = "camelCase", from = "StoredResult")]
pub struct PuzzleResult {
    #[getter(copy)]
    solved: bool,
    #[getter(copy)]
    attempts: u32,
    /// Seconds spent on the puzzle instance.
    #[getter(copy)]
    time: u64,
    #[getter(copy)]
    score: u32,
    #[getter(copy)]
    first_attempt: bool,
}

/// On-disk shape of a result. Older saves may lack everything but
/// `solved`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredResult {
    solved: bool,
    #[serde(default = "one")]
    attempts: u32,
    #[serde(default)]
    time: u64,
    #[serde(default)]
    score: u32,
    #[serde(default)]
    first_attempt: Option<bool>,
}

fn one() -> u32 {
    1
}

impl From<StoredResult> for PuzzleResult {
    fn from(stored: StoredResult) -> Self {
        let attempts = stored.attempts.max(1);
        Self {
            solved: stored.solved,
            attempts,
            time: stored.time,
            score: stored.score,
            first_attempt: stored.first_attempt.unwrap_or(attempts == 1),
        }
    }
}

impl PuzzleResult {
    /// Records a solve. `first_attempt` follows from `attempts == 1`.
    pub fn solved_after(attempts: u32, time: u64, score: u32) -> Self {
        let attempts = attempts.max(1);
        Self {
            solved: true,
            attempts,
            time,
            score,
            first_attempt: attempts == 1,
        }
    }
}

/// Clue object awarded when a room is completed.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters, derive_new::new,
)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[new(into)]
    name: String,
    #[new(into)]
    #[serde(default)]
    meta_clue: String,
}

impl Artifact {
    /// Placeholder for a room whose catalog entry has no artifact.
    pub fn unknown() -> Self {
        Self::new("Unknown Artifact", "")
    }
}

/// Start and end of a room visit, in game-timer seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomTime {
    /// Timer value at first entry.
    pub start: u64,
    /// Timer value at completion.
    pub end: Option<u64>,
}

/// Persisted player settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    ai_provider: Option<String>,
    #[serde(default = "default_true")]
    #[getter(copy)]
    sound_enabled: bool,
    #[serde(default)]
    #[getter(copy)]
    music_enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Summary of progress across every room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_getters::Getters)]
#[serde(rename_all = "camelCase")]
pub struct OverallProgress {
    rooms_completed: usize,
    total_rooms: usize,
    puzzles_solved: usize,
    total_puzzles: usize,
}

/// Builds a fresh game state.
pub fn default_state(total_hints: u32) -> Value {
    let rooms: serde_json::Map<String, Value> = RoomId::ORDER
        .iter()
        .map(|room| {
            (
                room.as_str().to_string(),
                json!({
                    "unlocked": *room == RoomId::Space,
                    "completed": false,
                    "artifact": null,
                    "puzzles": {},
                }),
            )
        })
        .collect();

    json!({
        "currentScreen": "title",
        "currentRoom": null,
        "currentPuzzleIndex": 0,
        "rooms": rooms,
        "timer": { "elapsed": 0, "running": false, "roomTimes": {} },
        "hints": { "total": total_hints, "used": 0 },
        "score": { "points": 0, "accuracy": {} },
        "badges": [],
        "settings": {
            "aiProvider": null,
            "apiKey": null,
            "soundEnabled": true,
            "musicEnabled": false,
        },
        "metaPuzzleUnlocked": false,
        "gameComplete": false,
        "startTime": null,
        "endTime": null,
    })
}

fn room_path(room: RoomId, rest: &str) -> String {
    format!("rooms.{}.{}", room.as_str(), rest)
}

fn parse_result(room: RoomId, puzzle_id: &str, value: &Value) -> Option<PuzzleResult> {
    match serde_json::from_value(value.clone()) {
        Ok(result) => Some(result),
        Err(e) => {
            warn!(room = %room, puzzle = %puzzle_id, error = %e, "Skipping unreadable puzzle result");
            None
        }
    }
}

impl PathStore {
    /// Replaces the state with a fresh game.
    #[instrument(skip(self))]
    pub fn new_game(&mut self, total_hints: u32) {
        info!("Starting new game");
        self.reset(default_state(total_hints));
    }

    /// Current screen, or `None` if the stored value is unrecognised.
    pub fn current_screen(&self) -> Option<Screen> {
        self.get_as("currentScreen")
    }

    /// Switches screens and emits [`StoreEvent::ScreenChanged`].
    #[instrument(skip(self))]
    pub fn navigate(&mut self, to: Screen) -> Result<(), StoreError> {
        let from = self.current_screen();
        self.set("currentScreen", json!(to))?;
        debug!(?from, %to, "Screen changed");
        self.emit(StoreEvent::ScreenChanged { from, to });
        Ok(())
    }

    /// Room the player is in, if any.
    pub fn current_room(&self) -> Option<RoomId> {
        self.get_as("currentRoom")
    }

    /// Sets or clears the current room.
    #[instrument(skip(self))]
    pub fn set_current_room(&mut self, room: Option<RoomId>) -> Result<(), StoreError> {
        self.set("currentRoom", json!(room))
    }

    /// Persisted puzzle cursor.
    pub fn current_puzzle_index(&self) -> usize {
        self.get_u64("currentPuzzleIndex").unwrap_or(0) as usize
    }

    /// Whether `room` is unlocked.
    pub fn room_unlocked(&self, room: RoomId) -> bool {
        self.get_bool(&room_path(room, "unlocked"))
    }

    /// Whether `room` is completed.
    pub fn room_completed(&self, room: RoomId) -> bool {
        self.get_bool(&room_path(room, "completed"))
    }

    /// Artifact held for `room`.
    pub fn room_artifact(&self, room: RoomId) -> Option<Artifact> {
        self.get_as(&room_path(room, "artifact"))
    }

    /// Recorded result for one puzzle.
    pub fn puzzle_result(&self, room: RoomId, puzzle_id: &str) -> Option<PuzzleResult> {
        self.get(&room_path(room, &format!("puzzles.{}", puzzle_id)))
            .and_then(|value| parse_result(room, puzzle_id, value))
    }

    /// Every readable result in `room`, keyed by puzzle id. Unreadable
    /// entries are skipped.
    pub fn puzzle_results(&self, room: RoomId) -> BTreeMap<String, PuzzleResult> {
        let Some(Value::Object(entries)) = self.get(&room_path(room, "puzzles")) else {
            return BTreeMap::new();
        };
        entries
            .iter()
            .filter_map(|(id, value)| {
                parse_result(room, id, value).map(|result| (id.clone(), result))
            })
            .collect()
    }

    /// Records a solve and adds its score.
    ///
    /// Returns `false` without writing if the puzzle already has a solved
    /// result; results are never overwritten.
    #[instrument(skip(self, result), fields(room = %room, puzzle = %puzzle_id))]
    pub fn mark_puzzle_solved(
        &mut self,
        room: RoomId,
        puzzle_id: &str,
        result: PuzzleResult,
    ) -> Result<bool, StoreError> {
        if self
            .puzzle_result(room, puzzle_id)
            .is_some_and(|existing| existing.solved())
        {
            debug!("Puzzle already solved; keeping existing result");
            return Ok(false);
        }

        self.set(
            &room_path(room, &format!("puzzles.{}", puzzle_id)),
            json!(&result),
        )?;

        let points = self.score_points() + u64::from(result.score());
        self.set("score.points", json!(points))?;

        info!(
            attempts = result.attempts(),
            score = result.score(),
            "Puzzle solved"
        );
        self.emit(StoreEvent::PuzzleSolved {
            room,
            puzzle: puzzle_id.to_string(),
            result,
        });
        Ok(true)
    }

    /// Completes `room`: stores the artifact, records accuracy, unlocks the
    /// next room, and unlocks the vault once every room is complete.
    ///
    /// Completing an already-completed room is a no-op returning `false`.
    #[instrument(skip(self, artifact), fields(room = %room))]
    pub fn mark_room_completed(
        &mut self,
        room: RoomId,
        artifact: Artifact,
    ) -> Result<bool, StoreError> {
        if self.room_completed(room) {
            return Ok(false);
        }

        self.set(&room_path(room, "completed"), json!(true))?;
        self.set(&room_path(room, "artifact"), json!(artifact))?;

        let results = self.puzzle_results(room);
        let solved = results.values().filter(|r| r.solved()).count();
        let first = results.values().filter(|r| r.first_attempt()).count();
        let accuracy = if solved == 0 {
            0
        } else {
            ((first * 100) as f64 / solved as f64).round() as u64
        };
        self.set(&format!("score.accuracy.{}", room.as_str()), json!(accuracy))?;

        if let Some(next) = room.next() {
            self.set(&room_path(next, "unlocked"), json!(true))?;
            info!(next = %next, "Room unlocked");
        }

        if RoomId::ORDER.iter().all(|r| self.room_completed(*r)) {
            self.set("metaPuzzleUnlocked", json!(true))?;
            info!("All rooms complete; vault unlocked");
        }

        info!(artifact = %artifact.name(), "Room completed");
        self.emit(StoreEvent::RoomCompleted { room, artifact });
        Ok(true)
    }

    /// Consumes one hint. Returns `false` once the budget is exhausted.
    #[instrument(skip(self))]
    pub fn use_hint(&mut self) -> Result<bool, StoreError> {
        let used = self.get_u64("hints.used").unwrap_or(0);
        let total = self.get_u64("hints.total").unwrap_or(0);
        if used >= total {
            debug!(used, total, "Hint budget exhausted");
            return Ok(false);
        }
        self.set("hints.used", json!(used + 1))?;
        self.emit(StoreEvent::HintUsed {
            used: (used + 1) as u32,
            remaining: (total - used - 1) as u32,
        });
        Ok(true)
    }

    /// Hints left in the budget.
    pub fn hints_remaining(&self) -> u32 {
        let used = self.get_u64("hints.used").unwrap_or(0);
        let total = self.get_u64("hints.total").unwrap_or(0);
        total.saturating_sub(used) as u32
    }

    /// Hints consumed so far.
    pub fn hints_used(&self) -> u32 {
        self.get_u64("hints.used").unwrap_or(0) as u32
    }

    /// Number of solved puzzles in `room`.
    pub fn room_progress(&self, room: RoomId) -> usize {
        self.puzzle_results(room)
            .values()
            .filter(|r| r.solved())
            .count()
    }

    /// Progress across every room, given the catalog's puzzle total.
    pub fn overall_progress(&self, total_puzzles: usize) -> OverallProgress {
        OverallProgress {
            rooms_completed: RoomId::ORDER
                .iter()
                .filter(|r| self.room_completed(**r))
                .count(),
            total_rooms: RoomId::ORDER.len(),
            puzzles_solved: RoomId::ORDER.iter().map(|r| self.room_progress(*r)).sum(),
            total_puzzles,
        }
    }

    /// Awards a badge. Returns `false` if it was already held.
    #[instrument(skip(self))]
    pub fn add_badge(&mut self, badge: &str) -> Result<bool, StoreError> {
        let mut badges = self.badges();
        if badges.iter().any(|b| b == badge) {
            return Ok(false);
        }
        badges.push(badge.to_string());
        self.set("badges", json!(badges))?;
        info!(badge, "Badge earned");
        self.emit(StoreEvent::BadgeEarned {
            badge: badge.to_string(),
        });
        Ok(true)
    }

    /// Earned badges in earn order.
    pub fn badges(&self) -> Vec<String> {
        self.get_as("badges").unwrap_or_default()
    }

    /// Total points.
    pub fn score_points(&self) -> u64 {
        self.get_u64("score.points").unwrap_or(0)
    }

    /// Whether the vault is open for the final puzzle.
    pub fn meta_unlocked(&self) -> bool {
        self.get_bool("metaPuzzleUnlocked")
    }

    /// Whether the final puzzle has been solved.
    pub fn game_complete(&self) -> bool {
        self.get_bool("gameComplete")
    }

    /// Persisted player settings, with defaults for missing fields.
    pub fn settings(&self) -> Settings {
        self.get_as("settings").unwrap_or(Settings {
            ai_provider: None,
            sound_enabled: true,
            music_enabled: false,
        })
    }

    /// Toggles sound effects.
    #[instrument(skip(self))]
    pub fn set_sound_enabled(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.set("settings.soundEnabled", json!(enabled))
    }

    /// Toggles music.
    #[instrument(skip(self))]
    pub fn set_music_enabled(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.set("settings.musicEnabled", json!(enabled))
    }

    /// Records the chosen AI provider name.
    #[instrument(skip(self))]
    pub fn set_ai_provider(&mut self, provider: Option<&str>) -> Result<(), StoreError> {
        self.set("settings.aiProvider", json!(provider))
    }
}
