//! Read-only room and puzzle catalog.
//!
//! The catalog is loaded once. Problems inside a room (unknown puzzle type,
//! duplicate ids, bad difficulty) are recorded as issues for that room only,
//! so one broken room does not take the rest of the game down with it.

mod types;

pub use types::{
    AnswerMode, BadgeDef, CharacterConfig, DEFAULT_CHARACTER, DEFAULT_POINTS, Feedback, GameRules,
    HintText, MetaInput, MetaPuzzleConfig, MetaStep, PuzzleConfig, PuzzleKind, RoomConfig,
};

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::error::ConfigError;
use crate::state::{Artifact, RoomId};
use crate::validator::Solution;
use types::{RawCatalog, RawPuzzle, RawRoom};

/// Loaded catalog.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct Catalog {
    #[getter(skip)]
    rooms: BTreeMap<RoomId, RoomConfig>,
    #[getter(skip)]
    issues: BTreeMap<RoomId, Vec<String>>,
    #[getter(skip)]
    puzzle_counts: BTreeMap<RoomId, usize>,
    badges: Vec<BadgeDef>,
    meta_puzzle: MetaPuzzleConfig,
    characters: BTreeMap<String, CharacterConfig>,
    #[getter(copy)]
    rules: GameRules,
}

impl Catalog {
    /// Parses a catalog document.
    ///
    /// Fails only when the document itself is unreadable. Per-room problems
    /// are kept in [`Catalog::issues`].
    #[instrument(skip(json))]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawCatalog = serde_json::from_str(json)
            .map_err(|e| ConfigError::new(format!("Invalid catalog document: {}", e)))?;

        let mut rooms = BTreeMap::new();
        let mut issues: BTreeMap<RoomId, Vec<String>> = BTreeMap::new();
        let mut puzzle_counts = BTreeMap::new();

        for raw_room in raw.rooms {
            let Ok(id) = raw_room.id.parse::<RoomId>() else {
                warn!(room = %raw_room.id, "Unknown room id in catalog; skipping");
                continue;
            };
            if rooms.contains_key(&id) || issues.contains_key(&id) {
                warn!(room = %id, "Room listed twice in catalog; keeping the first");
                continue;
            }
            puzzle_counts.insert(id, raw_room.puzzles.len());
            match build_room(id, raw_room) {
                Ok(room) => {
                    debug!(room = %id, puzzles = room.puzzles.len(), "Room loaded");
                    rooms.insert(id, room);
                }
                Err(problems) => {
                    for problem in &problems {
                        warn!(room = %id, problem = %problem, "Catalog issue");
                    }
                    issues.insert(id, problems);
                }
            }
        }

        let mut seen = HashSet::new();
        let badges = raw
            .badges
            .into_iter()
            .filter(|b| {
                let fresh = seen.insert(b.id().clone());
                if !fresh {
                    warn!(badge = %b.id(), "Duplicate badge definition ignored");
                }
                fresh
            })
            .collect();

        let catalog = Self {
            rooms,
            issues,
            puzzle_counts,
            badges,
            meta_puzzle: raw.meta_puzzle,
            characters: raw.characters,
            rules: raw.game_config,
        };
        info!(
            rooms = catalog.rooms.len(),
            broken_rooms = catalog.issues.len(),
            puzzles = catalog.total_puzzles(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    /// Reads and parses a catalog file.
    #[instrument]
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// A playable room, or the reason it cannot be played.
    pub fn room(&self, id: RoomId) -> Result<&RoomConfig, ConfigError> {
        if let Some(room) = self.rooms.get(&id) {
            return Ok(room);
        }
        match self.issues.get(&id) {
            Some(problems) => Err(ConfigError::new(format!(
                "Room '{}' could not be loaded: {}",
                id,
                problems.join("; ")
            ))),
            None => Err(ConfigError::new(format!(
                "Missing catalog entry for room '{}'",
                id
            ))),
        }
    }

    /// Puzzle by room and id.
    pub fn puzzle(&self, room: RoomId, puzzle_id: &str) -> Option<&PuzzleConfig> {
        self.rooms.get(&room).and_then(|r| r.puzzle(puzzle_id))
    }

    /// Problems found per room.
    pub fn issues(&self) -> &BTreeMap<RoomId, Vec<String>> {
        &self.issues
    }

    /// Number of puzzles the catalog lists for `room`.
    pub fn room_puzzle_count(&self, room: RoomId) -> usize {
        self.puzzle_counts.get(&room).copied().unwrap_or(0)
    }

    /// Number of puzzles across every room.
    pub fn total_puzzles(&self) -> usize {
        self.puzzle_counts.values().sum()
    }

    /// Badge definition by id.
    pub fn badge(&self, id: &str) -> Option<&BadgeDef> {
        self.badges.iter().find(|b| b.id() == id)
    }

    /// Persona by id.
    pub fn character(&self, id: &str) -> Option<&CharacterConfig> {
        self.characters.get(id)
    }
}

fn build_room(id: RoomId, raw: RawRoom) -> Result<RoomConfig, Vec<String>> {
    let mut problems = Vec::new();
    if raw.puzzles.is_empty() {
        problems.push("room has no puzzles".to_string());
    }

    let mut ids = HashSet::new();
    let mut puzzles = Vec::with_capacity(raw.puzzles.len());
    for raw_puzzle in raw.puzzles {
        if !ids.insert(raw_puzzle.id.clone()) {
            problems.push(format!("duplicate puzzle id '{}'", raw_puzzle.id));
            continue;
        }
        match build_puzzle(raw_puzzle) {
            Ok(puzzle) => puzzles.push(puzzle),
            Err(problem) => problems.push(problem),
        }
    }
    if !problems.is_empty() {
        return Err(problems);
    }

    // Stable: equal `order` values keep list order.
    puzzles.sort_by_key(|p| p.order);
    for pair in puzzles.windows(2) {
        if pair[0].order == pair[1].order {
            warn!(
                room = %id,
                first = %pair[0].id,
                second = %pair[1].id,
                order = pair[0].order,
                "Puzzles share an order value; keeping list order"
            );
        }
    }

    let artifact = raw.artifact.unwrap_or_else(|| {
        warn!(room = %id, "Room has no artifact");
        Artifact::unknown()
    });

    Ok(RoomConfig {
        id,
        name: raw.name,
        intro_narration: raw.intro_narration,
        character: raw
            .character
            .unwrap_or_else(|| DEFAULT_CHARACTER.to_string()),
        puzzles,
        artifact,
    })
}

fn build_puzzle(raw: RawPuzzle) -> Result<PuzzleConfig, String> {
    if raw.id.is_empty() {
        return Err("puzzle with an empty id".to_string());
    }
    if raw.id.contains('.') {
        return Err(format!("puzzle id '{}' contains '.'", raw.id));
    }
    let kind: PuzzleKind = raw
        .kind
        .parse()
        .map_err(|_| format!("puzzle '{}' has unknown type '{}'", raw.id, raw.kind))?;
    if !(1..=3).contains(&raw.difficulty) {
        return Err(format!(
            "puzzle '{}' has difficulty {} (expected 1-3)",
            raw.id, raw.difficulty
        ));
    }

    let solution = match (kind.answer_mode(), &raw.solution) {
        (AnswerMode::ExternalEvaluation, _) => None,
        (AnswerMode::SolutionSpec, Some(spec)) => Some(
            Solution::from_spec(spec).map_err(|e| format!("puzzle '{}': {}", raw.id, e))?,
        ),
        (AnswerMode::SolutionSpec, None) => {
            return Err(format!("puzzle '{}' has no solution", raw.id));
        }
    };

    Ok(PuzzleConfig {
        id: raw.id,
        kind,
        order: raw.order,
        title: raw.title,
        description: raw.description,
        difficulty: raw.difficulty as u8,
        points: raw.points.unwrap_or(DEFAULT_POINTS),
        solution,
        hints: raw.hints,
        character: raw.character,
        feedback: raw.feedback,
        config: raw.config,
    })
}
