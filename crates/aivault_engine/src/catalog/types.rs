//! Catalog record types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::{Artifact, RoomId};
use crate::validator::Solution;

/// Character used when neither puzzle nor room names one.
pub const DEFAULT_CHARACTER: &str = "mentor";

/// Points a puzzle is worth when the catalog omits `points`.
pub const DEFAULT_POINTS: u32 = 100;

/// Closed set of puzzle widgets.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PuzzleKind {
    /// Arrange flowchart steps.
    Flowchart,
    /// Continue a sequence.
    Pattern,
    /// Dial in a code.
    CodeLock,
    /// Read values off a dashboard.
    Dashboard,
    /// Tune parameters to a target.
    Optimization,
    /// Pick recommendations for a profile.
    Recommendation,
    /// Walk a decision tree.
    DecisionTree,
    /// Flag biased records.
    BiasDetection,
    /// Fill a crossword.
    Crossword,
    /// Run a simulation to a goal.
    Simulation,
    /// Match causes with effects.
    CauseEffect,
    /// Allocate limited resources.
    Resource,
    /// Find the faulty line.
    Debug,
    /// Crack a password from clues.
    Password,
    /// Write a prompt for the assistant.
    Prompt,
}

/// How a puzzle kind is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMode {
    /// Checked locally against the catalog solution.
    SolutionSpec,
    /// Judged by the assistant (or the local evaluator) and reported back.
    ExternalEvaluation,
}

impl PuzzleKind {
    /// Returns how answers for this kind are judged.
    pub fn answer_mode(self) -> AnswerMode {
        match self {
            Self::Prompt => AnswerMode::ExternalEvaluation,
            _ => AnswerMode::SolutionSpec,
        }
    }
}

/// Pre-authored hint text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct HintText {
    /// 1 (vague) to 3 (strong).
    #[getter(copy)]
    level: u8,
    text: String,
}

impl HintText {
    /// Creates a hint.
    pub fn new(level: u8, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Messages shown after a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Feedback {
    #[serde(default = "default_success")]
    success: String,
    #[serde(default = "default_failure")]
    failure: String,
}

impl Default for Feedback {
    fn default() -> Self {
        Self {
            success: default_success(),
            failure: default_failure(),
        }
    }
}

fn default_success() -> String {
    "Correct!".to_string()
}

fn default_failure() -> String {
    "Not quite right. Try again!".to_string()
}

/// One puzzle, validated and resolved at load time.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct PuzzleConfig {
    pub(crate) id: String,
    #[getter(copy)]
    pub(crate) kind: PuzzleKind,
    #[getter(copy)]
    pub(crate) order: i64,
    pub(crate) title: String,
    pub(crate) description: String,
    #[getter(copy)]
    pub(crate) difficulty: u8,
    #[getter(copy)]
    pub(crate) points: u32,
    /// `None` only for externally judged kinds.
    pub(crate) solution: Option<Solution>,
    pub(crate) hints: Vec<HintText>,
    pub(crate) character: Option<String>,
    pub(crate) feedback: Feedback,
    /// Kind-specific widget configuration, passed through untouched.
    pub(crate) config: Value,
}

impl PuzzleConfig {
    /// Character who gives hints for this puzzle.
    pub fn hint_character(&self) -> &str {
        self.character.as_deref().unwrap_or(DEFAULT_CHARACTER)
    }
}

/// A room with its puzzles in play order.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct RoomConfig {
    #[getter(copy)]
    pub(crate) id: RoomId,
    pub(crate) name: String,
    pub(crate) intro_narration: String,
    pub(crate) character: String,
    pub(crate) puzzles: Vec<PuzzleConfig>,
    pub(crate) artifact: Artifact,
}

impl RoomConfig {
    /// Puzzle at `index` in play order.
    pub fn puzzle_at(&self, index: usize) -> Option<&PuzzleConfig> {
        self.puzzles.get(index)
    }

    /// Puzzle by id.
    pub fn puzzle(&self, id: &str) -> Option<&PuzzleConfig> {
        self.puzzles.iter().find(|p| p.id == id)
    }
}

/// Badge definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct BadgeDef {
    id: String,
    name: String,
    /// Human-readable criteria.
    #[serde(default, alias = "criteria")]
    description: String,
    #[serde(default)]
    icon: String,
}

/// Input widget for a vault step.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MetaInput {
    /// Free text.
    #[default]
    Text,
    /// Numeric field.
    Number,
    /// One of several options.
    Choice,
    /// Numeric slider with tolerance.
    Slider,
}

/// One step of the final vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(rename_all = "camelCase")]
pub struct MetaStep {
    instruction: String,
    #[serde(default)]
    #[getter(copy)]
    input_type: MetaInput,
    answer: Value,
    #[serde(default)]
    #[getter(copy)]
    tolerance: Option<f64>,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    placeholder: Option<String>,
    #[serde(default)]
    #[getter(copy)]
    min: Option<f64>,
    #[serde(default)]
    #[getter(copy)]
    max: Option<f64>,
}

/// The final multi-step puzzle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, derive_getters::Getters)]
pub struct MetaPuzzleConfig {
    #[serde(default)]
    title: String,
    #[serde(default)]
    steps: Vec<MetaStep>,
}

/// Assistant persona shown next to hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(rename_all = "camelCase")]
pub struct CharacterConfig {
    name: String,
    #[serde(default)]
    avatar: String,
    #[serde(default)]
    fallback_dialogue: BTreeMap<String, Vec<String>>,
}

/// Game-wide rules from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(rename_all = "camelCase")]
pub struct GameRules {
    #[serde(default = "default_total_hints")]
    #[getter(copy)]
    total_hints: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            total_hints: default_total_hints(),
        }
    }
}

fn default_total_hints() -> u32 {
    crate::state::DEFAULT_TOTAL_HINTS
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawCatalog {
    pub(crate) rooms: Vec<RawRoom>,
    #[serde(default)]
    pub(crate) badges: Vec<BadgeDef>,
    #[serde(default)]
    pub(crate) meta_puzzle: MetaPuzzleConfig,
    #[serde(default)]
    pub(crate) characters: BTreeMap<String, CharacterConfig>,
    #[serde(default)]
    pub(crate) game_config: GameRules,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawRoom {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) intro_narration: String,
    #[serde(default)]
    pub(crate) character: Option<String>,
    #[serde(default)]
    pub(crate) puzzles: Vec<RawPuzzle>,
    #[serde(default)]
    pub(crate) artifact: Option<Artifact>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPuzzle {
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) order: i64,
    #[serde(default)]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default = "default_difficulty")]
    pub(crate) difficulty: i64,
    #[serde(default)]
    pub(crate) points: Option<u32>,
    #[serde(default)]
    pub(crate) solution: Option<Value>,
    #[serde(default)]
    pub(crate) hints: Vec<HintText>,
    #[serde(default)]
    pub(crate) character: Option<String>,
    #[serde(default)]
    pub(crate) feedback: Feedback,
    #[serde(default)]
    pub(crate) config: Value,
}

fn default_difficulty() -> i64 {
    1
}
