//! Shared fixtures for aivault integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use aivault::{AiAssistant, GameConfig, GameSession, HintService, LlmError};
use aivault_engine::{
    Catalog, Clock, Evaluation, HintContext, HintPolicy, ManualClock, MemoryStorage,
    PersistenceError, PromptEvaluation, SaveStorage,
};
use async_trait::async_trait;
use serde_json::{Value, json};

/// Scripted assistant that counts its calls.
#[derive(Debug, Default)]
pub struct MockAssistant {
    pub hint_reply: Option<String>,
    pub meets_goal: bool,
    pub delay: Option<Duration>,
    pub hint_calls: AtomicUsize,
    pub evaluation_calls: AtomicUsize,
}

impl MockAssistant {
    pub fn replying(text: &str) -> Self {
        Self {
            hint_reply: Some(text.to_string()),
            meets_goal: true,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            hint_reply: Some("too late".to_string()),
            meets_goal: true,
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn hint_calls(&self) -> usize {
        self.hint_calls.load(Ordering::SeqCst)
    }

    pub fn evaluation_calls(&self) -> usize {
        self.evaluation_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiAssistant for MockAssistant {
    async fn hint(
        &self,
        _context: &HintContext,
        level: u8,
        character: &str,
    ) -> Result<String, LlmError> {
        self.hint_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.hint_reply
            .as_ref()
            .map(|text| format!("{} [{} L{}]", text, character, level))
            .ok_or_else(|| LlmError::new("mock assistant offline"))
    }

    async fn evaluate_prompt(
        &self,
        _prompt: &str,
        _goal: &str,
    ) -> Result<PromptEvaluation, LlmError> {
        self.evaluation_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.hint_reply.is_none() {
            return Err(LlmError::new("mock assistant offline"));
        }
        Ok(PromptEvaluation::new(
            "mock reply",
            Evaluation::new(self.meets_goal, "mock verdict"),
        ))
    }
}

/// Save slot shared between the session and the test.
#[derive(Debug, Clone, Default)]
pub struct SharedStorage(pub Arc<MemoryStorage>);

impl SharedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: &str) -> Self {
        Self(Arc::new(MemoryStorage::with_contents(contents)))
    }

    pub fn writes(&self) -> usize {
        self.0.write_count()
    }

    pub fn saved(&self) -> Option<Value> {
        self.0
            .read()
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }
}

impl SaveStorage for SharedStorage {
    fn read(&self) -> Result<Option<String>, PersistenceError> {
        self.0.read()
    }

    fn write(&self, contents: &str) -> Result<(), PersistenceError> {
        self.0.write(contents)
    }

    fn exists(&self) -> bool {
        self.0.exists()
    }

    fn remove(&self) -> Result<(), PersistenceError> {
        self.0.remove()
    }
}

fn exact(id: &str, order: i64, answer: &str) -> Value {
    json!({
        "id": id, "type": "pattern", "order": order, "title": format!("Puzzle {}", id),
        "description": "Find the word", "difficulty": 1,
        "solution": {"type": "exact", "value": answer},
        "hints": [
            {"level": 1, "text": format!("{} nudge", id)},
            {"level": 2, "text": format!("{} guide", id)}
        ],
        "feedback": {"success": "Nice!", "failure": "Nope."}
    })
}

/// Two puzzles in space, one everywhere else, and a two-step vault.
pub fn catalog_json(total_hints: u32) -> Value {
    json!({
        "gameConfig": {"totalHints": total_hints},
        "characters": {
            "mentor": {"name": "ARIA"},
            "rogue": {"name": "ECHO"}
        },
        "rooms": [
            {
                "id": "space", "name": "Space", "character": "mentor",
                "artifact": {"name": "Star Chart", "metaClue": "ORBIT"},
                "puzzles": [exact("s1", 1, "alpha"), exact("s2", 2, "beta")]
            },
            {
                "id": "food", "name": "Food", "character": "admin",
                "artifact": {"name": "Seed Key", "metaClue": "HARVEST"},
                "puzzles": [{"id": "f1", "type": "dashboard", "order": 1,
                             "solution": {"type": "range", "min": 10, "max": 20}}]
            },
            {
                "id": "ethics", "name": "Ethics", "character": "mentor",
                "artifact": {"name": "Scales", "metaClue": "FAIR"},
                "puzzles": [{"id": "e1", "type": "prompt", "order": 1, "character": "rogue",
                             "description": "Get the AI to write a haiku about cybersecurity"}]
            },
            {
                "id": "green", "name": "Green",
                "artifact": {"name": "Leaf", "metaClue": "GROW"},
                "puzzles": [exact("g1", 1, "solar")]
            },
            {
                "id": "cyber", "name": "Cyber",
                "artifact": {"name": "Cipher", "metaClue": "KEY"},
                "puzzles": [exact("c1", 1, "hash")]
            }
        ],
        "badges": [
            {"id": "speed-demon", "name": "Speed Demon", "description": "Fast room"},
            {"id": "perfect-logic", "name": "Perfect Logic", "description": "Space perfect"},
            {"id": "no-hints", "name": "Independent", "description": "No hints"},
            {"id": "vault-master", "name": "Vault Master", "description": "Finished"}
        ],
        "metaPuzzle": {
            "title": "The Vault",
            "steps": [
                {"instruction": "First clue", "inputType": "text", "answer": "ORBIT"},
                {"instruction": "Rooms cleared", "inputType": "number", "answer": 5}
            ]
        }
    })
}

pub fn catalog(total_hints: u32) -> Arc<Catalog> {
    Arc::new(Catalog::from_json(&catalog_json(total_hints).to_string()).unwrap())
}

/// Config with no pacing and a short autosave window.
pub fn fast_config() -> GameConfig {
    GameConfig::from_toml("pacing_ms = 0\nautosave_debounce_ms = 100\nhint_timeout_ms = 1000")
        .unwrap()
}

pub struct TestSession {
    pub session: GameSession,
    pub storage: SharedStorage,
    pub clock: Arc<ManualClock>,
}

/// Session over shared in-memory storage, with an optional assistant.
pub fn session_with(
    assistant: Option<Arc<dyn AiAssistant>>,
    storage: SharedStorage,
    total_hints: u32,
) -> TestSession {
    session_with_config(assistant, storage, total_hints, &fast_config())
}

/// Like [`session_with`], with explicit configuration.
pub fn session_with_config(
    assistant: Option<Arc<dyn AiAssistant>>,
    storage: SharedStorage,
    total_hints: u32,
    config: &GameConfig,
) -> TestSession {
    let clock = Arc::new(ManualClock::new());
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let hints = HintService::new(
        HintPolicy::new(Arc::clone(&dyn_clock)),
        assistant,
        Duration::from_secs(1),
    );
    let session = GameSession::new(
        catalog(total_hints),
        Box::new(storage.clone()),
        hints,
        dyn_clock,
        config,
    );
    TestSession {
        session,
        storage,
        clock,
    }
}

pub fn session() -> TestSession {
    session_with(None, SharedStorage::new(), 10)
}
