//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use aivault_engine::{
    AchievementEngine, Catalog, ManualClock, PathStore, ProgressionEngine, default_state,
};
use serde_json::{Value, json};

fn exact(id: &str, order: i64, answer: &str) -> Value {
    json!({
        "id": id, "type": "pattern", "order": order, "title": format!("Puzzle {}", id),
        "description": "Find the word", "difficulty": 1,
        "solution": {"type": "exact", "value": answer},
        "hints": [
            {"level": 1, "text": format!("{} nudge", id)},
            {"level": 2, "text": format!("{} guide", id)},
            {"level": 3, "text": format!("{} strong", id)}
        ],
        "feedback": {"success": "Nice!", "failure": "Nope."}
    })
}

/// A small catalog: three puzzles in space and food, one in every other room.
pub fn catalog_json() -> Value {
    json!({
        "gameConfig": {"totalHints": 10},
        "rooms": [
            {
                "id": "space", "name": "Space Operations",
                "artifact": {"name": "Star Chart", "metaClue": "ORBIT"},
                "puzzles": [exact("s1", 1, "alpha"), exact("s2", 2, "beta"), exact("s3", 3, "gamma")]
            },
            {
                "id": "food", "name": "Food Systems",
                "artifact": {"name": "Seed Vault Key", "metaClue": "HARVEST"},
                "puzzles": [
                    {"id": "f1", "type": "dashboard", "order": 1, "difficulty": 2,
                     "solution": {"type": "range", "min": 10, "max": 20}},
                    {"id": "f2", "type": "optimization", "order": 2, "difficulty": 2, "points": 150,
                     "solution": {"type": "multi-value", "values": [3, 4]}},
                    {"id": "f3", "type": "crossword", "order": 3, "difficulty": 3,
                     "solution": {"type": "blanks", "values": {"a": "DATA", "b": "MODEL"}}}
                ]
            },
            {
                "id": "ethics", "name": "Ethics Archive",
                "artifact": {"name": "Scales", "metaClue": "FAIR"},
                "puzzles": [
                    {"id": "e1", "type": "prompt", "order": 1, "difficulty": 2,
                     "description": "Get the AI to write a haiku about cybersecurity"}
                ]
            },
            {
                "id": "green", "name": "Green Tech",
                "artifact": {"name": "Leaf", "metaClue": "GROW"},
                "puzzles": [exact("g1", 1, "solar")]
            },
            {
                "id": "cyber", "name": "Cyber City",
                "artifact": {"name": "Cipher", "metaClue": "KEY"},
                "puzzles": [exact("c1", 1, "hash")]
            }
        ],
        "badges": [
            {"id": "speed-demon", "name": "Speed Demon", "description": "Fast room", "icon": "S"},
            {"id": "perfect-logic", "name": "Perfect Logic", "description": "Space perfect", "icon": "P"},
            {"id": "data-master", "name": "Data Master", "description": "Food perfect", "icon": "D"},
            {"id": "code-breaker", "name": "Code Breaker", "description": "Cyber perfect", "icon": "C"},
            {"id": "no-hints", "name": "Independent", "description": "No hints", "icon": "N"},
            {"id": "vault-master", "name": "Vault Master", "description": "Finished", "icon": "V"}
        ],
        "metaPuzzle": {
            "title": "The Vault",
            "steps": [
                {"instruction": "Enter the first clue", "inputType": "text", "answer": "ORBIT"},
                {"instruction": "Set the dial", "inputType": "slider", "answer": 50, "tolerance": 2, "min": 0, "max": 100}
            ]
        }
    })
}

/// Parsed fixture catalog.
pub fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::from_json(&catalog_json().to_string()).unwrap())
}

/// Everything a test needs to drive progression.
pub struct Harness {
    pub store: PathStore,
    pub engine: ProgressionEngine,
    pub achievements: Arc<AchievementEngine>,
    pub clock: Arc<ManualClock>,
    pub catalog: Arc<Catalog>,
}

impl Harness {
    pub fn new() -> Self {
        let catalog = catalog();
        let clock = Arc::new(ManualClock::new());
        let mut store = PathStore::new(default_state(catalog.rules().total_hints()));
        let achievements = Arc::new(AchievementEngine::new(Arc::clone(&catalog)));
        achievements.install(&mut store);
        let engine = ProgressionEngine::new(Arc::clone(&catalog), clock.clone());
        Self {
            store,
            engine,
            achievements,
            clock,
            catalog,
        }
    }
}
