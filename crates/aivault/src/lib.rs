//! AI Vault - console host for the vault engine
//!
//! Wires [`aivault_engine`] to the outside world: a remote AI assistant for
//! character hints and prompt grading, debounced autosave, and a line-based
//! console.
//!
//! # Architecture
//!
//! - **Session**: one player's store, engines and background tasks
//! - **Assistant**: OpenAI or Anthropic chat completions behind a trait
//! - **Hint service**: timeouts and local fallbacks around the assistant
//! - **Autosave**: debounced writes on a background task
//! - **Console**: command parser and renderer
//!
//! # Example
//!
//! ```no_run
//! use aivault::{GameConfig, GameSession};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GameConfig::default();
//! let mut session = GameSession::from_config(&config)?;
//! session.start(false)?;
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod assistant;
mod autosave;
mod game_config;
mod hint_service;
mod llm_client;
mod session;

/// Console commands and rendering.
pub mod console;

// Crate-level exports - Configuration
pub use game_config::GameConfig;

// Crate-level exports - LLM client
pub use llm_client::{LlmClient, LlmConfig, LlmError, LlmProvider};

// Crate-level exports - Assistant
pub use assistant::{
    AiAssistant, LlmAssistant, grading_prompt, hint_prompt, persona, resolve_character,
};

// Crate-level exports - Hint service
pub use hint_service::{HintRequest, HintService, ResolvedHint};

// Crate-level exports - Autosave
pub use autosave::{AutoSaver, SaveScheduler};

// Crate-level exports - Session
pub use session::{GameSession, GameSummary, HintOutcome, RoomStatus, Turn, summarize};
