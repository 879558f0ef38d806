//! The remote AI collaborator: character hints and prompt grading.

use aivault_engine::{DEFAULT_CHARACTER, Evaluation, HintContext, PromptEvaluation};
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::llm_client::{LlmClient, LlmError};

const MENTOR_PERSONA: &str = "You are ARIA, a virtual mentor in an AI education escape room. You are encouraging and use the Socratic method. Never give direct answers; ask guiding questions instead. Keep responses under 2 sentences. Speak warmly but professionally.";
const ADMIN_PERSONA: &str = "You are SYS-OP, a system administrator in an AI education escape room. You are terse, technical, and slightly impatient but ultimately helpful. Give hints using technical jargon but make them useful. Keep responses under 2 sentences.";
const ROGUE_PERSONA: &str = "You are ECHO, a rogue AI in an AI education escape room. You are cryptic and playful. Give hints as riddles or metaphors. Never be straightforward. Keep responses under 2 sentences.";

const RESPONDER_PROMPT: &str = "You are a helpful AI assistant. Respond naturally to the user prompt.";
const GRADER_PROMPT: &str = "You evaluate AI responses. Reply only with valid JSON.";

/// Remote assistant used for hints and prompt puzzles.
///
/// Every call may fail; callers fall back to local answers.
#[async_trait]
pub trait AiAssistant: Send + Sync + std::fmt::Debug {
    /// A hint at `level` (1-3) voiced by `character`.
    async fn hint(
        &self,
        context: &HintContext,
        level: u8,
        character: &str,
    ) -> Result<String, LlmError>;

    /// Runs `prompt` and grades the reply against `goal`.
    async fn evaluate_prompt(&self, prompt: &str, goal: &str)
    -> Result<PromptEvaluation, LlmError>;
}

/// System prompt for a character, defaulting to the mentor.
pub fn persona(character: &str) -> &'static str {
    match character {
        "admin" => ADMIN_PERSONA,
        "rogue" => ROGUE_PERSONA,
        _ => MENTOR_PERSONA,
    }
}

/// User message asking for a hint.
pub fn hint_prompt(context: &HintContext, level: u8) -> String {
    format!(
        "The player is stuck on a puzzle called \"{}\".\n\
         Description: {}\n\
         Difficulty: {}/3\n\
         Hint level: {}/3 (1=vague nudge, 2=moderate guidance, 3=strong hint but NOT the answer)\n\
         Attempts so far: {}\n\
         Provide a hint appropriate to the level. Do NOT reveal the answer. Encourage reflection and learning.",
        context.title(),
        context.description(),
        context.difficulty(),
        level,
        context.attempts()
    )
}

/// User message asking the grader to judge a reply.
pub fn grading_prompt(goal: &str, reply: &str) -> String {
    format!(
        "Goal: \"{}\"\nAI Response: \"{}\"\nDoes the response meet the goal? Reply with ONLY valid JSON: {{\"meets_goal\": true/false, \"feedback\": \"brief explanation\"}}",
        goal, reply
    )
}

/// [`AiAssistant`] backed by an [`LlmClient`].
#[derive(Debug, Clone)]
pub struct LlmAssistant {
    client: LlmClient,
}

impl LlmAssistant {
    /// Wraps a client.
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AiAssistant for LlmAssistant {
    #[instrument(skip(self, context), fields(title = %context.title()))]
    async fn hint(
        &self,
        context: &HintContext,
        level: u8,
        character: &str,
    ) -> Result<String, LlmError> {
        let text = self
            .client
            .generate(persona(character), &hint_prompt(context, level))
            .await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::new("Assistant returned an empty hint"));
        }
        Ok(text.to_string())
    }

    #[instrument(skip(self, prompt, goal))]
    async fn evaluate_prompt(
        &self,
        prompt: &str,
        goal: &str,
    ) -> Result<PromptEvaluation, LlmError> {
        let reply = self.client.generate(RESPONDER_PROMPT, prompt).await?;
        let verdict = self
            .client
            .generate(GRADER_PROMPT, &grading_prompt(goal, &reply))
            .await?;
        let evaluation = Evaluation::parse_or_unreadable(&verdict);
        debug!(meets_goal = evaluation.meets_goal(), "Prompt graded");
        Ok(PromptEvaluation::new(reply, evaluation))
    }
}

/// Character for a puzzle: its own, else the room's, else the mentor.
pub fn resolve_character<'a>(puzzle: Option<&'a str>, room: &'a str) -> &'a str {
    puzzle
        .filter(|c| !c.is_empty())
        .or(Some(room).filter(|c| !c.is_empty()))
        .unwrap_or(DEFAULT_CHARACTER)
}
