//! Async hint and prompt-evaluation front for the remote assistant.
//!
//! Every request resolves. The remote side is tried at most once per request,
//! bounded by a timeout, and any failure downgrades to the local answer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use aivault_engine::{
    Hint, HintContext, HintPolicy, HintRoute, PromptEvaluation, PuzzleToken, hint_level,
    simulate_prompt_response,
};
use tracing::{debug, info, instrument, warn};

use crate::assistant::AiAssistant;

/// A hint request detached from the session so it can run in the background.
#[derive(Debug, Clone, derive_getters::Getters, derive_new::new)]
pub struct HintRequest {
    #[getter(copy)]
    token: PuzzleToken,
    context: HintContext,
    #[new(into)]
    character: String,
}

/// A hint tagged with the puzzle instance it was requested for.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct ResolvedHint {
    #[getter(copy)]
    token: PuzzleToken,
    hint: Hint,
}

/// Routes hint and evaluation calls to the assistant or to local fallbacks.
#[derive(Debug)]
pub struct HintService {
    policy: Mutex<HintPolicy>,
    assistant: Option<Arc<dyn AiAssistant>>,
    timeout: Duration,
}

impl HintService {
    /// Creates a service. `assistant = None` keeps everything local.
    pub fn new(
        policy: HintPolicy,
        assistant: Option<Arc<dyn AiAssistant>>,
        timeout: Duration,
    ) -> Self {
        info!(remote = assistant.is_some(), "Hint service ready");
        Self {
            policy: Mutex::new(policy),
            assistant,
            timeout,
        }
    }

    /// Whether a remote assistant is configured.
    pub fn remote_enabled(&self) -> bool {
        self.assistant.is_some()
    }

    /// Resolves a hint for `context`, voiced by `character`.
    #[instrument(skip(self, context), fields(title = %context.title(), attempts = context.attempts()))]
    pub async fn request_hint(&self, context: &HintContext, character: &str) -> Hint {
        let level = hint_level(context.attempts());
        let route = match self.policy.lock() {
            Ok(mut policy) => policy.route(self.assistant.is_some()),
            Err(poisoned) => poisoned.into_inner().route(self.assistant.is_some()),
        };
        let fallback = || self.local_hint(context, level);

        let assistant = match (route, &self.assistant) {
            (HintRoute::Remote, Some(assistant)) => assistant,
            (HintRoute::Fallback(reason), _) => {
                debug!(%reason, "Using authored hint");
                return fallback();
            }
            (HintRoute::Remote, None) => return fallback(),
        };

        match tokio::time::timeout(self.timeout, assistant.hint(context, level, character)).await {
            Ok(Ok(text)) => {
                info!(level, "Assistant hint received");
                Hint::ai(text)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Assistant hint failed; using fallback");
                fallback()
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Assistant hint timed out; using fallback");
                fallback()
            }
        }
    }

    /// Resolves a detached request, keeping its token.
    pub async fn resolve(&self, request: HintRequest) -> ResolvedHint {
        let hint = self
            .request_hint(request.context(), request.character())
            .await;
        ResolvedHint {
            token: request.token(),
            hint,
        }
    }

    /// Grades a player prompt against `goal`, locally if the assistant is
    /// missing or fails.
    #[instrument(skip(self, prompt, goal))]
    pub async fn evaluate_prompt(&self, prompt: &str, goal: &str) -> PromptEvaluation {
        let Some(assistant) = &self.assistant else {
            return simulate_prompt_response(prompt, goal);
        };
        match tokio::time::timeout(self.timeout, assistant.evaluate_prompt(prompt, goal)).await {
            Ok(Ok(evaluation)) => evaluation,
            Ok(Err(e)) => {
                warn!(error = %e, "Prompt evaluation failed; grading locally");
                simulate_prompt_response(prompt, goal)
            }
            Err(_) => {
                warn!("Prompt evaluation timed out; grading locally");
                simulate_prompt_response(prompt, goal)
            }
        }
    }

    fn local_hint(&self, context: &HintContext, level: u8) -> Hint {
        match self.policy.lock() {
            Ok(policy) => policy.fallback(context, level),
            Err(poisoned) => poisoned.into_inner().fallback(context, level),
        }
    }
}
