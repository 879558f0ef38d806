//! Prompt puzzle verdicts and the offline prompt evaluator.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Grade given to the assistant's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Evaluation {
    #[getter(copy)]
    meets_goal: bool,
    feedback: String,
}

impl Evaluation {
    /// Creates a grade.
    pub fn new(meets_goal: bool, feedback: impl Into<String>) -> Self {
        Self {
            meets_goal,
            feedback: feedback.into(),
        }
    }

    /// Grade used when the grader's reply cannot be read.
    pub fn unreadable() -> Self {
        Self::new(false, "Could not evaluate response.")
    }

    /// Parses a grader reply of the form `{"meets_goal": bool, "feedback": "..."}`.
    pub fn parse_or_unreadable(reply: &str) -> Self {
        serde_json::from_str(reply.trim()).unwrap_or_else(|_| Self::unreadable())
    }
}

/// The assistant's reply to a player prompt, with its grade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(rename_all = "camelCase")]
pub struct PromptEvaluation {
    ai_response: String,
    evaluation: Evaluation,
}

impl PromptEvaluation {
    /// Pairs a reply with its grade.
    pub fn new(ai_response: impl Into<String>, evaluation: Evaluation) -> Self {
        Self {
            ai_response: ai_response.into(),
            evaluation,
        }
    }

    /// Whether the prompt achieved its goal.
    pub fn meets_goal(&self) -> bool {
        self.evaluation.meets_goal
    }
}

const HAIKU_REPLY: &str = "Firewalls standing tall\nEncrypted data flows safe\nHackers find no way";
const GENERIC_REPLY: &str = "Here is some information about cybersecurity: Cybersecurity involves protecting systems, networks, and programs from digital attacks...";

/// Grades a prompt offline by keyword matching.
///
/// Only the haiku-about-cybersecurity goal is recognised. A prompt meets it
/// when it names the format, the topic, and an output constraint.
#[instrument(skip(prompt))]
pub fn simulate_prompt_response(prompt: &str, goal: &str) -> PromptEvaluation {
    let prompt = prompt.to_lowercase();
    let mut meets_goal = false;
    let mut feedback = "Try to be more specific in your prompt.";

    if goal.contains("haiku") && goal.contains("cybersecurity") {
        let has_format = prompt.contains("haiku");
        let has_topic = prompt.contains("cyber") || prompt.contains("security");
        let has_constraint = ["only", "just", "nothing else"]
            .iter()
            .any(|word| prompt.contains(word));

        feedback = match (has_format, has_topic, has_constraint) {
            (true, true, true) => {
                meets_goal = true;
                "Great prompt! You specified the format, topic, and output constraint."
            }
            (true, true, false) => {
                "Good start! Try adding a constraint to ensure ONLY a haiku is returned."
            }
            (true, false, _) => "You mentioned the format but forgot the topic.",
            _ => "Think about what format and topic the output should have.",
        };
    }

    let reply = if meets_goal { HAIKU_REPLY } else { GENERIC_REPLY };
    PromptEvaluation::new(reply, Evaluation::new(meets_goal, feedback))
}
