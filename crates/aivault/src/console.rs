//! Line-oriented console front end.
//!
//! Commands are read from any async line source. The game timer is topped up
//! once a second from elapsed time, and hints resolve in the background while
//! the player keeps typing.

use std::io::Write;
use std::str::FromStr;
use std::time::Duration;

use aivault_engine::{
    AnswerMode, BadgeStatus, HintSource, MetaPuzzle, MetaStep, ProgressionError, PuzzleConfig,
    RoomEntry, RoomId, StepOutcome, SubmitOutcome,
};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, instrument, warn};

use crate::hint_service::ResolvedHint;
use crate::session::{GameSession, GameSummary, HintOutcome, RoomStatus, Turn};

const HELP: &str = "\
Commands:
  rooms                 list rooms
  enter <room>          enter a room (space, food, ethics, green, cyber)
  leave                 return to the room list
  show                  show the current puzzle
  answer <json|text>    answer the current puzzle
  prompt <text>         send a prompt to the assistant (prompt puzzles)
  hint                  ask for a hint
  vault                 open the vault
  step <json|text>      answer the current vault step
  status                show progress
  badges                list badges
  sound on|off          toggle sound effects
  music on|off          toggle music
  save                  save now
  help                  show this help
  quit                  save and exit";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// List rooms.
    Rooms,
    /// Enter a room.
    Enter(RoomId),
    /// Leave the current room.
    Leave,
    /// Show the current puzzle.
    Show,
    /// Answer the current puzzle.
    Answer(Value),
    /// Prompt text for a prompt puzzle.
    Prompt(String),
    /// Ask for a hint.
    Hint,
    /// Open the vault.
    Vault,
    /// Answer the current vault step.
    Step(Value),
    /// Show progress.
    Status,
    /// List badges.
    Badges,
    /// Toggle sound effects.
    Sound(bool),
    /// Toggle music.
    Music(bool),
    /// Save immediately.
    Save,
    /// Show the command list.
    Help,
    /// Leave the game.
    Quit,
}

/// Why a line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum CommandError {
    /// Blank line.
    #[display("Empty command")]
    Empty,
    /// Unknown verb.
    #[display("Unknown command '{}' (try 'help')", _0)]
    Unknown(String),
    /// Verb given without its argument.
    #[display("'{}' needs an argument", _0)]
    MissingArgument(&'static str),
    /// Argument not understood.
    #[display("Invalid argument: {}", _0)]
    InvalidArgument(String),
}

impl std::error::Error for CommandError {}

/// Parses one input line.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CommandError::Empty);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let verb = verb.to_lowercase();

    let command = match verb.as_str() {
        "rooms" | "ls" => Command::Rooms,
        "enter" | "go" => {
            let name = required("enter", rest)?.to_lowercase();
            let room = RoomId::from_str(&name)
                .map_err(|_| CommandError::InvalidArgument(format!("no room named '{}'", name)))?;
            Command::Enter(room)
        }
        "leave" | "back" => Command::Leave,
        "show" | "look" => Command::Show,
        "answer" | "a" => Command::Answer(parse_answer(required("answer", rest)?)),
        "prompt" | "p" => Command::Prompt(required("prompt", rest)?.to_string()),
        "hint" | "h" => Command::Hint,
        "vault" => Command::Vault,
        "step" => Command::Step(parse_answer(required("step", rest)?)),
        "status" => Command::Status,
        "badges" => Command::Badges,
        "sound" => Command::Sound(parse_toggle(required("sound", rest)?)?),
        "music" => Command::Music(parse_toggle(required("music", rest)?)?),
        "save" => Command::Save,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => return Err(CommandError::Unknown(verb)),
    };
    Ok(command)
}

fn required<'a>(verb: &'static str, rest: &'a str) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument(verb))
    } else {
        Ok(rest)
    }
}

fn parse_toggle(arg: &str) -> Result<bool, CommandError> {
    match arg.to_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(CommandError::InvalidArgument(format!(
            "expected on or off, got '{}'",
            other
        ))),
    }
}

/// Reads an answer as JSON when it parses, otherwise as plain text.
///
/// `42` becomes a number and `["a","b"]` an array; `orbit` stays a string.
pub fn parse_answer(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Room list.
pub fn render_rooms(rooms: &[RoomStatus]) -> String {
    let mut out = String::from("Rooms:");
    for status in rooms {
        let marker = if status.completed() {
            "done"
        } else if !status.issues().is_empty() {
            "broken"
        } else if status.unlocked() {
            "open"
        } else {
            "locked"
        };
        out.push_str(&format!(
            "\n  {:<7} {:<28} {}/{}  [{}]",
            status.room().as_str(),
            status.name(),
            status.solved(),
            status.total(),
            marker
        ));
    }
    out
}

/// A puzzle as shown to the player.
pub fn render_puzzle(puzzle: &PuzzleConfig, index: usize, total: usize) -> String {
    let mut out = format!(
        "Puzzle {}/{}: {} ({}, difficulty {}/3, {} pts)\n{}",
        index + 1,
        total,
        puzzle.title(),
        puzzle.kind(),
        puzzle.difficulty(),
        puzzle.points(),
        puzzle.description()
    );
    if !puzzle.config().is_null() {
        out.push_str(&format!("\n{}", puzzle.config()));
    }
    if puzzle.kind().answer_mode() == AnswerMode::ExternalEvaluation {
        out.push_str("\n(use 'prompt <text>' to answer)");
    }
    out
}

/// What entering or advancing within a room produced.
pub fn render_entry(entry: &RoomEntry) -> String {
    match entry {
        RoomEntry::Puzzle(view) => render_puzzle(view.puzzle(), view.index(), view.total()),
        RoomEntry::Completed { room, artifact } => format!(
            "Room '{}' complete! Artifact collected: {}",
            room,
            artifact.name()
        ),
    }
}

/// Result of one submission.
pub fn render_turn(turn: &Turn) -> String {
    let mut out = String::new();
    if let Some(evaluation) = turn.evaluation() {
        out.push_str(&format!(
            "Assistant: {}\nJudge: {}\n",
            evaluation.ai_response(),
            evaluation.evaluation().feedback()
        ));
    }
    match turn.outcome() {
        SubmitOutcome::Correct { result, feedback } => out.push_str(&format!(
            "{} (+{} pts, {} attempt(s))",
            feedback,
            result.score(),
            result.attempts()
        )),
        SubmitOutcome::Incorrect { attempts, feedback } => {
            out.push_str(&format!("{} (attempt {})", feedback, attempts))
        }
    }
    if let Some(next) = turn.next() {
        out.push_str(&format!("\n\n{}", render_entry(next)));
    }
    out
}

/// The active vault step.
pub fn render_step(meta: &MetaPuzzle) -> String {
    match meta.current_step() {
        Some(step) => format!(
            "Vault step {}/{}: {}{}",
            meta.step_index() + 1,
            meta.total_steps(),
            step.instruction(),
            step_detail(step)
        ),
        None => "The vault is open.".to_string(),
    }
}

fn step_detail(step: &MetaStep) -> String {
    if !step.options().is_empty() {
        return format!("\nOptions: {}", step.options().join(", "));
    }
    match (step.min(), step.max()) {
        (Some(min), Some(max)) => format!("\nRange: {} to {}", min, max),
        _ => String::new(),
    }
}

/// Progress summary.
pub fn render_summary(summary: &GameSummary, hints_remaining: u32) -> String {
    let mut out = format!(
        "Time: {}\nPuzzles: {}/{}\nPoints: {}\nHints left: {}",
        summary.elapsed(),
        summary.puzzles_solved(),
        summary.total_puzzles(),
        summary.points(),
        hints_remaining
    );
    for (room, secs) in summary.room_times() {
        out.push_str(&format!(
            "\n  {:<7} {}",
            room.as_str(),
            aivault_engine::format_duration(*secs)
        ));
    }
    if !summary.badges().is_empty() {
        let names: Vec<&str> = summary.badges().iter().map(|b| b.name().as_str()).collect();
        out.push_str(&format!("\nBadges: {}", names.join(", ")));
    }
    if summary.complete() {
        out.push_str("\nThe vault is open. Well played!");
    }
    out
}

/// Badge list.
pub fn render_badges(badges: &[BadgeStatus]) -> String {
    let mut out = String::from("Badges:");
    for status in badges {
        out.push_str(&format!(
            "\n  [{}] {} - {}",
            if status.earned() { "x" } else { " " },
            status.badge().name(),
            status.badge().description()
        ));
    }
    out
}

fn render_hint(outcome: &HintOutcome) -> Option<String> {
    match outcome {
        HintOutcome::Shown(hint) => {
            let source = match hint.source() {
                HintSource::Ai => "assistant",
                HintSource::Fallback => "notes",
            };
            Some(format!("Hint ({}): {}", source, hint.text()))
        }
        HintOutcome::Exhausted => Some("No hints left.".to_string()),
        HintOutcome::Stale => None,
    }
}

/// Runs the console until `quit` or end of input, then hands the session back.
#[instrument(skip_all)]
pub async fn run<R, W>(
    mut session: GameSession,
    input: R,
    out: &mut W,
) -> anyhow::Result<GameSession>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let second = Duration::from_secs(1);
    let mut ticker = tokio::time::interval_at(Instant::now() + second, second);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pending: JoinSet<ResolvedHint> = JoinSet::new();

    writeln!(out, "{}\n\nType 'help' for commands.", render_rooms(&session.rooms()))?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("Input closed");
                    break;
                };
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => match execute(&mut session, command, &mut pending).await {
                        Ok(text) if text.is_empty() => {}
                        Ok(text) => writeln!(out, "{}", text)?,
                        Err(e) => writeln!(out, "! {}", e)?,
                    },
                    Err(CommandError::Empty) => {}
                    Err(e) => writeln!(out, "! {}", e)?,
                }
            }
            _ = ticker.tick() => {
                session.tick()?;
            }
            Some(joined) = pending.join_next() => match joined {
                Ok(resolved) => {
                    if let Some(text) = render_hint(&session.accept_hint(resolved)) {
                        writeln!(out, "{}", text)?;
                    }
                }
                Err(e) => warn!(error = %e, "Hint task failed"),
            },
        }
    }

    pending.abort_all();
    session.save_now();
    Ok(session)
}

/// Applies one command and returns the text to show.
pub async fn execute(
    session: &mut GameSession,
    command: Command,
    pending: &mut JoinSet<ResolvedHint>,
) -> Result<String, ProgressionError> {
    let text = match command {
        Command::Rooms => render_rooms(&session.rooms()),
        Command::Enter(room) => render_entry(&session.enter_room(room)?),
        Command::Leave => {
            session.leave_room()?;
            render_rooms(&session.rooms())
        }
        Command::Show => show(session)?,
        Command::Answer(answer) => {
            let (id, mode) = active_puzzle(session)?;
            let turn = match (mode, answer) {
                (AnswerMode::ExternalEvaluation, Value::String(prompt)) => {
                    session.submit_prompt(&id, &prompt).await?
                }
                (AnswerMode::ExternalEvaluation, other) => {
                    session.submit_prompt(&id, &other.to_string()).await?
                }
                (AnswerMode::SolutionSpec, answer) => session.submit_answer(&id, &answer).await?,
            };
            render_turn(&turn)
        }
        Command::Prompt(prompt) => {
            let (id, _) = active_puzzle(session)?;
            render_turn(&session.submit_prompt(&id, &prompt).await?)
        }
        Command::Hint => match session.prepare_hint()? {
            Some(request) => {
                let character = request.character().clone();
                let service = session.hint_service();
                pending.spawn(async move { service.resolve(request).await });
                format!(
                    "Asking {}... ({} hint(s) left)",
                    character_name(session, &character),
                    session.store().hints_remaining()
                )
            }
            None => render_hint(&HintOutcome::Exhausted).unwrap_or_default(),
        },
        Command::Vault => render_step(session.open_vault()?),
        Command::Step(answer) => match session.submit_vault_step(&answer)? {
            StepOutcome::Incorrect => "That doesn't fit the lock.".to_string(),
            StepOutcome::Advanced { .. } => match session.meta() {
                Some(meta) => render_step(meta),
                None => String::new(),
            },
            StepOutcome::VaultOpened => format!(
                "The vault swings open!\n\n{}",
                render_summary(&session.summary(), session.store().hints_remaining())
            ),
        },
        Command::Status => render_summary(&session.summary(), session.store().hints_remaining()),
        Command::Badges => render_badges(&session.badges()),
        Command::Sound(on) => {
            session.set_sound(on)?;
            format!("Sound {}", if on { "on" } else { "off" })
        }
        Command::Music(on) => {
            session.set_music(on)?;
            format!("Music {}", if on { "on" } else { "off" })
        }
        Command::Save => {
            if session.save_now() {
                "Saved.".to_string()
            } else {
                "Save failed; see the log.".to_string()
            }
        }
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    };
    Ok(text)
}

fn show(session: &GameSession) -> Result<String, ProgressionError> {
    if let Some(meta) = session.meta() {
        return Ok(render_step(meta));
    }
    let room = session.engine().room().ok_or(ProgressionError::NoActiveRoom)?;
    let puzzle = session
        .engine()
        .current_puzzle()
        .ok_or(ProgressionError::NoActivePuzzle)?;
    let total = session.catalog().room_puzzle_count(room);
    Ok(render_puzzle(puzzle, session.engine().cursor(), total))
}

fn active_puzzle(session: &GameSession) -> Result<(String, AnswerMode), ProgressionError> {
    let puzzle = session
        .engine()
        .current_puzzle()
        .ok_or(ProgressionError::NoActivePuzzle)?;
    Ok((puzzle.id().clone(), puzzle.kind().answer_mode()))
}

fn character_name(session: &GameSession, character: &str) -> String {
    session
        .catalog()
        .character(character)
        .map(|c| c.name().clone())
        .unwrap_or_else(|| character.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("rooms"), Ok(Command::Rooms));
        assert_eq!(parse_command("  enter Space "), Ok(Command::Enter(RoomId::Space)));
        assert_eq!(parse_command("answer 42"), Ok(Command::Answer(json!(42))));
        assert_eq!(
            parse_command("answer [\"a\", \"b\"]"),
            Ok(Command::Answer(json!(["a", "b"])))
        );
        assert_eq!(
            parse_command("step orbit"),
            Ok(Command::Step(json!("orbit")))
        );
        assert_eq!(
            parse_command("prompt list three fruits"),
            Ok(Command::Prompt("list three fruits".to_string()))
        );
        assert_eq!(parse_command("sound off"), Ok(Command::Sound(false)));
        assert_eq!(parse_command("Q"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_command("   "), Err(CommandError::Empty));
        assert_eq!(
            parse_command("dance"),
            Err(CommandError::Unknown("dance".to_string()))
        );
        assert_eq!(
            parse_command("enter"),
            Err(CommandError::MissingArgument("enter"))
        );
        assert!(matches!(
            parse_command("enter moon"),
            Err(CommandError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_command("music loud"),
            Err(CommandError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_hint_rendering() {
        let shown = HintOutcome::Shown(aivault_engine::Hint::fallback("Look up"));
        assert_eq!(render_hint(&shown).as_deref(), Some("Hint (notes): Look up"));
        assert_eq!(render_hint(&HintOutcome::Stale), None);
    }
}
