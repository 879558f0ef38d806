//! Tests for the game session wiring.

mod common;

use std::sync::Arc;
use std::time::Duration;

use aivault::{AiAssistant, GameConfig, GameSession, HintOutcome};
use aivault_engine::{
    HintSource, ProgressionError, RoomEntry, RoomId, Screen, StepOutcome,
};
use common::{MockAssistant, SharedStorage, session, session_with};
use serde_json::{Value, json};

const GOOD_PROMPT: &str = "Write only a haiku about cybersecurity";

fn answer_for(id: &str) -> Value {
    match id {
        "s1" => json!("alpha"),
        "s2" => json!("beta"),
        "f1" => json!(15),
        "g1" => json!("solar"),
        "c1" => json!("hash"),
        other => panic!("no answer for {}", other),
    }
}

async fn clear_room(session: &mut GameSession, room: RoomId) {
    session.enter_room(room).unwrap();
    while let Some(puzzle) = session.engine().current_puzzle() {
        let id = puzzle.id().clone();
        let turn = if id == "e1" {
            session.submit_prompt(&id, GOOD_PROMPT).await.unwrap()
        } else {
            session.submit_answer(&id, &answer_for(&id)).await.unwrap()
        };
        assert!(turn.is_correct(), "{} should be solved", id);
    }
    session.leave_room().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_fresh_start_opens_room_select() {
    let mut t = session();
    assert!(!t.session.start(false).unwrap());

    let store = t.session.store();
    assert_eq!(store.current_screen(), Some(Screen::RoomSelect));
    assert!(store.timer_running());
    assert_eq!(store.hints_remaining(), 10);

    let rooms = t.session.rooms();
    assert_eq!(rooms.len(), 5);
    assert!(rooms[0].unlocked());
    assert!(!rooms[1].unlocked());
    assert_eq!(rooms[0].total(), 2);
    t.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_solving_a_room_advances_and_unlocks() {
    let mut t = session();
    t.session.start(false).unwrap();

    let RoomEntry::Puzzle(view) = t.session.enter_room(RoomId::Space).unwrap() else {
        panic!("expected a puzzle");
    };
    assert_eq!(view.puzzle().id(), "s1");
    assert_eq!(t.session.store().current_screen(), Some(Screen::Room));

    let turn = t.session.submit_answer("s1", &json!("wrong")).await.unwrap();
    assert!(!turn.is_correct());
    assert!(turn.next().is_none());

    let turn = t.session.submit_answer("s1", &json!(" ALPHA ")).await.unwrap();
    assert!(turn.is_correct());
    match turn.next() {
        Some(RoomEntry::Puzzle(view)) => assert_eq!(view.puzzle().id(), "s2"),
        other => panic!("expected s2, got {:?}", other),
    }

    let turn = t.session.submit_answer("s2", &json!("beta")).await.unwrap();
    assert!(matches!(
        turn.next(),
        Some(RoomEntry::Completed {
            room: RoomId::Space,
            ..
        })
    ));
    assert!(t.session.store().room_unlocked(RoomId::Food));

    t.session.leave_room().unwrap();
    assert_eq!(t.session.store().current_screen(), Some(Screen::RoomSelect));
    t.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_stale_and_locked_submissions_rejected() {
    let mut t = session();
    t.session.start(false).unwrap();

    assert!(matches!(
        t.session.enter_room(RoomId::Cyber),
        Err(ProgressionError::RoomLocked(RoomId::Cyber))
    ));

    t.session.enter_room(RoomId::Space).unwrap();
    assert!(matches!(
        t.session.submit_answer("s2", &json!("beta")).await,
        Err(ProgressionError::StalePuzzle { .. })
    ));
    assert!(matches!(
        t.session.submit_prompt("s1", GOOD_PROMPT).await,
        Err(ProgressionError::Config(_))
    ));
    t.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_remote_hint_then_rate_limited_fallback() {
    let mock = Arc::new(MockAssistant::replying("Think"));
    let assistant: Arc<dyn AiAssistant> = mock.clone();
    let mut t = session_with(Some(assistant), SharedStorage::new(), 10);
    t.session.start(false).unwrap();
    t.session.enter_room(RoomId::Space).unwrap();

    let HintOutcome::Shown(first) = t.session.request_hint().await.unwrap() else {
        panic!("expected a hint");
    };
    assert_eq!(first.source(), HintSource::Ai);
    assert_eq!(first.text(), "Think [mentor L1]");

    let HintOutcome::Shown(second) = t.session.request_hint().await.unwrap() else {
        panic!("expected a hint");
    };
    assert_eq!(second.source(), HintSource::Fallback);
    assert_eq!(second.text(), "s1 nudge");

    assert_eq!(mock.hint_calls(), 1);
    assert_eq!(t.session.store().hints_used(), 2);
    t.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_hint_budget_exhausted() {
    let mut t = session_with(None, SharedStorage::new(), 1);
    t.session.start(false).unwrap();
    t.session.enter_room(RoomId::Space).unwrap();

    assert!(matches!(
        t.session.request_hint().await.unwrap(),
        HintOutcome::Shown(_)
    ));
    assert_eq!(
        t.session.request_hint().await.unwrap(),
        HintOutcome::Exhausted
    );
    assert_eq!(t.session.store().hints_remaining(), 0);
    t.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_hint_for_replaced_puzzle_is_dropped() {
    let mut t = session();
    t.session.start(false).unwrap();
    t.session.enter_room(RoomId::Space).unwrap();

    let request = t.session.prepare_hint().unwrap().expect("budget left");
    assert_eq!(request.character(), "mentor");
    t.session.submit_answer("s1", &json!("alpha")).await.unwrap();

    let resolved = t.session.hint_service().resolve(request).await;
    assert_eq!(t.session.accept_hint(resolved), HintOutcome::Stale);
    assert_eq!(t.session.store().hints_used(), 1);
    t.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_hint_without_puzzle_is_an_error() {
    let mut t = session();
    t.session.start(false).unwrap();
    assert!(matches!(
        t.session.prepare_hint(),
        Err(ProgressionError::NoActivePuzzle)
    ));
    assert_eq!(t.session.store().hints_used(), 0);
    t.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_prompt_puzzle_graded_by_assistant() {
    let mock = Arc::new(MockAssistant::replying("Think"));
    let assistant: Arc<dyn AiAssistant> = mock.clone();
    let mut t = session_with(Some(assistant), SharedStorage::new(), 10);
    t.session.start(false).unwrap();
    clear_room(&mut t.session, RoomId::Space).await;
    clear_room(&mut t.session, RoomId::Food).await;

    t.session.enter_room(RoomId::Ethics).unwrap();
    let request = t.session.prepare_hint().unwrap().expect("budget left");
    assert_eq!(request.character(), "rogue");

    let turn = t.session.submit_prompt("e1", "anything at all").await.unwrap();
    assert!(turn.is_correct());
    let evaluation = turn.evaluation().as_ref().expect("graded");
    assert_eq!(evaluation.ai_response(), "mock reply");
    assert_eq!(mock.evaluation_calls(), 1);
    t.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_prompt_graded_locally_without_assistant() {
    let mut t = session();
    t.session.start(false).unwrap();
    clear_room(&mut t.session, RoomId::Space).await;
    clear_room(&mut t.session, RoomId::Food).await;
    t.session.enter_room(RoomId::Ethics).unwrap();

    let turn = t.session.submit_prompt("e1", "a haiku about security").await.unwrap();
    assert!(!turn.is_correct());
    let feedback = turn.evaluation().as_ref().unwrap().evaluation().feedback().clone();
    assert!(feedback.starts_with("Good start!"));

    let turn = t.session.submit_prompt("e1", GOOD_PROMPT).await.unwrap();
    assert!(turn.is_correct());
    t.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_full_game_opens_the_vault() {
    let mut t = session();
    t.session.start(false).unwrap();
    for room in RoomId::ORDER {
        clear_room(&mut t.session, room).await;
    }
    assert!(t.session.store().meta_unlocked());

    let meta = t.session.open_vault().unwrap();
    assert_eq!(meta.total_steps(), 2);
    assert_eq!(t.session.store().current_screen(), Some(Screen::Meta));

    assert_eq!(
        t.session.submit_vault_step(&json!("  orbit ")).unwrap(),
        StepOutcome::Advanced { next: 1 }
    );
    assert_eq!(
        t.session.submit_vault_step(&json!(4)).unwrap(),
        StepOutcome::Incorrect
    );
    assert_eq!(
        t.session.submit_vault_step(&json!("5")).unwrap(),
        StepOutcome::VaultOpened
    );
    assert_eq!(t.session.store().current_screen(), Some(Screen::End));

    let summary = t.session.summary();
    assert!(summary.complete());
    assert_eq!(summary.puzzles_solved(), 6);
    assert_eq!(summary.total_puzzles(), 6);
    let badges: Vec<&str> = summary.badges().iter().map(|b| b.id().as_str()).collect();
    assert!(badges.contains(&"vault-master"));
    assert!(badges.contains(&"no-hints"));
    assert!(badges.contains(&"perfect-logic"));
    assert_eq!(summary.room_times().len(), 5);
    t.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_vault_locked_until_rooms_done() {
    let mut t = session();
    t.session.start(false).unwrap();
    assert!(matches!(
        t.session.open_vault(),
        Err(ProgressionError::MetaLocked)
    ));
    assert!(matches!(
        t.session.submit_vault_step(&json!("ORBIT")),
        Err(ProgressionError::MetaLocked)
    ));
    t.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_progress_autosaves_and_resumes() {
    let storage = SharedStorage::new();
    let mut first = session_with(None, storage.clone(), 10);
    first.session.start(false).unwrap();
    first.session.enter_room(RoomId::Space).unwrap();
    first.session.submit_answer("s1", &json!("alpha")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    let saved = storage.saved().expect("autosaved");
    assert_eq!(saved["rooms"]["space"]["puzzles"]["s1"]["solved"], json!(true));
    assert_eq!(saved["score"]["points"], json!(100));
    assert_eq!(saved["settings"]["apiKey"], Value::Null);
    first.session.shutdown().await;

    let mut second = session_with(None, storage.clone(), 10);
    assert!(second.session.start(false).unwrap());
    match second.session.enter_room(RoomId::Space).unwrap() {
        RoomEntry::Puzzle(view) => assert_eq!(view.puzzle().id(), "s2"),
        other => panic!("expected s2, got {:?}", other),
    }
    second.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_fresh_start_discards_save() {
    let storage = SharedStorage::new();
    let mut first = session_with(None, storage.clone(), 10);
    first.session.start(false).unwrap();
    first.session.enter_room(RoomId::Space).unwrap();
    first.session.submit_answer("s1", &json!("alpha")).await.unwrap();
    first.session.shutdown().await;

    let mut second = session_with(None, storage.clone(), 10);
    assert!(!second.session.start(true).unwrap());
    assert_eq!(second.session.store().room_progress(RoomId::Space), 0);
    second.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_timer_ticks_and_settings_toggle() {
    let mut t = session();
    t.session.start(false).unwrap();
    assert_eq!(t.session.tick().unwrap(), 0);
    tokio::time::advance(Duration::from_millis(2500)).await;
    assert_eq!(t.session.tick().unwrap(), 2);
    tokio::time::advance(Duration::from_millis(500)).await;
    assert_eq!(t.session.tick().unwrap(), 1);
    assert_eq!(t.session.summary().elapsed_secs(), 3);
    assert_eq!(t.session.summary().elapsed(), "00:03");

    t.session.set_sound(false).unwrap();
    t.session.set_music(true).unwrap();
    let settings = t.session.store().settings();
    assert!(!settings.sound_enabled());
    assert!(settings.music_enabled());
    t.session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_pacing_time_counts_toward_the_room() {
    let config = common::fast_config().with_pacing_ms(3000);
    let mut t = common::session_with_config(None, SharedStorage::new(), 10, &config);
    t.session.start(false).unwrap();
    t.session.enter_room(RoomId::Space).unwrap();

    t.session.submit_answer("s1", &json!("alpha")).await.unwrap();
    let turn = t.session.submit_answer("s2", &json!("beta")).await.unwrap();

    assert!(matches!(turn.next(), Some(RoomEntry::Completed { .. })));
    assert_eq!(t.session.store().elapsed(), 6);
    assert_eq!(t.session.store().room_time(RoomId::Space), 6);
    t.session.shutdown().await;
}

#[tokio::test]
async fn test_from_config_uses_files() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("puzzles.json");
    let save_path = dir.path().join("save").join("slot.json");
    std::fs::write(&catalog_path, common::catalog_json(10).to_string()).unwrap();

    let config = GameConfig::default()
        .with_catalog_path(&catalog_path)
        .with_save_path(&save_path)
        .with_pacing_ms(0);
    let mut session = GameSession::from_config(&config).unwrap();
    session.start(false).unwrap();
    session.enter_room(RoomId::Space).unwrap();
    session.submit_answer("s1", &json!("alpha")).await.unwrap();
    session.shutdown().await;

    let saved: Value =
        serde_json::from_str(&std::fs::read_to_string(&save_path).unwrap()).unwrap();
    assert_eq!(saved["rooms"]["space"]["puzzles"]["s1"]["solved"], json!(true));
}

#[tokio::test]
async fn test_from_config_missing_catalog() {
    let config = GameConfig::default().with_catalog_path("/definitely/not/here.json");
    assert!(GameSession::from_config(&config).is_err());
}
