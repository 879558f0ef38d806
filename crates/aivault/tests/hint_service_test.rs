//! Tests for hint routing, timeouts and fallbacks.

mod common;

use std::sync::Arc;
use std::time::Duration;

use aivault::{AiAssistant, HintRequest, HintService};
use aivault_engine::{
    Clock, HintContext, HintPolicy, HintSource, HintText, ManualClock, RoomId,
    simulate_prompt_response,
};
use common::MockAssistant;

const HAIKU_GOAL: &str = "Get the AI to write a haiku about cybersecurity";

fn context(attempts: u32) -> HintContext {
    HintContext::new(
        "Signal Pattern".to_string(),
        "What comes next?".to_string(),
        1,
        attempts,
        vec![
            HintText::new(1, "Compare neighbours"),
            HintText::new(2, "Look at ratios"),
            HintText::new(3, "Double it"),
        ],
    )
}

fn service(mock: &Arc<MockAssistant>, clock: &Arc<ManualClock>) -> HintService {
    let assistant: Arc<dyn AiAssistant> = mock.clone();
    let clock: Arc<dyn Clock> = clock.clone();
    HintService::new(
        HintPolicy::new(clock),
        Some(assistant),
        Duration::from_millis(500),
    )
}

#[tokio::test]
async fn test_remote_hint_uses_level_and_character() {
    let mock = Arc::new(MockAssistant::replying("Try this"));
    let clock = Arc::new(ManualClock::new());
    let service = service(&mock, &clock);

    let hint = service.request_hint(&context(1), "rogue").await;
    assert_eq!(hint.source(), HintSource::Ai);
    assert_eq!(hint.text(), "Try this [rogue L2]");
    assert!(service.remote_enabled());
}

#[tokio::test]
async fn test_failed_call_falls_back_to_authored_hint() {
    let mock = Arc::new(MockAssistant::failing());
    let clock = Arc::new(ManualClock::new());
    let service = service(&mock, &clock);

    let hint = service.request_hint(&context(2), "mentor").await;
    assert_eq!(hint.source(), HintSource::Fallback);
    assert_eq!(hint.text(), "Double it");
    assert_eq!(mock.hint_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_call_times_out_to_fallback() {
    let mock = Arc::new(MockAssistant::slow(Duration::from_secs(30)));
    let clock = Arc::new(ManualClock::new());
    let service = service(&mock, &clock);

    let hint = service.request_hint(&context(0), "mentor").await;
    assert_eq!(hint.source(), HintSource::Fallback);
    assert_eq!(hint.text(), "Compare neighbours");
}

#[tokio::test]
async fn test_rate_limit_spacing() {
    let mock = Arc::new(MockAssistant::replying("Remote"));
    let clock = Arc::new(ManualClock::new());
    let service = service(&mock, &clock);

    assert_eq!(
        service.request_hint(&context(0), "mentor").await.source(),
        HintSource::Ai
    );

    clock.advance(Duration::from_secs(2));
    assert_eq!(
        service.request_hint(&context(0), "mentor").await.source(),
        HintSource::Fallback
    );

    clock.advance(Duration::from_secs(3));
    assert_eq!(
        service.request_hint(&context(0), "mentor").await.source(),
        HintSource::Ai
    );
    assert_eq!(mock.hint_calls(), 2);
}

#[tokio::test]
async fn test_no_assistant_stays_local() {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());
    let service = HintService::new(HintPolicy::new(clock), None, Duration::from_secs(1));
    assert!(!service.remote_enabled());

    let hint = service.request_hint(&context(5), "mentor").await;
    assert_eq!(hint.source(), HintSource::Fallback);
    assert_eq!(hint.text(), "Double it");

    let local = service.evaluate_prompt("only a haiku on cyber", HAIKU_GOAL).await;
    assert_eq!(local, simulate_prompt_response("only a haiku on cyber", HAIKU_GOAL));
}

#[tokio::test]
async fn test_resolve_keeps_token() {
    let mut t = common::session();
    t.session.start(false).unwrap();
    t.session.enter_room(RoomId::Space).unwrap();
    let token = t.session.engine().current_token().unwrap();

    let mock = Arc::new(MockAssistant::replying("Tagged"));
    let clock = Arc::new(ManualClock::new());
    let service = service(&mock, &clock);
    let resolved = service
        .resolve(HintRequest::new(token, context(0), "admin"))
        .await;
    assert_eq!(resolved.token(), token);
    assert_eq!(resolved.hint().text(), "Tagged [admin L1]");
    t.session.shutdown().await;
}

#[tokio::test]
async fn test_evaluation_uses_assistant_then_falls_back() {
    let mock = Arc::new(MockAssistant::replying("unused"));
    let clock = Arc::new(ManualClock::new());
    let remote = service(&mock, &clock)
        .evaluate_prompt("anything", HAIKU_GOAL)
        .await;
    assert_eq!(remote.ai_response(), "mock reply");
    assert!(remote.meets_goal());

    let failing = Arc::new(MockAssistant::failing());
    let local = service(&failing, &clock)
        .evaluate_prompt("anything", HAIKU_GOAL)
        .await;
    assert!(!local.meets_goal());
    assert_eq!(failing.evaluation_calls(), 1);
}
