//! Hint budget and remote hint routing.

mod common;

use std::sync::Arc;
use std::time::Duration;

use aivault_engine::{
    FallbackReason, GENERIC_HINT, HintPolicy, HintRoute, HintSource, ManualClock, PathStore,
    RoomId, default_state, hint_level,
};
use common::Harness;

#[test]
fn test_budget_stops_at_total() {
    let mut store = PathStore::new(default_state(10));
    for _ in 0..10 {
        assert!(store.use_hint().unwrap());
    }
    assert!(!store.use_hint().unwrap());
    assert_eq!(store.hints_used(), 10);
    assert_eq!(store.hints_remaining(), 0);
}

#[test]
fn test_fallback_level_follows_attempts() {
    let mut h = Harness::new();
    h.engine.enter_room(&mut h.store, RoomId::Space).unwrap();
    let policy = HintPolicy::new(h.clock.clone());

    let context = h.engine.hint_context().unwrap();
    let first = policy.fallback(&context, hint_level(context.attempts()));
    assert_eq!(first.text(), "s1 nudge");
    assert_eq!(first.source(), HintSource::Fallback);

    for _ in 0..4 {
        h.engine
            .submit_answer(&mut h.store, "s1", &serde_json::json!("wrong"))
            .unwrap();
    }
    let context = h.engine.hint_context().unwrap();
    let strong = policy.fallback(&context, hint_level(context.attempts()));
    assert_eq!(strong.text(), "s1 strong");
}

#[test]
fn test_puzzle_without_hints_gets_generic_text() {
    let mut h = Harness::new();
    h.store
        .set("rooms.food.unlocked", serde_json::json!(true))
        .unwrap();
    h.engine.enter_room(&mut h.store, RoomId::Food).unwrap();
    let policy = HintPolicy::new(h.clock.clone());
    let context = h.engine.hint_context().unwrap();
    assert_eq!(policy.fallback(&context, 1).text(), GENERIC_HINT);
}

#[test]
fn test_remote_calls_are_spaced() {
    let clock = Arc::new(ManualClock::new());
    let mut policy = HintPolicy::new(clock.clone());

    assert_eq!(policy.route(true), HintRoute::Remote);
    clock.advance(Duration::from_secs(2));
    assert_eq!(
        policy.route(true),
        HintRoute::Fallback(FallbackReason::RateLimited)
    );
    clock.advance(Duration::from_secs(3));
    assert_eq!(policy.route(true), HintRoute::Remote);
}

#[test]
fn test_rate_limited_requests_do_not_extend_the_window() {
    let clock = Arc::new(ManualClock::new());
    let mut policy = HintPolicy::with_interval(clock.clone(), Duration::from_secs(10));

    assert_eq!(policy.route(true), HintRoute::Remote);
    for _ in 0..9 {
        clock.advance(Duration::from_secs(1));
        assert!(matches!(policy.route(true), HintRoute::Fallback(_)));
    }
    clock.advance(Duration::from_secs(1));
    assert_eq!(policy.route(true), HintRoute::Remote);
}

#[test]
fn test_no_provider_always_falls_back() {
    let clock = Arc::new(ManualClock::new());
    let mut policy = HintPolicy::new(clock);
    for _ in 0..3 {
        assert_eq!(
            policy.route(false),
            HintRoute::Fallback(FallbackReason::NoProvider)
        );
    }
}
