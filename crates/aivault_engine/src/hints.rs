//! Hint routing and pre-authored fallbacks.
//!
//! [`HintPolicy`] decides whether a hint request may go to the remote
//! assistant. Remote calls are spaced at least [`MIN_REMOTE_INTERVAL`]
//! apart on a monotonic [`Clock`]; anything else resolves locally to the
//! puzzle's own hint text.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::catalog::HintText;
use crate::clock::Clock;

/// Minimum spacing between remote hint calls.
pub const MIN_REMOTE_INTERVAL: Duration = Duration::from_secs(5);

/// Shown when a puzzle has no authored hints.
pub const GENERIC_HINT: &str = "Think carefully about the problem and try a different approach.";

/// Strongest hint level.
pub const MAX_HINT_LEVEL: u8 = 3;

/// What the assistant is told about the puzzle the player is stuck on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, derive_getters::Getters, derive_new::new)]
pub struct HintContext {
    title: String,
    description: String,
    #[getter(copy)]
    difficulty: u8,
    #[getter(copy)]
    attempts: u32,
    hints: Vec<HintText>,
}

/// Where a hint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HintSource {
    /// Generated by the remote assistant.
    Ai,
    /// Pre-authored catalog text.
    Fallback,
}

/// A hint ready to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Hint {
    #[getter(copy)]
    source: HintSource,
    text: String,
}

impl Hint {
    /// Hint produced by the assistant.
    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            source: HintSource::Ai,
            text: text.into(),
        }
    }

    /// Hint taken from the catalog.
    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            source: HintSource::Fallback,
            text: text.into(),
        }
    }
}

/// Hint strength for a puzzle attempted `attempts` times.
pub fn hint_level(attempts: u32) -> u8 {
    attempts
        .saturating_add(1)
        .min(u32::from(MAX_HINT_LEVEL)) as u8
}

/// Picks the authored hint at `level`, else the last authored hint, else
/// [`GENERIC_HINT`].
pub fn fallback_hint(hints: &[HintText], level: u8) -> Hint {
    let text = hints
        .iter()
        .find(|h| h.level() == level)
        .or_else(|| hints.last())
        .map(|h| h.text().clone())
        .unwrap_or_else(|| GENERIC_HINT.to_string());
    Hint::fallback(text)
}

/// Why a request stayed local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum FallbackReason {
    /// No remote provider is configured.
    NoProvider,
    /// A remote call was made less than the minimum interval ago.
    RateLimited,
}

/// Routing decision for one hint request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintRoute {
    /// Call the remote assistant once. Any failure falls back.
    Remote,
    /// Answer locally.
    Fallback(FallbackReason),
}

/// Rate limiter for remote hint calls.
#[derive(Debug, Clone)]
pub struct HintPolicy {
    clock: Arc<dyn Clock>,
    min_interval: Duration,
    last_remote_call: Option<Duration>,
}

impl HintPolicy {
    /// Creates a policy with the default interval.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_interval(clock, MIN_REMOTE_INTERVAL)
    }

    /// Creates a policy with a custom interval.
    pub fn with_interval(clock: Arc<dyn Clock>, min_interval: Duration) -> Self {
        Self {
            clock,
            min_interval,
            last_remote_call: None,
        }
    }

    /// Decides where a request goes. Routing to the remote side stamps the
    /// call time, whether or not the call later succeeds.
    #[instrument(skip(self))]
    pub fn route(&mut self, provider_configured: bool) -> HintRoute {
        if !provider_configured {
            return HintRoute::Fallback(FallbackReason::NoProvider);
        }
        let now = self.clock.now();
        if let Some(last) = self.last_remote_call
            && now.saturating_sub(last) < self.min_interval
        {
            debug!(
                since_last_ms = now.saturating_sub(last).as_millis() as u64,
                "Remote hint rate limited"
            );
            return HintRoute::Fallback(FallbackReason::RateLimited);
        }
        self.last_remote_call = Some(now);
        HintRoute::Remote
    }

    /// Resolves a request locally.
    pub fn fallback(&self, context: &HintContext, level: u8) -> Hint {
        fallback_hint(context.hints(), level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn hints() -> Vec<HintText> {
        vec![HintText::new(1, "nudge"), HintText::new(2, "guide")]
    }

    #[test]
    fn test_hint_level_caps_at_three() {
        assert_eq!(hint_level(0), 1);
        assert_eq!(hint_level(1), 2);
        assert_eq!(hint_level(2), 3);
        assert_eq!(hint_level(9), 3);
    }

    #[test]
    fn test_fallback_selection() {
        assert_eq!(fallback_hint(&hints(), 2).text(), "guide");
        assert_eq!(fallback_hint(&hints(), 3).text(), "guide");
        assert_eq!(fallback_hint(&[], 1).text(), GENERIC_HINT);
        assert_eq!(fallback_hint(&hints(), 1).source(), HintSource::Fallback);
    }

    #[test]
    fn test_route_spacing() {
        let clock = Arc::new(ManualClock::new());
        let mut policy = HintPolicy::new(clock.clone());

        assert_eq!(
            policy.route(false),
            HintRoute::Fallback(FallbackReason::NoProvider)
        );
        assert_eq!(policy.route(true), HintRoute::Remote);
        clock.advance(Duration::from_millis(4_999));
        assert_eq!(
            policy.route(true),
            HintRoute::Fallback(FallbackReason::RateLimited)
        );
        clock.advance(Duration::from_millis(1));
        assert_eq!(policy.route(true), HintRoute::Remote);
    }

    #[test]
    fn test_fallback_does_not_stamp() {
        let clock = Arc::new(ManualClock::new());
        let mut policy = HintPolicy::new(clock.clone());
        assert_eq!(policy.route(true), HintRoute::Remote);
        clock.advance(Duration::from_secs(3));
        policy.route(true);
        clock.advance(Duration::from_secs(2));
        assert_eq!(policy.route(true), HintRoute::Remote);
    }
}
