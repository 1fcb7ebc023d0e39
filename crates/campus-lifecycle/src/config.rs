//! Lifecycle configuration and the init state machine.

use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::warn;

// ---------------------------------------------------------------------------
// LifecycleConfig
// ---------------------------------------------------------------------------

/// Timing for the recurring refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Period between refreshes while authenticated. Default: 15 minutes.
    pub refresh_interval: Duration,

    /// Upper bound of the random delay added to the *first* refresh of each
    /// schedule, so clients started together don't renew in lock step.
    /// Default: 30 seconds.
    pub initial_jitter: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Self::DEFAULT_REFRESH_INTERVAL,
            initial_jitter: Duration::from_secs(30),
        }
    }
}

impl LifecycleConfig {
    pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);
    pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
    /// How long before a token lapses the keep-alive renews it.
    pub const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

    pub fn with_interval(refresh_interval: Duration) -> Self {
        Self {
            refresh_interval,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.initial_jitter = Duration::ZERO;
        self
    }

    /// Clamps out-of-range values:
    /// - `refresh_interval` raised to [`Self::MIN_REFRESH_INTERVAL`]
    /// - `initial_jitter` capped at `refresh_interval`
    pub fn validated(mut self) -> Self {
        if self.refresh_interval < Self::MIN_REFRESH_INTERVAL {
            warn!(
                interval = ?self.refresh_interval,
                min = ?Self::MIN_REFRESH_INTERVAL,
                "refresh_interval below minimum, clamping"
            );
            self.refresh_interval = Self::MIN_REFRESH_INTERVAL;
        }
        if self.initial_jitter > self.refresh_interval {
            self.initial_jitter = self.refresh_interval;
        }
        self
    }

    /// Delay before the first refresh of a new schedule.
    pub(crate) fn first_delay(&self) -> Duration {
        let max_ms = u64::try_from(self.initial_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = if max_ms > 0 {
            Duration::from_millis(rand::rng().random_range(0..max_ms))
        } else {
            Duration::ZERO
        };
        self.refresh_interval + jitter
    }

    /// When to refresh next: `delay` from `now`, or [`Self::EXPIRY_MARGIN`]
    /// before the token lapses if that comes first. Never sooner than
    /// [`Self::MIN_REFRESH_INTERVAL`] from `now`.
    pub(crate) fn refresh_deadline(
        now: Instant,
        delay: Duration,
        expires_at: Option<Instant>,
    ) -> Instant {
        let planned = now + delay;
        let Some(expires_at) = expires_at else {
            return planned;
        };
        let early = expires_at
            .checked_sub(Self::EXPIRY_MARGIN)
            .unwrap_or(now)
            .max(now + Self::MIN_REFRESH_INTERVAL);
        planned.min(early)
    }
}

// ---------------------------------------------------------------------------
// InitState
// ---------------------------------------------------------------------------

/// Controller initialization state.
///
/// ```text
/// Uninitialized → Initializing → Ready
/// ```
///
/// `Ready` is entered once per controller and never left. UI that depends
/// on knowing whether anyone is signed in shows its placeholder until then.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitState {
    #[default]
    Uninitialized,
    /// The startup restore attempt is running.
    Initializing,
    Ready,
}

impl InitState {
    /// The only state reachable from this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Uninitialized => Some(Self::Initializing),
            Self::Initializing => Some(Self::Ready),
            Self::Ready => None,
        }
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }

    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }
}

impl std::fmt::Display for InitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Initializing => write!(f, "Initializing"),
            Self::Ready => write!(f, "Ready"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interval_is_fifteen_minutes() {
        let cfg = LifecycleConfig::default();
        assert_eq!(cfg.refresh_interval, Duration::from_secs(900));
    }

    #[test]
    fn test_validated_clamps_zero_interval() {
        let cfg = LifecycleConfig::with_interval(Duration::ZERO).validated();

        assert_eq!(cfg.refresh_interval, LifecycleConfig::MIN_REFRESH_INTERVAL);
        assert!(cfg.initial_jitter <= cfg.refresh_interval);
    }

    #[test]
    fn test_first_delay_within_jitter_bounds() {
        let cfg = LifecycleConfig::default();

        for _ in 0..100 {
            let delay = cfg.first_delay();
            assert!(delay >= cfg.refresh_interval);
            assert!(delay < cfg.refresh_interval + cfg.initial_jitter);
        }
    }

    #[test]
    fn test_first_delay_without_jitter_is_exact() {
        let cfg = LifecycleConfig::default().without_jitter();
        assert_eq!(cfg.first_delay(), cfg.refresh_interval);
    }

    #[test]
    fn test_refresh_deadline_without_expiry_uses_delay() {
        let now = Instant::now();
        let deadline = LifecycleConfig::refresh_deadline(now, Duration::from_secs(900), None);

        assert_eq!(deadline, now + Duration::from_secs(900));
    }

    #[test]
    fn test_refresh_deadline_short_token_renews_before_expiry() {
        let now = Instant::now();
        let expires_at = now + Duration::from_secs(300);

        let deadline =
            LifecycleConfig::refresh_deadline(now, Duration::from_secs(900), Some(expires_at));

        assert_eq!(deadline, expires_at - LifecycleConfig::EXPIRY_MARGIN);
    }

    #[test]
    fn test_refresh_deadline_long_token_keeps_interval() {
        let now = Instant::now();
        let expires_at = now + Duration::from_secs(3600);

        let deadline =
            LifecycleConfig::refresh_deadline(now, Duration::from_secs(900), Some(expires_at));

        assert_eq!(deadline, now + Duration::from_secs(900));
    }

    #[test]
    fn test_refresh_deadline_nearly_lapsed_token_waits_minimum() {
        let now = Instant::now();
        let expires_at = now + Duration::from_secs(5);

        let deadline =
            LifecycleConfig::refresh_deadline(now, Duration::from_secs(900), Some(expires_at));

        assert_eq!(deadline, now + LifecycleConfig::MIN_REFRESH_INTERVAL);
    }

    #[test]
    fn test_init_state_is_strictly_ordered() {
        assert!(InitState::Uninitialized.can_transition_to(InitState::Initializing));
        assert!(InitState::Initializing.can_transition_to(InitState::Ready));
        assert!(!InitState::Uninitialized.can_transition_to(InitState::Ready));
        assert!(!InitState::Ready.can_transition_to(InitState::Initializing));
        assert_eq!(InitState::Ready.next(), None);
    }

    #[test]
    fn test_init_state_display() {
        assert_eq!(InitState::Initializing.to_string(), "Initializing");
    }
}
