//! Reconnect delay schedule.

use perp_trader_core::ReconnectSettings;
use rand::Rng;
use std::time::Duration;

/// Exponential backoff with proportional jitter.
///
/// `delay_for(n)` yields `initial * multiplier^(n-1)` capped at `max`, then
/// perturbed by up to `±jitter` of itself. `max_attempts = None` retries forever.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter: f64,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ReconnectSettings::default())
    }
}

impl From<&ReconnectSettings> for RetryPolicy {
    fn from(settings: &ReconnectSettings) -> Self {
        Self {
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms.max(settings.initial_delay_ms)),
            multiplier: settings.multiplier.max(1.0),
            jitter: settings.jitter.clamp(0.0, 1.0),
            max_attempts: settings.max_attempts,
        }
    }
}

impl RetryPolicy {
    /// Constant delay with no jitter, retrying forever.
    #[must_use]
    pub const fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
            jitter: 0.0,
            max_attempts: None,
        }
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Whether another attempt is allowed after `attempt` failures.
    #[must_use]
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }

    /// Delay before the `attempt`-th retry (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        if self.jitter <= 0.0 {
            return Duration::from_secs_f64(capped);
        }

        let spread = capped * self.jitter;
        let offset = rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_secs_f64((capped + offset).max(0.0))
    }
}
