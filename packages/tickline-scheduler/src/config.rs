use crate::error::SchedulerError;
use serde::Serialize;
use std::env;
use std::time::Duration;

/// Delay before the first tick, in milliseconds.
pub const ENV_INITIAL_DELAY_MS: &str = "TICKLINE_INITIAL_DELAY_MS";
/// Interval between ticks, in milliseconds.
pub const ENV_PERIOD_MS: &str = "TICKLINE_PERIOD_MS";

const DEFAULT_INITIAL_DELAY_MS: u64 = 0;
/// One host tick at 20 ticks per second.
const DEFAULT_PERIOD_MS: u64 = 50;

/// Longest initial delay or period accepted by [`SchedulerConfig::validate`]:
/// one year, well inside what every driver's clock can add to "now".
pub const MAX_PACING: Duration = Duration::from_secs(365 * 24 * 60 * 60);

fn env_u64(key: &str, default: u64) -> u64 {
    parse_u64(env::var(key).ok(), default)
}

fn parse_u64(value: Option<String>, default: u64) -> u64 {
    value
        .filter(|s| !s.is_empty())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Pacing requested from the tick driver when a scheduler subscribes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerConfig {
    pub initial_delay: Duration,
    pub period: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            period: Duration::from_millis(DEFAULT_PERIOD_MS),
        }
    }
}

impl SchedulerConfig {
    /// Build from `TICKLINE_INITIAL_DELAY_MS` / `TICKLINE_PERIOD_MS`.
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self {
            initial_delay: Duration::from_millis(env_u64(
                ENV_INITIAL_DELAY_MS,
                DEFAULT_INITIAL_DELAY_MS,
            )),
            period: Duration::from_millis(env_u64(ENV_PERIOD_MS, DEFAULT_PERIOD_MS)),
        }
    }

    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.period.is_zero() {
            return Err(SchedulerError::InvalidConfig(
                "tick period must be greater than zero".to_string(),
            ));
        }
        if self.period > MAX_PACING || self.initial_delay > MAX_PACING {
            return Err(SchedulerError::InvalidConfig(format!(
                "initial delay and period must not exceed {MAX_PACING:?}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_one_tick_without_delay() {
        let config = SchedulerConfig::default();
        assert_eq!(config.initial_delay, Duration::ZERO);
        assert_eq!(config.period, Duration::from_millis(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_period_is_rejected() {
        let config = SchedulerConfig::default().with_period(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(SchedulerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn unrepresentable_durations_are_rejected() {
        let long_period = SchedulerConfig::default().with_period(Duration::MAX);
        assert!(matches!(
            long_period.validate(),
            Err(SchedulerError::InvalidConfig(_))
        ));

        let long_delay = SchedulerConfig::default().with_initial_delay(Duration::MAX);
        assert!(matches!(
            long_delay.validate(),
            Err(SchedulerError::InvalidConfig(_))
        ));

        let at_limit = SchedulerConfig::default()
            .with_initial_delay(MAX_PACING)
            .with_period(MAX_PACING);
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn unset_env_key_uses_default() {
        assert_eq!(env_u64("TICKLINE_TEST_SURELY_UNSET_KEY", 17), 17);
    }

    #[test]
    fn env_values_are_trimmed_and_bad_ones_fall_back() {
        assert_eq!(parse_u64(None, 17), 17);
        assert_eq!(parse_u64(Some("abc".to_string()), 17), 17);
        assert_eq!(parse_u64(Some(String::new()), 17), 17);
        assert_eq!(parse_u64(Some("   ".to_string()), 17), 17);
        assert_eq!(parse_u64(Some("-5".to_string()), 17), 17);
        assert_eq!(parse_u64(Some(" 25 ".to_string()), 17), 25);
        assert_eq!(parse_u64(Some("0".to_string()), 17), 0);
    }
}
