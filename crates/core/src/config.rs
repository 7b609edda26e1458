//! Scheduler configuration.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Runtime-adjustable knobs for the admission loop.
///
/// The loop reads the current value fresh on every tick, so changes take
/// effect at the next tick without restarting the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Max concurrently running (or start-requested) agent sessions
    pub max_concurrency: NonZeroUsize,

    /// Whether incomplete dependencies suppress eligibility
    pub blocking_enabled: bool,

    /// Interval between admission ticks
    #[serde(with = "duration_millis")]
    pub tick_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: NonZeroUsize::new(1).unwrap(),
            blocking_enabled: true,
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl SchedulerConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max concurrent sessions.
    pub fn with_max_concurrency(mut self, max: NonZeroUsize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Toggle dependency blocking.
    pub fn with_blocking(mut self, enabled: bool) -> Self {
        self.blocking_enabled = enabled;
        self
    }

    /// Set the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_conservative() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_concurrency.get(), 1);
        assert!(config.blocking_enabled);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn builder_overrides_stick() {
        let config = SchedulerConfig::new()
            .with_max_concurrency(NonZeroUsize::new(4).unwrap())
            .with_blocking(false)
            .with_tick_interval(Duration::from_millis(250));
        assert_eq!(config.max_concurrency.get(), 4);
        assert!(!config.blocking_enabled);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
    }

    #[test]
    fn config_survives_json_round_trip() {
        let config = SchedulerConfig::new().with_tick_interval(Duration::from_millis(500));
        let json = serde_json::to_string(&config).unwrap();
        let back: SchedulerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
