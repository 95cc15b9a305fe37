//! Room service settings.

use std::time::Duration;

/// Timing knobs for the room service and the reaper.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// A room idle for longer than this is retired by the reaper.
    pub inactivity_timeout: Duration,

    /// How often the reaper sweeps.
    pub sweep_interval: Duration,

    /// Upper bound on a single repository call.
    pub storage_timeout: Duration,

    /// Upper bound on a single gateway call.
    pub notify_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(10 * 60),
            sweep_interval: Duration::from_secs(60),
            storage_timeout: Duration::from_secs(10),
            notify_timeout: Duration::from_secs(10),
        }
    }
}

impl ServiceConfig {
    /// Replaces zero durations with their defaults.
    ///
    /// A zero interval would panic `tokio::time::interval`, and a zero
    /// timeout would fail every call.
    pub fn validated(self) -> Self {
        let defaults = Self::default();
        Self {
            inactivity_timeout: nonzero("inactivity_timeout", self.inactivity_timeout, defaults.inactivity_timeout),
            sweep_interval: nonzero("sweep_interval", self.sweep_interval, defaults.sweep_interval),
            storage_timeout: nonzero("storage_timeout", self.storage_timeout, defaults.storage_timeout),
            notify_timeout: nonzero("notify_timeout", self.notify_timeout, defaults.notify_timeout),
        }
    }
}

fn nonzero(name: &'static str, value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        tracing::warn!(setting = name, ?fallback, "zero duration, using default");
        fallback
    } else {
        value
    }
}
