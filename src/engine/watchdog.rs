//! Loop-overrun watchdog.
//!
//! The scheduler resets the watchdog at the start of each tick and records a
//! named *epoch* after every step (each subsystem's `periodic`, the button
//! poll, each command's `execute`/`end`). When a tick takes longer than the
//! configured period the epochs show where the time went.

use std::time::Duration;

use indexmap::IndexMap;
use log::debug;

use crate::engine::time;


/// Tick timer with named epochs.
#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout: Duration,
    start: Duration,
    last_epoch: Duration,
    epochs: IndexMap<String, Duration>,
    elapsed: Option<Duration>,
}

impl Watchdog {
    /// Creates a watchdog that expires after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let now = time::now();
        Self {
            timeout,
            start: now,
            last_epoch: now,
            epochs: IndexMap::new(),
            elapsed: None,
        }
    }

    /// Starts a new measurement, discarding previous epochs.
    pub fn reset(&mut self) {
        let now = time::now();
        self.start = now;
        self.last_epoch = now;
        self.epochs.clear();
        self.elapsed = None;
    }

    /// Records the time since the previous epoch under `name`. Re-using a
    /// name replaces its entry.
    pub fn add_epoch(&mut self, name: impl Into<String>) {
        let now = time::now();
        self.epochs.insert(name.into(), now.saturating_sub(self.last_epoch));
        self.last_epoch = now;
    }

    /// Stops the measurement.
    pub fn disable(&mut self) {
        self.elapsed = Some(time::now().saturating_sub(self.start));
    }

    /// Duration of the measurement, up to now if it is still running.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
            .unwrap_or_else(|| time::now().saturating_sub(self.start))
    }

    /// Whether the measurement exceeded the timeout.
    pub fn is_expired(&self) -> bool {
        self.elapsed() > self.timeout
    }

    /// Recorded epochs, in order.
    pub fn epochs(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.epochs.iter().map(|(name, d)| (name.as_str(), *d))
    }

    /// Logs every epoch at `debug` level.
    pub fn print_epochs(&self) {
        for (name, duration) in self.epochs() {
            debug!("\t{name}: {:.6}s", duration.as_secs_f64());
        }
    }

    /// Changes the timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Current timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
