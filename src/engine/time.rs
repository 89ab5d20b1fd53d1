//! Time source for timers, watchdogs and debouncers.
//!
//! All time in the scheduler is read through the per-thread current
//! [`Clock`]. By default this is a [`MonotonicClock`]; tests and simulations
//! install a [`ManualClock`] and advance it explicitly:
//!
//! ```
//! use std::time::Duration;
//! use command_framework::engine::time;
//! use command_framework::ManualClock;
//!
//! let clock = ManualClock::new();
//! time::set_clock(clock.clone());
//! clock.advance(Duration::from_millis(20));
//! assert_eq!(time::now(), Duration::from_millis(20));
//! time::reset_clock();
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};


/// A source of monotonically non-decreasing timestamps.
pub trait Clock {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

/// Wall-clock backed [`Clock`] measuring time since its creation.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose origin is the current instant.
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually stepped [`Clock`].
///
/// Clones share the same underlying time, so a test can keep one clone and
/// install another with [`set_clock`].
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    /// Creates a clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward by `step`.
    pub fn advance(&self, step: Duration) {
        self.now.set(self.now.get() + step);
    }

    /// Sets the absolute time. Callers are responsible for never moving it
    /// backwards.
    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

thread_local! {
    static CLOCK: RefCell<Rc<dyn Clock>> = RefCell::new(Rc::new(MonotonicClock::new()));
}

/// Current time on this thread's clock.
pub fn now() -> Duration {
    let clock = CLOCK.with(|c| c.borrow().clone());
    clock.now()
}

/// Installs `clock` as this thread's time source.
pub fn set_clock(clock: impl Clock + 'static) {
    CLOCK.with(|c| *c.borrow_mut() = Rc::new(clock));
}

/// Restores a fresh [`MonotonicClock`] as this thread's time source.
pub fn reset_clock() {
    set_clock(MonotonicClock::new());
}

/// Stopwatch measuring accumulated running time on the current clock.
///
/// ## Semantics
/// * A new timer is stopped with zero elapsed time.
/// * `start` begins accumulating; `stop` freezes the value.
/// * `restart` zeroes and starts in one step.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    started_at: Option<Duration>,
    accumulated: Duration,
}

impl Timer {
    /// Creates a stopped timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the timer. Has no effect if it is already running.
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(now());
        }
    }

    /// Stops the timer, keeping the elapsed time.
    pub fn stop(&mut self) {
        if let Some(started_at) = self.started_at.take() {
            self.accumulated += now().saturating_sub(started_at);
        }
    }

    /// Zeroes the elapsed time without changing whether the timer runs.
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        if self.started_at.is_some() {
            self.started_at = Some(now());
        }
    }

    /// Zeroes the elapsed time and starts the timer.
    pub fn restart(&mut self) {
        self.accumulated = Duration::ZERO;
        self.started_at = Some(now());
    }

    /// Whether the timer is running.
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Total elapsed running time.
    pub fn elapsed(&self) -> Duration {
        match self.started_at {
            Some(started_at) => self.accumulated + now().saturating_sub(started_at),
            None => self.accumulated,
        }
    }

    /// Whether at least `period` has elapsed.
    pub fn has_elapsed(&self, period: Duration) -> bool {
        self.elapsed() >= period
    }
}
