//! Edge-detected conditions that schedule and cancel commands.
//!
//! A [`Trigger`] wraps a boolean condition and an [`EventLoop`]. Binding a
//! command adds an action to the loop that samples the condition on every
//! poll and compares it with the previous sample:
//!
//! | Binding | Rising edge | Falling edge |
//! |---------|-------------|--------------|
//! | `on_true` | schedule | |
//! | `on_false` | | schedule |
//! | `on_change` | schedule | schedule |
//! | `while_true` | schedule | cancel |
//! | `while_false` | cancel | schedule |
//! | `toggle_on_true` | toggle | |
//! | `toggle_on_false` | | toggle |
//!
//! The first "previous" sample is taken when the binding is made, so a
//! condition that is already true when bound does not fire `on_true` until
//! it has gone false and back.
//!
//! By default triggers bind to the scheduler's default button loop, which
//! the scheduler polls once per tick before running commands.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use log::debug;

use crate::engine::command::CommandHandle;
use crate::engine::event_loop::EventLoop;
use crate::engine::scheduler::CommandScheduler;
use crate::engine::time;


type Condition = Rc<dyn Fn() -> bool>;

fn schedule(command: &CommandHandle) {
    // the scheduler logs its own errors
    if let Err(err) = CommandScheduler::instance().schedule(command) {
        debug!("trigger binding could not schedule `{}`: {err}", command.name());
    }
}

fn cancel(command: &CommandHandle) {
    CommandScheduler::instance().cancel(command);
}

fn toggle(command: &CommandHandle) {
    if CommandScheduler::instance().is_scheduled(command) {
        cancel(command);
    } else {
        schedule(command);
    }
}

/// Boolean condition bound to an event loop.
#[derive(Clone)]
pub struct Trigger {
    event_loop: EventLoop,
    condition: Condition,
}

impl Trigger {
    /// Creates a trigger on the scheduler's default button loop.
    pub fn new(condition: impl Fn() -> bool + 'static) -> Self {
        Self::with_loop(CommandScheduler::instance().default_button_loop(), condition)
    }

    /// Creates a trigger polled by `event_loop`.
    pub fn with_loop(event_loop: EventLoop, condition: impl Fn() -> bool + 'static) -> Self {
        Self { event_loop, condition: Rc::new(condition) }
    }

    /// Current value of the condition.
    pub fn get(&self) -> bool {
        (self.condition)()
    }

    /// Event loop the trigger binds to.
    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// Binds an edge handler called with `(previous, current)` on every poll.
    fn bind_edges(&self, mut on_sample: impl FnMut(bool, bool) + 'static) -> Self {
        let condition = self.condition.clone();
        let mut previous = condition();
        self.event_loop.bind(move || {
            let current = condition();
            on_sample(previous, current);
            previous = current;
        });
        self.clone()
    }

    /// Schedules `command` when the condition changes to true.
    pub fn on_true(&self, command: CommandHandle) -> Self {
        self.bind_edges(move |previous, current| {
            if !previous && current {
                schedule(&command);
            }
        })
    }

    /// Schedules `command` when the condition changes to false.
    pub fn on_false(&self, command: CommandHandle) -> Self {
        self.bind_edges(move |previous, current| {
            if previous && !current {
                schedule(&command);
            }
        })
    }

    /// Schedules `command` whenever the condition changes.
    pub fn on_change(&self, command: CommandHandle) -> Self {
        self.bind_edges(move |previous, current| {
            if previous != current {
                schedule(&command);
            }
        })
    }

    /// Schedules `command` when the condition changes to true and cancels it
    /// when the condition changes to false.
    pub fn while_true(&self, command: CommandHandle) -> Self {
        self.bind_edges(move |previous, current| {
            if !previous && current {
                schedule(&command);
            } else if previous && !current {
                cancel(&command);
            }
        })
    }

    /// Schedules `command` when the condition changes to false and cancels
    /// it when the condition changes to true.
    pub fn while_false(&self, command: CommandHandle) -> Self {
        self.bind_edges(move |previous, current| {
            if previous && !current {
                schedule(&command);
            } else if !previous && current {
                cancel(&command);
            }
        })
    }

    /// Toggles `command` when the condition changes to true.
    pub fn toggle_on_true(&self, command: CommandHandle) -> Self {
        self.bind_edges(move |previous, current| {
            if !previous && current {
                toggle(&command);
            }
        })
    }

    /// Toggles `command` when the condition changes to false.
    pub fn toggle_on_false(&self, command: CommandHandle) -> Self {
        self.bind_edges(move |previous, current| {
            if previous && !current {
                toggle(&command);
            }
        })
    }

    /// True when both conditions are true. Uses this trigger's loop.
    pub fn and(&self, other: &Trigger) -> Trigger {
        let (a, b) = (self.condition.clone(), other.condition.clone());
        Trigger::with_loop(self.event_loop.clone(), move || a() && b())
    }

    /// True when either condition is true. Uses this trigger's loop.
    pub fn or(&self, other: &Trigger) -> Trigger {
        let (a, b) = (self.condition.clone(), other.condition.clone());
        Trigger::with_loop(self.event_loop.clone(), move || a() || b())
    }

    /// Inverted condition.
    pub fn negate(&self) -> Trigger {
        let a = self.condition.clone();
        Trigger::with_loop(self.event_loop.clone(), move || !a())
    }

    /// True only on the sample where the condition changes to true.
    pub fn rising(&self) -> Trigger {
        let a = self.condition.clone();
        let previous = Cell::new(a());
        Trigger::with_loop(self.event_loop.clone(), move || {
            let present = a();
            let edge = present && !previous.get();
            previous.set(present);
            edge
        })
    }

    /// True only on the sample where the condition changes to false.
    pub fn falling(&self) -> Trigger {
        let a = self.condition.clone();
        let previous = Cell::new(a());
        Trigger::with_loop(self.event_loop.clone(), move || {
            let present = a();
            let edge = !present && previous.get();
            previous.set(present);
            edge
        })
    }

    /// Condition filtered through a [`Debouncer`].
    pub fn debounce(&self, debounce_time: Duration, kind: DebounceType) -> Trigger {
        let a = self.condition.clone();
        let debouncer = RefCell::new(Debouncer::new(debounce_time, kind));
        Trigger::with_loop(self.event_loop.clone(), move || {
            debouncer.borrow_mut().calculate(a())
        })
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("event_loop", &self.event_loop)
            .finish_non_exhaustive()
    }
}

/// Which input changes a [`Debouncer`] delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebounceType {
    /// Delay false → true changes.
    Rising,
    /// Delay true → false changes.
    Falling,
    /// Delay changes in both directions.
    Both,
}

/// Suppresses input changes shorter than a debounce time.
///
/// The output follows the input only after the input has differed from the
/// baseline for at least the debounce time. For [`DebounceType::Rising`]
/// the baseline is `false`, for [`DebounceType::Falling`] it is `true`, and
/// for [`DebounceType::Both`] it follows the last accepted value.
#[derive(Debug, Clone)]
pub struct Debouncer {
    debounce_time: Duration,
    kind: DebounceType,
    baseline: bool,
    changed_at: Duration,
}

impl Debouncer {
    /// Creates a debouncer.
    pub fn new(debounce_time: Duration, kind: DebounceType) -> Self {
        Self {
            debounce_time,
            kind,
            baseline: kind == DebounceType::Falling,
            changed_at: time::now(),
        }
    }

    fn reset_timer(&mut self) {
        self.changed_at = time::now();
    }

    fn has_elapsed(&self) -> bool {
        time::now().saturating_sub(self.changed_at) >= self.debounce_time
    }

    /// Feeds one input sample and returns the debounced value.
    pub fn calculate(&mut self, input: bool) -> bool {
        if input == self.baseline {
            self.reset_timer();
        }

        if self.has_elapsed() {
            if self.kind == DebounceType::Both {
                self.baseline = input;
                self.reset_timer();
            }
            input
        } else {
            self.baseline
        }
    }
}
