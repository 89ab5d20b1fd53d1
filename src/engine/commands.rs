//! Basic commands built from closures.
//!
//! These are the leaves most behaviour is written with. Each takes its
//! requirements as any iterator of [`SubsystemRef`]s:
//!
//! ```
//! use command_framework::{InstantCommand, RunCommand, SubsystemRef};
//!
//! let drive = SubsystemRef::named("drive");
//! let stop = InstantCommand::new(|| {}, [drive.clone()]);
//! let hold = RunCommand::new(|| {}, [drive]);
//! # let _ = (stop, hold);
//! ```

use std::fmt;
use std::time::Duration;

use log::{debug, info};

use crate::engine::command::{Command, CommandHandle};
use crate::engine::requirements::{requirements, Requirements};
use crate::engine::subsystem::SubsystemRef;
use crate::engine::time::{self, Timer};


/// Command assembled from four closures, one per lifecycle phase.
pub struct FunctionalCommand {
    on_init: Box<dyn FnMut()>,
    on_execute: Box<dyn FnMut()>,
    on_end: Box<dyn FnMut(bool)>,
    is_finished: Box<dyn FnMut() -> bool>,
    requirements: Requirements,
}

impl FunctionalCommand {
    /// Creates a command from its lifecycle closures.
    pub fn new(
        on_init: impl FnMut() + 'static,
        on_execute: impl FnMut() + 'static,
        on_end: impl FnMut(bool) + 'static,
        is_finished: impl FnMut() -> bool + 'static,
        requirements: impl IntoIterator<Item = SubsystemRef>,
    ) -> Self {
        Self {
            on_init: Box::new(on_init),
            on_execute: Box::new(on_execute),
            on_end: Box::new(on_end),
            is_finished: Box::new(is_finished),
            requirements: self::requirements(requirements),
        }
    }
}

impl Command for FunctionalCommand {
    fn initialize(&mut self) {
        (self.on_init)()
    }

    fn execute(&mut self) {
        (self.on_execute)()
    }

    fn end(&mut self, interrupted: bool) {
        (self.on_end)(interrupted)
    }

    fn is_finished(&mut self) -> bool {
        (self.is_finished)()
    }

    fn requirements(&self) -> Requirements {
        self.requirements.clone()
    }
}

impl fmt::Debug for FunctionalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionalCommand")
            .field("requirements", &self.requirements)
            .finish_non_exhaustive()
    }
}

/// Runs an action once on initialize and finishes immediately.
pub struct InstantCommand {
    action: Box<dyn FnMut()>,
    requirements: Requirements,
}

impl InstantCommand {
    /// Creates a command running `action` once.
    pub fn new(action: impl FnMut() + 'static, requirements: impl IntoIterator<Item = SubsystemRef>) -> Self {
        Self {
            action: Box::new(action),
            requirements: self::requirements(requirements),
        }
    }

    /// A command that does nothing and finishes immediately.
    pub fn noop() -> Self {
        Self::new(|| {}, Requirements::new())
    }
}

impl Command for InstantCommand {
    fn initialize(&mut self) {
        (self.action)()
    }

    fn is_finished(&mut self) -> bool {
        true
    }

    fn requirements(&self) -> Requirements {
        self.requirements.clone()
    }
}

/// Runs an action every tick and never finishes on its own.
pub struct RunCommand {
    action: Box<dyn FnMut()>,
    requirements: Requirements,
}

impl RunCommand {
    /// Creates a command running `action` every tick.
    pub fn new(action: impl FnMut() + 'static, requirements: impl IntoIterator<Item = SubsystemRef>) -> Self {
        Self {
            action: Box::new(action),
            requirements: self::requirements(requirements),
        }
    }
}

impl Command for RunCommand {
    fn execute(&mut self) {
        (self.action)()
    }

    fn requirements(&self) -> Requirements {
        self.requirements.clone()
    }
}

/// Runs one action on initialize and another when ended. Never finishes on
/// its own.
pub struct StartEndCommand {
    on_start: Box<dyn FnMut()>,
    on_end: Box<dyn FnMut()>,
    requirements: Requirements,
}

impl StartEndCommand {
    /// Creates the command.
    pub fn new(
        on_start: impl FnMut() + 'static,
        on_end: impl FnMut() + 'static,
        requirements: impl IntoIterator<Item = SubsystemRef>,
    ) -> Self {
        Self {
            on_start: Box::new(on_start),
            on_end: Box::new(on_end),
            requirements: self::requirements(requirements),
        }
    }
}

impl Command for StartEndCommand {
    fn initialize(&mut self) {
        (self.on_start)()
    }

    fn end(&mut self, _interrupted: bool) {
        (self.on_end)()
    }

    fn requirements(&self) -> Requirements {
        self.requirements.clone()
    }
}

/// Finishes once the given duration has elapsed on the current clock.
///
/// Runs while disabled.
#[derive(Debug, Clone)]
pub struct WaitCommand {
    duration: Duration,
    timer: Timer,
}

impl WaitCommand {
    /// Creates a command waiting `duration`.
    pub fn new(duration: Duration) -> Self {
        Self { duration, timer: Timer::new() }
    }

    /// Time the command waits for.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Command for WaitCommand {
    fn initialize(&mut self) {
        self.timer.restart();
    }

    fn end(&mut self, _interrupted: bool) {
        self.timer.stop();
    }

    fn is_finished(&mut self) -> bool {
        self.timer.has_elapsed(self.duration)
    }

    fn runs_when_disabled(&self) -> bool {
        true
    }
}

/// Finishes once a condition becomes true.
///
/// Runs while disabled.
pub struct WaitUntilCommand {
    condition: Box<dyn FnMut() -> bool>,
}

impl WaitUntilCommand {
    /// Waits for `condition` to return `true`.
    pub fn new(condition: impl FnMut() -> bool + 'static) -> Self {
        Self { condition: Box::new(condition) }
    }

    /// Waits until the current clock reads at least `time`.
    pub fn at(time: Duration) -> Self {
        Self::new(move || time::now() >= time)
    }
}

impl Command for WaitUntilCommand {
    fn is_finished(&mut self) -> bool {
        (self.condition)()
    }

    fn runs_when_disabled(&self) -> bool {
        true
    }
}

/// Logs a message at `info` level and finishes immediately.
///
/// Runs while disabled.
#[derive(Debug, Clone)]
pub struct PrintCommand {
    message: String,
}

impl PrintCommand {
    /// Creates a command logging `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl Command for PrintCommand {
    fn initialize(&mut self) {
        info!("{}", self.message);
    }

    fn is_finished(&mut self) -> bool {
        true
    }

    fn runs_when_disabled(&self) -> bool {
        true
    }
}

/// Schedules other commands on initialize and finishes immediately.
///
/// The scheduled commands run independently: they are not ended when this
/// command ends and their requirements are not claimed by it. Runs while
/// disabled.
#[derive(Debug, Clone)]
pub struct ScheduleCommand {
    commands: Vec<CommandHandle>,
}

impl ScheduleCommand {
    /// Creates a command scheduling each of `commands`.
    pub fn new(commands: impl IntoIterator<Item = CommandHandle>) -> Self {
        Self { commands: commands.into_iter().collect() }
    }
}

impl Command for ScheduleCommand {
    fn initialize(&mut self) {
        for command in &self.commands {
            if let Err(err) = command.schedule() {
                debug!("ScheduleCommand could not schedule `{}`: {err}", command.name());
            }
        }
    }

    fn is_finished(&mut self) -> bool {
        true
    }

    fn runs_when_disabled(&self) -> bool {
        true
    }
}
