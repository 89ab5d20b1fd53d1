//! Command factories.
//!
//! Free functions for building common commands without naming their types:
//!
//! ```
//! use std::time::Duration;
//! use command_framework::{cmd, CommandExt, SubsystemRef};
//!
//! let intake = SubsystemRef::named("intake");
//! let routine = cmd::sequence(vec![
//!     cmd::run_once(|| {}, [intake.clone()]).boxed(),
//!     cmd::wait(Duration::from_millis(500)).boxed(),
//!     cmd::print("intake cycle done").boxed(),
//! ])
//! .unwrap();
//! # let _ = routine;
//! ```
//!
//! Group factories return `Err` instead of panicking when the children are
//! not a valid composition.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use crate::engine::command::Command;
use crate::engine::commands::{
    InstantCommand,
    PrintCommand,
    RunCommand,
    StartEndCommand,
    WaitCommand,
    WaitUntilCommand,
};
use crate::engine::compositions::{
    ConditionalCommand,
    DeferredCommand,
    ParallelCommandGroup,
    ParallelDeadlineGroup,
    ParallelRaceGroup,
    RepeatCommand,
    SelectCommand,
    SequentialCommandGroup,
};
use crate::engine::error::SchedulerResult;
use crate::engine::subsystem::SubsystemRef;


/// Does nothing and finishes immediately.
pub fn none() -> InstantCommand {
    InstantCommand::noop()
}

/// Does nothing and never finishes.
pub fn idle(requirements: impl IntoIterator<Item = SubsystemRef>) -> RunCommand {
    RunCommand::new(|| {}, requirements)
}

/// Runs `action` once and finishes.
pub fn run_once(action: impl FnMut() + 'static, requirements: impl IntoIterator<Item = SubsystemRef>) -> InstantCommand {
    InstantCommand::new(action, requirements)
}

/// Runs `action` every tick; never finishes.
pub fn run(action: impl FnMut() + 'static, requirements: impl IntoIterator<Item = SubsystemRef>) -> RunCommand {
    RunCommand::new(action, requirements)
}

/// Runs `start` on initialize and `end` on end; never finishes.
pub fn start_end(
    start: impl FnMut() + 'static,
    end: impl FnMut() + 'static,
    requirements: impl IntoIterator<Item = SubsystemRef>,
) -> StartEndCommand {
    StartEndCommand::new(start, end, requirements)
}

/// Logs `message` and finishes.
pub fn print(message: impl Into<String>) -> PrintCommand {
    PrintCommand::new(message)
}

/// Finishes after `duration`.
pub fn wait(duration: Duration) -> WaitCommand {
    WaitCommand::new(duration)
}

/// Finishes once `condition` returns true.
pub fn wait_until(condition: impl FnMut() -> bool + 'static) -> WaitUntilCommand {
    WaitUntilCommand::new(condition)
}

/// Runs `on_true` or `on_false` depending on `condition` at initialize.
pub fn either(
    on_true: impl Command + 'static,
    on_false: impl Command + 'static,
    condition: impl FnMut() -> bool + 'static,
) -> SchedulerResult<ConditionalCommand> {
    Ok(ConditionalCommand::try_new(on_true, on_false, condition)?)
}

/// Runs the command mapped to the key `selector` returns at initialize.
pub fn select<K>(
    commands: impl IntoIterator<Item = (K, Box<dyn Command>)>,
    selector: impl FnMut() -> K + 'static,
) -> SchedulerResult<SelectCommand<K>>
where
    K: Hash + Eq + Debug + 'static,
{
    Ok(SelectCommand::try_new(commands, selector)?)
}

/// Builds a fresh command from `supplier` at every initialize.
pub fn defer(
    supplier: impl FnMut() -> Box<dyn Command> + 'static,
    requirements: impl IntoIterator<Item = SubsystemRef>,
) -> DeferredCommand {
    DeferredCommand::new(supplier, requirements)
}

/// Runs `commands` one after another.
pub fn sequence(commands: Vec<Box<dyn Command>>) -> SchedulerResult<SequentialCommandGroup> {
    Ok(SequentialCommandGroup::try_new(commands)?)
}

/// Runs `commands` one after another, starting over after the last.
pub fn repeating_sequence(commands: Vec<Box<dyn Command>>) -> SchedulerResult<RepeatCommand> {
    Ok(RepeatCommand::try_new(sequence(commands)?)?)
}

/// Runs `commands` together until all finish.
pub fn parallel(commands: Vec<Box<dyn Command>>) -> SchedulerResult<ParallelCommandGroup> {
    Ok(ParallelCommandGroup::try_new(commands)?)
}

/// Runs `commands` together until any finishes.
pub fn race(commands: Vec<Box<dyn Command>>) -> SchedulerResult<ParallelRaceGroup> {
    Ok(ParallelRaceGroup::try_new(commands)?)
}

/// Runs `deadline` and `others` together until `deadline` finishes.
pub fn deadline(
    deadline: impl Command + 'static,
    others: Vec<Box<dyn Command>>,
) -> SchedulerResult<ParallelDeadlineGroup> {
    Ok(ParallelDeadlineGroup::try_new(Box::new(deadline), others)?)
}

