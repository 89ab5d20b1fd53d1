//! # Command Lifecycle Contract
//!
//! This module defines the [`Command`] trait, the shared [`CommandHandle`]
//! used wherever the scheduler needs command identity, and the [`CommandExt`]
//! decorator methods.
//!
//! ## Lifecycle
//!
//! ```text
//!   Idle ──schedule──▶ Initialized ──run──▶ Running ──finished/cancel──▶ Idle
//!          initialize()              execute()         end(interrupted)
//!                                    is_finished()
//! ```
//!
//! * `initialize` is called exactly once per activation, synchronously
//!   inside the scheduling call.
//! * `execute` and `is_finished` are called once per tick while scheduled.
//! * `end(interrupted)` is called exactly once per activation;
//!   `interrupted` is `false` only when the command left because
//!   `is_finished` returned `true`.
//!
//! ## Ownership
//!
//! Commands are plain values. Compositions take children by value, which
//! makes ownership transfer a move. Anything that needs a command's
//! *identity* (the scheduler, trigger bindings, default commands, proxies)
//! holds a [`CommandHandle`]. A handle may itself be composed; doing so
//! flags it so that it can no longer be scheduled or composed again.
//!
//! ## Invariants
//!
//! - Every method must return promptly. Waiting is modelled as
//!   `is_finished` returning `false` across ticks.
//! - A composed handle is never scheduled directly.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::engine::commands::{InstantCommand, WaitCommand, WaitUntilCommand};
use crate::engine::compositions::{
    ConditionalCommand,
    ParallelCommandGroup,
    ParallelDeadlineGroup,
    ParallelRaceGroup,
    ProxyCommand,
    RepeatCommand,
    SequentialCommandGroup,
    WrapperCommand,
};
use crate::engine::error::{CompositionError, SchedulerResult};
use crate::engine::requirements::Requirements;
use crate::engine::scheduler::CommandScheduler;
use crate::engine::subsystem::SubsystemRef;
use crate::engine::telemetry::{TelemetrySink, TelemetryValue};
use crate::engine::types::{next_command_id, short_type_name, CommandID, InterruptionBehavior, ScheduleOutcome};


/// A unit of behaviour driven by the scheduler.
///
/// Every method has a default, so a command only overrides the phases it
/// cares about. The defaults describe a command that does nothing, requires
/// nothing and never finishes.

pub trait Command {
    /// Called once when the command becomes scheduled.
    fn initialize(&mut self) {}

    /// Called every tick while the command is scheduled.
    fn execute(&mut self) {}

    /// Called once when the command stops being scheduled.
    fn end(&mut self, _interrupted: bool) {}

    /// Whether the command has completed. Checked after each `execute`.
    fn is_finished(&mut self) -> bool {
        false
    }

    /// Subsystems this command needs exclusive access to.
    fn requirements(&self) -> Requirements {
        Requirements::new()
    }

    /// Whether the command keeps running while the robot is disabled.
    fn runs_when_disabled(&self) -> bool {
        false
    }

    /// Policy applied when a conflicting command is scheduled.
    fn interruption_behavior(&self) -> InterruptionBehavior {
        InterruptionBehavior::CancelSelf
    }

    /// Display name used in logs, watchdog epochs and telemetry.
    fn name(&self) -> String {
        short_type_name::<Self>()
    }

    /// Whether `subsystem` is among this command's requirements.
    fn has_requirement(&self, subsystem: &SubsystemRef) -> bool {
        self.requirements().contains(subsystem)
    }

    /// Claims the command for a composition.
    ///
    /// Plain values are moved into their composition and need no
    /// bookkeeping. [`CommandHandle`] overrides this to flag the shared
    /// command and to refuse handles that are scheduled or already composed.
    fn mark_composed(&mut self) -> Result<(), CompositionError> {
        Ok(())
    }

    /// Undoes [`mark_composed`](Command::mark_composed) when the composition
    /// it was claimed for could not be built.
    fn unmark_composed(&mut self) {}
}

impl Command for Box<dyn Command> {
    fn initialize(&mut self) {
        (**self).initialize()
    }

    fn execute(&mut self) {
        (**self).execute()
    }

    fn end(&mut self, interrupted: bool) {
        (**self).end(interrupted)
    }

    fn is_finished(&mut self) -> bool {
        (**self).is_finished()
    }

    fn requirements(&self) -> Requirements {
        (**self).requirements()
    }

    fn runs_when_disabled(&self) -> bool {
        (**self).runs_when_disabled()
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        (**self).interruption_behavior()
    }

    fn name(&self) -> String {
        (**self).name()
    }

    fn has_requirement(&self, subsystem: &SubsystemRef) -> bool {
        (**self).has_requirement(subsystem)
    }

    fn mark_composed(&mut self) -> Result<(), CompositionError> {
        (**self).mark_composed()
    }

    fn unmark_composed(&mut self) {
        (**self).unmark_composed()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handles
// ─────────────────────────────────────────────────────────────────────────────

struct HandleInner {
    id: CommandID,
    composed: Cell<bool>,
    command: RefCell<Box<dyn Command>>,
}

/// Shared, identity-carrying reference to a command.
///
/// ## Identity
/// Each handle created with [`CommandHandle::new`] gets a fresh
/// [`CommandID`]. Clones share the command and its identity, so a command
/// can be bound to several triggers and still be "the same" command to the
/// scheduler.
///
/// ## Composition
/// A handle implements [`Command`] and may be placed in a composition. The
/// first composition flags it as composed; from then on it can neither be
/// scheduled on its own nor composed again.

#[derive(Clone)]
pub struct CommandHandle {
    inner: Rc<HandleInner>,
}

impl CommandHandle {
    /// Wraps a command value in a new handle.
    pub fn new<C: Command + 'static>(command: C) -> Self {
        Self::from_boxed(Box::new(command))
    }

    /// Wraps an already boxed command in a new handle.
    pub fn from_boxed(command: Box<dyn Command>) -> Self {
        Self {
            inner: Rc::new(HandleInner {
                id: next_command_id(),
                composed: Cell::new(false),
                command: RefCell::new(command),
            }),
        }
    }

    /// Identity of the command.
    #[inline]
    pub fn id(&self) -> CommandID {
        self.inner.id
    }

    /// Whether the handle belongs to a composition.
    #[inline]
    pub fn is_composed(&self) -> bool {
        self.inner.composed.get()
    }

    pub(crate) fn set_composed(&self, composed: bool) {
        self.inner.composed.set(composed);
    }

    /// Name of the wrapped command.
    ///
    /// Falls back to `Command#<id>` while the command is mutably borrowed,
    /// i.e. when asked from inside one of its own lifecycle methods.
    pub fn name(&self) -> String {
        match self.inner.command.try_borrow() {
            Ok(command) => command.name(),
            Err(_) => format!("Command#{}", self.inner.id),
        }
    }

    /// Runs `f` with exclusive access to the wrapped command.
    ///
    /// # Panics
    /// If the command is already mutably borrowed, which happens when a
    /// command's own lifecycle method re-enters it through the scheduler.
    pub(crate) fn with_command<R>(&self, f: impl FnOnce(&mut dyn Command) -> R) -> R {
        let mut command = self.inner.command.borrow_mut();
        f(command.as_mut())
    }

    pub(crate) fn with_command_ref<R>(&self, f: impl FnOnce(&dyn Command) -> R) -> R {
        let command = self.inner.command.borrow();
        f(command.as_ref())
    }

    /// Schedules the command on this thread's scheduler.
    pub fn schedule(&self) -> SchedulerResult<ScheduleOutcome> {
        CommandScheduler::instance().schedule(self)
    }

    /// Cancels the command on this thread's scheduler.
    pub fn cancel(&self) {
        CommandScheduler::instance().cancel(self);
    }

    /// Whether the command is scheduled on this thread's scheduler.
    pub fn is_scheduled(&self) -> bool {
        CommandScheduler::instance().is_scheduled(self)
    }

    /// Publishes `.name`, `running`, `.isParented`, `interruptBehavior` and
    /// `runsWhenDisabled` under `<name>/`.
    pub fn publish_telemetry(&self, sink: &mut dyn TelemetrySink) {
        let name = self.name();
        let (behavior, runs_when_disabled) =
            self.with_command_ref(|c| (c.interruption_behavior(), c.runs_when_disabled()));

        sink.publish(&format!("{name}/.name"), TelemetryValue::Str(name.clone()));
        sink.publish(&format!("{name}/running"), TelemetryValue::Bool(self.is_scheduled()));
        sink.publish(&format!("{name}/.isParented"), TelemetryValue::Bool(self.is_composed()));
        sink.publish(
            &format!("{name}/interruptBehavior"),
            TelemetryValue::Str(behavior.as_str().to_string()),
        );
        sink.publish(&format!("{name}/runsWhenDisabled"), TelemetryValue::Bool(runs_when_disabled));
    }
}

impl Command for CommandHandle {
    fn initialize(&mut self) {
        self.with_command(|c| c.initialize())
    }

    fn execute(&mut self) {
        self.with_command(|c| c.execute())
    }

    fn end(&mut self, interrupted: bool) {
        self.with_command(|c| c.end(interrupted))
    }

    fn is_finished(&mut self) -> bool {
        self.with_command(|c| c.is_finished())
    }

    fn requirements(&self) -> Requirements {
        self.with_command_ref(|c| c.requirements())
    }

    fn runs_when_disabled(&self) -> bool {
        self.with_command_ref(|c| c.runs_when_disabled())
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        self.with_command_ref(|c| c.interruption_behavior())
    }

    fn name(&self) -> String {
        CommandHandle::name(self)
    }

    fn mark_composed(&mut self) -> Result<(), CompositionError> {
        if self.is_composed() {
            return Err(CompositionError::AlreadyComposed { name: self.name() });
        }
        if CommandScheduler::instance().is_scheduled(self) {
            return Err(CompositionError::ScheduledCommand { name: self.name() });
        }
        self.set_composed(true);
        Ok(())
    }

    fn unmark_composed(&mut self) {
        self.set_composed(false);
    }
}

impl PartialEq for CommandHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for CommandHandle {}

impl fmt::Debug for CommandHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHandle")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("composed", &self.is_composed())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decorators
// ─────────────────────────────────────────────────────────────────────────────

fn compose<T>(built: Result<T, CompositionError>) -> T {
    match built {
        Ok(command) => command,
        Err(err) => panic!("{err}"),
    }
}

/// Decorator methods available on every command.
///
/// Each decorator consumes the command and returns a composition owning it.
///
/// # Panics
/// Decorators that build a group panic when the resulting group would be
/// invalid: the children share a subsystem, or a [`CommandHandle`] involved
/// is already composed or currently scheduled. The fallible equivalents are
/// the `try_new` constructors of the composition types and the functions in
/// [`cmd`](crate::cmd).

pub trait CommandExt: Command + Sized + 'static {
    /// Boxes the command for use in heterogeneous collections.
    fn boxed(self) -> Box<dyn Command> {
        Box::new(self)
    }

    /// Wraps the command in a new [`CommandHandle`].
    fn into_handle(self) -> CommandHandle {
        CommandHandle::new(self)
    }

    /// Ends the command (interrupted) once `timeout` has elapsed.
    fn with_timeout(self, timeout: Duration) -> ParallelRaceGroup {
        self.race_with(WaitCommand::new(timeout))
    }

    /// Ends the command (interrupted) once `condition` becomes true.
    fn until(self, condition: impl FnMut() -> bool + 'static) -> ParallelRaceGroup {
        self.race_with(WaitUntilCommand::new(condition))
    }

    /// Ends the command (interrupted) as soon as `condition` becomes false.
    fn only_while(self, mut condition: impl FnMut() -> bool + 'static) -> ParallelRaceGroup {
        self.until(move || !condition())
    }

    /// Skips the command when `condition` is true at initialization.
    fn unless(self, condition: impl FnMut() -> bool + 'static) -> ConditionalCommand {
        ConditionalCommand::new(InstantCommand::noop(), self, condition)
    }

    /// Runs the command only when `condition` is true at initialization.
    fn only_if(self, mut condition: impl FnMut() -> bool + 'static) -> ConditionalCommand {
        self.unless(move || !condition())
    }

    /// Runs `before` first, then this command.
    fn before_starting(self, before: impl Command + 'static) -> SequentialCommandGroup {
        compose(SequentialCommandGroup::try_new(vec![Box::new(before), self.boxed()]))
    }

    /// Runs this command, then `next`.
    fn and_then(self, next: impl Command + 'static) -> SequentialCommandGroup {
        compose(SequentialCommandGroup::try_new(vec![self.boxed(), Box::new(next)]))
    }

    /// Runs this command and `other` in parallel until both finish.
    fn along_with(self, other: impl Command + 'static) -> ParallelCommandGroup {
        compose(ParallelCommandGroup::try_new(vec![self.boxed(), Box::new(other)]))
    }

    /// Runs this command and `other` in parallel until either finishes.
    fn race_with(self, other: impl Command + 'static) -> ParallelRaceGroup {
        compose(ParallelRaceGroup::try_new(vec![self.boxed(), Box::new(other)]))
    }

    /// Runs `other` alongside this command, interrupting it when this
    /// command finishes.
    fn deadline_for(self, other: impl Command + 'static) -> ParallelDeadlineGroup {
        compose(ParallelDeadlineGroup::try_new(self.boxed(), vec![Box::new(other)]))
    }

    /// Restarts the command every time it finishes.
    fn repeatedly(self) -> RepeatCommand {
        compose(RepeatCommand::try_new(self))
    }

    /// Schedules the command on its own when initialized, without inheriting
    /// its requirements.
    fn as_proxy(self) -> ProxyCommand {
        ProxyCommand::new(self.into_handle())
    }

    /// Overrides whether the command runs while disabled.
    fn ignoring_disable(self, runs_when_disabled: bool) -> WrapperCommand {
        compose(WrapperCommand::try_new(self)).with_runs_when_disabled(runs_when_disabled)
    }

    /// Overrides the interruption behaviour.
    fn with_interrupt_behavior(self, behavior: InterruptionBehavior) -> WrapperCommand {
        compose(WrapperCommand::try_new(self)).with_interruption_behavior(behavior)
    }

    /// Calls `action(interrupted)` after the command ends.
    fn finally_do(self, action: impl FnMut(bool) + 'static) -> WrapperCommand {
        compose(WrapperCommand::try_new(self)).with_finally(action)
    }

    /// Calls `action` after the command ends, only if it was interrupted.
    fn handle_interrupt(self, mut action: impl FnMut() + 'static) -> WrapperCommand {
        self.finally_do(move |interrupted| {
            if interrupted {
                action();
            }
        })
    }

    /// Renames the command.
    fn with_name(self, name: impl Into<String>) -> WrapperCommand {
        compose(WrapperCommand::try_new(self)).with_display_name(name)
    }
}

impl<C: Command + 'static> CommandExt for C {}
