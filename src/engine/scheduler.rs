//! Command scheduling and the per-tick run loop.
//!
//! This module is responsible for:
//! * keeping the set of scheduled commands and the subsystem ownership table,
//! * resolving requirement conflicts when a command is scheduled,
//! * driving every scheduled command's lifecycle once per tick,
//! * backfilling idle subsystems with their default commands.
//!
//! ## Tick order
//!
//! One call to [`CommandScheduler::run`] performs, in this exact order:
//! 1. `periodic()` on every registered subsystem, in registration order,
//! 2. a poll of the active button loop (trigger bindings),
//! 3. `execute()` / `is_finished()` on a snapshot of the scheduled commands,
//!    in scheduling order, ending the ones that finish,
//! 4. scheduling and cancellation requests queued during step 3,
//! 5. default-command backfill for every subsystem nobody holds.
//!
//! Backfill comes last so a subsystem vacated in step 3 gets its default
//! command initialized in the same tick but executed only from the next.
//!
//! ## Re-entrancy
//!
//! Commands, trigger actions and hooks may call back into the scheduler. No
//! internal borrow is held while user code runs. While step 3 is running,
//! `schedule` and `cancel` are queued and applied in step 4, so a command
//! scheduled from inside another command's `execute` is initialized after
//! the command loop rather than on the spot. The requested order is kept.
//!
//! A command cancelled from inside its own `initialize` (typically a group
//! whose proxied child competes for one of the group's subsystems) finishes
//! `initialize` first and is then ended as interrupted.
//!
//! ## Instance
//!
//! There is one scheduler per thread, reached through
//! [`CommandScheduler::instance`]. A second scheduler operating on the same
//! subsystems would break exclusive ownership, so none can be constructed
//! directly.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use indexmap::IndexMap;
use log::{debug, error, trace, warn};

use crate::engine::command::CommandHandle;
use crate::engine::config::{ConflictResolution, SchedulerConfig};
use crate::engine::error::{SchedulerError, SchedulerResult};
use crate::engine::event_loop::EventLoop;
use crate::engine::requirements::{RequirementTable, Requirements};
use crate::engine::subsystem::SubsystemRef;
use crate::engine::telemetry::{TelemetrySink, TelemetryValue};
use crate::engine::time;
use crate::engine::types::{CommandID, InterruptionBehavior, ScheduleOutcome, Tick};
use crate::engine::watchdog::Watchdog;
use crate::profiling::profiler;


type CommandAction = Rc<dyn Fn(&CommandHandle)>;
type InterruptAction = Rc<dyn Fn(&CommandHandle, Option<&CommandHandle>)>;

/// Cancellation requested while the command was inside its own
/// `initialize`, with the interrupting command if any.
struct Interruption {
    interruptor: Option<CommandHandle>,
}

/// Bookkeeping for one scheduled command.
///
/// Metadata is captured at schedule time; conflict resolution and disabled
/// gating use these values rather than asking the command again.
struct ScheduledCommand {
    handle: CommandHandle,
    requirements: Requirements,
    interruption_behavior: InterruptionBehavior,
    runs_when_disabled: bool,
    scheduled_at: Duration,
}

#[derive(Default)]
struct Hooks {
    initialize: Vec<CommandAction>,
    execute: Vec<CommandAction>,
    interrupt: Vec<InterruptAction>,
    finish: Vec<CommandAction>,
}

struct SchedulerState {
    config: SchedulerConfig,
    scheduled: IndexMap<CommandID, ScheduledCommand>,
    requirements: RequirementTable,
    subsystems: IndexMap<SubsystemRef, Option<CommandHandle>>,
    default_loop: EventLoop,
    active_loop: EventLoop,
    disabled: bool,
    enabled_source: Rc<dyn Fn() -> bool>,
    hooks: Hooks,
    in_run_loop: bool,
    to_schedule: Vec<CommandHandle>,
    to_cancel: Vec<(CommandHandle, Option<CommandHandle>)>,
    ending: HashSet<CommandID>,
    initializing: IndexMap<CommandID, Option<Interruption>>,
    watchdog: Watchdog,
    tick: Tick,
}

thread_local! {
    static INSTANCE: RefCell<Option<CommandScheduler>> = const { RefCell::new(None) };
}

/// Handle to this thread's command scheduler.
///
/// Cloning is cheap; every clone refers to the same scheduler.
#[derive(Clone)]
pub struct CommandScheduler {
    state: Rc<RefCell<SchedulerState>>,
}

impl CommandScheduler {
    fn new(config: SchedulerConfig) -> Self {
        let default_loop = EventLoop::new();
        let watchdog = Watchdog::new(config.period());
        Self {
            state: Rc::new(RefCell::new(SchedulerState {
                config,
                scheduled: IndexMap::new(),
                requirements: RequirementTable::default(),
                subsystems: IndexMap::new(),
                active_loop: default_loop.clone(),
                default_loop,
                disabled: false,
                enabled_source: Rc::new(|| true),
                hooks: Hooks::default(),
                in_run_loop: false,
                to_schedule: Vec::new(),
                to_cancel: Vec::new(),
                ending: HashSet::new(),
                initializing: IndexMap::new(),
                watchdog,
                tick: 0,
            })),
        }
    }

    // ─── Instance ───────────────────────────────────────────────────────────

    /// This thread's scheduler, created with the default configuration on
    /// first use.
    pub fn instance() -> CommandScheduler {
        INSTANCE.with(|slot| {
            slot.borrow_mut()
                .get_or_insert_with(|| CommandScheduler::new(SchedulerConfig::default()))
                .clone()
        })
    }

    /// Creates this thread's scheduler with `config`.
    ///
    /// ## Errors
    /// * [`SchedulerError::Config`] if `config` is invalid,
    /// * [`SchedulerError::AlreadyInitialized`] if the scheduler exists.
    pub fn init(config: SchedulerConfig) -> SchedulerResult<CommandScheduler> {
        config.validate()?;
        INSTANCE.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.is_some() {
                return Err(SchedulerError::AlreadyInitialized);
            }
            let scheduler = CommandScheduler::new(config);
            *slot = Some(scheduler.clone());
            Ok(scheduler)
        })
    }

    /// Creates this thread's scheduler from a TOML configuration document.
    pub fn init_from_toml(source: &str) -> SchedulerResult<CommandScheduler> {
        let config = SchedulerConfig::from_toml(source)?;
        Self::init(config)
    }

    /// Drops this thread's scheduler. The next [`instance`](Self::instance)
    /// call creates a fresh one.
    ///
    /// Scheduled commands are not ended. Bindings on the default button
    /// loop are cleared.
    pub fn reset_instance() {
        let previous = INSTANCE.with(|slot| slot.borrow_mut().take());
        if let Some(previous) = previous {
            let default_loop = previous.state.borrow().default_loop.clone();
            default_loop.clear();
        }
    }

    /// Configuration the scheduler was created with.
    pub fn config(&self) -> SchedulerConfig {
        self.state.borrow().config.clone()
    }

    /// Number of completed or in-progress calls to [`run`](Self::run).
    pub fn tick(&self) -> Tick {
        self.state.borrow().tick
    }

    // ─── Scheduling ─────────────────────────────────────────────────────────

    /// Schedules `command`.
    ///
    /// ## Semantics
    /// * While commands are executing, the request is queued
    ///   ([`ScheduleOutcome::Deferred`]).
    /// * Scheduling a scheduled command is a no-op.
    /// * Commands holding any of the requirements are interrupted according
    ///   to their interruption behaviour and the configured
    ///   [`ConflictResolution`]. A `CancelIncoming` holder blocks the
    ///   command.
    /// * On success `initialize` runs before this call returns.
    ///
    /// ## Errors
    /// [`SchedulerError::ComposedCommand`] if `command` belongs to a
    /// composition.
    pub fn schedule(&self, command: &CommandHandle) -> SchedulerResult<ScheduleOutcome> {
        if command.is_composed() {
            let err = SchedulerError::ComposedCommand { name: command.name() };
            error!("{err}");
            return Err(err);
        }

        {
            let mut state = self.state.borrow_mut();
            if state.in_run_loop {
                state.to_schedule.push(command.clone());
                return Ok(ScheduleOutcome::Deferred);
            }
            if state.disabled {
                return Ok(ScheduleOutcome::SchedulerDisabled);
            }
            if state.scheduled.contains_key(&command.id()) {
                return Ok(ScheduleOutcome::AlreadyScheduled);
            }
        }

        let (requirements, interruption_behavior, runs_when_disabled) = command
            .with_command_ref(|c| (c.requirements(), c.interruption_behavior(), c.runs_when_disabled()));

        if !runs_when_disabled && !self.robot_enabled() {
            return Ok(ScheduleOutcome::RobotDisabled);
        }

        let conflicts = self.state.borrow().requirements.conflicts(&requirements);
        if !conflicts.is_empty() {
            if let Some(blocker) = self.resolve_conflicts(command, &conflicts) {
                debug!("`{}` not scheduled: blocked by command #{blocker}", command.name());
                return Ok(ScheduleOutcome::Blocked { by: blocker });
            }
            // an interrupted command's `end` may have scheduled this one
            if self.is_scheduled(command) {
                return Ok(ScheduleOutcome::AlreadyScheduled);
            }
        }

        self.init_command(command, requirements, interruption_behavior, runs_when_disabled);
        Ok(ScheduleOutcome::Scheduled)
    }

    /// Schedules each of `commands`, stopping at the first error.
    pub fn schedule_all<'a>(
        &self,
        commands: impl IntoIterator<Item = &'a CommandHandle>,
    ) -> SchedulerResult<()> {
        for command in commands {
            self.schedule(command)?;
        }
        Ok(())
    }

    /// Interrupts the holders in `conflicts` on behalf of `incoming`.
    ///
    /// Returns the id of a `CancelIncoming` holder that refused, if any.
    fn resolve_conflicts(&self, incoming: &CommandHandle, conflicts: &[CommandID]) -> Option<CommandID> {
        let holders: Vec<(CommandHandle, InterruptionBehavior)> = {
            let state = self.state.borrow();
            conflicts
                .iter()
                .filter_map(|id| state.scheduled.get(id))
                .map(|s| (s.handle.clone(), s.interruption_behavior))
                .collect()
        };

        let mode = self.state.borrow().config.conflict_resolution;
        match mode {
            ConflictResolution::InOrder => {}
            ConflictResolution::CheckThenCancel => {
                if let Some((blocker, _)) = holders
                    .iter()
                    .find(|(_, behavior)| *behavior == InterruptionBehavior::CancelIncoming)
                {
                    return Some(blocker.id());
                }
            }
        }

        // in-order mode keeps cancellations made before a blocker is met
        for (holder, behavior) in holders {
            if behavior == InterruptionBehavior::CancelIncoming {
                return Some(holder.id());
            }
            self.cancel_with_cause(&holder, Some(incoming));
        }
        None
    }

    fn init_command(
        &self,
        command: &CommandHandle,
        requirements: Requirements,
        interruption_behavior: InterruptionBehavior,
        runs_when_disabled: bool,
    ) {
        {
            let mut state = self.state.borrow_mut();
            state.requirements.claim(&requirements, command.id());
            state.scheduled.insert(
                command.id(),
                ScheduledCommand {
                    handle: command.clone(),
                    requirements,
                    interruption_behavior,
                    runs_when_disabled,
                    scheduled_at: time::now(),
                },
            );
        }

        self.state.borrow_mut().initializing.insert(command.id(), None);
        command.with_command(|c| c.initialize());
        let interruption = self
            .state
            .borrow_mut()
            .initializing
            .shift_remove(&command.id())
            .flatten();

        let hooks = self.state.borrow().hooks.initialize.clone();
        for hook in hooks {
            hook(command);
        }

        let name = command.name();
        debug!("scheduled `{name}`");
        self.add_epoch(format!("{name}.initialize()"));

        if let Some(Interruption { interruptor }) = interruption {
            if self.is_scheduled(command) {
                debug!("`{name}` was interrupted during initialize");
                self.end_command(command, true, interruptor.as_ref());
            }
        }
    }

    /// Cancels `command`, ending it with `interrupted = true`.
    ///
    /// Cancelling a command that is not scheduled does nothing. The
    /// command's interruption behaviour does not apply to explicit cancels.
    pub fn cancel(&self, command: &CommandHandle) {
        self.cancel_with_cause(command, None);
    }

    /// Cancels each of `commands`.
    pub fn cancel_many<'a>(&self, commands: impl IntoIterator<Item = &'a CommandHandle>) {
        for command in commands {
            self.cancel(command);
        }
    }

    /// Cancels every scheduled command.
    pub fn cancel_all(&self) {
        for command in self.scheduled_commands() {
            self.cancel(&command);
        }
    }

    fn cancel_with_cause(&self, command: &CommandHandle, interruptor: Option<&CommandHandle>) {
        {
            let mut state = self.state.borrow_mut();
            if state.ending.contains(&command.id()) {
                return;
            }
            if state.in_run_loop {
                state.to_cancel.push((command.clone(), interruptor.cloned()));
                return;
            }
            if !state.scheduled.contains_key(&command.id()) {
                return;
            }
            // the command is borrowed by its own `initialize`; end it once that returns
            if let Some(slot) = state.initializing.get_mut(&command.id()) {
                if slot.is_none() {
                    *slot = Some(Interruption { interruptor: interruptor.cloned() });
                }
                return;
            }
        }

        debug!(
            "cancelling `{}`{}",
            command.name(),
            interruptor.map(|i| format!(" for `{}`", i.name())).unwrap_or_default()
        );
        self.end_command(command, true, interruptor);
    }

    /// Ends a scheduled command and removes it.
    ///
    /// `end` runs while the command is still registered, then its
    /// requirements are released.
    fn end_command(&self, command: &CommandHandle, interrupted: bool, interruptor: Option<&CommandHandle>) {
        let id = command.id();
        if !self.state.borrow_mut().ending.insert(id) {
            return;
        }

        command.with_command(|c| c.end(interrupted));

        if interrupted {
            let hooks = self.state.borrow().hooks.interrupt.clone();
            for hook in hooks {
                hook(command, interruptor);
            }
        } else {
            let hooks = self.state.borrow().hooks.finish.clone();
            for hook in hooks {
                hook(command);
            }
        }

        let name = command.name();
        {
            let mut state = self.state.borrow_mut();
            state.ending.remove(&id);
            if let Some(entry) = state.scheduled.shift_remove(&id) {
                state.requirements.release(&entry.requirements, id);
            }
            state.watchdog.add_epoch(format!("{name}.end({interrupted})"));
        }
        trace!("ended `{name}` (interrupted: {interrupted})");
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    /// Whether `command` is scheduled.
    pub fn is_scheduled(&self, command: &CommandHandle) -> bool {
        self.state.borrow().scheduled.contains_key(&command.id())
    }

    /// Whether `command` is queued for scheduling after the current command
    /// loop.
    pub fn is_pending(&self, command: &CommandHandle) -> bool {
        self.state.borrow().to_schedule.iter().any(|c| c == command)
    }

    /// Scheduled commands in scheduling order.
    pub fn scheduled_commands(&self) -> Vec<CommandHandle> {
        self.state.borrow().scheduled.values().map(|s| s.handle.clone()).collect()
    }

    /// Scheduled command holding `subsystem`, if any.
    pub fn requiring(&self, subsystem: &SubsystemRef) -> Option<CommandHandle> {
        let state = self.state.borrow();
        let id = state.requirements.holder(subsystem)?;
        state.scheduled.get(&id).map(|s| s.handle.clone())
    }

    /// Time since `command` was scheduled, or `None` if it is not scheduled.
    pub fn time_since_scheduled(&self, command: &CommandHandle) -> Option<Duration> {
        let scheduled_at = self.state.borrow().scheduled.get(&command.id())?.scheduled_at;
        Some(time::now().saturating_sub(scheduled_at))
    }

    /// Whether `command` belongs to a composition.
    pub fn is_composed(&self, command: &CommandHandle) -> bool {
        command.is_composed()
    }

    /// Releases `command` from its composition so that it may be scheduled
    /// or composed again. Only sound once the owning composition is gone.
    pub fn remove_composed_command(&self, command: &CommandHandle) {
        command.set_composed(false);
    }

    // ─── Subsystems ─────────────────────────────────────────────────────────

    /// Registers `subsystem` so its `periodic` runs each tick and its
    /// default command is backfilled. Duplicates are ignored with a warning.
    pub fn register_subsystem(&self, subsystem: &SubsystemRef) {
        let mut state = self.state.borrow_mut();
        if state.subsystems.contains_key(subsystem) {
            warn!("tried to register an already-registered subsystem `{}`", subsystem.name());
            return;
        }
        state.subsystems.insert(subsystem.clone(), None);
    }

    /// Unregisters `subsystem`, dropping its default command.
    pub fn unregister_subsystem(&self, subsystem: &SubsystemRef) {
        self.state.borrow_mut().subsystems.shift_remove(subsystem);
    }

    /// Unregisters every subsystem.
    pub fn unregister_all_subsystems(&self) {
        self.state.borrow_mut().subsystems.clear();
    }

    /// Registered subsystems in registration order.
    pub fn subsystems(&self) -> Vec<SubsystemRef> {
        self.state.borrow().subsystems.keys().cloned().collect()
    }

    /// Sets the default command of `subsystem`, registering it if needed.
    ///
    /// The command is scheduled by the next backfill pass that finds the
    /// subsystem idle.
    ///
    /// ## Errors
    /// * [`SchedulerError::ComposedCommand`] if `command` is composed,
    /// * [`SchedulerError::DefaultCommandMissingRequirement`] if `command`
    ///   does not require `subsystem`.
    pub fn set_default_command(&self, subsystem: &SubsystemRef, command: CommandHandle) -> SchedulerResult<()> {
        if command.is_composed() {
            let err = SchedulerError::ComposedCommand { name: command.name() };
            error!("{err}");
            return Err(err);
        }

        let (requires, behavior) =
            command.with_command_ref(|c| (c.has_requirement(subsystem), c.interruption_behavior()));
        if !requires {
            let err = SchedulerError::DefaultCommandMissingRequirement {
                command: command.name(),
                subsystem: subsystem.name().to_string(),
            };
            error!("{err}");
            return Err(err);
        }
        if behavior == InterruptionBehavior::CancelIncoming {
            warn!(
                "registering a CancelIncoming default command `{}` on `{}`: it will block every other command requiring the subsystem",
                command.name(),
                subsystem.name()
            );
        }

        self.state.borrow_mut().subsystems.insert(subsystem.clone(), Some(command));
        Ok(())
    }

    /// Clears the default command of `subsystem`. A running default command
    /// is not cancelled.
    pub fn remove_default_command(&self, subsystem: &SubsystemRef) {
        if let Some(slot) = self.state.borrow_mut().subsystems.get_mut(subsystem) {
            *slot = None;
        }
    }

    /// Default command of `subsystem`, if any.
    pub fn default_command(&self, subsystem: &SubsystemRef) -> Option<CommandHandle> {
        self.state.borrow().subsystems.get(subsystem).cloned().flatten()
    }

    // ─── Enable state ───────────────────────────────────────────────────────

    /// Re-enables a disabled scheduler.
    pub fn enable(&self) {
        self.state.borrow_mut().disabled = false;
    }

    /// Disables the scheduler: `run` does nothing and `schedule` is a no-op
    /// until [`enable`](Self::enable). Scheduled commands stay scheduled.
    pub fn disable(&self) {
        self.state.borrow_mut().disabled = true;
    }

    /// Whether the scheduler itself is enabled.
    pub fn is_enabled(&self) -> bool {
        !self.state.borrow().disabled
    }

    /// Installs the provider of the robot-enabled flag read each tick.
    pub fn set_enabled_source(&self, source: impl Fn() -> bool + 'static) {
        self.state.borrow_mut().enabled_source = Rc::new(source);
    }

    fn robot_enabled(&self) -> bool {
        let source = self.state.borrow().enabled_source.clone();
        source()
    }

    // ─── Hooks ──────────────────────────────────────────────────────────────

    /// Runs `action` after any command initializes.
    pub fn on_command_initialize(&self, action: impl Fn(&CommandHandle) + 'static) {
        self.state.borrow_mut().hooks.initialize.push(Rc::new(action));
    }

    /// Runs `action` after any command executes.
    pub fn on_command_execute(&self, action: impl Fn(&CommandHandle) + 'static) {
        self.state.borrow_mut().hooks.execute.push(Rc::new(action));
    }

    /// Runs `action` after any command is interrupted.
    pub fn on_command_interrupt(&self, action: impl Fn(&CommandHandle) + 'static) {
        self.on_command_interrupt_with_cause(move |command, _| action(command));
    }

    /// Runs `action` after any command is interrupted, with the command
    /// whose scheduling caused the interruption, if any.
    pub fn on_command_interrupt_with_cause(
        &self,
        action: impl Fn(&CommandHandle, Option<&CommandHandle>) + 'static,
    ) {
        self.state.borrow_mut().hooks.interrupt.push(Rc::new(action));
    }

    /// Runs `action` after any command finishes normally.
    pub fn on_command_finish(&self, action: impl Fn(&CommandHandle) + 'static) {
        self.state.borrow_mut().hooks.finish.push(Rc::new(action));
    }

    // ─── Button loops ───────────────────────────────────────────────────────

    /// Loop that triggers bind to by default.
    pub fn default_button_loop(&self) -> EventLoop {
        self.state.borrow().default_loop.clone()
    }

    /// Loop polled each tick.
    pub fn active_button_loop(&self) -> EventLoop {
        self.state.borrow().active_loop.clone()
    }

    /// Replaces the loop polled each tick.
    pub fn set_active_button_loop(&self, event_loop: EventLoop) {
        self.state.borrow_mut().active_loop = event_loop;
    }

    // ─── Watchdog ───────────────────────────────────────────────────────────

    /// Changes the loop period used for overrun detection.
    pub fn set_period(&self, period: Duration) {
        self.state.borrow_mut().watchdog.set_timeout(period);
    }

    /// Logs the epochs recorded during the last tick.
    pub fn print_watchdog_epochs(&self) {
        self.state.borrow().watchdog.print_epochs();
    }

    /// Epochs recorded during the last tick, in order.
    pub fn watchdog_epochs(&self) -> Vec<(String, Duration)> {
        self.state
            .borrow()
            .watchdog
            .epochs()
            .map(|(name, d)| (name.to_string(), d))
            .collect()
    }

    fn add_epoch(&self, name: impl Into<String>) {
        self.state.borrow_mut().watchdog.add_epoch(name);
    }

    // ─── Telemetry ──────────────────────────────────────────────────────────

    /// Publishes `Scheduler/Names` and `Scheduler/Ids` for the scheduled
    /// commands.
    pub fn publish_telemetry(&self, sink: &mut dyn TelemetrySink) {
        let commands = self.scheduled_commands();
        let names = commands.iter().map(|c| c.name()).collect();
        let ids = commands.iter().map(|c| c.id() as i64).collect();
        sink.publish("Scheduler/Names", TelemetryValue::StrArray(names));
        sink.publish("Scheduler/Ids", TelemetryValue::IntArray(ids));
    }

    /// Cancels the scheduled commands with the given ids. Unknown ids are
    /// ignored.
    pub fn cancel_by_ids(&self, ids: &[CommandID]) {
        let targets: Vec<CommandHandle> = {
            let state = self.state.borrow();
            ids.iter()
                .filter_map(|id| state.scheduled.get(id))
                .map(|s| s.handle.clone())
                .collect()
        };
        for command in &targets {
            self.cancel(command);
        }
    }

    // ─── Run loop ───────────────────────────────────────────────────────────

    /// Runs one tick. See the module documentation for the exact order.
    pub fn run(&self) {
        if self.state.borrow().disabled {
            return;
        }
        let _tick_span = profiler::span("CommandScheduler::run");

        let subsystems: Vec<SubsystemRef> = {
            let mut state = self.state.borrow_mut();
            state.tick += 1;
            state.watchdog.reset();
            state.subsystems.keys().cloned().collect()
        };

        {
            let _span = profiler::span("subsystems.periodic");
            for subsystem in &subsystems {
                subsystem.periodic();
                self.add_epoch(format!("{}.periodic()", subsystem.name()));
            }
        }

        {
            let _span = profiler::span("buttons.poll");
            let active_loop = self.active_button_loop();
            active_loop.poll();
            self.add_epoch("buttons.poll()");
        }

        {
            let _span = profiler::span("commands.execute");
            self.run_commands();
        }

        {
            let _span = profiler::span("commands.queued");
            self.apply_queued();
        }

        {
            let _span = profiler::span("subsystems.default_commands");
            self.backfill_defaults();
        }

        let (overrun, report) = {
            let mut state = self.state.borrow_mut();
            state.watchdog.disable();
            (state.watchdog.is_expired(), state.config.report_overruns)
        };
        if overrun && report {
            let state = self.state.borrow();
            warn!(
                "CommandScheduler loop overrun: {:?} > {:?}",
                state.watchdog.elapsed(),
                state.watchdog.timeout()
            );
            state.watchdog.print_epochs();
        }
    }

    fn run_commands(&self) {
        let robot_enabled = self.robot_enabled();
        let snapshot: Vec<(CommandHandle, bool)> = {
            let mut state = self.state.borrow_mut();
            state.in_run_loop = true;
            state
                .scheduled
                .values()
                .map(|s| (s.handle.clone(), s.runs_when_disabled))
                .collect()
        };

        for (command, runs_when_disabled) in snapshot {
            if !self.is_scheduled(&command) {
                continue;
            }

            if !robot_enabled && !runs_when_disabled {
                self.end_command(&command, true, None);
                continue;
            }

            command.with_command(|c| c.execute());
            let hooks = self.state.borrow().hooks.execute.clone();
            for hook in hooks {
                hook(&command);
            }
            self.add_epoch(format!("{}.execute()", command.name()));

            if command.with_command(|c| c.is_finished()) {
                self.end_command(&command, false, None);
            }
        }

        self.state.borrow_mut().in_run_loop = false;
    }

    fn apply_queued(&self) {
        let (to_schedule, to_cancel) = {
            let mut state = self.state.borrow_mut();
            (std::mem::take(&mut state.to_schedule), std::mem::take(&mut state.to_cancel))
        };

        for command in &to_schedule {
            // errors were logged by `schedule`
            let _ = self.schedule(command);
        }
        for (command, interruptor) in &to_cancel {
            self.cancel_with_cause(command, interruptor.as_ref());
        }
    }

    fn backfill_defaults(&self) {
        let defaults: Vec<(SubsystemRef, CommandHandle)> = {
            let state = self.state.borrow();
            state
                .subsystems
                .iter()
                .filter_map(|(s, d)| d.clone().map(|d| (s.clone(), d)))
                .collect()
        };

        for (subsystem, default) in defaults {
            // re-checked per subsystem: an earlier default may claim several
            if self.requiring(&subsystem).is_none() {
                let _ = self.schedule(&default);
            }
        }
    }
}

impl fmt::Debug for CommandScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("CommandScheduler")
            .field("tick", &state.tick)
            .field("scheduled", &state.scheduled.len())
            .field("subsystems", &state.subsystems.len())
            .field("disabled", &state.disabled)
            .finish()
    }
}
