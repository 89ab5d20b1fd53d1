//! Subsystems: named exclusive resources.
//!
//! A **subsystem** is the unit of mutual exclusion. Commands declare the
//! subsystems they need as *requirements*; the scheduler guarantees that at
//! most one scheduled command holds a given subsystem at any instant.
//!
//! ## Ownership
//!
//! User code owns its subsystem state (typically as `Rc<RefCell<T>>` so that
//! commands can capture it). The scheduler only sees a [`SubsystemRef`]: a
//! shared, identity-comparable handle used as a requirement and as the
//! receiver of the per-tick [`Subsystem::periodic`] hook.
//!
//! A subsystem never schedules itself. Its default command and its current
//! command live in the scheduler; the accessors on [`SubsystemRef`] are
//! lookups into the per-thread [`CommandScheduler`] instance.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::engine::command::CommandHandle;
use crate::engine::commands::{InstantCommand, RunCommand, StartEndCommand};
use crate::engine::error::SchedulerResult;
use crate::engine::scheduler::CommandScheduler;
use crate::engine::telemetry::{TelemetrySink, TelemetryValue};
use crate::engine::types::{short_type_name, SubsystemID};


/// Behaviour attached to an exclusive resource.
///
/// Both methods have defaults, so a marker type can implement it with an
/// empty `impl` block.
pub trait Subsystem {
    /// Called once per scheduler tick, before any command runs, for every
    /// registered subsystem. Intended for sensor refresh and bookkeeping that
    /// must happen regardless of which command is active.
    fn periodic(&mut self) {}

    /// Display name used in logs and telemetry.
    fn name(&self) -> String {
        short_type_name::<Self>()
    }
}

/// Stateless subsystem identified only by its name.
///
/// Useful for logical resources that need mutual exclusion but have no
/// per-tick behaviour.
#[derive(Debug, Clone)]
pub struct NamedSubsystem {
    name: String,
}

impl NamedSubsystem {
    /// Creates a subsystem with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Subsystem for NamedSubsystem {
    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Shared, identity-carrying reference to a subsystem.
///
/// ## Identity
/// Equality and hashing use the address of the shared allocation, so two
/// references are equal exactly when they point at the same subsystem.
/// Cloning is cheap and preserves identity.
///
/// ## Name
/// The display name is captured when the reference is created.
///
/// ## Registration
/// [`new`](Self::new) and [`from_shared`](Self::from_shared) register the
/// subsystem with this thread's scheduler (creating it if needed), so its
/// `periodic` runs from the next tick on.

#[derive(Clone)]
pub struct SubsystemRef {
    inner: Rc<RefCell<dyn Subsystem>>,
    name: Rc<str>,
}

impl SubsystemRef {
    /// Wraps a subsystem value, taking ownership of it.
    pub fn new<S: Subsystem + 'static>(subsystem: S) -> Self {
        let name: Rc<str> = Rc::from(subsystem.name());
        let inner: Rc<RefCell<dyn Subsystem>> = Rc::new(RefCell::new(subsystem));
        Self::registered(inner, name)
    }

    /// Shares a subsystem that user code keeps a typed handle to.
    ///
    /// ```
    /// use std::{cell::RefCell, rc::Rc};
    /// use command_framework::{Subsystem, SubsystemRef};
    ///
    /// struct Arm { angle: f64 }
    /// impl Subsystem for Arm {}
    ///
    /// let arm = Rc::new(RefCell::new(Arm { angle: 0.0 }));
    /// let arm_ref = SubsystemRef::from_shared(&arm);
    /// assert_eq!(arm_ref, arm_ref.clone());
    /// ```
    pub fn from_shared<S: Subsystem + 'static>(shared: &Rc<RefCell<S>>) -> Self {
        let name: Rc<str> = Rc::from(shared.borrow().name());
        let inner: Rc<RefCell<dyn Subsystem>> = shared.clone();
        Self::registered(inner, name)
    }

    fn registered(inner: Rc<RefCell<dyn Subsystem>>, name: Rc<str>) -> Self {
        let subsystem = Self { inner, name };
        subsystem.register();
        subsystem
    }

    /// Creates a stateless [`NamedSubsystem`].
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(NamedSubsystem::new(name))
    }

    /// Identity of the referenced subsystem.
    #[inline]
    pub fn id(&self) -> SubsystemID {
        Rc::as_ptr(&self.inner) as *const () as usize
    }

    /// Display name captured at creation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the subsystem's periodic hook.
    pub(crate) fn periodic(&self) {
        self.inner.borrow_mut().periodic();
    }

    /// Registers this subsystem with the per-thread scheduler again, after
    /// an unregister or a scheduler reset.
    pub fn register(&self) {
        CommandScheduler::instance().register_subsystem(self);
    }

    /// Default command of this subsystem, if any.
    pub fn default_command(&self) -> Option<CommandHandle> {
        CommandScheduler::instance().default_command(self)
    }

    /// Sets the default command. Fails if the command does not require this
    /// subsystem or belongs to a composition. Takes effect at the next idle
    /// backfill pass.
    pub fn set_default_command(&self, command: CommandHandle) -> SchedulerResult<()> {
        CommandScheduler::instance().set_default_command(self, command)
    }

    /// Clears the default command. A running default command keeps running
    /// until interrupted but is not rescheduled.
    pub fn remove_default_command(&self) {
        CommandScheduler::instance().remove_default_command(self);
    }

    /// Scheduled command currently holding this subsystem, if any.
    pub fn current_command(&self) -> Option<CommandHandle> {
        CommandScheduler::instance().requiring(self)
    }

    /// Command that runs `action` once and finishes, requiring this subsystem.
    pub fn run_once(&self, action: impl FnMut() + 'static) -> InstantCommand {
        InstantCommand::new(action, [self.clone()])
    }

    /// Command that runs `action` every tick and never finishes, requiring
    /// this subsystem.
    pub fn run(&self, action: impl FnMut() + 'static) -> RunCommand {
        RunCommand::new(action, [self.clone()])
    }

    /// Command that runs `start` on initialize and `end` when it ends,
    /// requiring this subsystem.
    pub fn start_end(
        &self,
        start: impl FnMut() + 'static,
        end: impl FnMut() + 'static,
    ) -> StartEndCommand {
        StartEndCommand::new(start, end, [self.clone()])
    }

    /// Command that does nothing and never finishes, requiring this subsystem.
    pub fn idle(&self) -> RunCommand {
        RunCommand::new(|| {}, [self.clone()])
    }

    /// Publishes `.hasDefault`, `.default`, `.hasCommand` and `.command`
    /// under `<name>/`.
    pub fn publish_telemetry(&self, sink: &mut dyn TelemetrySink) {
        let default = self.default_command();
        let current = self.current_command();
        let key = |suffix: &str| format!("{}/{}", self.name, suffix);

        sink.publish(&key(".hasDefault"), TelemetryValue::Bool(default.is_some()));
        sink.publish(
            &key(".default"),
            TelemetryValue::Str(default.map(|c| c.name()).unwrap_or_else(|| "none".into())),
        );
        sink.publish(&key(".hasCommand"), TelemetryValue::Bool(current.is_some()));
        sink.publish(
            &key(".command"),
            TelemetryValue::Str(current.map(|c| c.name()).unwrap_or_else(|| "none".into())),
        );
    }
}

impl PartialEq for SubsystemRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for SubsystemRef {}

impl Hash for SubsystemRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for SubsystemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubsystemRef")
            .field("name", &self.name)
            .field("id", &self.id())
            .finish()
    }
}
