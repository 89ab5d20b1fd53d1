//! Single-child compositions.

use crate::engine::command::Command;
use crate::engine::compositions::Aggregate;
use crate::engine::error::CompositionError;
use crate::engine::requirements::Requirements;
use crate::engine::types::InterruptionBehavior;


fn claim_one(command: Box<dyn Command>) -> Result<Box<dyn Command>, CompositionError> {
    let mut children = [command];
    Aggregate::claim(None, &mut children)?;
    let [command] = children;
    Ok(command)
}

/// Delegates every lifecycle call to one child, with optional overrides.
///
/// This is what the metadata decorators build: [`with_name`],
/// [`ignoring_disable`], [`with_interrupt_behavior`] and [`finally_do`].
///
/// [`with_name`]: crate::CommandExt::with_name
/// [`ignoring_disable`]: crate::CommandExt::ignoring_disable
/// [`with_interrupt_behavior`]: crate::CommandExt::with_interrupt_behavior
/// [`finally_do`]: crate::CommandExt::finally_do
pub struct WrapperCommand {
    command: Box<dyn Command>,
    name: Option<String>,
    runs_when_disabled: Option<bool>,
    interruption_behavior: Option<InterruptionBehavior>,
    finally: Vec<Box<dyn FnMut(bool)>>,
}

impl WrapperCommand {
    /// Wraps `command`, failing if it cannot be composed.
    pub fn try_new(command: impl Command + 'static) -> Result<Self, CompositionError> {
        Ok(Self {
            command: claim_one(Box::new(command))?,
            name: None,
            runs_when_disabled: None,
            interruption_behavior: None,
            finally: Vec::new(),
        })
    }

    /// Overrides the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Overrides whether the command runs while disabled.
    pub fn with_runs_when_disabled(mut self, runs_when_disabled: bool) -> Self {
        self.runs_when_disabled = Some(runs_when_disabled);
        self
    }

    /// Overrides the interruption behaviour.
    pub fn with_interruption_behavior(mut self, behavior: InterruptionBehavior) -> Self {
        self.interruption_behavior = Some(behavior);
        self
    }

    /// Adds an action run with the `interrupted` flag after the child ends.
    /// Actions run in the order they were added.
    pub fn with_finally(mut self, action: impl FnMut(bool) + 'static) -> Self {
        self.finally.push(Box::new(action));
        self
    }
}

impl Command for WrapperCommand {
    fn initialize(&mut self) {
        self.command.initialize();
    }

    fn execute(&mut self) {
        self.command.execute();
    }

    fn end(&mut self, interrupted: bool) {
        self.command.end(interrupted);
        for action in &mut self.finally {
            action(interrupted);
        }
    }

    fn is_finished(&mut self) -> bool {
        self.command.is_finished()
    }

    fn requirements(&self) -> Requirements {
        self.command.requirements()
    }

    fn runs_when_disabled(&self) -> bool {
        self.runs_when_disabled.unwrap_or_else(|| self.command.runs_when_disabled())
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        self.interruption_behavior
            .unwrap_or_else(|| self.command.interruption_behavior())
    }

    fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.command.name())
    }
}

/// Restarts its child every time the child finishes. Never finishes on its
/// own.
///
/// The child is ended (not interrupted) when it finishes and initialized
/// again on the following tick, before that tick's `execute`.
pub struct RepeatCommand {
    command: Box<dyn Command>,
    ended: bool,
}

impl RepeatCommand {
    /// Wraps `command`, failing if it cannot be composed.
    pub fn try_new(command: impl Command + 'static) -> Result<Self, CompositionError> {
        Ok(Self { command: claim_one(Box::new(command))?, ended: true })
    }

    /// Wraps `command`.
    ///
    /// # Panics
    /// If `command` is a [`CommandHandle`](crate::CommandHandle) that is
    /// already composed or currently scheduled.
    pub fn new(command: impl Command + 'static) -> Self {
        match Self::try_new(command) {
            Ok(command) => command,
            Err(err) => panic!("{err}"),
        }
    }
}

impl Command for RepeatCommand {
    fn initialize(&mut self) {
        self.ended = false;
        self.command.initialize();
    }

    fn execute(&mut self) {
        if self.ended {
            self.ended = false;
            self.command.initialize();
        }
        self.command.execute();
        if self.command.is_finished() {
            self.command.end(false);
            self.ended = true;
        }
    }

    fn end(&mut self, interrupted: bool) {
        // the child may already have ended in the last execute
        if !self.ended {
            self.command.end(interrupted);
            self.ended = true;
        }
    }

    fn requirements(&self) -> Requirements {
        self.command.requirements()
    }

    fn runs_when_disabled(&self) -> bool {
        self.command.runs_when_disabled()
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        self.command.interruption_behavior()
    }

    fn name(&self) -> String {
        format!("Repeat({})", self.command.name())
    }
}
