use crate::engine::command::Command;
use crate::engine::compositions::Aggregate;
use crate::engine::error::CompositionError;
use crate::engine::requirements::Requirements;
use crate::engine::types::InterruptionBehavior;


/// Runs its children one after another.
///
/// ## State
/// `current` is `None` before initialization (and after an interrupted
/// end) and `Some(len)` once every child has finished. A child is only
/// initialized after its predecessor has ended.

pub struct SequentialCommandGroup {
    commands: Vec<Box<dyn Command>>,
    current: Option<usize>,
    aggregate: Aggregate,
}

impl SequentialCommandGroup {
    /// Builds the group, failing if two children share a subsystem or a
    /// child cannot be composed.
    pub fn try_new(mut commands: Vec<Box<dyn Command>>) -> Result<Self, CompositionError> {
        let aggregate = Aggregate::claim(Some("sequential"), &mut commands)?;
        Ok(Self { commands, current: None, aggregate })
    }

    /// Builds the group.
    ///
    /// # Panics
    /// Under the conditions [`SequentialCommandGroup::try_new`] reports.
    pub fn new(commands: Vec<Box<dyn Command>>) -> Self {
        match Self::try_new(commands) {
            Ok(group) => group,
            Err(err) => panic!("{err}"),
        }
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the group has no children.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Command for SequentialCommandGroup {
    fn initialize(&mut self) {
        self.current = Some(0);
        if let Some(first) = self.commands.first_mut() {
            first.initialize();
        }
    }

    fn execute(&mut self) {
        let Some(index) = self.current else { return };
        let Some(command) = self.commands.get_mut(index) else { return };

        command.execute();
        if command.is_finished() {
            command.end(false);
            let next = index + 1;
            self.current = Some(next);
            if let Some(command) = self.commands.get_mut(next) {
                command.initialize();
            }
        }
    }

    fn end(&mut self, interrupted: bool) {
        if interrupted {
            if let Some(command) = self.current.and_then(|i| self.commands.get_mut(i)) {
                command.end(true);
            }
        }
        self.current = None;
    }

    fn is_finished(&mut self) -> bool {
        self.current == Some(self.commands.len())
    }

    fn requirements(&self) -> Requirements {
        self.aggregate.requirements.clone()
    }

    fn runs_when_disabled(&self) -> bool {
        self.aggregate.runs_when_disabled
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        self.aggregate.interruption_behavior
    }
}
