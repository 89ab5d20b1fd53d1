//! Parallel composition family.
//!
//! All three groups initialize every child together and execute them in
//! construction order on each tick. They differ only in when the group
//! finishes and how still-running children are ended.

use crate::engine::command::Command;
use crate::engine::compositions::Aggregate;
use crate::engine::error::CompositionError;
use crate::engine::requirements::Requirements;
use crate::engine::types::InterruptionBehavior;


/// Child plus its running flag.
struct Slot {
    command: Box<dyn Command>,
    running: bool,
}

fn slots(commands: Vec<Box<dyn Command>>) -> Vec<Slot> {
    commands.into_iter().map(|command| Slot { command, running: false }).collect()
}

/// Initializes every slot and flags it running.
fn start_all(slots: &mut [Slot]) {
    for slot in slots {
        slot.running = true;
        slot.command.initialize();
    }
}

/// Executes running slots, ending (not interrupted) those that finish.
fn step_running(slots: &mut [Slot]) {
    for slot in slots.iter_mut().filter(|s| s.running) {
        slot.command.execute();
        if slot.command.is_finished() {
            slot.command.end(false);
            slot.running = false;
        }
    }
}

/// Runs its children together until all of them finish.
pub struct ParallelCommandGroup {
    slots: Vec<Slot>,
    aggregate: Aggregate,
}

impl ParallelCommandGroup {
    /// Builds the group, failing if two children share a subsystem or a
    /// child cannot be composed.
    pub fn try_new(mut commands: Vec<Box<dyn Command>>) -> Result<Self, CompositionError> {
        let aggregate = Aggregate::claim(Some("parallel"), &mut commands)?;
        Ok(Self { slots: slots(commands), aggregate })
    }

    /// Builds the group.
    ///
    /// # Panics
    /// Under the conditions [`ParallelCommandGroup::try_new`] reports.
    pub fn new(commands: Vec<Box<dyn Command>>) -> Self {
        match Self::try_new(commands) {
            Ok(group) => group,
            Err(err) => panic!("{err}"),
        }
    }
}

impl Command for ParallelCommandGroup {
    fn initialize(&mut self) {
        start_all(&mut self.slots);
    }

    fn execute(&mut self) {
        step_running(&mut self.slots);
    }

    fn end(&mut self, interrupted: bool) {
        if interrupted {
            for slot in self.slots.iter_mut().filter(|s| s.running) {
                slot.command.end(true);
            }
        }
        for slot in &mut self.slots {
            slot.running = false;
        }
    }

    fn is_finished(&mut self) -> bool {
        !self.slots.iter().any(|s| s.running)
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

/// Runs its children together until any one of them finishes.
///
/// Every child is executed on each tick, even after an earlier child in the
/// same tick has finished. When the group ends, each child is ended with
/// `interrupted = !child.is_finished()`.
pub struct ParallelRaceGroup {
    commands: Vec<Box<dyn Command>>,
    finished: bool,
    aggregate: Aggregate,
}

impl ParallelRaceGroup {
    /// Builds the group, failing if two children share a subsystem or a
    /// child cannot be composed.
    pub fn try_new(mut commands: Vec<Box<dyn Command>>) -> Result<Self, CompositionError> {
        let aggregate = Aggregate::claim(Some("race"), &mut commands)?;
        Ok(Self { commands, finished: true, aggregate })
    }

    /// Builds the group.
    ///
    /// # Panics
    /// Under the conditions [`ParallelRaceGroup::try_new`] reports.
    pub fn new(commands: Vec<Box<dyn Command>>) -> Self {
        match Self::try_new(commands) {
            Ok(group) => group,
            Err(err) => panic!("{err}"),
        }
    }
}

impl Command for ParallelRaceGroup {
    fn initialize(&mut self) {
        self.finished = false;
        for command in &mut self.commands {
            command.initialize();
        }
    }

    fn execute(&mut self) {
        for command in &mut self.commands {
            command.execute();
            if command.is_finished() {
                self.finished = true;
            }
        }
    }

    fn end(&mut self, _interrupted: bool) {
        for command in &mut self.commands {
            let finished = command.is_finished();
            command.end(!finished);
        }
    }

    fn is_finished(&mut self) -> bool {
        self.finished
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

/// Runs a deadline command and a cohort together, finishing when the
/// deadline finishes.
///
/// Cohort members that finish earlier are ended normally and stay idle.
/// Members still running when the group ends are ended with
/// `interrupted = true`.
pub struct ParallelDeadlineGroup {
    /// Slot 0 is the deadline.
    slots: Vec<Slot>,
    aggregate: Aggregate,
}

impl ParallelDeadlineGroup {
    /// Builds the group, failing if two children share a subsystem or a
    /// child cannot be composed.
    pub fn try_new(
        deadline: Box<dyn Command>,
        others: Vec<Box<dyn Command>>,
    ) -> Result<Self, CompositionError> {
        let mut commands = Vec::with_capacity(others.len() + 1);
        commands.push(deadline);
        commands.extend(others);
        let aggregate = Aggregate::claim(Some("deadline"), &mut commands)?;
        Ok(Self { slots: slots(commands), aggregate })
    }

    /// Builds the group.
    ///
    /// # Panics
    /// Under the conditions [`ParallelDeadlineGroup::try_new`] reports.
    pub fn new(deadline: Box<dyn Command>, others: Vec<Box<dyn Command>>) -> Self {
        match Self::try_new(deadline, others) {
            Ok(group) => group,
            Err(err) => panic!("{err}"),
        }
    }
}

impl Command for ParallelDeadlineGroup {
    fn initialize(&mut self) {
        start_all(&mut self.slots);
    }

    fn execute(&mut self) {
        step_running(&mut self.slots);
    }

    fn end(&mut self, interrupted: bool) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.running {
                // the deadline itself only reaches here when the group is interrupted
                slot.command.end(index != 0 || interrupted);
                slot.running = false;
            }
        }
    }

    fn is_finished(&mut self) -> bool {
        !self.slots[0].running
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
