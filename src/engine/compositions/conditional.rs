//! Compositions that pick one child at initialization.
//!
//! The choice is made once per activation. Requirements are the union over
//! every branch, so the composition claims everything a branch might need
//! even though only one branch runs.

use std::fmt::Debug;
use std::hash::Hash;

use indexmap::IndexMap;
use log::warn;

use crate::engine::command::Command;
use crate::engine::compositions::Aggregate;
use crate::engine::error::CompositionError;
use crate::engine::requirements::Requirements;
use crate::engine::types::InterruptionBehavior;


/// Runs one of two commands depending on a condition evaluated at
/// initialization.
pub struct ConditionalCommand {
    /// `[on_true, on_false]`
    branches: [Box<dyn Command>; 2],
    condition: Box<dyn FnMut() -> bool>,
    selected: Option<usize>,
    aggregate: Aggregate,
}

impl ConditionalCommand {
    /// Builds the composition, failing if a branch cannot be composed.
    pub fn try_new(
        on_true: impl Command + 'static,
        on_false: impl Command + 'static,
        condition: impl FnMut() -> bool + 'static,
    ) -> Result<Self, CompositionError> {
        let mut branches: [Box<dyn Command>; 2] = [Box::new(on_true), Box::new(on_false)];
        let aggregate = Aggregate::claim(None, &mut branches)?;
        Ok(Self {
            branches,
            condition: Box::new(condition),
            selected: None,
            aggregate,
        })
    }

    /// Builds the composition.
    ///
    /// # Panics
    /// If a branch is a [`CommandHandle`](crate::CommandHandle) that is
    /// already composed or currently scheduled.
    pub fn new(
        on_true: impl Command + 'static,
        on_false: impl Command + 'static,
        condition: impl FnMut() -> bool + 'static,
    ) -> Self {
        match Self::try_new(on_true, on_false, condition) {
            Ok(command) => command,
            Err(err) => panic!("{err}"),
        }
    }

    fn selected(&mut self) -> Option<&mut Box<dyn Command>> {
        let index = self.selected?;
        Some(&mut self.branches[index])
    }
}

impl Command for ConditionalCommand {
    fn initialize(&mut self) {
        let index = if (self.condition)() { 0 } else { 1 };
        self.selected = Some(index);
        self.branches[index].initialize();
    }

    fn execute(&mut self) {
        if let Some(command) = self.selected() {
            command.execute();
        }
    }

    fn end(&mut self, interrupted: bool) {
        if let Some(command) = self.selected() {
            command.end(interrupted);
        }
    }

    fn is_finished(&mut self) -> bool {
        self.selected().is_some_and(|c| c.is_finished())
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

/// Runs the command mapped to the key a selector returns at initialization.
///
/// An unmapped key logs a warning and the composition finishes on the next
/// check without running anything.
pub struct SelectCommand<K> {
    commands: IndexMap<K, Box<dyn Command>>,
    selector: Box<dyn FnMut() -> K>,
    selected: Option<usize>,
    unmapped: bool,
    aggregate: Aggregate,
}

impl<K> SelectCommand<K>
where
    K: Hash + Eq + Debug + 'static,
{
    /// Builds the composition, failing if a child cannot be composed.
    pub fn try_new(
        commands: impl IntoIterator<Item = (K, Box<dyn Command>)>,
        selector: impl FnMut() -> K + 'static,
    ) -> Result<Self, CompositionError> {
        let (keys, mut children): (Vec<K>, Vec<Box<dyn Command>>) = commands.into_iter().unzip();
        let aggregate = Aggregate::claim(None, &mut children)?;
        Ok(Self {
            commands: keys.into_iter().zip(children).collect(),
            selector: Box::new(selector),
            selected: None,
            unmapped: false,
            aggregate,
        })
    }

    /// Builds the composition.
    ///
    /// # Panics
    /// If a child is a [`CommandHandle`](crate::CommandHandle) that is
    /// already composed or currently scheduled.
    pub fn new(
        commands: impl IntoIterator<Item = (K, Box<dyn Command>)>,
        selector: impl FnMut() -> K + 'static,
    ) -> Self {
        match Self::try_new(commands, selector) {
            Ok(command) => command,
            Err(err) => panic!("{err}"),
        }
    }

    fn selected(&mut self) -> Option<&mut Box<dyn Command>> {
        let index = self.selected?;
        self.commands.get_index_mut(index).map(|(_, command)| command)
    }
}

impl<K> Command for SelectCommand<K>
where
    K: Hash + Eq + Debug + 'static,
{
    fn initialize(&mut self) {
        let key = (self.selector)();
        self.selected = self.commands.get_index_of(&key);
        self.unmapped = self.selected.is_none();
        match self.selected() {
            Some(command) => command.initialize(),
            None => warn!("SelectCommand selector value {key:?} does not correspond to any command"),
        }
    }

    fn execute(&mut self) {
        if let Some(command) = self.selected() {
            command.execute();
        }
    }

    fn end(&mut self, interrupted: bool) {
        if let Some(command) = self.selected() {
            command.end(interrupted);
        }
    }

    fn is_finished(&mut self) -> bool {
        if self.unmapped {
            return true;
        }
        self.selected().is_some_and(|c| c.is_finished())
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
