#![cfg(test)]
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use command_framework::engine::time;
use command_framework::{
    Command,
    CommandHandle,
    CommandScheduler,
    InterruptionBehavior,
    ManualClock,
    Requirements,
    Subsystem,
    SubsystemRef,
};


/// Ordered record of lifecycle events, shared between mocks and the test.
pub type Journal = Rc<RefCell<Vec<String>>>;

pub fn journal() -> Journal {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.borrow().clone()
}

pub fn count(journal: &Journal, entry: &str) -> usize {
    journal.borrow().iter().filter(|e| e.as_str() == entry).count()
}

pub fn clear(journal: &Journal) {
    journal.borrow_mut().clear();
}

/// Fresh scheduler and a manual clock at zero for the current test thread.
pub fn setup() -> ManualClock {
    CommandScheduler::reset_instance();
    let clock = ManualClock::new();
    time::set_clock(clock.clone());
    clock
}

/// Command that journals `<name>.initialize`, `<name>.execute` and
/// `<name>.end(<interrupted>)`, and finishes when its flag is set.
pub struct MockCommand {
    name: String,
    journal: Journal,
    requirements: Requirements,
    finished: Rc<Cell<bool>>,
    runs_when_disabled: bool,
    behavior: InterruptionBehavior,
}

impl MockCommand {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            requirements: Requirements::new(),
            finished: Rc::new(Cell::new(false)),
            runs_when_disabled: false,
            behavior: InterruptionBehavior::CancelSelf,
        }
    }

    pub fn requiring(mut self, subsystem: &SubsystemRef) -> Self {
        self.requirements.insert(subsystem.clone());
        self
    }

    /// Finishes on its first check.
    pub fn instant(self) -> Self {
        self.finished.set(true);
        self
    }

    pub fn run_disabled(mut self, runs_when_disabled: bool) -> Self {
        self.runs_when_disabled = runs_when_disabled;
        self
    }

    pub fn cancel_incoming(mut self) -> Self {
        self.behavior = InterruptionBehavior::CancelIncoming;
        self
    }

    /// Flag controlling `is_finished`.
    pub fn finished_flag(&self) -> Rc<Cell<bool>> {
        self.finished.clone()
    }

    pub fn handle(self) -> CommandHandle {
        CommandHandle::new(self)
    }

    fn log(&self, event: String) {
        self.journal.borrow_mut().push(event);
    }
}

impl Command for MockCommand {
    fn initialize(&mut self) {
        self.log(format!("{}.initialize", self.name));
    }

    fn execute(&mut self) {
        self.log(format!("{}.execute", self.name));
    }

    fn end(&mut self, interrupted: bool) {
        self.log(format!("{}.end({interrupted})", self.name));
    }

    fn is_finished(&mut self) -> bool {
        self.finished.get()
    }

    fn requirements(&self) -> Requirements {
        self.requirements.clone()
    }

    fn runs_when_disabled(&self) -> bool {
        self.runs_when_disabled
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        self.behavior
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Subsystem journaling `<name>.periodic`.
pub struct JournalSubsystem {
    name: String,
    journal: Journal,
}

impl JournalSubsystem {
    pub fn new(name: &str, journal: &Journal) -> SubsystemRef {
        SubsystemRef::new(Self { name: name.to_string(), journal: journal.clone() })
    }
}

impl Subsystem for JournalSubsystem {
    fn periodic(&mut self) {
        self.journal.borrow_mut().push(format!("{}.periodic", self.name));
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Asserts that no two scheduled commands share a subsystem.
pub fn assert_exclusive(subsystems: &[SubsystemRef]) {
    let scheduler = CommandScheduler::instance();
    let scheduled = scheduler.scheduled_commands();
    for subsystem in subsystems {
        let holders = scheduled
            .iter()
            .filter(|c| c.requirements().contains(subsystem))
            .count();
        assert!(holders <= 1, "{} is held by {holders} commands", subsystem.name());
    }
}
