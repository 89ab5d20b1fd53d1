#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use command_framework::{
    cmd,
    CommandExt,
    CommandHandle,
    CommandScheduler,
    SubsystemRef,
};

pub const COMMANDS_SMALL: usize = 16;
pub const COMMANDS_MED: usize = 256;
pub const COMMANDS_LARGE: usize = 4_096;

/// Fresh scheduler with `count` registered subsystems.
pub fn setup_scheduler(count: usize) -> (CommandScheduler, Vec<SubsystemRef>) {
    CommandScheduler::reset_instance();
    let scheduler = CommandScheduler::instance();
    let subsystems: Vec<SubsystemRef> = (0..count)
        .map(|i| SubsystemRef::named(format!("subsystem{i}")))
        .collect();
    (scheduler, subsystems)
}

/// One never-finishing command per subsystem, each bumping a shared counter.
pub fn run_commands(subsystems: &[SubsystemRef], counter: &Rc<Cell<u64>>) -> Vec<CommandHandle> {
    subsystems
        .iter()
        .map(|subsystem| {
            let counter = counter.clone();
            subsystem
                .run(move || counter.set(counter.get() + 1))
                .into_handle()
        })
        .collect()
}

/// An idle default command on every subsystem.
pub fn idle_defaults(subsystems: &[SubsystemRef]) {
    for subsystem in subsystems {
        // infallible: the idle command requires its own subsystem
        let _ = subsystem.set_default_command(cmd::idle([subsystem.clone()]).into_handle());
    }
}
