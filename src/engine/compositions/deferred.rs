use log::{error, warn};

use crate::engine::command::Command;
use crate::engine::requirements::{requirements, Requirements};
use crate::engine::subsystem::SubsystemRef;


/// Placeholder child used before the first initialize and after every end.
///
/// Lifecycle calls reaching it indicate a call-order bug in the enclosing
/// code, so each one is logged.
struct NullCommand;

impl Command for NullCommand {
    fn initialize(&mut self) {
        warn!("DeferredCommand: initialize reached the placeholder command");
    }

    fn execute(&mut self) {
        warn!("DeferredCommand: execute called outside an activation");
    }

    fn end(&mut self, _interrupted: bool) {
        warn!("DeferredCommand: end called outside an activation");
    }

    fn is_finished(&mut self) -> bool {
        true
    }
}

/// Builds a fresh child from a supplier on every initialize.
///
/// The child is never reused across activations. Because the child is not
/// known up front, requirements are declared at construction and should
/// cover anything the supplier may return.
pub struct DeferredCommand {
    supplier: Box<dyn FnMut() -> Box<dyn Command>>,
    current: Box<dyn Command>,
    requirements: Requirements,
}

impl DeferredCommand {
    /// Creates the command.
    pub fn new(
        supplier: impl FnMut() -> Box<dyn Command> + 'static,
        requirements: impl IntoIterator<Item = SubsystemRef>,
    ) -> Self {
        Self {
            supplier: Box::new(supplier),
            current: Box::new(NullCommand),
            requirements: self::requirements(requirements),
        }
    }
}

impl Command for DeferredCommand {
    fn initialize(&mut self) {
        let mut command = (self.supplier)();
        self.current = match command.mark_composed() {
            Ok(()) => command,
            Err(err) => {
                error!("DeferredCommand: supplied command rejected: {err}");
                Box::new(NullCommand)
            }
        };
        self.current.initialize();
    }

    fn execute(&mut self) {
        self.current.execute();
    }

    fn end(&mut self, interrupted: bool) {
        self.current.end(interrupted);
        self.current = Box::new(NullCommand);
    }

    fn is_finished(&mut self) -> bool {
        self.current.is_finished()
    }

    fn requirements(&self) -> Requirements {
        self.requirements.clone()
    }
}
