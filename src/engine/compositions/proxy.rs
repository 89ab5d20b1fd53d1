use crate::engine::command::{Command, CommandHandle};
use crate::engine::scheduler::CommandScheduler;


enum Source {
    Handle(CommandHandle),
    Supplier(Box<dyn FnMut() -> CommandHandle>),
}

/// Schedules a command independently of its own lifecycle.
///
/// The proxy requires nothing. It schedules the proxied command when
/// initialized, finishes once that command is no longer scheduled, and
/// cancels it if the proxy itself is interrupted. This is how a
/// composition can start work on subsystems it does not claim: the proxied
/// command competes for them through the scheduler like any other command.
///
/// Runs while disabled; the proxied command is gated by its own policy.
pub struct ProxyCommand {
    source: Source,
    current: Option<CommandHandle>,
}

impl ProxyCommand {
    /// Proxies a fixed command.
    pub fn new(command: CommandHandle) -> Self {
        Self { source: Source::Handle(command), current: None }
    }

    /// Proxies whatever command `supplier` returns at each initialize.
    pub fn from_supplier(supplier: impl FnMut() -> CommandHandle + 'static) -> Self {
        Self { source: Source::Supplier(Box::new(supplier)), current: None }
    }
}

impl Command for ProxyCommand {
    fn initialize(&mut self) {
        let command = match &mut self.source {
            Source::Handle(handle) => handle.clone(),
            Source::Supplier(supplier) => supplier(),
        };
        // errors are logged by the scheduler; the proxy then finishes at once
        let _ = CommandScheduler::instance().schedule(&command);
        self.current = Some(command);
    }

    fn end(&mut self, interrupted: bool) {
        if let Some(command) = self.current.take() {
            if interrupted {
                CommandScheduler::instance().cancel(&command);
            }
        }
    }

    fn is_finished(&mut self) -> bool {
        match &self.current {
            Some(command) => {
                let scheduler = CommandScheduler::instance();
                !(scheduler.is_scheduled(command) || scheduler.is_pending(command))
            }
            None => true,
        }
    }

    fn runs_when_disabled(&self) -> bool {
        true
    }

    fn name(&self) -> String {
        match &self.source {
            Source::Handle(handle) => format!("Proxy({})", handle.name()),
            Source::Supplier(_) => "Proxy(deferred)".to_string(),
        }
    }
}
