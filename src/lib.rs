//! # Command Framework
//!
//! Cooperative, single-threaded command scheduler for periodic control loops.
//!
//! ## Design Goals
//! - Deterministic, tick-driven execution (one [`CommandScheduler::run`] per
//!   control cycle)
//! - Exclusive subsystem ownership enforced at schedule time
//! - Composable behaviour: sequences, parallel groups, races, deadlines,
//!   conditionals and decorators built from plain commands
//! - Edge-triggered bindings that schedule and cancel commands while the
//!   scheduler polls
//!
//! Commands are plain Rust values implementing [`Command`]. Anything the
//! scheduler must identify (scheduled commands, trigger bindings, default
//! commands) goes through a [`CommandHandle`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(dead_code)]
#![allow(clippy::module_inception)]

pub mod engine;
pub mod profiling;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

pub use engine::scheduler::CommandScheduler;

pub use engine::command::{
    Command,
    CommandExt,
    CommandHandle,
};

pub use engine::subsystem::{
    NamedSubsystem,
    Subsystem,
    SubsystemRef,
};

pub use engine::requirements::Requirements;

pub use engine::commands::{
    FunctionalCommand,
    InstantCommand,
    PrintCommand,
    RunCommand,
    ScheduleCommand,
    StartEndCommand,
    WaitCommand,
    WaitUntilCommand,
};

pub use engine::compositions::{
    ConditionalCommand,
    DeferredCommand,
    ParallelCommandGroup,
    ParallelDeadlineGroup,
    ParallelRaceGroup,
    ProxyCommand,
    RepeatCommand,
    SelectCommand,
    SequentialCommandGroup,
    WrapperCommand,
};

pub use engine::event_loop::EventLoop;
pub use engine::trigger::{DebounceType, Debouncer, Trigger};

pub use engine::config::{ConfigError, ConflictResolution, SchedulerConfig};

pub use engine::error::{
    CompositionError,
    SchedulerError,
    SchedulerResult,
};

pub use engine::types::{
    CommandID,
    InterruptionBehavior,
    ScheduleOutcome,
    SubsystemID,
    Tick,
};

pub use engine::telemetry::{MemorySink, TelemetrySink, TelemetryValue};
pub use engine::time::{Clock, ManualClock, MonotonicClock, Timer};

pub use engine::cmd;
pub use profiling::profiler;

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used scheduler types.
///
/// Import with:
/// ```rust
/// use command_framework::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        cmd,
        Command,
        CommandExt,
        CommandHandle,
        CommandScheduler,
        InterruptionBehavior,
        ScheduleOutcome,
        Subsystem,
        SubsystemRef,
        Trigger,
    };
}
