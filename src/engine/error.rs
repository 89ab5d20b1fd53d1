//! Error types for scheduling and command composition.
//!
//! The scheduler separates three kinds of conditions:
//!
//! * **Programmer errors** — composing a command twice, scheduling a command
//!   that belongs to a composition, building a composition whose children
//!   share a subsystem, or registering a default command that does not
//!   require its subsystem. These are returned as [`SchedulerError`] values
//!   (and logged at `error` level) so they surface during development.
//! * **Expected non-events** — scheduling an already scheduled command or
//!   cancelling an idle one. These are not errors; see
//!   [`ScheduleOutcome`](crate::ScheduleOutcome).
//! * **Resolution conflicts** — a running `CancelIncoming` command refusing
//!   an incoming one. Also not an error.
//!
//! ## Display vs. Debug
//! * [`std::fmt::Display`] messages name the offending command or subsystem
//!   and are written for logs.
//! * [`std::fmt::Debug`] (derived) retains the full structure.

use thiserror::Error as ThisError;

use crate::engine::config::ConfigError;


/// Convenience alias used throughout the scheduler.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Returned when a composition cannot be built from the given children.
///
/// ## Context
/// Compositions claim the union of their children's requirements. Children
/// of a sequential or parallel composition must have pairwise-disjoint
/// requirement sets; anything else is rejected at construction instead of
/// being silently merged.

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum CompositionError {
    /// Two children of the composition require the same subsystem.
    #[error("multiple commands in a {kind} composition cannot require the same subsystem `{subsystem}`")]
    SharedRequirement {
        /// Composition kind (`sequential`, `parallel`, `race`, `deadline`).
        kind: &'static str,

        /// Name of the subsystem required more than once.
        subsystem: String,
    },

    /// The command handle already belongs to a composition.
    #[error("command `{name}` is already part of a composition and may not be composed again")]
    AlreadyComposed {
        /// Name of the command.
        name: String,
    },

    /// The command handle is scheduled on its own.
    #[error("command `{name}` is scheduled individually and may not be added to a composition")]
    ScheduledCommand {
        /// Name of the command.
        name: String,
    },
}

/// Aggregate error for the scheduler API.
///
/// `From` conversions allow `?` from composition and configuration code.

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum SchedulerError {
    /// A command owned by a composition was passed to the scheduler.
    #[error("command `{name}` is part of a composition and cannot be scheduled independently")]
    ComposedCommand {
        /// Name of the command.
        name: String,
    },

    /// A default command does not require the subsystem it is assigned to.
    #[error("default command `{command}` must require subsystem `{subsystem}`")]
    DefaultCommandMissingRequirement {
        /// Name of the default command.
        command: String,

        /// Name of the subsystem.
        subsystem: String,
    },

    /// The per-thread scheduler instance was already created.
    #[error("command scheduler has already been initialized on this thread")]
    AlreadyInitialized,

    /// Invalid composition.
    #[error(transparent)]
    Composition(#[from] CompositionError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
