//! Core Scheduler Types and Identifiers
//!
//! This module defines the small, copyable types shared by every part of the
//! scheduler: identifiers, the interruption policy and the outcome of a
//! scheduling attempt.
//!
//! ## Identity
//!
//! Commands and subsystems are scheduled by *identity*, never by value. Two
//! structurally identical commands are distinct. Identity is carried by:
//!
//! - [`CommandID`], allocated once per [`CommandHandle`](crate::CommandHandle),
//! - [`SubsystemID`], derived from the shared allocation behind a
//!   [`SubsystemRef`](crate::SubsystemRef).

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};


/// Unique identifier of a command handle.
pub type CommandID = u64;
/// Identifier of a subsystem (address of its shared allocation).
pub type SubsystemID = usize;
/// Scheduler tick counter.
pub type Tick = u64;

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates a fresh, never-reused command identifier.
#[inline]
pub(crate) fn next_command_id() -> CommandID {
    NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed)
}

/// Returns the last path segment of a type name, keeping generic arguments
/// readable (`RunCommand`, `SelectCommand<u8>`).
pub(crate) fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    let short = base.rsplit("::").next().unwrap_or(base);
    match full.find('<') {
        Some(generic_start) => format!("{}{}", short, &full[generic_start..]),
        None => short.to_string(),
    }
}

/// Policy applied when another command that shares a requirement is
/// scheduled while this command is running.
///
/// ## Semantics
/// The policy only governs *implicit* cancellation caused by a conflicting
/// schedule. An explicit [`CommandScheduler::cancel`](crate::CommandScheduler::cancel)
/// always ends the command.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InterruptionBehavior {
    /// The running command ends with `end(true)` and the incoming command is
    /// scheduled. This is the default.
    #[default]
    CancelSelf,

    /// The running command continues and the incoming command is not
    /// scheduled.
    CancelIncoming,
}

impl InterruptionBehavior {
    /// Stable name used for telemetry.
    pub fn as_str(self) -> &'static str {
        match self {
            InterruptionBehavior::CancelSelf => "kCancelSelf",
            InterruptionBehavior::CancelIncoming => "kCancelIncoming",
        }
    }
}

/// Result of a successful (non-erroneous) call to
/// [`CommandScheduler::schedule`](crate::CommandScheduler::schedule).
///
/// None of these outcomes is an error: they describe the normal control flow
/// of scheduling, including the idempotent no-op cases.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// The command was initialized and is now scheduled.
    Scheduled,

    /// The command was already scheduled; nothing happened.
    AlreadyScheduled,

    /// The call happened while the scheduler was executing commands; the
    /// request is queued and applied once the command loop completes.
    Deferred,

    /// A running command with [`InterruptionBehavior::CancelIncoming`]
    /// holds one of the requirements. The incoming command was not scheduled.
    Blocked {
        /// Command that refused the interruption.
        by: CommandID,
    },

    /// The scheduler itself is disabled.
    SchedulerDisabled,

    /// The robot is disabled and the command does not run when disabled.
    RobotDisabled,
}

impl ScheduleOutcome {
    /// Whether the command is scheduled (or queued to be) after the call.
    pub fn is_scheduled(self) -> bool {
        matches!(
            self,
            ScheduleOutcome::Scheduled | ScheduleOutcome::AlreadyScheduled | ScheduleOutcome::Deferred
        )
    }
}
