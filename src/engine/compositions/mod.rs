//! # Command Compositions
//!
//! Commands built from other commands. Every composition exclusively owns
//! its children (moved in at construction) and drives their lifecycle
//! according to its own state machine:
//!
//! | Type | Finishes when | Ends children with |
//! |------|---------------|--------------------|
//! | [`SequentialCommandGroup`] | last child finishes | `end(interrupted)` on the current child |
//! | [`ParallelCommandGroup`] | all children finish | `end(interrupted)` on running children |
//! | [`ParallelRaceGroup`] | any child finishes | `end(!child.is_finished())` on every child |
//! | [`ParallelDeadlineGroup`] | the deadline finishes | `end(true)` on running children |
//! | [`ConditionalCommand`], [`SelectCommand`] | the selected child finishes | `end(interrupted)` on the selected child |
//! | [`DeferredCommand`] | the supplied child finishes | `end(interrupted)` on the supplied child |
//! | [`RepeatCommand`] | never | `end(interrupted)` unless already ended |
//! | [`ProxyCommand`] | the proxied command is unscheduled | cancels it if interrupted |
//!
//! ## Requirements
//!
//! A composition requires the union of its children's requirements.
//! Sequential and parallel groups reject children whose requirement sets
//! overlap; conditional compositions merge them since only one branch runs.
//! [`ProxyCommand`] is the exception: it requires nothing, which lets a
//! composition hand work to the scheduler without claiming its subsystems.
//!
//! ## Metadata
//!
//! * `runs_when_disabled` is true only if every child runs when disabled.
//! * `interruption_behavior` is `CancelIncoming` if any child is.

mod conditional;
mod deferred;
mod parallel;
mod proxy;
mod sequential;
mod wrapper;

pub use conditional::{ConditionalCommand, SelectCommand};
pub use deferred::DeferredCommand;
pub use parallel::{ParallelCommandGroup, ParallelDeadlineGroup, ParallelRaceGroup};
pub use proxy::ProxyCommand;
pub use sequential::SequentialCommandGroup;
pub use wrapper::{RepeatCommand, WrapperCommand};

use crate::engine::command::Command;
use crate::engine::error::CompositionError;
use crate::engine::requirements::{aggregate, aggregate_disjoint, Requirements};
use crate::engine::types::InterruptionBehavior;


/// Metadata shared by every multi-child composition.
#[derive(Debug, Clone, Default)]
pub(crate) struct Aggregate {
    pub(crate) requirements: Requirements,
    pub(crate) runs_when_disabled: bool,
    pub(crate) interruption_behavior: InterruptionBehavior,
}

impl Aggregate {
    /// Computes metadata for `children` and claims them for a composition.
    ///
    /// With `kind` set, overlapping requirements are rejected and reported
    /// under that composition kind. Children are only marked composed once
    /// the requirement check has passed, and a child that cannot be claimed
    /// releases the ones claimed before it.
    pub(crate) fn claim(
        kind: Option<&'static str>,
        children: &mut [Box<dyn Command>],
    ) -> Result<Self, CompositionError> {
        let sets: Vec<Requirements> = children.iter().map(|c| c.requirements()).collect();
        let requirements = match kind {
            Some(kind) => aggregate_disjoint(kind, &sets)?,
            None => aggregate(&sets),
        };

        let runs_when_disabled = children.iter().all(|c| c.runs_when_disabled());
        let interruption_behavior = if children
            .iter()
            .any(|c| c.interruption_behavior() == InterruptionBehavior::CancelIncoming)
        {
            InterruptionBehavior::CancelIncoming
        } else {
            InterruptionBehavior::CancelSelf
        };

        for i in 0..children.len() {
            if let Err(err) = children[i].mark_composed() {
                for claimed in &mut children[..i] {
                    claimed.unmark_composed();
                }
                return Err(err);
            }
        }

        Ok(Self { requirements, runs_when_disabled, interruption_behavior })
    }
}
