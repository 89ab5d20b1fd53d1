//! # Requirement Tracking Module
//!
//! This module implements **exclusive subsystem ownership** for scheduled
//! commands.
//!
//! ## Purpose
//!
//! The scheduler enforces one rule at runtime:
//!
//! - At most one scheduled command may hold a given subsystem.
//!
//! Equivalently, the requirement sets of all scheduled commands are pairwise
//! disjoint. The rule is established at schedule time (conflicting holders
//! are interrupted or the incoming command is refused) and never violated
//! once a scheduling call returns.
//!
//! ## Ownership Table
//!
//! | Entry | Meaning |
//! |------:|--------|
//! | absent | Subsystem is free |
//! | `subsystem → id` | Command `id` holds the subsystem |
//!
//! Releasing only removes entries still held by the releasing command, so a
//! command that ends while another command claims its subsystems (for
//! instance from inside its own `end`) cannot release the newcomer's claim.
//!
//! ## Compositions
//!
//! [`aggregate_disjoint`] builds the requirement union of a composition's
//! children and rejects children that overlap, so the table invariant holds
//! transitively through nesting.

use indexmap::{IndexMap, IndexSet};

use crate::engine::error::CompositionError;
use crate::engine::subsystem::SubsystemRef;
use crate::engine::types::CommandID;


/// Set of subsystems a command needs exclusive access to.
///
/// Insertion-ordered so iteration (and therefore conflict resolution order)
/// is deterministic.
pub type Requirements = IndexSet<SubsystemRef>;

/// Collects subsystem references into a [`Requirements`] set.
pub fn requirements<I>(subsystems: I) -> Requirements
where
    I: IntoIterator<Item = SubsystemRef>,
{
    subsystems.into_iter().collect()
}

/// Unions requirement sets, failing if any subsystem appears in more than one.
///
/// ## Errors
/// [`CompositionError::SharedRequirement`] naming the first shared subsystem.
pub fn aggregate_disjoint<'a, I>(kind: &'static str, sets: I) -> Result<Requirements, CompositionError>
where
    I: IntoIterator<Item = &'a Requirements>,
{
    let mut union = Requirements::new();
    for set in sets {
        for subsystem in set {
            if !union.insert(subsystem.clone()) {
                return Err(CompositionError::SharedRequirement {
                    kind,
                    subsystem: subsystem.name().to_string(),
                });
            }
        }
    }
    Ok(union)
}

/// Unions requirement sets without checking for overlap.
pub fn aggregate<'a, I>(sets: I) -> Requirements
where
    I: IntoIterator<Item = &'a Requirements>,
{
    sets.into_iter().flat_map(|set| set.iter().cloned()).collect()
}

/// Subsystem → holder table owned by the scheduler.
#[derive(Debug, Default)]
pub(crate) struct RequirementTable {
    holders: IndexMap<SubsystemRef, CommandID>,
}

impl RequirementTable {
    /// Command currently holding `subsystem`.
    #[inline]
    pub(crate) fn holder(&self, subsystem: &SubsystemRef) -> Option<CommandID> {
        self.holders.get(subsystem).copied()
    }

    /// Distinct holders of any subsystem in `requirements`, in requirement
    /// order.
    pub(crate) fn conflicts(&self, requirements: &Requirements) -> Vec<CommandID> {
        let mut out: Vec<CommandID> = Vec::new();
        for subsystem in requirements {
            if let Some(holder) = self.holder(subsystem) {
                if !out.contains(&holder) {
                    out.push(holder);
                }
            }
        }
        out
    }

    /// Records `command` as the holder of every subsystem in `requirements`.
    pub(crate) fn claim(&mut self, requirements: &Requirements, command: CommandID) {
        for subsystem in requirements {
            self.holders.insert(subsystem.clone(), command);
        }
    }

    /// Frees the subsystems in `requirements` that `command` still holds.
    pub(crate) fn release(&mut self, requirements: &Requirements, command: CommandID) {
        for subsystem in requirements {
            if self.holder(subsystem) == Some(command) {
                self.holders.shift_remove(subsystem);
            }
        }
    }
}
