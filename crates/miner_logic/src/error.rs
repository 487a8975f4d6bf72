use bevy::prelude::*;
use miner_core::agent::ActionKind;
use std::fmt;
use thiserror::Error;

/// Everything that can go wrong while reaching or digging a block.
///
/// Only [`DigError::is_fatal`] variants leave the executor; the rest are converted to a
/// [`DeferReason`] and handled by the defer and retry machinery.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DigError {
    #[error("block at {position} is currently unreachable ({reason})")]
    TransientUnreachable { position: IVec3, reason: DeferReason },

    #[error("block at {position} stayed unreachable after {passes} passes ({reason})")]
    PermanentlyUnreachable { position: IVec3, passes: u32, reason: DeferReason },

    #[error("protected block '{block}' at {at} obstructs the path")]
    UnbreakableObstruction { at: IVec3, block: String },

    #[error("actuator failed to {action} {at} after {attempts} attempts")]
    ActuatorFailure { action: ActionKind, at: IVec3, attempts: u32 },

    #[error("world state at {0} contradicts the plan")]
    WorldStateDesync(IVec3),

    #[error("agent did not leave {0} after repeated moves")]
    Stuck(IVec3),

    #[error("no standable cell next to {0} can be reached")]
    NoAccessPath(IVec3),

    #[error("reaching {target} needs {needed} excavated cells, budget is {budget}")]
    ExcavationBudgetExhausted { target: IVec3, needed: u32, budget: u32 },

    #[error("cell {0} is blocked and excavation is disabled")]
    ExcavationDisabled(IVec3),

    #[error("agent position signal lost")]
    AgentPositionLost,

    #[error("agent ran out of fuel")]
    FuelExhausted,
}

impl DigError {
    /// Conditions that make continuing the operation meaningless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DigError::AgentPositionLost | DigError::FuelExhausted)
    }

    /// Reason code recorded when the failing block gets deferred.
    pub fn reason(&self) -> DeferReason {
        match self {
            DigError::TransientUnreachable { reason, .. } => reason.clone(),
            DigError::PermanentlyUnreachable { reason, .. } => reason.clone(),
            DigError::UnbreakableObstruction { block, .. } => DeferReason::UnbreakableObstruction(block.clone()),
            DigError::ActuatorFailure { .. } => DeferReason::ActuatorFailure,
            DigError::Stuck(_) => DeferReason::Stuck,
            DigError::NoAccessPath(_) => DeferReason::NoAccessPath,
            DigError::ExcavationBudgetExhausted { .. } => DeferReason::ExcavationBudgetExhausted,
            DigError::ExcavationDisabled(_) => DeferReason::ExcavationDisabled,
            DigError::WorldStateDesync(_) => DeferReason::NoAccessPath,
            DigError::AgentPositionLost | DigError::FuelExhausted => DeferReason::Aborted,
        }
    }
}

/// Reason code of a deferred or permanently unreachable block.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeferReason {
    /// No standable cell next to the block is reachable, not even by excavation.
    NoAccessPath,
    /// A policy-protected block is in the way.
    UnbreakableObstruction(String),
    /// Reaching the block would need more excavation than allowed.
    ExcavationBudgetExhausted,
    /// A blocking cell needs digging but excavation is off.
    ExcavationDisabled,
    /// The agent stopped moving.
    Stuck,
    /// Move or dig kept failing.
    ActuatorFailure,
    /// Part of a column whose earlier block failed.
    ColumnAbandoned,
    /// The operation stopped before the block was tried again.
    Aborted,
}

impl fmt::Display for DeferReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferReason::NoAccessPath => f.write_str("no access path"),
            DeferReason::UnbreakableObstruction(block) => write!(f, "obstructed by {block}"),
            DeferReason::ExcavationBudgetExhausted => f.write_str("excavation budget exhausted"),
            DeferReason::ExcavationDisabled => f.write_str("excavation disabled"),
            DeferReason::Stuck => f.write_str("agent stuck"),
            DeferReason::ActuatorFailure => f.write_str("actuator failure"),
            DeferReason::ColumnAbandoned => f.write_str("column abandoned"),
            DeferReason::Aborted => f.write_str("aborted"),
        }
    }
}
