use crate::error::DeferReason;
use bevy::prelude::*;
use std::fmt;

/// Terminal status of one mining operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MiningStatus {
    Completed,
    CompletedWithRemainder,
    Failed,
    Cancelled,
}

impl fmt::Display for MiningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiningStatus::Completed => f.write_str("completed"),
            MiningStatus::CompletedWithRemainder => f.write_str("completed with remainder"),
            MiningStatus::Failed => f.write_str("failed"),
            MiningStatus::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnreachableBlock {
    pub position: IVec3,
    pub reason: DeferReason,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionStats {
    pub moves: usize,
    pub digs: usize,
    /// Acknowledged failures of either kind.
    pub failed: usize,
    /// Non-target cells removed while repositioning or sinking shafts.
    pub excavated: usize,
}

/// Structured result handed back to the caller.
#[derive(Clone, Debug, PartialEq)]
pub struct MiningReport {
    pub status: MiningStatus,
    /// Removed targets, in removal order.
    pub mined: Vec<IVec3>,
    /// Targets found to be air already when their turn came.
    pub skipped: Vec<IVec3>,
    /// Targets given up on, with their last reason.
    pub unreachable: Vec<UnreachableBlock>,
    /// Targets never tried because the operation stopped early.
    pub unfinished: Vec<IVec3>,
    /// Passes over the plan, the first one included.
    pub passes: u32,
    pub regroup_attempts: u32,
    pub inline_retries: u32,
    pub shafts: u32,
    pub stats: ActionStats,
    /// Why the operation failed, only set for [`MiningStatus::Failed`].
    pub failure: Option<String>,
}

impl MiningReport {
    pub fn empty(status: MiningStatus) -> Self {
        Self {
            status,
            mined: Vec::new(),
            skipped: Vec::new(),
            unreachable: Vec::new(),
            unfinished: Vec::new(),
            passes: 0,
            regroup_attempts: 0,
            inline_retries: 0,
            shafts: 0,
            stats: ActionStats::default(),
            failure: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, MiningStatus::Completed | MiningStatus::CompletedWithRemainder)
    }
}

impl fmt::Display for MiningReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: mined {}, skipped {}, unreachable {}, unfinished {} ({} passes, {} shafts, {} moves, {} digs, {} excavated)",
            self.status,
            self.mined.len(),
            self.skipped.len(),
            self.unreachable.len(),
            self.unfinished.len(),
            self.passes,
            self.shafts,
            self.stats.moves,
            self.stats.digs,
            self.stats.excavated,
        )?;
        if let Some(failure) = &self.failure {
            write!(f, ", failure: {failure}")?;
        }
        Ok(())
    }
}
