pub mod filter;
pub mod grouper;
pub mod plan;
pub mod sequencer;

use crate::planner::grouper::{group_columns, Column};
use crate::planner::sequencer::sequence_columns;
use bevy::prelude::*;
use miner_core::configuration::{ColumnDirection, MiningPattern};

/// Grouper followed by sequencer, the only way any working set becomes an order.
pub fn order_columns(
    positions: &[IVec3],
    direction: ColumnDirection,
    agent_xz: IVec2,
    pattern: MiningPattern,
) -> Vec<Column> {
    sequence_columns(group_columns(positions, direction), agent_xz, pattern)
}
