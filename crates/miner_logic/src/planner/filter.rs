use bevy::prelude::*;
use miner_core::configuration::BlockPolicy;
use miner_core::world::BlockOracle;
use std::collections::HashSet;

/// Drops selection noise: duplicates, non-solid cells and policy-protected blocks.
///
/// Keeps the first occurrence of every position in input order. Pure read; the world is
/// only queried.
pub fn filter_selection<O: BlockOracle + ?Sized>(
    selection: &[IVec3],
    oracle: &O,
    policy: &BlockPolicy,
) -> Vec<IVec3> {
    let mut seen = HashSet::with_capacity(selection.len());
    let mut out = Vec::new();

    for &pos in selection {
        if !seen.insert(pos) { continue; }
        if !oracle.is_block_solid(pos) { continue; }
        match oracle.block_type(pos) {
            Some(block) if policy.is_protected(&block) => {
                trace!("Skipping protected {} at {}", block, pos);
            }
            _ => out.push(pos),
        }
    }

    debug!("Selection filter kept {} of {} positions", out.len(), selection.len());
    out
}

// =================================================================================================
//
//                                            Unit Tests
//
// =================================================================================================
