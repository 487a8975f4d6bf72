#![allow(dead_code)]

use bevy::prelude::*;
use futures_lite::future::block_on;
use miner_core::configuration::MiningConfig;
use miner_core::world::block::BlockRegistry;
use miner_core::world::{column_key, BlockMutator};
use miner_core::agent::Actuator;
use miner_logic::operation::{excavate, CancelToken};
use miner_logic::report::MiningReport;
use miner_world::listener::NotificationLog;
use miner_world::voxel_world::VoxelWorld;
use std::collections::HashSet;

pub fn world_with_log() -> (VoxelWorld, NotificationLog) {
    let log = NotificationLog::default();
    let world = VoxelWorld::new(BlockRegistry::default()).with_listener(log.clone());
    (world, log)
}

pub fn run<W: BlockMutator, A: Actuator>(
    world: &mut W,
    agent: &mut A,
    selection: &[IVec3],
    config: &MiningConfig,
) -> MiningReport {
    block_on(excavate(world, agent, selection, config, &CancelToken::default()))
}

/// Every position of the inclusive box.
pub fn cuboid(min: IVec3, max: IVec3) -> Vec<IVec3> {
    let mut out = Vec::new();
    for y in min.y..=max.y {
        for z in min.z..=max.z {
            for x in min.x..=max.x {
                out.push(IVec3::new(x, y, z));
            }
        }
    }
    out
}

/// Horizontal keys of the runs in an execution order.
pub fn column_runs(order: &[IVec3]) -> Vec<IVec2> {
    let mut runs: Vec<IVec2> = Vec::new();
    for &p in order {
        let key = column_key(p);
        if runs.last() != Some(&key) {
            runs.push(key);
        }
    }
    runs
}

/// No column shows up in two separate runs.
pub fn assert_columns_contiguous(order: &[IVec3]) {
    let runs = column_runs(order);
    let unique: HashSet<IVec2> = runs.iter().copied().collect();
    assert_eq!(unique.len(), runs.len(), "interleaved columns in {:?}", order);
}
