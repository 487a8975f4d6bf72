use crate::executor::MiningExecutor;
use crate::planner::filter::filter_selection;
use crate::report::{MiningReport, MiningStatus};
use bevy::prelude::*;
use miner_core::agent::Actuator;
use miner_core::configuration::MiningConfig;
use miner_core::world::BlockMutator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative stop signal, shared between the caller and a running operation.
///
/// Only looked at between plan steps; an action in flight always completes.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Mines a raw selection: filter, plan and execute.
///
/// # Parameters
/// - `world`: block store the removals are written to; it notifies its own listeners.
/// - `agent`: actuator for the physical moves and digs.
/// - `selection`: target coordinates in any order, duplicates and air allowed.
/// - `config`: pattern, direction, retry and excavation limits.
/// - `cancel`: checked between steps.
///
/// # Returns
/// The structured [`MiningReport`]. A selection without minable blocks completes
/// immediately without a single action.
pub async fn excavate<W: BlockMutator, A: Actuator>(
    world: &mut W,
    agent: &mut A,
    selection: &[IVec3],
    config: &MiningConfig,
    cancel: &CancelToken,
) -> MiningReport {
    let policy = config.policy();
    let targets = filter_selection(selection, &*world, &policy);

    if targets.is_empty() {
        info!("Nothing to mine in a selection of {} position(s)", selection.len());
        return MiningReport::empty(MiningStatus::Completed);
    }

    MiningExecutor::new(world, agent, config, policy, targets, cancel.clone())
        .run()
        .await
}
