pub mod error;
pub mod executor;
pub mod operation;
pub mod pathing;
pub mod planner;
pub mod report;

use crate::operation::{excavate, CancelToken};
use crate::report::MiningReport;
use bevy::prelude::*;
use futures_lite::future;
use miner_core::agent::Actuator;
use miner_core::configuration::MiningConfig;
use miner_core::world::BlockMutator;
use miner_core::MiningStage;
use std::marker::PhantomData;

/// Asks for one mining operation over a raw selection.
#[derive(Event, Clone, Debug, Default)]
pub struct MiningRequest {
    pub selection: Vec<IVec3>,
    pub cancel: CancelToken,
}

/// Sent once per [`MiningRequest`] with its report.
#[derive(Event, Clone, Debug)]
pub struct MiningFinished {
    pub report: MiningReport,
}

/// Runs mining requests against the world resource `W` with the agent resource `A`.
pub struct MiningPlugin<W, A> {
    _marker: PhantomData<fn() -> (W, A)>,
}

impl<W, A> Default for MiningPlugin<W, A> {
    fn default() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<W, A> Plugin for MiningPlugin<W, A>
where
    W: BlockMutator + Resource,
    A: Actuator + Resource,
{
    fn build(&self, app: &mut App) {
        app.add_event::<MiningRequest>();
        app.add_event::<MiningFinished>();
        app.add_systems(
            Update,
            run_mining_requests::<W, A>
                .in_set(MiningStage::Execute)
                .run_if(resource_exists::<W>.and(resource_exists::<A>)),
        );
    }
}

/// Executes every pending request to completion within the frame.
fn run_mining_requests<W, A>(
    mut requests: EventReader<MiningRequest>,
    mut finished: EventWriter<MiningFinished>,
    config: Res<MiningConfig>,
    mut world: ResMut<W>,
    mut agent: ResMut<A>,
) where
    W: BlockMutator + Resource,
    A: Actuator + Resource,
{
    for request in requests.read() {
        debug!("Mining request over {} position(s)", request.selection.len());
        let report = future::block_on(excavate(
            &mut *world,
            &mut *agent,
            &request.selection,
            &config,
            &request.cancel,
        ));
        finished.write(MiningFinished { report });
    }
}

// =================================================================================================
//
//                                            Unit Tests
//
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MiningStatus;
    use miner_core::world::block::BlockRegistry;
    use miner_core::MinerCorePlugin;
    use miner_world::sim_agent::SimActuator;
    use miner_world::voxel_world::VoxelWorld;

    #[test]
    fn test_plugin_answers_requests() {
        let mut world = VoxelWorld::new(BlockRegistry::default());
        world.fill_box(IVec3::ZERO, IVec3::new(1, 1, 0), "stone_block");
        let agent = SimActuator::new(&world, IVec3::new(0, 3, 0));

        let mut app = App::new();
        app.add_plugins((MinerCorePlugin, MiningPlugin::<VoxelWorld, SimActuator>::default()));
        app.insert_resource(world);
        app.insert_resource(agent);

        app.world_mut().send_event(MiningRequest {
            selection: vec![IVec3::ZERO, IVec3::new(1, 0, 0), IVec3::new(0, 1, 0), IVec3::new(1, 1, 0)],
            ..default()
        });
        app.update();

        let events = app.world().resource::<Events<MiningFinished>>();
        let mut cursor = events.get_cursor();
        let reports: Vec<&MiningFinished> = cursor.read(events).collect();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].report.status, MiningStatus::Completed);
        assert_eq!(reports[0].report.mined.len(), 4);
        assert_eq!(app.world().resource::<SimActuator>().successful(miner_core::agent::ActionKind::Dig), 4);
    }
}
