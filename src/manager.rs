use bevy::prelude::*;
use miner_core::events::world_events::ChunkRegeneratedEvent;
use miner_core::{MinerCorePlugin, MiningStage};
use miner_logic::report::MiningStatus;
use miner_logic::{MiningFinished, MiningPlugin, MiningRequest};
use miner_world::sim_agent::SimActuator;
use miner_world::terrain::SimulationConfig;
use miner_world::voxel_world::VoxelWorld;
use miner_world::WorldSimPlugin;

pub struct ManagerPlugin;

impl Plugin for ManagerPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            MinerCorePlugin,
            WorldSimPlugin,
            MiningPlugin::<VoxelWorld, SimActuator>::default(),
        ));

        app.add_systems(Update, (
            request_configured_selection
                .in_set(MiningStage::Request)
                .run_if(resource_exists::<VoxelWorld>.and(run_once)),
            log_regenerated_chunks.in_set(MiningStage::Publish),
            report_and_exit.in_set(MiningStage::Publish),
        ));
    }
}

fn request_configured_selection(
    config: Res<SimulationConfig>,
    mut requests: EventWriter<MiningRequest>,
) {
    let selection = config.selection();
    info!("Requesting {} position(s) from the configured selection", selection.len());
    requests.write(MiningRequest { selection, ..default() });
}

fn log_regenerated_chunks(mut regenerated: EventReader<ChunkRegeneratedEvent>) {
    for event in regenerated.read() {
        debug!("Chunk {} regenerated", event.coord);
    }
}

fn report_and_exit(
    mut finished: EventReader<MiningFinished>,
    mut exit: EventWriter<AppExit>,
) {
    for MiningFinished { report } in finished.read() {
        for block in &report.unreachable {
            warn!("Unreachable {}: {}", block.position, block.reason);
        }
        match report.status {
            MiningStatus::Failed => {
                error!("{}", report);
                exit.write(AppExit::error());
            }
            _ => {
                info!("{}", report);
                exit.write(AppExit::Success);
            }
        }
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

    #[test]
    fn test_configured_job_runs_and_exits() {
        let mut app = App::new();
        app.insert_resource(SimulationConfig {
            terrain_radius: 6,
            agent_start: [0, 12, 0],
            selection_min: [-1, 6, -1],
            selection_max: [1, 8, 1],
            ..default()
        });
        app.add_plugins(ManagerPlugin);

        app.update();

        assert!(app.should_exit().is_some());
        let agent = app.world().resource::<SimActuator>();
        assert!(agent.successful(miner_core::agent::ActionKind::Dig) > 0);
    }
}
