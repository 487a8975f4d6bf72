pub mod listener;
pub mod shared;
pub mod sim_agent;
pub mod terrain;
pub mod voxel_world;

use crate::listener::NotificationLog;
use crate::sim_agent::SimActuator;
use crate::terrain::{generate_terrain, SimulationConfig};
use crate::voxel_world::VoxelWorld;
use bevy::prelude::*;
use miner_core::events::world_events::{BlockRemovedEvent, ChunkRegeneratedEvent};
use miner_core::world::block::BlockRegistry;
use miner_core::world::chunk_dim::chunk_of;
use miner_core::world::WorldNotification;
use miner_core::MiningStage;

/// Builds the simulated world and agent, and republishes world notifications as Bevy events.
pub struct WorldSimPlugin;

impl Plugin for WorldSimPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimulationConfig>();
        app.init_resource::<BlockRegistry>();
        app.init_resource::<NotificationLog>();
        app.add_systems(Startup, spawn_sim_world);
        app.add_systems(Update, forward_world_notifications.in_set(MiningStage::Publish));
    }
}

fn spawn_sim_world(
    mut commands: Commands,
    config: Res<SimulationConfig>,
    registry: Res<BlockRegistry>,
    log: Res<NotificationLog>,
) {
    let world = generate_terrain(&config, registry.clone()).with_listener(log.clone());
    let agent = SimActuator::new(&world, config.agent_start());
    info!("Simulated agent placed at {}", config.agent_start());

    commands.insert_resource(world);
    commands.insert_resource(agent);
}

/// Drains the synchronous notification log into the Bevy event queues.
fn forward_world_notifications(
    log: Res<NotificationLog>,
    mut removed_ev: EventWriter<BlockRemovedEvent>,
    mut regen_ev: EventWriter<ChunkRegeneratedEvent>,
) {
    for notification in log.drain() {
        match notification {
            WorldNotification::BlockRemoved { pos, previous_type } => {
                removed_ev.write(BlockRemovedEvent {
                    chunk_coord: chunk_of(pos),
                    location: pos,
                    block_name: previous_type,
                });
            }
            WorldNotification::ChunkRegenerated { chunk } => {
                regen_ev.write(ChunkRegeneratedEvent { coord: chunk });
            }
        }
    }
}
