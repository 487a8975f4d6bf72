pub mod agent;
pub mod configuration;
pub mod events;
pub mod world;

use crate::configuration::MiningConfig;
use crate::events::EventModule;
use bevy::prelude::*;

/// Order of the mining systems inside a frame.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum MiningStage { Request, Execute, Publish }

pub struct MinerCorePlugin;

impl Plugin for MinerCorePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MiningConfig>();
        app.add_plugins(EventModule);
        app.configure_sets(
            Update,
            (MiningStage::Request, MiningStage::Execute, MiningStage::Publish).chain(),
        );
    }
}
