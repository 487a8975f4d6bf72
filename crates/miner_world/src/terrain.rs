use crate::voxel_world::VoxelWorld;
use bevy::prelude::*;
use miner_core::world::block::{BlockRegistry, Blocks};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Demo world and job settings, read from the `[simulation]` section of the mining config.
#[derive(Resource, Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,

    /// Inclusive horizontal extent of the generated terrain (x/z, both axes).
    pub terrain_radius: i32,

    /// Height of the topmost ground layer.
    pub surface_height: i32,

    /// Height of the unbreakable floor.
    pub bedrock_height: i32,

    /// Chance for a ground cell to be a gravel pocket.
    pub pocket_chance: f64,

    /// Chance for a ground cell below the surface to be a protected marker.
    pub marker_chance: f64,

    pub agent_start: [i32; 3],
    pub selection_min: [i32; 3],
    pub selection_max: [i32; 3],
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 1337,
            terrain_radius: 24,
            surface_height: 8,
            bedrock_height: 0,
            pocket_chance: 0.08,
            marker_chance: 0.01,
            agent_start: [0, 12, 0],
            selection_min: [-4, 3, -4],
            selection_max: [4, 8, 4],
        }
    }
}

#[derive(Deserialize, Default)]
struct SimulationFile {
    #[serde(default)]
    simulation: SimulationConfig,
}

impl SimulationConfig {

    /// Reads the `[simulation]` section, other sections are ignored.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let file: SimulationFile = toml::from_str(&content)?;
        Ok(file.simulation)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|e| {
            warn!("Using default simulation config, failed to load {}: {}", path.display(), e);
            Self::default()
        })
    }

    pub fn agent_start(&self) -> IVec3 { IVec3::from_array(self.agent_start) }

    /// Every position of the configured selection box, including air.
    pub fn selection(&self) -> Vec<IVec3> {
        let min = IVec3::from_array(self.selection_min).min(IVec3::from_array(self.selection_max));
        let max = IVec3::from_array(self.selection_min).max(IVec3::from_array(self.selection_max));
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
}

/// Generates the layered demo terrain: bedrock floor, deep stone, stone, a dirt cap,
/// scattered gravel pockets, caves of air and a few protected markers.
pub fn generate_terrain(config: &SimulationConfig, registry: BlockRegistry) -> VoxelWorld {
    let mut world = VoxelWorld::new(registry);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let r = config.terrain_radius.max(0);

    for z in -r..=r {
        for x in -r..=r {
            world.set_block(IVec3::new(x, config.bedrock_height, z), Blocks::Bedrock.as_ref());

            for y in (config.bedrock_height + 1)..=config.surface_height {
                let pos = IVec3::new(x, y, z);
                let depth = config.surface_height - y;
                let block = if rng.random_bool(config.pocket_chance.clamp(0.0, 1.0)) {
                    if rng.random_bool(0.5) { None } else { Some(Blocks::Gravel) }
                } else if depth > 0 && rng.random_bool(config.marker_chance.clamp(0.0, 1.0)) {
                    Some(Blocks::Marker)
                } else if depth == 0 {
                    Some(Blocks::Dirt)
                } else if y <= config.bedrock_height + 2 {
                    Some(Blocks::DeepStone)
                } else {
                    Some(Blocks::Stone)
                };

                if let Some(block) = block {
                    world.set_block(pos, block.as_ref());
                }
            }
        }
    }

    debug!("Generated demo terrain with radius {} (seed {})", r, config.seed);
    world
}

// =================================================================================================
//
//                                            Unit Tests
//
// =================================================================================================
