use bevy::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// This is the identifier for a block. This can be used to identify a block in a world.
/// Id `0` is always air.
pub type BlockId = u16;

pub const AIR: BlockId = 0;

/// Block form for a block.
/// Current forms:
/// - [`Solid`] the default value for blocks, the agent cannot pass through
/// - [`Fluid`] the block is a fluid, the agent can pass through and nothing is dug
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockForm {
    #[default]
    #[serde(rename = "solid", alias = "Solid", alias = "SOLID")]
    Solid,
    #[serde(rename = "fluid", alias = "Fluid", alias = "FLUID")]
    Fluid,
}

/// Block states for a handle in code. Currently used:
/// - [`hardness`] higher value means the block needs more time for break, negative means it
///   can never be broken by the agent
/// - [`block_form`] if the block is solid or fluid
#[derive(Deserialize, Clone, Copy, Debug, Default)]
pub struct BlockStats {
    #[serde(default)]
    pub hardness: f32,
    #[serde(default)]
    pub block_form: BlockForm,
}

#[derive(Clone, Debug)]
pub struct BlockDefinition {
    pub name: String,
    pub stats: BlockStats,
}

/// All blocks the simulation knows out of the box.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Blocks {
    Bedrock,
    Border,
    DeepStone,
    Dirt,
    Gravel,
    Marker,
    Sand,
    Stone,
    Water,
}

impl Blocks {

    pub const ALL: [Blocks; 9] = [
        Blocks::Bedrock,
        Blocks::Border,
        Blocks::DeepStone,
        Blocks::Dirt,
        Blocks::Gravel,
        Blocks::Marker,
        Blocks::Sand,
        Blocks::Stone,
        Blocks::Water,
    ];

    /// Give the simple name back as a definition string.
    pub const fn localized_name(&self) -> &'static str {
        match self {
            Blocks::Bedrock => "bedrock_block",
            Blocks::Border => "border_block",
            Blocks::DeepStone => "deep_stone_block",
            Blocks::Dirt => "dirt_block",
            Blocks::Gravel => "gravel_block",
            Blocks::Marker => "marker_block",
            Blocks::Sand => "sand_block",
            Blocks::Stone => "stone_block",
            Blocks::Water => "water_block",
        }
    }

    const fn stats(&self) -> BlockStats {
        match self {
            Blocks::Bedrock | Blocks::Border => BlockStats { hardness: -1.0, block_form: BlockForm::Solid },
            Blocks::DeepStone => BlockStats { hardness: 3.0, block_form: BlockForm::Solid },
            Blocks::Stone => BlockStats { hardness: 1.5, block_form: BlockForm::Solid },
            Blocks::Water => BlockStats { hardness: 0.0, block_form: BlockForm::Fluid },
            Blocks::Dirt | Blocks::Gravel | Blocks::Sand | Blocks::Marker => {
                BlockStats { hardness: 0.5, block_form: BlockForm::Solid }
            }
        }
    }
}

impl AsRef<str> for Blocks {
    fn as_ref(&self) -> &str {
        self.localized_name()
    }
}

/// Name and stats lookup for every block id.
#[derive(Resource, Clone, Debug)]
pub struct BlockRegistry {
    pub blocks: Vec<BlockDefinition>,
    pub block_ids: HashMap<String, BlockId>,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        let mut reg = Self::empty();
        for block in Blocks::ALL {
            reg.register(block.localized_name(), block.stats());
        }
        reg
    }
}

impl BlockRegistry {

    /// Registry that only knows air (id `0`).
    pub fn empty() -> Self {
        let air = BlockDefinition {
            name: "air".to_string(),
            stats: BlockStats { hardness: 0.0, block_form: BlockForm::Fluid },
        };
        let mut block_ids = HashMap::new();
        block_ids.insert(air.name.clone(), 0);
        Self { blocks: vec![air], block_ids }
    }

    /// Registers a block and returns its id. Registering a known name updates its stats.
    pub fn register(&mut self, name: &str, stats: BlockStats) -> BlockId {
        if let Some(&id) = self.block_ids.get(name) {
            self.blocks[id as usize].stats = stats;
            return id;
        }
        let id = self.blocks.len() as BlockId;
        self.blocks.push(BlockDefinition { name: name.to_string(), stats });
        self.block_ids.insert(name.to_string(), id);
        id
    }

    pub fn definition(&self, id: BlockId) -> Option<&BlockDefinition> { self.blocks.get(id as usize) }

    pub fn name_optional(&self, id: BlockId) -> Option<&str> {
        self.definition(id).map(|b| b.name.as_str())
    }

    pub fn id_optional(&self, name: &str) -> Option<BlockId> {
        self.block_ids.get(name).copied()
    }

    pub fn id_or_default(&self, name: &str) -> BlockId {
        self.id_optional(name).unwrap_or(0)
    }

    pub fn is_air(&self, id: BlockId) -> bool { id == AIR }

    /// Solid blocks are the only ones the agent can dig or collide with.
    /// Unknown ids count as solid.
    pub fn is_solid(&self, id: BlockId) -> bool {
        if id == 0 { return false; }
        self.definition(id).is_none_or(|b| b.stats.block_form == BlockForm::Solid)
    }

    /// Blocks with a negative hardness can't be broken by any agent.
    pub fn is_unbreakable(&self, id: BlockId) -> bool {
        self.definition(id).is_some_and(|b| b.stats.hardness < 0.0)
    }

    /// Extends the registry with block definitions from a JSON array:
    /// `[{ "name": "ore_block", "stats": { "hardness": 2.0 } }]`.
    pub fn extend_from_json(&mut self, json: &str) -> anyhow::Result<usize> {
        let defs: Vec<BlockJson> = serde_json::from_str(json)?;
        for def in &defs {
            self.register(&def.name, def.stats);
        }
        Ok(defs.len())
    }

    /// Loads every `*.json` file of `dir` into a registry seeded with the built-in blocks.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut reg = Self::default();

        if !dir.exists() {
            warn!("Block definition directory does not exist: {}", dir.display());
            return Ok(reg);
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                warn!("Skipping non-json file in block definition directory: {}", path.display());
                continue;
            }
            let count = reg.extend_from_json(&fs::read_to_string(&path)?)?;
            debug!("Loaded {} block definitions from {}", count, path.display());
        }

        Ok(reg)
    }
}

// =================================================================================================
//
//                                            Json Mapper
//
// =================================================================================================

#[derive(Deserialize)]
struct BlockJson {
    pub name: String,
    #[serde(default)]
    pub stats: BlockStats,
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
    fn test_default_registry_knows_builtin_blocks() {
        let reg = BlockRegistry::default();
        assert_eq!(reg.id_optional("air"), Some(0));
        for block in Blocks::ALL {
            assert!(reg.id_optional(block.as_ref()).is_some(), "{} missing", block.as_ref());
        }
    }

    #[test]
    fn test_solidity_and_unbreakable() {
        let reg = BlockRegistry::default();
        let stone = reg.id_or_default("stone_block");
        let water = reg.id_or_default("water_block");
        let bedrock = reg.id_or_default("bedrock_block");

        assert!(reg.is_solid(stone));
        assert!(!reg.is_solid(water));
        assert!(!reg.is_solid(0));
        assert!(reg.is_unbreakable(bedrock));
        assert!(!reg.is_unbreakable(stone));
        assert!(reg.is_solid(999));
    }

    #[test]
    fn test_extend_from_json() {
        let mut reg = BlockRegistry::default();
        let count = reg.extend_from_json(
            r#"[{ "name": "ore_block", "stats": { "hardness": 2.0 } },
                { "name": "lava_block", "stats": { "block_form": "fluid" } }]"#,
        ).unwrap();

        assert_eq!(count, 2);
        assert!(reg.is_solid(reg.id_or_default("ore_block")));
        assert!(!reg.is_solid(reg.id_or_default("lava_block")));
    }

    #[test]
    fn test_register_existing_name_keeps_id() {
        let mut reg = BlockRegistry::default();
        let id = reg.id_or_default("stone_block");
        let again = reg.register("stone_block", BlockStats { hardness: -1.0, block_form: BlockForm::Solid });
        assert_eq!(id, again);
        assert!(reg.is_unbreakable(id));
    }

    #[test]
    fn test_load_from_missing_dir_falls_back() {
        let reg = BlockRegistry::load_from_dir("does/not/exist").unwrap();
        assert!(reg.id_optional("stone_block").is_some());
    }
}
