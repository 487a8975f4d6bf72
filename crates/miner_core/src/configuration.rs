use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default location of the mining configuration.
pub const MINING_CONFIG_PATH: &str = "config/mining.toml";

/// Order in which columns are visited.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MiningPattern {
    /// Lexicographic rows, fully predictable coverage.
    SweepLine,
    /// Greedy nearest column from the simulated agent position.
    #[default]
    NearestColumn,
    /// Rings around the agent start.
    Spiral,
    /// Sweep line with alternating row direction.
    ZigZag,
}

/// Height order inside one column.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColumnDirection {
    #[default]
    TopDown,
    BottomUp,
}

impl ColumnDirection {

    /// Offset from a target block to the cell the agent prefers to dig it from.
    pub const fn approach_offset(self) -> IVec3 {
        match self {
            ColumnDirection::TopDown => IVec3::Y,
            ColumnDirection::BottomUp => IVec3::NEG_Y,
        }
    }
}

/// Top-level mining configuration resource.
///
/// Can be deserialized from `config/mining.toml`; every missing key keeps its default.
#[derive(Resource, Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct MiningConfig {
    /// Column traversal order of the first pass.
    pub pattern: MiningPattern,

    /// Height order inside a column.
    pub direction: ColumnDirection,

    /// Full passes over deferred blocks before giving up on them.
    pub max_retry_passes: u32,

    /// Whether blocking material may be dug while repositioning (and for shafts).
    pub excavation_enabled: bool,

    /// Non-diggable policy: exact names, `prefix*` or `*suffix`.
    pub protected_blocks: Vec<String>,

    /// Consecutive moves without a position change before the agent counts as stuck.
    pub max_move_attempts: u32,

    /// Local retries of a failing dig.
    pub max_action_attempts: u32,

    /// Cells that may be excavated to reach a single block.
    pub max_excavation_digs: u32,

    /// Cells added on every side of the working bounds for path searches.
    pub search_margin: i32,

    /// Upper bound of expanded cells per path search.
    pub max_search_nodes: usize,

    /// Extra route cost of a cell that has to be dug.
    pub dig_cost: u32,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            pattern: MiningPattern::NearestColumn,
            direction: ColumnDirection::TopDown,
            max_retry_passes: 3,
            excavation_enabled: true,
            protected_blocks: vec![
                String::from("bedrock_block"),
                String::from("border_block"),
                String::from("marker_*"),
            ],
            max_move_attempts: 3,
            max_action_attempts: 3,
            max_excavation_digs: 24,
            search_margin: 4,
            max_search_nodes: 50_000,
            dig_cost: 4,
        }
    }
}

impl MiningConfig {

    /// Loads and parses a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    /// Same as [`MiningConfig::load`] but falls back to the defaults with a warning.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Using default mining config, failed to load {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        fs::write(path.as_ref(), toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn policy(&self) -> BlockPolicy {
        BlockPolicy::new(&self.protected_blocks)
    }
}

/// Non-diggable block policy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockPolicy {
    exact: Vec<String>,
    prefixes: Vec<String>,
    suffixes: Vec<String>,
}

impl BlockPolicy {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut policy = Self::default();
        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() { continue; }
            if let Some(prefix) = pattern.strip_suffix('*') {
                policy.prefixes.push(prefix.to_string());
            } else if let Some(suffix) = pattern.strip_prefix('*') {
                policy.suffixes.push(suffix.to_string());
            } else {
                policy.exact.push(pattern.to_string());
            }
        }
        policy
    }

    pub fn is_protected(&self, block_type: &str) -> bool {
        self.exact.iter().any(|e| e == block_type)
            || self.prefixes.iter().any(|p| block_type.starts_with(p.as_str()))
            || self.suffixes.iter().any(|s| block_type.ends_with(s.as_str()))
    }
}

// =================================================================================================
//
//                                            Unit Tests
//
// =================================================================================================
