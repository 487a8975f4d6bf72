use bevy::prelude::*;
use miner_core::world::block::{BlockId, BlockRegistry, AIR};
use miner_core::world::chunk::ChunkMap;
use miner_core::world::chunk_dim::chunk_of;
use miner_core::world::{BlockMutator, BlockOracle, WorldListener};
use std::collections::HashMap;

/// Authoritative block store of one world.
///
/// Removal and notification happen inside the same call; there is no public way to clear
/// a block that skips the listeners, apart from [`VoxelWorld::set_block`] which is meant
/// for building worlds before any listener cares.
#[derive(Resource)]
pub struct VoxelWorld {
    chunks: ChunkMap,
    registry: BlockRegistry,
    listeners: Vec<Box<dyn WorldListener>>,
    revision: u64,
    chunk_revisions: HashMap<IVec2, u64>,
}

impl VoxelWorld {
    pub fn new(registry: BlockRegistry) -> Self {
        Self {
            chunks: ChunkMap::default(),
            registry,
            listeners: Vec::new(),
            revision: 0,
            chunk_revisions: HashMap::new(),
        }
    }

    pub fn with_listener<L: WorldListener + 'static>(mut self, listener: L) -> Self {
        self.add_listener(listener);
        self
    }

    pub fn add_listener<L: WorldListener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener));
    }

    #[inline]
    pub fn registry(&self) -> &BlockRegistry { &self.registry }

    #[inline]
    pub fn chunks(&self) -> &ChunkMap { &self.chunks }

    #[inline]
    pub fn block_id(&self, pos: IVec3) -> BlockId { self.chunks.get_world(pos) }

    /// Places a block by name without notifying anyone. Unknown names are ignored.
    ///
    /// Returns `false` when nothing was written.
    pub fn set_block(&mut self, pos: IVec3, name: &str) -> bool {
        let Some(id) = self.registry.id_optional(name) else {
            warn!("Unknown block '{}' at {}", name, pos);
            return false;
        };
        self.chunks.set_world(pos, id).is_some()
    }

    /// Fills the inclusive box `min..=max` with a block, see [`VoxelWorld::set_block`].
    pub fn fill_box(&mut self, min: IVec3, max: IVec3, name: &str) {
        let Some(id) = self.registry.id_optional(name) else {
            warn!("Unknown block '{}' for box {}..{}", name, min, max);
            return;
        };
        for y in min.y..=max.y {
            for z in min.z..=max.z {
                for x in min.x..=max.x {
                    self.chunks.set_world(IVec3::new(x, y, z), id);
                }
            }
        }
    }

    /// Global revision, bumped on every notified change.
    #[inline]
    pub fn revision(&self) -> u64 { self.revision }

    /// Revision of the last notified change in a chunk, `0` if it never changed.
    pub fn chunk_revision(&self, chunk: IVec2) -> u64 {
        self.chunk_revisions.get(&chunk).copied().unwrap_or(0)
    }

    /// Vertical sections of a chunk written since it was last regenerated.
    pub fn pending_sections(&self, chunk: IVec2) -> Vec<usize> {
        self.chunks.get_chunk(chunk).map_or_else(Vec::new, |c| c.pending_sections().collect())
    }

    /// Chunks changed after `revision`, sorted by coordinate.
    pub fn chunks_changed_since(&self, revision: u64) -> Vec<IVec2> {
        let mut out: Vec<IVec2> = self.chunk_revisions.iter()
            .filter(|&(_, &r)| r > revision)
            .map(|(&c, _)| c)
            .collect();
        out.sort_by_key(|c| (c.x, c.y));
        out
    }

    fn bump(&mut self, chunk: IVec2) {
        self.revision += 1;
        self.chunk_revisions.insert(chunk, self.revision);
    }
}

impl BlockOracle for VoxelWorld {
    fn is_block_solid(&self, pos: IVec3) -> bool {
        self.registry.is_solid(self.block_id(pos))
    }

    fn block_type(&self, pos: IVec3) -> Option<String> {
        let id = self.block_id(pos);
        if self.registry.is_air(id) { return None; }
        Some(self.registry.name_optional(id).unwrap_or("unknown").to_string())
    }
}

impl BlockMutator for VoxelWorld {
    fn remove_block(&mut self, pos: IVec3) -> Option<String> {
        let previous = self.block_type(pos)?;
        self.chunks.set_world(pos, AIR)?;
        let chunk = chunk_of(pos);
        self.bump(chunk);

        trace!("Removed {} at {}", previous, pos);
        for listener in self.listeners.iter_mut() {
            listener.on_block_removed(pos, &previous);
        }
        Some(previous)
    }

    fn regenerate_chunk(&mut self, chunk: IVec2) {
        if let Some(data) = self.chunks.get_chunk_mut(chunk) {
            data.mark_regenerated();
        }
        self.bump(chunk);

        trace!("Regenerated chunk {}", chunk);
        for listener in self.listeners.iter_mut() {
            listener.on_chunk_regenerated(chunk);
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
    use crate::listener::NotificationLog;
    use miner_core::world::WorldNotification;

    fn world() -> (VoxelWorld, NotificationLog) {
        let log = NotificationLog::default();
        let world = VoxelWorld::new(BlockRegistry::default()).with_listener(log.clone());
        (world, log)
    }

    #[test]
    fn test_remove_block_notifies_once() {
        let (mut world, log) = world();
        let p = IVec3::new(3, 4, 5);
        world.set_block(p, "stone_block");

        assert_eq!(world.remove_block(p), Some("stone_block".to_string()));
        assert!(!world.is_block_solid(p));
        assert_eq!(log.snapshot(), vec![WorldNotification::BlockRemoved {
            pos: p,
            previous_type: "stone_block".to_string(),
        }]);
    }

    #[test]
    fn test_remove_air_is_noop() {
        let (mut world, log) = world();
        let p = IVec3::new(0, 0, 0);

        assert_eq!(world.remove_block(p), None);
        assert_eq!(world.remove_block(p), None);
        assert!(log.snapshot().is_empty());
        assert_eq!(world.revision(), 0);
    }

    #[test]
    fn test_fluid_is_not_solid_but_has_type() {
        let (mut world, _) = world();
        let p = IVec3::new(1, 1, 1);
        world.set_block(p, "water_block");
        assert!(!world.is_block_solid(p));
        assert_eq!(world.block_type(p), Some("water_block".to_string()));
    }

    #[test]
    fn test_chunk_revisions_track_changes() {
        let (mut world, log) = world();
        world.fill_box(IVec3::new(0, 0, 0), IVec3::new(20, 0, 0), "dirt_block");
        let start = world.revision();

        world.remove_block(IVec3::new(18, 0, 0));
        assert_eq!(world.chunks_changed_since(start), vec![IVec2::new(1, 0)]);

        world.regenerate_chunk(IVec2::new(0, 0));
        assert_eq!(world.chunks_changed_since(start), vec![IVec2::new(0, 0), IVec2::new(1, 0)]);
        assert!(world.chunk_revision(IVec2::new(0, 0)) > world.chunk_revision(IVec2::new(1, 0)));
        assert_eq!(log.snapshot().last(), Some(&WorldNotification::ChunkRegenerated { chunk: IVec2::ZERO }));
        assert!(world.pending_sections(IVec2::ZERO).is_empty());
        assert!(!world.pending_sections(IVec2::new(1, 0)).is_empty());
    }

    #[test]
    fn test_unknown_block_name_is_ignored() {
        let (mut world, _) = world();
        assert!(!world.set_block(IVec3::ZERO, "no_such_block"));
        assert!(!world.is_block_solid(IVec3::ZERO));
    }
}
