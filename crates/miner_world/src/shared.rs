use crate::voxel_world::VoxelWorld;
use bevy::prelude::*;
use miner_core::world::{BlockMutator, BlockOracle};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle to a [`VoxelWorld`] shared by several independent agents.
///
/// All writes go through one lock, so a block can only be removed once and the
/// notifications of one removal are never interleaved with another agent's.
#[derive(Clone)]
pub struct SharedWorld {
    inner: Arc<Mutex<VoxelWorld>>,
}

impl SharedWorld {
    pub fn new(world: VoxelWorld) -> Self {
        Self { inner: Arc::new(Mutex::new(world)) }
    }

    /// Locks the world for a batch of reads or setup writes.
    pub fn lock(&self) -> MutexGuard<'_, VoxelWorld> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BlockOracle for SharedWorld {
    fn is_block_solid(&self, pos: IVec3) -> bool {
        self.lock().is_block_solid(pos)
    }

    fn block_type(&self, pos: IVec3) -> Option<String> {
        self.lock().block_type(pos)
    }
}

impl BlockMutator for SharedWorld {
    fn remove_block(&mut self, pos: IVec3) -> Option<String> {
        self.lock().remove_block(pos)
    }

    fn regenerate_chunk(&mut self, chunk: IVec2) {
        self.lock().regenerate_chunk(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::NotificationLog;
    use miner_core::world::block::BlockRegistry;
    use std::thread;

    #[test]
    fn test_concurrent_removals_notify_each_block_once() {
        let log = NotificationLog::default();
        let mut world = VoxelWorld::new(BlockRegistry::default()).with_listener(log.clone());
        world.fill_box(IVec3::new(0, 0, 0), IVec3::new(7, 3, 7), "stone_block");
        let shared = SharedWorld::new(world);

        let targets: Vec<IVec3> = (0..8)
            .flat_map(|x| (0..4).flat_map(move |y| (0..8).map(move |z| IVec3::new(x, y, z))))
            .collect();

        let removed: usize = thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| {
                let mut handle = shared.clone();
                let targets = &targets;
                s.spawn(move || targets.iter().filter(|&&p| handle.remove_block(p).is_some()).count())
            }).collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(removed, targets.len());
        assert_eq!(log.removed_positions().len(), targets.len());
        assert!(targets.iter().all(|&p| !shared.is_block_solid(p)));
    }
}
