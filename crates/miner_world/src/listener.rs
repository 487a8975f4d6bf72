use bevy::prelude::*;
use miner_core::world::{WorldListener, WorldNotification};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared, append-only record of world notifications.
///
/// Clones share the same buffer: hand one clone to the world as a listener and keep
/// another to read or drain what happened.
#[derive(Resource, Clone, Default)]
pub struct NotificationLog {
    entries: Arc<Mutex<Vec<WorldNotification>>>,
}

impl NotificationLog {
    fn lock(&self) -> MutexGuard<'_, Vec<WorldNotification>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Vec<WorldNotification> {
        self.lock().clone()
    }

    pub fn drain(&self) -> Vec<WorldNotification> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Positions of every block removal, in notification order.
    pub fn removed_positions(&self) -> Vec<IVec3> {
        self.lock().iter().filter_map(|n| match n {
            WorldNotification::BlockRemoved { pos, .. } => Some(*pos),
            WorldNotification::ChunkRegenerated { .. } => None,
        }).collect()
    }

    pub fn regenerated_chunks(&self) -> Vec<IVec2> {
        self.lock().iter().filter_map(|n| match n {
            WorldNotification::ChunkRegenerated { chunk } => Some(*chunk),
            WorldNotification::BlockRemoved { .. } => None,
        }).collect()
    }
}

impl WorldListener for NotificationLog {
    fn on_block_removed(&mut self, pos: IVec3, previous_type: &str) {
        self.lock().push(WorldNotification::BlockRemoved {
            pos,
            previous_type: previous_type.to_string(),
        });
    }

    fn on_chunk_regenerated(&mut self, chunk: IVec2) {
        self.lock().push(WorldNotification::ChunkRegenerated { chunk });
    }
}
