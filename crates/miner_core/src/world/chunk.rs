use bevy::prelude::*;
use std::collections::HashMap;

use crate::world::block::{BlockId, AIR};
use crate::world::chunk_dim::*;

#[inline]
fn cell_index(lx: usize, ly: usize, lz: usize) -> usize { (ly * CZ + lz) * CX + lx }

/// Dense block storage of one chunk column.
///
/// Every write marks its vertical section as pending until the chunk is regenerated.
#[derive(Clone)]
pub struct ChunkData {
    blocks: Box<[BlockId]>,
    pending: u32,
}

impl Default for ChunkData {
    fn default() -> Self {
        Self {
            blocks: vec![AIR; CX * CY * CZ].into_boxed_slice(),
            pending: 0,
        }
    }
}

impl ChunkData {
    #[inline]
    pub fn block(&self, lx: usize, ly: usize, lz: usize) -> BlockId { self.blocks[cell_index(lx, ly, lz)] }

    /// Writes `id` and returns what was there before.
    pub fn replace(&mut self, lx: usize, ly: usize, lz: usize, id: BlockId) -> BlockId {
        let cell = &mut self.blocks[cell_index(lx, ly, lz)];
        let previous = std::mem::replace(cell, id);
        self.pending |= 1 << (ly / SEC_H);
        previous
    }

    /// Sections written since the last regeneration, lowest first.
    pub fn pending_sections(&self) -> impl Iterator<Item = usize> + '_ {
        (0..SEC_COUNT).filter(|s| self.pending & (1 << s) != 0)
    }

    #[inline]
    pub fn mark_regenerated(&mut self) { self.pending = 0; }
}

/// Sparse chunk storage keyed by chunk coordinate (XZ).
#[derive(Clone, Default)]
pub struct ChunkMap {
    chunks: HashMap<IVec2, ChunkData>,
}

impl ChunkMap {
    #[inline]
    pub fn get_chunk(&self, coord: IVec2) -> Option<&ChunkData> { self.chunks.get(&coord) }

    #[inline]
    pub fn get_chunk_mut(&mut self, coord: IVec2) -> Option<&mut ChunkData> { self.chunks.get_mut(&coord) }

    #[inline]
    pub fn len(&self) -> usize { self.chunks.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    /// Block id at a world position, air for missing chunks and heights outside the world.
    pub fn get_world(&self, wp: IVec3) -> BlockId {
        let Some(ly) = world_y_to_local(wp.y) else { return AIR; };
        let (cc, local) = world_to_chunk_xz(wp.x, wp.z);
        self.chunks.get(&cc)
            .map_or(AIR, |ch| ch.block(local.x as usize, ly, local.y as usize))
    }

    /// Writes `id` and returns the previous id, creating the chunk on demand.
    ///
    /// Returns `None` for heights outside of the world.
    pub fn set_world(&mut self, wp: IVec3, id: BlockId) -> Option<BlockId> {
        let ly = world_y_to_local(wp.y)?;
        let (cc, local) = world_to_chunk_xz(wp.x, wp.z);
        let ch = self.chunks.entry(cc).or_default();
        Some(ch.replace(local.x as usize, ly, local.y as usize, id))
    }
}

// =================================================================================================
//
//                                            Unit Tests
//
// =================================================================================================
