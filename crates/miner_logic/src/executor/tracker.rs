use bevy::prelude::*;
use miner_core::world::chunk_dim::chunk_of;
use miner_core::world::BlockMutator;
use std::collections::HashSet;

/// Chunks touched by removals since the last regeneration flush.
#[derive(Debug, Default)]
pub struct MinedChunkTracker {
    pending: HashSet<IVec2>,
}

impl MinedChunkTracker {
    /// Records the chunk owning `pos` and returns it.
    pub fn record(&mut self, pos: IVec3) -> IVec2 {
        let chunk = chunk_of(pos);
        self.pending.insert(chunk);
        chunk
    }

    #[inline]
    pub fn is_empty(&self) -> bool { self.pending.is_empty() }

    #[inline]
    pub fn len(&self) -> usize { self.pending.len() }

    /// Requests regeneration of every pending chunk, in coordinate order, and forgets them.
    pub fn flush<W: BlockMutator + ?Sized>(&mut self, world: &mut W) -> Vec<IVec2> {
        let mut chunks: Vec<IVec2> = self.pending.drain().collect();
        chunks.sort_by_key(|c| (c.x, c.y));
        for &chunk in &chunks {
            world.regenerate_chunk(chunk);
        }
        if !chunks.is_empty() {
            debug!("Regenerated {} mined chunk(s)", chunks.len());
        }
        chunks
    }
}

// =================================================================================================
//
//                                            Unit Tests
//
// =================================================================================================
