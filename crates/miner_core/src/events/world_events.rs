use bevy::prelude::*;

/// Event emitted after the world removed a block on behalf of an agent.
#[derive(Event, Clone, Debug)]
pub struct BlockRemovedEvent {
    pub chunk_coord: IVec2,
    pub location: IVec3,
    pub block_name: String,
}

/// Event signaling that a chunk had its visual and navigation data rebuilt.
#[derive(Event, Clone, Copy, Debug)]
pub struct ChunkRegeneratedEvent {
    pub coord: IVec2,
}
