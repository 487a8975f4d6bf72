use bevy::prelude::*;

/// Read side of the world: the only questions the planner asks about blocks.
pub trait BlockOracle {
    /// `true` if the cell holds a block the agent has to dig to pass.
    fn is_block_solid(&self, pos: IVec3) -> bool;

    /// Registry name of the block in the cell, `None` for air.
    fn block_type(&self, pos: IVec3) -> Option<String>;
}

/// Write side of the world.
///
/// Every mutation notifies the registered [`WorldListener`]s before it returns,
/// so there is no way to change a block without the change being observed.
pub trait BlockMutator: BlockOracle {
    /// Removes the block at `pos` and fires [`WorldListener::on_block_removed`].
    ///
    /// Idempotent: removing air does nothing, fires nothing and returns `None`.
    /// Otherwise returns the type that was removed.
    fn remove_block(&mut self, pos: IVec3) -> Option<String>;

    /// Requests regeneration of the visual and navigation data of a chunk and fires
    /// [`WorldListener::on_chunk_regenerated`].
    fn regenerate_chunk(&mut self, chunk: IVec2);
}

/// Consumer of world changes (navigation caches, mesh builders, network bridges).
///
/// Called synchronously from inside the mutation.
pub trait WorldListener: Send + Sync {
    fn on_block_removed(&mut self, pos: IVec3, previous_type: &str);

    fn on_chunk_regenerated(&mut self, chunk: IVec2);
}

/// A change observed through a [`WorldListener`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorldNotification {
    BlockRemoved { pos: IVec3, previous_type: String },
    ChunkRegenerated { chunk: IVec2 },
}
