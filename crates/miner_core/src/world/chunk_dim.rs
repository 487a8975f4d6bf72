use bevy::prelude::*;

/// Cells per chunk along X, Y and Z.
pub const CX: usize = 16;
pub const CY: usize = 384;
pub const CZ: usize = 16;

/// Lowest and highest world height stored by a chunk (inclusive), `CY` cells apart.
pub const Y_MIN: i32 = -64;
pub const Y_MAX: i32 = Y_MIN + CY as i32 - 1;

/// Cells per vertical section; regeneration bookkeeping works per section.
pub const SEC_H: usize = 16;
pub const SEC_COUNT: usize = CY / SEC_H;

/// Splits a world `(x, z)` into the owning chunk coordinate and the cell inside it.
///
/// Negative coordinates use euclidean division, so `-1` lands in chunk `-1` at local `15`.
///
/// ```
/// use bevy::prelude::*;
/// use miner_core::world::chunk_dim::world_to_chunk_xz;
///
/// let (chunk, local) = world_to_chunk_xz(-1, 17);
/// assert_eq!(chunk, IVec2::new(-1, 1));
/// assert_eq!(local, UVec2::new(15, 1));
/// ```
#[inline]
pub fn world_to_chunk_xz(x: i32, z: i32) -> (IVec2, UVec2) {
    let chunk = IVec2::new(x.div_euclid(CX as i32), z.div_euclid(CZ as i32));
    let local = UVec2::new(x.rem_euclid(CX as i32) as u32, z.rem_euclid(CZ as i32) as u32);
    (chunk, local)
}

/// Chunk owning a block; the height does not matter.
#[inline]
pub fn chunk_of(pos: IVec3) -> IVec2 {
    world_to_chunk_xz(pos.x, pos.z).0
}

/// Index of a world height inside a chunk, `None` above or below the world.
#[inline]
pub fn world_y_to_local(wy: i32) -> Option<usize> {
    (Y_MIN..=Y_MAX).contains(&wy).then(|| (wy - Y_MIN) as usize)
}

// =================================================================================================
//
//                                            Unit Tests
//
// =================================================================================================
