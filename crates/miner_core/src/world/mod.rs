pub mod access;
pub mod block;
pub mod chunk;
pub mod chunk_dim;

pub use access::{BlockMutator, BlockOracle, WorldListener, WorldNotification};

use bevy::prelude::*;

/// Horizontal key of a block position: the `(x, z)` pair shared by a column.
#[inline]
pub fn column_key(pos: IVec3) -> IVec2 {
    IVec2::new(pos.x, pos.z)
}

/// Smallest box containing every position, `None` for an empty input.
pub fn bounding_box<I: IntoIterator<Item = IVec3>>(positions: I) -> Option<(IVec3, IVec3)> {
    positions.into_iter().fold(None, |acc, p| match acc {
        None => Some((p, p)),
        Some((min, max)) => Some((min.min(p), max.max(p))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_key_drops_height() {
        assert_eq!(column_key(IVec3::new(4, -9, 7)), IVec2::new(4, 7));
    }

    #[test]
    fn test_bounding_box() {
        assert_eq!(bounding_box(Vec::new()), None);
        let bb = bounding_box([IVec3::new(1, 5, -2), IVec3::new(-3, 0, 4)]);
        assert_eq!(bb, Some((IVec3::new(-3, 0, -2), IVec3::new(1, 5, 4))));
    }
}
