use bevy::prelude::*;
use miner_core::configuration::ColumnDirection;
use miner_core::world::column_key;
use std::collections::HashMap;

/// Vertical stack of target blocks sharing one `(x, z)` key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    pub key: IVec2,
    /// Sorted by height per [`ColumnDirection`], no duplicates.
    pub blocks: Vec<IVec3>,
}

impl Column {
    /// Block the column starts with.
    #[inline]
    pub fn first(&self) -> Option<IVec3> { self.blocks.first().copied() }

    /// Highest block of the column regardless of direction.
    pub fn topmost(&self) -> Option<IVec3> {
        self.blocks.iter().copied().max_by_key(|p| p.y)
    }

    #[inline]
    pub fn len(&self) -> usize { self.blocks.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.blocks.is_empty() }
}

/// Groups positions into columns by horizontal key.
///
/// Columns come out in first-discovery order of their key. Inside a column the blocks are
/// sorted by height (descending for [`ColumnDirection::TopDown`]); the sort is stable and
/// duplicates are dropped.
///
/// Always called on the complete working set. Derived orders are never patched in place.
pub fn group_columns(positions: &[IVec3], direction: ColumnDirection) -> Vec<Column> {
    let mut index: HashMap<IVec2, usize> = HashMap::new();
    let mut columns: Vec<Column> = Vec::new();

    for &pos in positions {
        let key = column_key(pos);
        let slot = *index.entry(key).or_insert_with(|| {
            columns.push(Column { key, blocks: Vec::new() });
            columns.len() - 1
        });
        let column = &mut columns[slot];
        if !column.blocks.contains(&pos) {
            column.blocks.push(pos);
        }
    }

    for column in columns.iter_mut() {
        match direction {
            ColumnDirection::TopDown => column.blocks.sort_by(|a, b| b.y.cmp(&a.y)),
            ColumnDirection::BottomUp => column.blocks.sort_by_key(|p| p.y),
        }
    }

    columns
}

/// Column order, then each column's sorted blocks.
pub fn flatten_columns(columns: &[Column]) -> Vec<IVec3> {
    columns.iter().flat_map(|c| c.blocks.iter().copied()).collect()
}

// =================================================================================================
//
//                                            Unit Tests
//
// =================================================================================================
