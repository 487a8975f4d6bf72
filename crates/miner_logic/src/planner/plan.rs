use crate::error::DeferReason;
use crate::planner::grouper::{flatten_columns, Column};
use bevy::prelude::*;
use miner_core::world::column_key;
use std::collections::{HashMap, HashSet};

/// Flattened, column-contiguous dig order with a cursor.
///
/// Entries are only ever inserted as whole regrouped columns at the cursor, or removed as
/// whole column runs starting at the cursor, so column runs stay contiguous.
#[derive(Clone, Debug, Default)]
pub struct MiningPlan {
    entries: Vec<IVec3>,
    cursor: usize,
}

impl MiningPlan {
    pub fn from_columns(columns: &[Column]) -> Self {
        Self { entries: flatten_columns(columns), cursor: 0 }
    }

    #[inline]
    pub fn current(&self) -> Option<IVec3> { self.entries.get(self.cursor).copied() }

    /// Entry right before the cursor.
    #[inline]
    pub fn previous(&self) -> Option<IVec3> {
        self.cursor.checked_sub(1).and_then(|i| self.entries.get(i).copied())
    }

    #[inline]
    pub fn advance(&mut self) {
        if self.cursor < self.entries.len() {
            self.cursor += 1;
        }
    }

    /// `true` when the current entry opens a new column run.
    pub fn at_column_start(&self) -> bool {
        match (self.previous(), self.current()) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(prev), Some(cur)) => column_key(prev) != column_key(cur),
        }
    }

    /// Removes the run of entries sharing the current entry's column, starting at the cursor.
    pub fn take_column_remainder(&mut self) -> Vec<IVec3> {
        let Some(current) = self.current() else { return Vec::new(); };
        let key = column_key(current);
        let end = self.entries[self.cursor..]
            .iter()
            .position(|&p| column_key(p) != key)
            .map_or(self.entries.len(), |n| self.cursor + n);
        self.entries.drain(self.cursor..end).collect()
    }

    /// Inserts regrouped columns at the cursor; they become the next entries.
    pub fn splice_columns(&mut self, columns: &[Column]) {
        let flat = flatten_columns(columns);
        self.entries.splice(self.cursor..self.cursor, flat);
    }

    /// Replaces everything with a fresh pass.
    pub fn restart(&mut self, columns: &[Column]) {
        self.entries = flatten_columns(columns);
        self.cursor = 0;
    }

    #[inline]
    pub fn remaining(&self) -> &[IVec3] { &self.entries[self.cursor..] }

    #[inline]
    pub fn is_exhausted(&self) -> bool { self.cursor >= self.entries.len() }

    #[inline]
    pub fn len(&self) -> usize { self.entries.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

/// One deferred position with why and when it was deferred.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeferredBlock {
    pub position: IVec3,
    pub reason: DeferReason,
    /// Number of blocks mined when this one got deferred.
    pub mined_at: usize,
}

/// Arena of raw deferred positions.
///
/// Holds no order worth keeping; whoever takes positions out runs them through the
/// grouper and the sequencer again. Counts how often each position was handed back for
/// regrouping, inline or in a retry pass, and stops handing out columns that used up
/// their retries.
#[derive(Clone, Debug, Default)]
pub struct DeferredSet {
    blocks: Vec<DeferredBlock>,
    regroups: HashMap<IVec3, u32>,
}

impl DeferredSet {
    pub fn defer<I: IntoIterator<Item = IVec3>>(&mut self, positions: I, reason: DeferReason, mined_at: usize) {
        for position in positions {
            if let Some(existing) = self.blocks.iter_mut().find(|b| b.position == position) {
                existing.reason = reason.clone();
                existing.mined_at = mined_at;
            } else {
                self.blocks.push(DeferredBlock { position, reason: reason.clone(), mined_at });
            }
        }
    }

    /// Removes every column holding a block deferred before the `mined`-th removal, i.e.
    /// columns whose surroundings changed since. Columns regrouped `limit` times stay.
    pub fn take_retryable(&mut self, mined: usize, limit: u32) -> Vec<IVec3> {
        let exhausted = self.exhausted_columns(limit);
        let ready: HashSet<IVec2> = self.blocks.iter()
            .filter(|b| b.mined_at < mined)
            .map(|b| column_key(b.position))
            .filter(|key| !exhausted.contains(key))
            .collect();
        self.take_regrouped(&ready).into_iter().map(|b| b.position).collect()
    }

    /// Removes every column not yet regrouped `limit` times.
    pub fn take_regroupable(&mut self, limit: u32) -> Vec<IVec3> {
        let exhausted = self.exhausted_columns(limit);
        let ready: HashSet<IVec2> = self.blocks.iter()
            .map(|b| column_key(b.position))
            .filter(|key| !exhausted.contains(key))
            .collect();
        self.take_regrouped(&ready).into_iter().map(|b| b.position).collect()
    }

    /// How often `position` was handed out for regrouping.
    pub fn regroups(&self, position: IVec3) -> u32 {
        self.regroups.get(&position).copied().unwrap_or(0)
    }

    fn exhausted_columns(&self, limit: u32) -> HashSet<IVec2> {
        self.blocks.iter()
            .filter(|b| self.regroups(b.position) >= limit)
            .map(|b| column_key(b.position))
            .collect()
    }

    fn take_regrouped(&mut self, columns: &HashSet<IVec2>) -> Vec<DeferredBlock> {
        let taken = self.take_where(|b| columns.contains(&column_key(b.position)));
        for block in &taken {
            *self.regroups.entry(block.position).or_default() += 1;
        }
        taken
    }

    fn take_where<F: Fn(&DeferredBlock) -> bool>(&mut self, take: F) -> Vec<DeferredBlock> {
        let (taken, waiting): (Vec<_>, Vec<_>) = self.blocks.drain(..).partition(|b| take(b));
        self.blocks = waiting;
        taken
    }

    /// Removes every block of one column.
    pub fn take_column(&mut self, key: IVec2) -> Vec<DeferredBlock> {
        self.take_where(|b| column_key(b.position) == key)
    }

    pub fn take_all(&mut self) -> Vec<DeferredBlock> {
        std::mem::take(&mut self.blocks)
    }

    pub fn positions(&self) -> Vec<IVec3> {
        self.blocks.iter().map(|b| b.position).collect()
    }

    pub fn reason_of(&self, position: IVec3) -> Option<&DeferReason> {
        self.blocks.iter().find(|b| b.position == position).map(|b| &b.reason)
    }

    #[inline]
    pub fn len(&self) -> usize { self.blocks.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.blocks.is_empty() }
}

// =================================================================================================
//
//                                            Unit Tests
//
// =================================================================================================
