use crate::planner::grouper::Column;
use bevy::prelude::*;
use miner_core::configuration::MiningPattern;

/// Orders columns for traversal.
///
/// `agent_xz` is the agent's horizontal position, used by the patterns that depend on it.
/// Equal keys keep their incoming (discovery) order.
pub fn sequence_columns(columns: Vec<Column>, agent_xz: IVec2, pattern: MiningPattern) -> Vec<Column> {
    match pattern {
        MiningPattern::SweepLine => sweep_line(columns),
        MiningPattern::NearestColumn => nearest_column(columns, agent_xz),
        MiningPattern::Spiral => spiral(columns, agent_xz),
        MiningPattern::ZigZag => zig_zag(columns),
    }
}

/// Squared horizontal distance, the nearness measure of [`MiningPattern::NearestColumn`].
#[inline]
pub fn horizontal_distance_sq(a: IVec2, b: IVec2) -> i64 {
    let d = (a - b).as_i64vec2();
    d.x * d.x + d.y * d.y
}

/// Rows along Z, cells along X.
fn sweep_line(mut columns: Vec<Column>) -> Vec<Column> {
    columns.sort_by_key(|c| (c.key.y, c.key.x));
    columns
}

fn zig_zag(columns: Vec<Column>) -> Vec<Column> {
    let mut rows = sweep_line(columns);
    let mut out = Vec::with_capacity(rows.len());
    let mut row_index = 0usize;

    while !rows.is_empty() {
        let z = rows[0].key.y;
        let split = rows.iter().position(|c| c.key.y != z).unwrap_or(rows.len());
        let mut row: Vec<Column> = rows.drain(..split).collect();
        if row_index % 2 == 1 {
            row.reverse();
        }
        out.extend(row);
        row_index += 1;
    }

    out
}

fn nearest_column(mut remaining: Vec<Column>, agent_xz: IVec2) -> Vec<Column> {
    let mut out = Vec::with_capacity(remaining.len());
    let mut at = agent_xz;

    while !remaining.is_empty() {
        let mut best = 0;
        let mut best_d = horizontal_distance_sq(at, remaining[0].key);
        for (i, c) in remaining.iter().enumerate().skip(1) {
            let d = horizontal_distance_sq(at, c.key);
            if d < best_d {
                best = i;
                best_d = d;
            }
        }
        let next = remaining.remove(best);
        at = next.key;
        out.push(next);
    }

    out
}

fn spiral(mut columns: Vec<Column>, center: IVec2) -> Vec<Column> {
    columns.sort_by_key(|c| ring_position(c.key - center));
    columns
}

/// `(ring, step)` of an offset: the ring is the Chebyshev distance, the step walks the ring
/// clockwise starting at its north-west corner.
fn ring_position(d: IVec2) -> (i32, i32) {
    let r = d.x.abs().max(d.y.abs());
    if r == 0 { return (0, 0); }
    let step = if d.y == -r {
        d.x + r
    } else if d.x == r {
        2 * r + (d.y + r)
    } else if d.y == r {
        4 * r + (r - d.x)
    } else {
        6 * r + (r - d.y)
    };
    (r, step)
}

// =================================================================================================
//
//                                            Unit Tests
//
// =================================================================================================
