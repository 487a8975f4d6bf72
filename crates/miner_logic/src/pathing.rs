use bevy::prelude::*;
use miner_core::agent::Direction;
use miner_core::configuration::BlockPolicy;
use miner_core::world::{bounding_box, BlockOracle};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

/// Inclusive box every path search stays inside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchBounds {
    pub min: IVec3,
    pub max: IVec3,
}

impl SearchBounds {
    /// Bounding box of `positions` grown by `margin` on every side.
    pub fn around<I: IntoIterator<Item = IVec3>>(positions: I, margin: i32) -> Option<Self> {
        let (min, max) = bounding_box(positions)?;
        let margin = IVec3::splat(margin.max(0));
        Some(Self { min: min - margin, max: max + margin })
    }

    #[inline]
    pub fn contains(&self, p: IVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Same box grown just enough to contain `p`.
    #[inline]
    pub fn including(self, p: IVec3) -> Self {
        Self { min: self.min.min(p), max: self.max.max(p) }
    }
}

/// Cells to walk through, start excluded, destination last.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Route {
    pub cells: Vec<IVec3>,
    /// Solid cells on the route that have to be dug first.
    pub digs: u32,
}

impl Route {
    pub fn destination(&self) -> Option<IVec3> { self.cells.last().copied() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.cells.is_empty() }
}

/// Bounded grid searches over the world oracle.
pub struct PathSearch<'a, O: BlockOracle + ?Sized> {
    oracle: &'a O,
    bounds: SearchBounds,
    max_nodes: usize,
}

impl<'a, O: BlockOracle + ?Sized> PathSearch<'a, O> {
    pub fn new(oracle: &'a O, bounds: SearchBounds, max_nodes: usize) -> Self {
        Self { oracle, bounds, max_nodes: max_nodes.max(1) }
    }

    /// Breadth-first search through non-solid cells only.
    ///
    /// `goals` are in preference order: the first goal that is reachable at all wins, even
    /// when a later one is closer.
    pub fn clear_path(&self, start: IVec3, goals: &[IVec3]) -> Option<Route> {
        if goals.contains(&start) {
            return Some(Route::default());
        }

        let mut wanted: HashSet<IVec3> = goals.iter().copied().filter(|g| self.bounds.contains(*g)).collect();
        if wanted.is_empty() { return None; }

        let mut parents: HashMap<IVec3, IVec3> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        let mut expanded = 0usize;

        while let Some(cur) = queue.pop_front() {
            expanded += 1;
            if expanded > self.max_nodes {
                debug!("Clear path search from {} hit the node budget", start);
                break;
            }

            for d in Direction::ALL {
                let next = cur + d.offset();
                if next == start || parents.contains_key(&next) { continue; }
                if !self.bounds.contains(next) || self.oracle.is_block_solid(next) { continue; }

                parents.insert(next, cur);
                wanted.remove(&next);
                queue.push_back(next);
            }

            if wanted.is_empty() { break; }
        }

        let goal = goals.iter().copied().find(|g| parents.contains_key(g))?;
        Some(Route { cells: walk_back(&parents, start, goal), digs: 0 })
    }

    /// Every cell reachable from `start` through non-solid cells, `start` first, in
    /// breadth-first order.
    pub fn reachable(&self, start: IVec3) -> Vec<IVec3> {
        let mut seen: HashSet<IVec3> = HashSet::from([start]);
        let mut order = vec![start];
        let mut queue = VecDeque::from([start]);

        while let Some(cur) = queue.pop_front() {
            if order.len() > self.max_nodes {
                debug!("Reachability search from {} hit the node budget", start);
                break;
            }
            for d in Direction::ALL {
                let next = cur + d.offset();
                if !self.bounds.contains(next) || self.oracle.is_block_solid(next) { continue; }
                if seen.insert(next) {
                    order.push(next);
                    queue.push_back(next);
                }
            }
        }
        order
    }

    /// Cheapest route that may dig through solid cells.
    ///
    /// Entering air costs `1`, entering a diggable solid cell `1 + dig_cost`. Protected
    /// blocks and everything in `blocked` can't be entered. The cheapest reachable goal
    /// wins, ties go to the earlier goal.
    ///
    /// Without a route, returns the protected cells the search ran into, in the order it
    /// met them. The list is empty when the node budget ran out first.
    pub fn excavation_route(
        &self,
        start: IVec3,
        goals: &[IVec3],
        policy: &BlockPolicy,
        blocked: &HashSet<IVec3>,
        dig_cost: u32,
    ) -> Result<Route, Vec<IVec3>> {
        if goals.contains(&start) {
            return Ok(Route::default());
        }

        let goal_rank: HashMap<IVec3, usize> = goals.iter().enumerate().map(|(i, &g)| (g, i)).collect();
        let mut best: HashMap<IVec3, (u64, u32)> = HashMap::from([(start, (0, 0))]);
        let mut parents: HashMap<IVec3, IVec3> = HashMap::new();
        let mut heap = BinaryHeap::from([Reverse((0u64, usize::MAX, start.x, start.y, start.z))]);
        let mut expanded = 0usize;
        let mut walls: Vec<IVec3> = Vec::new();

        while let Some(Reverse((cost, rank, x, y, z))) = heap.pop() {
            let cur = IVec3::new(x, y, z);
            let Some(&(known, digs)) = best.get(&cur) else { continue; };
            if cost > known { continue; }

            if rank != usize::MAX {
                return Ok(Route { cells: walk_back(&parents, start, cur), digs });
            }

            expanded += 1;
            if expanded > self.max_nodes {
                debug!("Excavation search from {} hit the node budget", start);
                return Err(Vec::new());
            }

            for d in Direction::ALL {
                let next = cur + d.offset();
                if !self.bounds.contains(next) { continue; }

                let Some(step) = self.step_cost(next, policy, blocked, dig_cost) else {
                    if !walls.contains(&next) && self.is_protected(next, policy) {
                        walls.push(next);
                    }
                    continue;
                };
                let next_cost = cost + step as u64;
                let next_digs = digs + u32::from(step > 1);

                if best.get(&next).is_some_and(|&(c, _)| c <= next_cost) { continue; }
                best.insert(next, (next_cost, next_digs));
                parents.insert(next, cur);

                let next_rank = goal_rank.get(&next).copied().unwrap_or(usize::MAX);
                heap.push(Reverse((next_cost, next_rank, next.x, next.y, next.z)));
            }
        }

        Err(walls)
    }

    fn is_protected(&self, cell: IVec3, policy: &BlockPolicy) -> bool {
        self.oracle.block_type(cell).is_some_and(|b| policy.is_protected(&b))
    }

    fn step_cost(&self, cell: IVec3, policy: &BlockPolicy, blocked: &HashSet<IVec3>, dig_cost: u32) -> Option<u32> {
        if !self.oracle.is_block_solid(cell) {
            return Some(1);
        }
        if blocked.contains(&cell) {
            return None;
        }
        if self.is_protected(cell, policy) {
            return None;
        }
        Some(1 + dig_cost.max(1))
    }
}

fn walk_back(parents: &HashMap<IVec3, IVec3>, start: IVec3, goal: IVec3) -> Vec<IVec3> {
    let mut cells = vec![goal];
    let mut cur = goal;
    while let Some(&prev) = parents.get(&cur) {
        if prev == start { break; }
        cells.push(prev);
        cur = prev;
    }
    cells.reverse();
    cells
}

// =================================================================================================
//
//                                            Unit Tests
//
// =================================================================================================
