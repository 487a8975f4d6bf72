pub mod excavator;
pub mod tracker;

use crate::error::{DeferReason, DigError};
use crate::executor::excavator::{MineOutcome, ObstacleExcavator};
use crate::operation::CancelToken;
use crate::pathing::{PathSearch, SearchBounds};
use crate::planner::grouper::group_columns;
use crate::planner::order_columns;
use crate::planner::plan::{DeferredSet, MiningPlan};
use crate::planner::sequencer::horizontal_distance_sq;
use crate::report::{MiningReport, MiningStatus, UnreachableBlock};
use bevy::prelude::*;
use miner_core::agent::{Actuator, Direction};
use miner_core::configuration::{BlockPolicy, ColumnDirection, MiningConfig, MiningPattern};
use miner_core::world::{column_key, BlockMutator};
use std::collections::HashSet;

/// States of the mining state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutorState {
    Idle,
    Sequencing,
    Executing,
    MovingToBlock,
    Mining,
    Deferring,
    RetryingPass,
    ShaftDigging,
    Completed,
    CompletedWithRemainder,
    Failed,
    Cancelled,
}

impl ExecutorState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutorState::Completed
                | ExecutorState::CompletedWithRemainder
                | ExecutorState::Failed
                | ExecutorState::Cancelled
        )
    }
}

/// The last removed target and the cell the agent removed it from.
#[derive(Clone, Copy, Debug)]
struct LastDig {
    block: IVec3,
    stand: IVec3,
}

/// Runs one mining operation over an already filtered target set.
///
/// Lives for exactly one operation; the plan and the deferred set die with it.
pub struct MiningExecutor<'a, W: BlockMutator, A: Actuator> {
    config: &'a MiningConfig,
    excavator: ObstacleExcavator<'a, W, A>,
    cancel: CancelToken,
    state: ExecutorState,

    targets: Vec<IVec3>,
    plan: MiningPlan,
    deferred: DeferredSet,
    bounds: SearchBounds,
    last_dig: Option<LastDig>,
    pending_error: Option<DigError>,
    failure: Option<DigError>,
    shaft_attempted: HashSet<IVec2>,

    mined: Vec<IVec3>,
    skipped: Vec<IVec3>,
    unreachable: Vec<UnreachableBlock>,
    passes: u32,
    regroup_attempts: u32,
    inline_retries: u32,
    shafts: u32,
}

impl<'a, W: BlockMutator, A: Actuator> MiningExecutor<'a, W, A> {
    pub fn new(
        world: &'a mut W,
        agent: &'a mut A,
        config: &'a MiningConfig,
        policy: BlockPolicy,
        targets: Vec<IVec3>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            config,
            excavator: ObstacleExcavator::new(world, agent, config, policy),
            cancel,
            state: ExecutorState::Idle,
            targets,
            plan: MiningPlan::default(),
            deferred: DeferredSet::default(),
            bounds: SearchBounds { min: IVec3::ZERO, max: IVec3::ZERO },
            last_dig: None,
            pending_error: None,
            failure: None,
            shaft_attempted: HashSet::new(),
            mined: Vec::new(),
            skipped: Vec::new(),
            unreachable: Vec::new(),
            passes: 0,
            regroup_attempts: 0,
            inline_retries: 0,
            shafts: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> ExecutorState { self.state }

    /// Drives the state machine to a terminal state and reports.
    pub async fn run(mut self) -> MiningReport {
        while !self.state.is_terminal() {
            if self.cancel.is_cancelled() {
                info!("Mining cancelled while {:?}", self.state);
                self.state = ExecutorState::Cancelled;
                break;
            }

            let next = match self.state {
                ExecutorState::Idle => self.start().await,
                ExecutorState::Sequencing => self.sequence(),
                ExecutorState::Executing => self.execute(),
                ExecutorState::MovingToBlock => self.move_to_block().await,
                ExecutorState::Mining => self.mine().await,
                ExecutorState::Deferring => self.defer(),
                ExecutorState::RetryingPass => self.retry_pass(),
                ExecutorState::ShaftDigging => self.dig_shaft().await,
                terminal => terminal,
            };

            if next != self.state {
                trace!("Executor {:?} -> {:?}", self.state, next);
            }
            self.state = next;
        }

        self.finish()
    }

    async fn start(&mut self) -> ExecutorState {
        let at = match self.excavator.locate().await {
            Ok(at) => at,
            Err(e) => return self.fail(e),
        };
        if let Err(e) = self.excavator.ensure_fuel().await {
            return self.fail(e);
        }

        self.bounds = SearchBounds::around(self.targets.iter().copied().chain([at]), self.config.search_margin)
            .unwrap_or(SearchBounds { min: at, max: at });
        info!("Mining {} block(s), agent at {}", self.targets.len(), at);
        ExecutorState::Sequencing
    }

    fn sequence(&mut self) -> ExecutorState {
        let targets = std::mem::take(&mut self.targets);
        let columns = order_columns(
            &targets,
            self.config.direction,
            column_key(self.excavator.position()),
            self.config.pattern,
        );

        debug!("Planned {} block(s) in {} column(s), {:?}", targets.len(), columns.len(), self.config.pattern);
        self.plan = MiningPlan::from_columns(&columns);
        self.passes = 1;
        ExecutorState::Executing
    }

    fn execute(&mut self) -> ExecutorState {
        if self.plan.is_exhausted() {
            return self.end_pass();
        }

        if self.plan.at_column_start() {
            self.retry_inline();
        }

        let Some(target) = self.plan.current() else {
            return self.end_pass();
        };

        if !self.excavator.world().is_block_solid(target) {
            debug!("{}, skipping", DigError::WorldStateDesync(target));
            self.skipped.push(target);
            self.plan.advance();
            return ExecutorState::Executing;
        }

        ExecutorState::MovingToBlock
    }

    fn end_pass(&mut self) -> ExecutorState {
        if !self.deferred.is_empty() {
            return ExecutorState::RetryingPass;
        }
        if self.unreachable.is_empty() {
            ExecutorState::Completed
        } else {
            ExecutorState::CompletedWithRemainder
        }
    }

    /// Splices deferred columns back in front of the column about to start, once something
    /// was mined since they were deferred.
    fn retry_inline(&mut self) {
        if self.deferred.is_empty() {
            return;
        }
        let ready = self.deferred.take_retryable(self.mined.len(), self.config.max_retry_passes);
        if ready.is_empty() {
            return;
        }

        // Columns keep the configured direction here; only shafts are always dug top-down.
        let columns = order_columns(
            &ready,
            self.config.direction,
            column_key(self.excavator.position()),
            MiningPattern::NearestColumn,
        );
        debug!("Retrying {} deferred block(s) in {} column(s) inline", ready.len(), columns.len());
        self.inline_retries += 1;
        self.plan.splice_columns(&columns);
    }

    async fn move_to_block(&mut self) -> ExecutorState {
        let Some(target) = self.plan.current() else {
            return ExecutorState::Executing;
        };
        let from = match self.excavator.locate().await {
            Ok(from) => from,
            Err(e) => return self.fail(e),
        };

        if let Some(cells) = self.fast_path(target, from) {
            match self.excavator.travel(&cells).await {
                Ok(_) => return ExecutorState::Mining,
                Err(e) if e.is_fatal() => return self.fail(e),
                Err(e) => debug!("Same-column step to {} failed ({}), repositioning", target, e),
            }
        }

        match self.reach(target).await {
            Ok(()) => ExecutorState::Mining,
            Err(e) => self.on_error(e),
        }
    }

    /// Cells leading straight down (or up) the column from the last removed block, if the
    /// agent still stands where it removed it from.
    fn fast_path(&self, target: IVec3, from: IVec3) -> Option<Vec<IVec3>> {
        let last = self.last_dig?;
        if column_key(last.block) != column_key(target) || from != last.stand {
            return None;
        }
        let step = match target.y.cmp(&last.block.y) {
            std::cmp::Ordering::Less => IVec3::NEG_Y,
            std::cmp::Ordering::Greater => IVec3::Y,
            std::cmp::Ordering::Equal => return None,
        };

        let mut cells = vec![last.block];
        let mut cell = last.block + step;
        while cell != target {
            cells.push(cell);
            cell += step;
        }
        Some(cells)
    }

    /// Brings the agent next to `target` through a clear path, or by excavation.
    async fn reach(&mut self, target: IVec3) -> Result<(), DigError> {
        let from = self.excavator.position();
        if Direction::between(from, target).is_some() {
            return Ok(());
        }

        let candidates = self.approach_candidates(target, from);
        let cells = self.route_to(from, target, &candidates)?;
        self.excavator.travel(&cells).await?;

        let at = self.excavator.locate().await?;
        if Direction::between(at, target).is_none() {
            return Err(DigError::WorldStateDesync(at));
        }
        Ok(())
    }

    /// Standing cells around `target`: the column-direction side first, then the horizontal
    /// neighbors nearest to the agent, the opposite vertical side last.
    fn approach_candidates(&self, target: IVec3, from: IVec3) -> Vec<IVec3> {
        let along = self.config.direction.approach_offset();
        let mut sides: Vec<IVec3> = Direction::HORIZONTAL.iter().map(|d| target + d.offset()).collect();
        sides.sort_by_key(|&c| (c - from).length_squared());

        let mut out = Vec::with_capacity(6);
        out.push(target + along);
        out.extend(sides);
        out.push(target - along);
        out
    }

    /// Route to the first reachable goal, clear paths preferred over excavation.
    fn route_to(&self, from: IVec3, target: IVec3, goals: &[IVec3]) -> Result<Vec<IVec3>, DigError> {
        let world = self.excavator.world();
        let search = PathSearch::new(world, self.bounds.including(from), self.config.max_search_nodes);

        if let Some(route) = search.clear_path(from, goals) {
            return Ok(route.cells);
        }
        if !self.config.excavation_enabled {
            return Err(DigError::NoAccessPath(target));
        }

        let pending = self.pending_targets();
        let route = search
            .excavation_route(from, goals, self.excavator.policy(), &pending, self.config.dig_cost)
            .map_err(|walls| self.obstruction_of(target, &walls))?;
        if route.digs > self.config.max_excavation_digs {
            return Err(DigError::ExcavationBudgetExhausted {
                target,
                needed: route.digs,
                budget: self.config.max_excavation_digs,
            });
        }

        debug!("Excavating {} cell(s) to reach {}", route.digs, target);
        Ok(route.cells)
    }

    /// Why no route exists: the protected cell closest to `target` among those the search
    /// ran into, if any.
    fn obstruction_of(&self, target: IVec3, walls: &[IVec3]) -> DigError {
        let world = self.excavator.world();
        walls.iter()
            .min_by_key(|&&w| (w - target).length_squared())
            .and_then(|&at| world.block_type(at).map(|block| DigError::UnbreakableObstruction { at, block }))
            .unwrap_or(DigError::NoAccessPath(target))
    }

    fn pending_targets(&self) -> HashSet<IVec3> {
        self.plan.remaining().iter().copied().chain(self.deferred.positions()).collect()
    }

    async fn mine(&mut self) -> ExecutorState {
        let Some(target) = self.plan.current() else {
            return ExecutorState::Executing;
        };
        let from = self.excavator.position();

        match self.excavator.mine(from, target).await {
            Ok(MineOutcome::Mined) => {
                debug!("Mined {} from {}", target, from);
                self.mined.push(target);
            }
            Ok(MineOutcome::AlreadyAir) => {
                debug!("{}, skipping", DigError::WorldStateDesync(target));
                self.skipped.push(target);
            }
            Err(e) => return self.on_error(e),
        }

        self.last_dig = Some(LastDig { block: target, stand: from });
        self.plan.advance();
        ExecutorState::Executing
    }

    /// Defers the rest of the current column as one unit.
    fn defer(&mut self) -> ExecutorState {
        let reason = self.pending_error.take().map_or(DeferReason::NoAccessPath, |e| e.reason());
        let Some(target) = self.plan.current() else {
            return ExecutorState::Executing;
        };
        let entering = self.plan.at_column_start();
        let blocks = self.plan.take_column_remainder();

        warn!(
            "{}; deferring {} block(s) of column {}{}",
            DigError::TransientUnreachable { position: target, reason: reason.clone() },
            blocks.len(),
            column_key(target),
            if entering { "" } else { " (interrupted)" },
        );
        let mined = self.mined.len();
        self.deferred.defer([target], reason, mined);
        self.deferred.defer(blocks.into_iter().filter(|&b| b != target), DeferReason::ColumnAbandoned, mined);
        ExecutorState::Executing
    }

    /// Regroups every deferred column that still has retries left; once none has, moves on to
    /// shafts or gives up.
    fn retry_pass(&mut self) -> ExecutorState {
        self.excavator.flush();

        let blocks = self.deferred.take_regroupable(self.config.max_retry_passes);
        if blocks.is_empty() {
            return if self.config.excavation_enabled {
                ExecutorState::ShaftDigging
            } else {
                self.give_up()
            };
        }

        self.regroup_attempts += 1;
        self.passes += 1;

        let columns = order_columns(
            &blocks,
            self.config.direction,
            column_key(self.excavator.position()),
            MiningPattern::NearestColumn,
        );
        info!(
            "Retry pass {}/{}: {} deferred block(s) in {} column(s)",
            self.regroup_attempts, self.config.max_retry_passes, blocks.len(), columns.len(),
        );
        self.plan.restart(&columns);
        ExecutorState::Executing
    }

    /// Sinks a vertical shaft to the nearest still deferred column and makes that column the plan.
    async fn dig_shaft(&mut self) -> ExecutorState {
        let from = match self.excavator.locate().await {
            Ok(from) => from,
            Err(e) => return self.fail(e),
        };

        let agent_xz = column_key(from);
        let next = group_columns(&self.deferred.positions(), ColumnDirection::TopDown)
            .into_iter()
            .filter(|c| !self.shaft_attempted.contains(&c.key))
            .min_by_key(|c| horizontal_distance_sq(agent_xz, c.key));
        let Some(column) = next else {
            return self.give_up();
        };
        let Some(top) = column.topmost() else {
            return self.give_up();
        };

        self.shaft_attempted.insert(column.key);
        self.shafts += 1;
        let taken = self.deferred.take_column(column.key);
        info!("Sinking shaft from {} toward column {} (top {})", from, column.key, top);

        match self.sink_shaft(from, top).await {
            Ok(()) => {
                self.last_dig = None;
                self.plan.restart(&[column]);
                ExecutorState::Executing
            }
            Err(e) if e.is_fatal() => {
                self.deferred.defer(taken.into_iter().map(|b| b.position), DeferReason::Aborted, self.mined.len());
                self.fail(e)
            }
            Err(e) => {
                warn!("Shaft toward column {} failed: {}", column.key, e);
                let reason = e.reason();
                for block in taken {
                    self.mark_unreachable(block.position, reason.clone());
                }
                ExecutorState::ShaftDigging
            }
        }
    }

    /// Climbs to the shaft head above `top`, then digs straight down to the cell above it.
    async fn sink_shaft(&mut self, from: IVec3, top: IVec3) -> Result<(), DigError> {
        let head = self.shaft_head(from, top).ok_or(DigError::NoAccessPath(top))?;
        let cells = self.route_to(from, top, &[head])?;
        let mut at = self.excavator.travel(&cells).await?;

        while at.y > top.y + 1 {
            at = self.excavator.step(at, Direction::Down).await?;
        }
        Ok(())
    }

    /// Cell above `top` the shaft starts from.
    ///
    /// The lowest open cell of the column above `top` that the agent can walk to wins.
    /// Without one, the shaft starts at the height of the reachable cell above `top` that
    /// is horizontally closest, and the agent excavates across to it.
    fn shaft_head(&self, from: IVec3, top: IVec3) -> Option<IVec3> {
        let world = self.excavator.world();
        let search = PathSearch::new(world, self.bounds.including(from), self.config.max_search_nodes);
        let above: Vec<IVec3> = search.reachable(from).into_iter().filter(|c| c.y > top.y).collect();

        let key = column_key(top);
        if let Some(head) = above.iter().copied().filter(|&c| column_key(c) == key).min_by_key(|c| c.y) {
            return Some(head);
        }
        above.iter()
            .min_by_key(|&&c| (horizontal_distance_sq(column_key(c), key), c.y))
            .map(|&c| IVec3::new(top.x, c.y, top.z))
    }

    fn give_up(&mut self) -> ExecutorState {
        for block in self.deferred.take_all() {
            self.mark_unreachable(block.position, block.reason);
        }
        ExecutorState::CompletedWithRemainder
    }

    fn mark_unreachable(&mut self, position: IVec3, reason: DeferReason) {
        warn!("{}", DigError::PermanentlyUnreachable { position, passes: self.passes, reason: reason.clone() });
        self.unreachable.push(UnreachableBlock { position, reason });
    }

    fn on_error(&mut self, error: DigError) -> ExecutorState {
        if error.is_fatal() {
            return self.fail(error);
        }
        self.pending_error = Some(error);
        ExecutorState::Deferring
    }

    fn fail(&mut self, error: DigError) -> ExecutorState {
        error!("Mining failed: {}", error);
        self.failure = Some(error);
        ExecutorState::Failed
    }

    fn finish(mut self) -> MiningReport {
        self.excavator.flush();

        let status = match self.state {
            ExecutorState::Completed => MiningStatus::Completed,
            ExecutorState::CompletedWithRemainder => MiningStatus::CompletedWithRemainder,
            ExecutorState::Cancelled => MiningStatus::Cancelled,
            _ => MiningStatus::Failed,
        };

        let mut unfinished = std::mem::take(&mut self.targets);
        unfinished.extend_from_slice(self.plan.remaining());
        unfinished.extend(self.deferred.positions());

        let report = MiningReport {
            status,
            mined: self.mined,
            skipped: self.skipped,
            unreachable: self.unreachable,
            unfinished,
            passes: self.passes,
            regroup_attempts: self.regroup_attempts,
            inline_retries: self.inline_retries,
            shafts: self.shafts,
            stats: self.excavator.stats(),
            failure: self.failure.map(|e| e.to_string()),
        };
        info!("Mining {}", report);
        report
    }
}

// =================================================================================================
//
//                                            Unit Tests
//
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use miner_core::world::block::BlockRegistry;
    use miner_world::sim_agent::SimActuator;
    use miner_world::voxel_world::VoxelWorld;

    #[test]
    fn test_thick_protected_shell_is_reported_as_obstruction() {
        let mut world = VoxelWorld::new(BlockRegistry::default());
        world.fill_box(IVec3::splat(-2), IVec3::splat(2), "bedrock_block");
        world.fill_box(IVec3::splat(-1), IVec3::splat(1), "stone_block");
        let start = IVec3::new(0, 5, 0);
        let mut agent = SimActuator::new(&world, start);

        let config = MiningConfig::default();
        let target = IVec3::ZERO;
        let mut executor = MiningExecutor::new(
            &mut world, &mut agent, &config, config.policy(), vec![target], CancelToken::default(),
        );
        executor.bounds = SearchBounds::around([target, start], config.search_margin).unwrap();

        let goals = executor.approach_candidates(target, start);
        let error = executor.route_to(start, target, &goals).unwrap_err();

        assert!(matches!(error, DigError::UnbreakableObstruction { at, .. } if at.abs().max_element() == 2));
        assert_eq!(error.reason(), DeferReason::UnbreakableObstruction("bedrock_block".into()));
    }
}
