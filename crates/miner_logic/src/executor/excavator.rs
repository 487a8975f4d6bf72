use crate::error::DigError;
use crate::executor::tracker::MinedChunkTracker;
use crate::report::ActionStats;
use bevy::prelude::*;
use miner_core::agent::{ActionKind, Actuator, Direction};
use miner_core::configuration::{BlockPolicy, MiningConfig};
use miner_core::world::BlockMutator;

/// Result of digging a planned target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MineOutcome {
    Mined,
    /// The world already showed air, nothing was dug.
    AlreadyAir,
}

/// Drives the agent through the world and clears whatever blocks its way.
///
/// Owns every physical action of an operation, so it also keeps the action statistics,
/// the last confirmed agent position and the chunks touched by removals.
pub struct ObstacleExcavator<'a, W: BlockMutator, A: Actuator> {
    world: &'a mut W,
    agent: &'a mut A,
    policy: BlockPolicy,
    excavation_enabled: bool,
    max_move_attempts: u32,
    max_action_attempts: u32,
    position: IVec3,
    tracker: MinedChunkTracker,
    stats: ActionStats,
}

impl<'a, W: BlockMutator, A: Actuator> ObstacleExcavator<'a, W, A> {
    pub fn new(world: &'a mut W, agent: &'a mut A, config: &MiningConfig, policy: BlockPolicy) -> Self {
        Self {
            world,
            agent,
            policy,
            excavation_enabled: config.excavation_enabled,
            max_move_attempts: config.max_move_attempts.max(1),
            max_action_attempts: config.max_action_attempts.max(1),
            position: IVec3::ZERO,
            tracker: MinedChunkTracker::default(),
            stats: ActionStats::default(),
        }
    }

    #[inline]
    pub fn world(&self) -> &W { &*self.world }

    #[inline]
    pub fn policy(&self) -> &BlockPolicy { &self.policy }

    /// Last confirmed agent position.
    #[inline]
    pub fn position(&self) -> IVec3 { self.position }

    #[inline]
    pub fn stats(&self) -> ActionStats { self.stats }

    /// Asks the agent where it is.
    pub async fn locate(&mut self) -> Result<IVec3, DigError> {
        let position = self.agent.agent_position().await.ok_or(DigError::AgentPositionLost)?;
        self.position = position;
        Ok(position)
    }

    pub async fn ensure_fuel(&mut self) -> Result<(), DigError> {
        match self.agent.fuel_level().await {
            Some(0) => Err(DigError::FuelExhausted),
            _ => Ok(()),
        }
    }

    /// Walks a route cell by cell, excavating solid cells on the way.
    pub async fn travel(&mut self, cells: &[IVec3]) -> Result<IVec3, DigError> {
        let mut at = self.position;
        for &cell in cells {
            let Some(direction) = Direction::between(at, cell) else {
                return Err(DigError::WorldStateDesync(at));
            };
            at = self.step(at, direction).await?;
        }
        Ok(at)
    }

    /// One move from `from`, digging the cell ahead first if it is solid.
    pub async fn step(&mut self, from: IVec3, direction: Direction) -> Result<IVec3, DigError> {
        let next = from + direction.offset();

        if self.world.is_block_solid(next) {
            if !self.excavation_enabled {
                return Err(DigError::ExcavationDisabled(next));
            }
            let block = self.world.block_type(next).unwrap_or_default();
            if self.policy.is_protected(&block) {
                return Err(DigError::UnbreakableObstruction { at: next, block });
            }

            self.dig_toward(next, direction).await?;
            if self.remove(next).is_some() {
                self.stats.excavated += 1;
                trace!("Excavated {} at {}", block, next);
            }
        }

        let mut idle = 0;
        loop {
            self.stats.moves += 1;
            if self.agent.move_agent(direction).await.is_success() {
                let now = self.locate().await?;
                if now == next {
                    return Ok(next);
                }
                if now != from {
                    return Err(DigError::WorldStateDesync(now));
                }
            } else {
                self.stats.failed += 1;
                self.ensure_fuel().await?;
            }

            idle += 1;
            if idle >= self.max_move_attempts {
                warn!("Agent stuck at {} after {} moves {}", from, idle, direction);
                return Err(DigError::Stuck(from));
            }
        }
    }

    /// Digs a planned target next to `from`. Removal and notification happen before this returns.
    pub async fn mine(&mut self, from: IVec3, target: IVec3) -> Result<MineOutcome, DigError> {
        let Some(direction) = Direction::between(from, target) else {
            return Err(DigError::NoAccessPath(target));
        };
        if !self.world.is_block_solid(target) {
            return Ok(MineOutcome::AlreadyAir);
        }

        if let Err(e) = self.dig_toward(target, direction).await {
            if !self.world.is_block_solid(target) {
                return Ok(MineOutcome::AlreadyAir);
            }
            return Err(e);
        }

        match self.remove(target) {
            Some(_) => Ok(MineOutcome::Mined),
            None => Ok(MineOutcome::AlreadyAir),
        }
    }

    /// Requests regeneration of every chunk touched so far.
    pub fn flush(&mut self) -> Vec<IVec2> {
        self.tracker.flush(&mut *self.world)
    }

    async fn dig_toward(&mut self, at: IVec3, direction: Direction) -> Result<(), DigError> {
        for attempt in 1..=self.max_action_attempts {
            self.stats.digs += 1;
            if self.agent.dig(direction).await.is_success() {
                return Ok(());
            }
            self.stats.failed += 1;
            debug!("Dig {} at {} failed ({}/{})", direction, at, attempt, self.max_action_attempts);
            self.ensure_fuel().await?;
        }
        Err(DigError::ActuatorFailure { action: ActionKind::Dig, at, attempts: self.max_action_attempts })
    }

    fn remove(&mut self, pos: IVec3) -> Option<String> {
        let removed = self.world.remove_block(pos)?;
        self.tracker.record(pos);
        Some(removed)
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
    use futures_lite::future::block_on;
    use miner_core::world::block::BlockRegistry;
    use miner_world::listener::NotificationLog;
    use miner_world::sim_agent::SimActuator;
    use miner_world::voxel_world::VoxelWorld;

    fn setup() -> (VoxelWorld, NotificationLog) {
        let log = NotificationLog::default();
        let mut world = VoxelWorld::new(BlockRegistry::default()).with_listener(log.clone());
        world.set_block(IVec3::new(1, 0, 0), "stone_block");
        world.set_block(IVec3::new(0, 0, 1), "bedrock_block");
        (world, log)
    }

    #[test]
    fn test_step_digs_obstacle_then_moves() {
        let (mut world, log) = setup();
        let mut agent = SimActuator::new(&world, IVec3::ZERO);
        let config = MiningConfig::default();
        let mut excavator = ObstacleExcavator::new(&mut world, &mut agent, &config, config.policy());

        block_on(excavator.locate()).unwrap();
        let at = block_on(excavator.step(IVec3::ZERO, Direction::East)).unwrap();

        assert_eq!(at, IVec3::new(1, 0, 0));
        assert_eq!(excavator.stats().excavated, 1);
        assert_eq!(log.removed_positions(), vec![IVec3::new(1, 0, 0)]);
        assert_eq!(excavator.flush(), vec![IVec2::ZERO]);
    }

    #[test]
    fn test_step_refuses_protected_and_disabled() {
        let (mut world, _) = setup();
        let mut agent = SimActuator::new(&world, IVec3::ZERO);
        let config = MiningConfig { excavation_enabled: false, ..default() };
        let mut excavator = ObstacleExcavator::new(&mut world, &mut agent, &config, MiningConfig::default().policy());

        assert_eq!(
            block_on(excavator.step(IVec3::ZERO, Direction::East)),
            Err(DigError::ExcavationDisabled(IVec3::new(1, 0, 0)))
        );

        let config = MiningConfig::default();
        let (mut world, _) = setup();
        let mut agent = SimActuator::new(&world, IVec3::ZERO);
        let mut excavator = ObstacleExcavator::new(&mut world, &mut agent, &config, config.policy());
        assert!(matches!(
            block_on(excavator.step(IVec3::ZERO, Direction::South)),
            Err(DigError::UnbreakableObstruction { .. })
        ));
    }

    #[test]
    fn test_stuck_after_bounded_moves() {
        let (mut world, _) = setup();
        let mut agent = SimActuator::new(&world, IVec3::ZERO);
        agent.jam();
        let config = MiningConfig::default();
        let mut excavator = ObstacleExcavator::new(&mut world, &mut agent, &config, config.policy());

        assert_eq!(block_on(excavator.step(IVec3::ZERO, Direction::Up)), Err(DigError::Stuck(IVec3::ZERO)));
        assert_eq!(excavator.stats().moves, 3);
    }

    #[test]
    fn test_mine_retries_failed_digs() {
        let (mut world, log) = setup();
        let mut agent = SimActuator::new(&world, IVec3::ZERO);
        agent.fail_next_digs(2);
        let config = MiningConfig::default();
        let mut excavator = ObstacleExcavator::new(&mut world, &mut agent, &config, config.policy());

        let outcome = block_on(excavator.mine(IVec3::ZERO, IVec3::new(1, 0, 0))).unwrap();
        assert_eq!(outcome, MineOutcome::Mined);
        assert_eq!(excavator.stats().digs, 3);
        assert_eq!(excavator.stats().failed, 2);
        assert_eq!(log.removed_positions().len(), 1);
    }

    #[test]
    fn test_mine_gives_up_after_attempt_budget() {
        let (mut world, _) = setup();
        let mut agent = SimActuator::new(&world, IVec3::ZERO);
        agent.fail_next_digs(5);
        let config = MiningConfig::default();
        let mut excavator = ObstacleExcavator::new(&mut world, &mut agent, &config, config.policy());

        let err = block_on(excavator.mine(IVec3::ZERO, IVec3::new(1, 0, 0))).unwrap_err();
        assert_eq!(err, DigError::ActuatorFailure { action: ActionKind::Dig, at: IVec3::new(1, 0, 0), attempts: 3 });
    }

    #[test]
    fn test_mine_air_is_benign() {
        let (mut world, log) = setup();
        let mut agent = SimActuator::new(&world, IVec3::ZERO);
        let config = MiningConfig::default();
        let mut excavator = ObstacleExcavator::new(&mut world, &mut agent, &config, config.policy());

        assert_eq!(block_on(excavator.mine(IVec3::ZERO, IVec3::NEG_Y)), Ok(MineOutcome::AlreadyAir));
        assert_eq!(excavator.stats().digs, 0);
        assert!(log.is_empty());
    }
}
