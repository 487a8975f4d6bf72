use crate::voxel_world::VoxelWorld;
use bevy::prelude::*;
use futures_lite::future;
use miner_core::agent::{ActionKind, ActionOutcome, Actuator, Direction};
use miner_core::world::block::BlockRegistry;
use miner_core::world::chunk::ChunkMap;

/// One acknowledged physical action, as seen by the agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentAction {
    pub kind: ActionKind,
    pub direction: Direction,
    /// Agent position when the action was issued.
    pub origin: IVec3,
    pub outcome: ActionOutcome,
}

/// Simulated agent with its own copy of the physical terrain.
///
/// Digging here changes only the agent's terrain; keeping the planner's world model in
/// sync is the planner's job, exactly like with a real agent. Every acknowledgment
/// yields once before it resolves.
#[derive(Resource)]
pub struct SimActuator {
    terrain: ChunkMap,
    registry: BlockRegistry,
    position: IVec3,
    facing: Direction,
    fuel: Option<u32>,
    failing_moves: u32,
    failing_digs: u32,
    jammed: bool,
    signal_lost_after: Option<usize>,
    trace: Vec<AgentAction>,
}

impl SimActuator {
    /// Agent standing at `start` inside a snapshot of `world`.
    pub fn new(world: &VoxelWorld, start: IVec3) -> Self {
        Self {
            terrain: world.chunks().clone(),
            registry: world.registry().clone(),
            position: start,
            facing: Direction::North,
            fuel: None,
            failing_moves: 0,
            failing_digs: 0,
            jammed: false,
            signal_lost_after: None,
            trace: Vec::new(),
        }
    }

    pub fn with_fuel(mut self, fuel: u32) -> Self {
        self.fuel = Some(fuel);
        self
    }

    /// The next `count` moves are acknowledged as failed.
    pub fn fail_next_moves(&mut self, count: u32) { self.failing_moves = count; }

    /// The next `count` digs are acknowledged as failed.
    pub fn fail_next_digs(&mut self, count: u32) { self.failing_digs = count; }

    /// Moves report success but the agent never leaves its cell.
    pub fn jam(&mut self) { self.jammed = true; }

    /// Position queries return `None` once `actions` actions were issued.
    pub fn lose_signal_after(&mut self, actions: usize) { self.signal_lost_after = Some(actions); }

    /// Places a block in the physical terrain only, the planner's world doesn't see it.
    pub fn place_physical(&mut self, pos: IVec3, name: &str) {
        if let Some(id) = self.registry.id_optional(name) {
            self.terrain.set_world(pos, id);
        }
    }

    #[inline]
    pub fn position(&self) -> IVec3 { self.position }

    #[inline]
    pub fn trace(&self) -> &[AgentAction] { &self.trace }

    pub fn count(&self, kind: ActionKind) -> usize {
        self.trace.iter().filter(|a| a.kind == kind).count()
    }

    pub fn successful(&self, kind: ActionKind) -> usize {
        self.trace.iter().filter(|a| a.kind == kind && a.outcome.is_success()).count()
    }

    /// Cells the agent actually dug, in order.
    pub fn dug_cells(&self) -> Vec<IVec3> {
        self.trace.iter()
            .filter(|a| a.kind == ActionKind::Dig && a.outcome.is_success())
            .map(|a| a.origin + a.direction.offset())
            .collect()
    }

    pub fn physical_block(&self, pos: IVec3) -> Option<&str> {
        let id = self.terrain.get_world(pos);
        if self.registry.is_air(id) { None } else { self.registry.name_optional(id) }
    }

    fn record(&mut self, kind: ActionKind, direction: Direction, outcome: ActionOutcome) -> ActionOutcome {
        self.trace.push(AgentAction { kind, direction, origin: self.position, outcome });
        outcome
    }

    fn turn(&mut self, direction: Direction) {
        if !direction.is_vertical() {
            self.facing = direction;
        }
    }

    fn signal_lost(&self) -> bool {
        self.signal_lost_after.is_some_and(|n| self.trace.len() >= n)
    }
}

impl Actuator for SimActuator {
    async fn move_agent(&mut self, direction: Direction) -> ActionOutcome {
        future::yield_now().await;

        if self.fuel == Some(0) {
            return self.record(ActionKind::Move, direction, ActionOutcome::Failed);
        }
        if self.failing_moves > 0 {
            self.failing_moves -= 1;
            return self.record(ActionKind::Move, direction, ActionOutcome::Failed);
        }

        let target = self.position + direction.offset();
        if self.registry.is_solid(self.terrain.get_world(target)) {
            return self.record(ActionKind::Move, direction, ActionOutcome::Failed);
        }

        let outcome = self.record(ActionKind::Move, direction, ActionOutcome::Success);
        self.turn(direction);
        if !self.jammed {
            self.position = target;
        }
        if let Some(fuel) = self.fuel.as_mut() {
            *fuel -= 1;
        }
        outcome
    }

    async fn dig(&mut self, direction: Direction) -> ActionOutcome {
        future::yield_now().await;
        self.turn(direction);

        if self.failing_digs > 0 {
            self.failing_digs -= 1;
            return self.record(ActionKind::Dig, direction, ActionOutcome::Failed);
        }

        let target = self.position + direction.offset();
        let id = self.terrain.get_world(target);
        if !self.registry.is_solid(id) || self.registry.is_unbreakable(id) {
            return self.record(ActionKind::Dig, direction, ActionOutcome::Failed);
        }

        self.terrain.set_world(target, 0);
        self.record(ActionKind::Dig, direction, ActionOutcome::Success)
    }

    async fn agent_position(&mut self) -> Option<IVec3> {
        future::yield_now().await;
        if self.signal_lost() { None } else { Some(self.position) }
    }

    async fn agent_facing(&mut self) -> Option<Direction> {
        if self.signal_lost() { None } else { Some(self.facing) }
    }

    async fn fuel_level(&mut self) -> Option<u32> {
        self.fuel
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
    use miner_core::world::BlockOracle;

    fn world() -> VoxelWorld {
        let mut world = VoxelWorld::new(BlockRegistry::default());
        world.set_block(IVec3::new(0, 0, 0), "stone_block");
        world.set_block(IVec3::new(1, 1, 0), "bedrock_block");
        world
    }

    #[test]
    fn test_move_blocked_by_solid() {
        let mut agent = SimActuator::new(&world(), IVec3::new(0, 1, 0));
        assert_eq!(block_on(agent.move_agent(Direction::Down)), ActionOutcome::Failed);
        assert_eq!(block_on(agent.move_agent(Direction::Up)), ActionOutcome::Success);
        assert_eq!(agent.position(), IVec3::new(0, 2, 0));
    }

    #[test]
    fn test_dig_changes_only_physical_terrain() {
        let world = world();
        let mut agent = SimActuator::new(&world, IVec3::new(0, 1, 0));

        assert!(block_on(agent.dig(Direction::Down)).is_success());
        assert_eq!(agent.physical_block(IVec3::ZERO), None);
        assert_eq!(world.block_type(IVec3::ZERO).as_deref(), Some("stone_block"));
        assert_eq!(agent.dug_cells(), vec![IVec3::ZERO]);
    }

    #[test]
    fn test_dig_fails_on_air_and_unbreakable() {
        let mut agent = SimActuator::new(&world(), IVec3::new(0, 1, 0));
        assert_eq!(block_on(agent.dig(Direction::Up)), ActionOutcome::Failed);
        assert_eq!(block_on(agent.dig(Direction::East)), ActionOutcome::Failed);
        assert_eq!(block_on(agent.agent_facing()), Some(Direction::East));
    }

    #[test]
    fn test_scripted_failures_and_signal_loss() {
        let mut agent = SimActuator::new(&world(), IVec3::new(0, 1, 0));
        agent.fail_next_moves(1);
        agent.lose_signal_after(2);

        assert_eq!(block_on(agent.move_agent(Direction::Up)), ActionOutcome::Failed);
        assert_eq!(block_on(agent.agent_position()), Some(IVec3::new(0, 1, 0)));
        assert_eq!(block_on(agent.move_agent(Direction::Up)), ActionOutcome::Success);
        assert_eq!(block_on(agent.agent_position()), None);
    }

    #[test]
    fn test_fuel_runs_out() {
        let mut agent = SimActuator::new(&world(), IVec3::new(0, 1, 0)).with_fuel(1);
        assert!(block_on(agent.move_agent(Direction::Up)).is_success());
        assert_eq!(block_on(agent.fuel_level()), Some(0));
        assert_eq!(block_on(agent.move_agent(Direction::Up)), ActionOutcome::Failed);
    }

    #[test]
    fn test_jammed_agent_stays_in_place() {
        let mut agent = SimActuator::new(&world(), IVec3::new(0, 1, 0));
        agent.jam();
        assert!(block_on(agent.move_agent(Direction::Up)).is_success());
        assert_eq!(agent.position(), IVec3::new(0, 1, 0));
    }
}
