use bevy::prelude::*;
use std::fmt;

/// Absolute travel and dig directions of the agent.
///
/// North is `-Z`, east is `+X`, matching the chunk layout.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Direction { North, East, South, West, Up, Down }

impl Direction {

    pub const ALL: [Direction; 6] = [
        Direction::Up,
        Direction::Down,
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub const HORIZONTAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    #[inline]
    pub const fn offset(self) -> IVec3 {
        match self {
            Direction::East  => IVec3::new( 1,  0,  0),
            Direction::West  => IVec3::new(-1,  0,  0),
            Direction::Up    => IVec3::new( 0,  1,  0),
            Direction::Down  => IVec3::new( 0, -1,  0),
            Direction::South => IVec3::new( 0,  0,  1),
            Direction::North => IVec3::new( 0,  0, -1),
        }
    }

    #[inline]
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::South => Direction::North,
            Direction::North => Direction::South,
        }
    }

    #[inline]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    /// Direction of the single step from `from` to `to`, `None` unless both cells are face neighbors.
    pub fn between(from: IVec3, to: IVec3) -> Option<Direction> {
        let delta = to - from;
        Direction::ALL.into_iter().find(|d| d.offset() == delta)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
            Direction::Up => "up",
            Direction::Down => "down",
        };
        f.write_str(name)
    }
}

/// The two physical primitives the planner issues.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ActionKind { Move, Dig }

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Move => f.write_str("move"),
            ActionKind::Dig => f.write_str("dig"),
        }
    }
}

/// Acknowledgment of a physical action.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ActionOutcome { Success, Failed }

impl ActionOutcome {
    #[inline]
    pub fn is_success(self) -> bool { self == ActionOutcome::Success }
}

/// External executor of physical actions.
///
/// Every call resolves only once the agent acknowledged the action, with a latency the
/// planner can't predict. The planner never has two calls in flight.
#[allow(async_fn_in_trait)]
pub trait Actuator {
    async fn move_agent(&mut self, direction: Direction) -> ActionOutcome;

    async fn dig(&mut self, direction: Direction) -> ActionOutcome;

    /// Last known block position of the agent, `None` once the signal is lost.
    async fn agent_position(&mut self) -> Option<IVec3>;

    /// Horizontal direction the agent faces.
    async fn agent_facing(&mut self) -> Option<Direction>;

    /// Remaining fuel, `None` for agents without a fuel limit.
    async fn fuel_level(&mut self) -> Option<u32> {
        None
    }
}
