mod common;

use bevy::prelude::*;
use common::*;
use futures_lite::future::block_on;
use miner_core::agent::{ActionKind, ActionOutcome, Actuator, Direction};
use miner_core::configuration::MiningConfig;
use miner_core::world::chunk_dim::chunk_of;
use miner_core::world::{BlockMutator, WorldNotification};
use miner_logic::error::DeferReason;
use miner_logic::operation::{excavate, CancelToken};
use miner_logic::report::MiningStatus;
use miner_world::shared::SharedWorld;
use miner_world::sim_agent::SimActuator;
use std::collections::HashSet;
use std::thread;

/// Cancels the operation once a number of digs were acknowledged.
struct CancelAfterDigs {
    inner: SimActuator,
    token: CancelToken,
    digs_left: usize,
}

impl Actuator for CancelAfterDigs {
    async fn move_agent(&mut self, direction: Direction) -> ActionOutcome {
        self.inner.move_agent(direction).await
    }

    async fn dig(&mut self, direction: Direction) -> ActionOutcome {
        let outcome = self.inner.dig(direction).await;
        if outcome.is_success() {
            self.digs_left = self.digs_left.saturating_sub(1);
            if self.digs_left == 0 {
                self.token.cancel();
            }
        }
        outcome
    }

    async fn agent_position(&mut self) -> Option<IVec3> {
        self.inner.agent_position().await
    }

    async fn agent_facing(&mut self) -> Option<Direction> {
        self.inner.agent_facing().await
    }
}

/// Removes a block behind the planner's back after the first dig.
struct Saboteur {
    inner: SimActuator,
    world: SharedWorld,
    victim: Option<IVec3>,
}

impl Actuator for Saboteur {
    async fn move_agent(&mut self, direction: Direction) -> ActionOutcome {
        self.inner.move_agent(direction).await
    }

    async fn dig(&mut self, direction: Direction) -> ActionOutcome {
        let outcome = self.inner.dig(direction).await;
        if let Some(victim) = self.victim.take() {
            self.world.lock().remove_block(victim);
        }
        outcome
    }

    async fn agent_position(&mut self) -> Option<IVec3> {
        self.inner.agent_position().await
    }

    async fn agent_facing(&mut self) -> Option<Direction> {
        self.inner.agent_facing().await
    }
}

fn cube_world() -> (miner_world::voxel_world::VoxelWorld, miner_world::listener::NotificationLog, Vec<IVec3>) {
    let (mut world, log) = world_with_log();
    world.fill_box(IVec3::ZERO, IVec3::splat(2), "stone_block");
    (world, log, cuboid(IVec3::ZERO, IVec3::splat(2)))
}

#[test]
fn test_cancel_between_steps_flushes_regeneration() {
    let (mut world, log, selection) = cube_world();
    let token = CancelToken::default();
    let mut agent = CancelAfterDigs {
        inner: SimActuator::new(&world, IVec3::new(1, 5, 1)),
        token: token.clone(),
        digs_left: 5,
    };

    let report = block_on(excavate(&mut world, &mut agent, &selection, &MiningConfig::default(), &token));

    assert_eq!(report.status, MiningStatus::Cancelled);
    assert_eq!(report.mined.len(), 5);
    assert_eq!(report.unfinished.len(), 22);
    assert_eq!(agent.inner.count(ActionKind::Dig), 5);

    let notifications = log.snapshot();
    assert_eq!(
        notifications.last(),
        Some(&WorldNotification::ChunkRegenerated { chunk: chunk_of(IVec3::ZERO) })
    );
    assert_eq!(log.removed_positions(), report.mined);
}

#[test]
fn test_cancelled_before_start_issues_nothing() {
    let (mut world, log, selection) = cube_world();
    let mut agent = SimActuator::new(&world, IVec3::new(1, 5, 1));
    let token = CancelToken::default();
    token.cancel();

    let report = block_on(excavate(&mut world, &mut agent, &selection, &MiningConfig::default(), &token));

    assert_eq!(report.status, MiningStatus::Cancelled);
    assert_eq!(report.unfinished.len(), 27);
    assert!(agent.trace().is_empty());
    assert!(log.is_empty());
}

#[test]
fn test_lost_position_signal_fails_operation() {
    let (mut world, _, selection) = cube_world();
    let mut agent = SimActuator::new(&world, IVec3::new(1, 5, 1));
    agent.lose_signal_after(6);

    let report = run(&mut world, &mut agent, &selection, &MiningConfig::default());

    assert_eq!(report.status, MiningStatus::Failed);
    assert_eq!(report.failure.as_deref(), Some("agent position signal lost"));
    assert!(!report.mined.is_empty());
    assert_eq!(report.mined.len() + report.unfinished.len(), 27);
}

#[test]
fn test_signal_lost_at_start() {
    let (mut world, _, selection) = cube_world();
    let mut agent = SimActuator::new(&world, IVec3::new(1, 5, 1));
    agent.lose_signal_after(0);

    let report = run(&mut world, &mut agent, &selection, &MiningConfig::default());

    assert_eq!(report.status, MiningStatus::Failed);
    assert_eq!(report.unfinished.len(), 27);
    assert!(agent.trace().is_empty());
}

#[test]
fn test_running_out_of_fuel_fails_operation() {
    let (mut world, _) = world_with_log();
    world.set_block(IVec3::ZERO, "stone_block");
    let mut agent = SimActuator::new(&world, IVec3::new(0, 10, 0)).with_fuel(3);

    let report = run(&mut world, &mut agent, &[IVec3::ZERO], &MiningConfig::default());

    assert_eq!(report.status, MiningStatus::Failed);
    assert_eq!(report.failure.as_deref(), Some("agent ran out of fuel"));
    assert_eq!(report.unfinished, vec![IVec3::ZERO]);
    assert_eq!(agent.successful(ActionKind::Move), 3);
}

#[test]
fn test_jammed_agent_is_stuck_and_bounded() {
    let (mut world, _) = world_with_log();
    world.set_block(IVec3::ZERO, "stone_block");
    let mut agent = SimActuator::new(&world, IVec3::new(0, 3, 0));
    agent.jam();

    let config = MiningConfig::default();
    let report = run(&mut world, &mut agent, &[IVec3::ZERO], &config);

    assert_eq!(report.status, MiningStatus::CompletedWithRemainder);
    assert_eq!(report.unreachable.len(), 1);
    assert_eq!(report.unreachable[0].reason, DeferReason::Stuck);

    // Every attempt gives up after the move budget: first pass, retry passes, shaft.
    let attempts = 1 + config.max_retry_passes + 1;
    assert_eq!(agent.count(ActionKind::Move), (attempts * config.max_move_attempts) as usize);
    assert_eq!(agent.count(ActionKind::Dig), 0);
}

#[test]
fn test_failing_digs_are_retried_locally() {
    let (mut world, _) = world_with_log();
    world.set_block(IVec3::ZERO, "stone_block");
    let mut agent = SimActuator::new(&world, IVec3::new(0, 2, 0));
    agent.fail_next_digs(2);

    let report = run(&mut world, &mut agent, &[IVec3::ZERO], &MiningConfig::default());

    assert_eq!(report.status, MiningStatus::Completed);
    assert_eq!(report.mined, vec![IVec3::ZERO]);
    assert_eq!(report.stats.digs, 3);
    assert_eq!(report.stats.failed, 2);
    assert_eq!(report.passes, 1);
}

#[test]
fn test_block_removed_elsewhere_is_skipped() {
    let (mut world, log) = world_with_log();
    let first = IVec3::ZERO;
    let victim = IVec3::new(3, 0, 0);
    world.set_block(first, "stone_block");
    world.set_block(victim, "stone_block");
    let inner = SimActuator::new(&world, IVec3::new(0, 3, 0));

    let mut shared = SharedWorld::new(world);
    let mut agent = Saboteur { inner, world: shared.clone(), victim: Some(victim) };

    let report = run(&mut shared, &mut agent, &[first, victim], &MiningConfig::default());

    assert_eq!(report.status, MiningStatus::Completed);
    assert_eq!(report.mined, vec![first]);
    assert_eq!(report.skipped, vec![victim]);
    assert_eq!(agent.inner.dug_cells(), vec![first]);
    assert_eq!(log.removed_positions(), vec![victim, first]);
}

#[test]
fn test_two_agents_on_shared_world_remove_each_block_once() {
    let (mut world, log) = world_with_log();
    world.fill_box(IVec3::ZERO, IVec3::new(5, 0, 5), "stone_block");
    let selection = cuboid(IVec3::ZERO, IVec3::new(5, 0, 5));
    let agents = [
        SimActuator::new(&world, IVec3::new(0, 3, 0)),
        SimActuator::new(&world, IVec3::new(5, 3, 5)),
    ];
    let shared = SharedWorld::new(world);

    let reports: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = agents.into_iter().map(|mut agent| {
            let mut world = shared.clone();
            let selection = &selection;
            s.spawn(move || run(&mut world, &mut agent, selection, &MiningConfig::default()))
        }).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut mined = HashSet::new();
    for report in &reports {
        assert!(report.is_success());
        for p in &report.mined {
            assert!(mined.insert(*p), "{} mined twice", p);
        }
    }
    assert_eq!(mined, selection.iter().copied().collect::<HashSet<_>>());

    let removed = log.removed_positions();
    assert_eq!(removed.len(), selection.len());
    assert_eq!(removed.iter().copied().collect::<HashSet<_>>().len(), selection.len());
}
