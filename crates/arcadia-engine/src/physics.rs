//! Motion integration and broad-phase rebuild (PHYSICS phase).
//!
//! Each step the [`MotionSystem`]:
//!
//! 1. integrates `Transform += Velocity * dt` for every mover,
//! 2. counts down enemy spawn timers, clearing `spawning` and emitting
//!    [`fx::SPAWN`] at zero,
//! 3. clears the [`SpatialGrid`](crate::spatial::SpatialGrid) and re-files
//!    every entity that has both a transform and a collider.
//!
//! Running the rebuild here guarantees the COLLISION phase of the same step
//! sees current positions.

use arcadia_ecs::prelude::*;

use crate::events::fx;
use crate::tick::{StepInfo, System, SystemError};
use crate::world::WorldState;

/// System name used in diagnostics.
pub const MOTION_SYSTEM_NAME: &str = "motion";

#[derive(Debug)]
pub struct MotionSystem {
    movers: Query,
    enemies: Query,
    colliders: Query,
    scratch: Vec<EntityId>,
}

impl Default for MotionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionSystem {
    pub fn new() -> Self {
        Self {
            movers: Query::all(&[ComponentKind::Transform, ComponentKind::Velocity]),
            enemies: Query::all(&[ComponentKind::Enemy]),
            colliders: Query::all(&[ComponentKind::Transform, ComponentKind::Collider]),
            scratch: Vec::new(),
        }
    }
}

impl System for MotionSystem {
    fn name(&self) -> &str {
        MOTION_SYSTEM_NAME
    }

    fn run(&mut self, world: &mut WorldState, step: &StepInfo) -> Result<(), SystemError> {
        let dt = step.delta;
        let registry = &mut world.registry;

        self.scratch.clear();
        self.scratch.extend_from_slice(registry.query(self.movers));
        for &id in &self.scratch {
            let Some(v) = registry.component::<Velocity>(id).copied() else {
                continue;
            };
            if let Some(t) = registry.component_mut::<Transform>(id) {
                t.x += v.vx * dt;
                t.y += v.vy * dt;
            }
        }

        self.scratch.clear();
        self.scratch.extend_from_slice(registry.query(self.enemies));
        for &id in &self.scratch {
            let Some(enemy) = registry.component_mut::<Enemy>(id) else {
                continue;
            };
            if !enemy.spawning {
                continue;
            }
            enemy.spawn_timer -= dt;
            if enemy.spawn_timer > 0.0 {
                continue;
            }
            enemy.spawn_timer = 0.0;
            enemy.spawning = false;
            let variant = enemy.variant as u8 as f32;
            let (x, y) = registry.component::<Transform>(id).map_or((0.0, 0.0), |t| (t.x, t.y));
            world.events.emit(fx::SPAWN, [x, y, variant, 0.0]);
        }

        world.grid.clear();
        self.scratch.clear();
        self.scratch.extend_from_slice(registry.query(self.colliders));
        for &id in &self.scratch {
            if let Some(t) = registry.component::<Transform>(id) {
                world.grid.insert(id, t.x, t.y);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn step() -> StepInfo {
        StepInfo {
            delta: 0.5,
            time: 0.0,
            step: 0,
        }
    }

    #[test]
    fn integrates_velocity() {
        let mut world = WorldState::new(&EngineConfig::default());
        let e = world
            .registry
            .spawn(&[], [Transform::at(1.0, 1.0).into(), Velocity::new(4.0, -2.0).into()]);
        let still = world.registry.spawn(&[], [Transform::at(3.0, 3.0).into()]);

        MotionSystem::new().run(&mut world, &step()).unwrap();
        let t = world.registry.component::<Transform>(e).unwrap();
        assert_eq!((t.x, t.y), (3.0, 0.0));
        assert_eq!(world.registry.component::<Transform>(still).map(|t| t.x), Some(3.0));
    }

    #[test]
    fn spawn_timer_expires() {
        let mut world = WorldState::new(&EngineConfig::default());
        let e = world
            .registry
            .spawn(&[Tag::Enemy], [Enemy::spawning(EnemyVariant::Hunter, 0.75).into()]);
        let mut motion = MotionSystem::new();

        motion.run(&mut world, &step()).unwrap();
        assert!(world.registry.component::<Enemy>(e).unwrap().spawning);
        motion.run(&mut world, &step()).unwrap();
        let enemy = world.registry.component::<Enemy>(e).unwrap();
        assert!(!enemy.spawning);
        assert_eq!(enemy.spawn_timer, 0.0);

        let mut spawned = Vec::new();
        world.events.read_events(0, |ev| spawned.push((ev.id, ev.args[2])));
        assert_eq!(spawned, vec![(fx::SPAWN, 1.0)]);
    }

    #[test]
    fn grid_is_rebuilt_from_colliders() {
        let mut world = WorldState::new(&EngineConfig::default());
        let a = world.registry.spawn(
            &[],
            [
                Transform::at(0.0, 0.0).into(),
                Velocity::new(200.0, 0.0).into(),
                Collider::new(1.0, layers::ENEMY, layers::BULLET).into(),
            ],
        );
        world.registry.spawn(&[], [Transform::at(0.0, 0.0).into()]);

        MotionSystem::new().run(&mut world, &step()).unwrap();
        assert_eq!(world.grid.len(), 1);
        assert!(world.grid.query(0.0, 0.0, 1.0).is_empty());
        assert_eq!(world.grid.query(100.0, 0.0, 1.0), vec![a]);
    }
}
