//! STATE-phase systems: timed expiry, death, and deferred destruction.
//!
//! Register [`LifetimeSystem`] before [`CleanupSystem`]; the cleanup pass is
//! the one that flushes the registry's deferred-destroy queue.

use arcadia_ecs::prelude::*;

use crate::events::fx;
use crate::tick::{StepInfo, System, SystemError};
use crate::world::WorldState;

/// Counts down [`Lifetime`] and queues expired entities for destruction.
#[derive(Debug)]
pub struct LifetimeSystem {
    query: Query,
    scratch: Vec<EntityId>,
}

impl Default for LifetimeSystem {
    fn default() -> Self {
        Self {
            query: Query::all(&[ComponentKind::Lifetime]),
            scratch: Vec::new(),
        }
    }
}

impl System for LifetimeSystem {
    fn name(&self) -> &str {
        "lifetime"
    }

    fn run(&mut self, world: &mut WorldState, step: &StepInfo) -> Result<(), SystemError> {
        self.scratch.clear();
        self.scratch.extend_from_slice(world.registry.query(self.query));
        for &id in &self.scratch {
            let lifetime = world.registry.require_mut::<Lifetime>(id)?;
            lifetime.remaining -= step.delta;
            if lifetime.remaining <= 0.0 {
                world.registry.defer_destroy(id);
            }
        }
        Ok(())
    }
}

/// Queues every entity whose health is depleted (emitting [`fx::DEATH`]),
/// then destroys everything queued this step.
#[derive(Debug)]
pub struct CleanupSystem {
    query: Query,
    scratch: Vec<EntityId>,
    destroyed_total: u64,
}

impl Default for CleanupSystem {
    fn default() -> Self {
        Self {
            query: Query::all(&[ComponentKind::Health]),
            scratch: Vec::new(),
            destroyed_total: 0,
        }
    }
}

impl CleanupSystem {
    pub fn destroyed_total(&self) -> u64 {
        self.destroyed_total
    }
}

impl System for CleanupSystem {
    fn name(&self) -> &str {
        "cleanup"
    }

    fn run(&mut self, world: &mut WorldState, _step: &StepInfo) -> Result<(), SystemError> {
        self.scratch.clear();
        self.scratch.extend_from_slice(world.registry.query(self.query));
        for &id in &self.scratch {
            let Some(record) = world.registry.get(id) else {
                continue;
            };
            let depleted = record.get::<Health>().is_some_and(Health::is_depleted);
            if !depleted || world.registry.is_pending_destroy(id) {
                continue;
            }
            let (x, y) = record.get::<Transform>().map_or((0.0, 0.0), |t| (t.x, t.y));
            let variant = record.get::<Enemy>().map_or(-1.0, |e| e.variant as u8 as f32);
            world.events.emit(fx::DEATH, [x, y, variant, 0.0]);
            world.registry.defer_destroy(id);
        }
        self.destroyed_total += world.registry.flush_deferred() as u64;
        Ok(())
    }
}
