//! Layer-masked circle collision (COLLISION phase).
//!
//! Detection only: overlapping pairs are handed to a [`CombatResolver`],
//! which decides what a hit means. The collision system itself never touches
//! health.
//!
//! A pair is tested when either side wants the other:
//! `(a.mask & b.layer) != 0 || (b.mask & a.layer) != 0`. A bullet whose mask
//! includes the enemy layer hits that enemy even if the enemy's own mask
//! ignores bullets.

use std::collections::HashSet;

use arcadia_ecs::prelude::*;
use tracing::trace;

use crate::events::fx;
use crate::tick::{StepInfo, System, SystemError};
use crate::world::WorldState;

/// System name used in diagnostics.
pub const COLLISION_SYSTEM_NAME: &str = "collision";

/// Receives every overlapping pair found in a step.
pub trait CombatResolver {
    /// `a` is the entity whose broad-phase query discovered `b`. Both ids
    /// were active when the call was made.
    fn resolve(&mut self, a: EntityId, b: EntityId, world: &mut WorldState) -> Result<(), SystemError>;
}

impl<F> CombatResolver for F
where
    F: FnMut(EntityId, EntityId, &mut WorldState) -> Result<(), SystemError>,
{
    fn resolve(&mut self, a: EntityId, b: EntityId, world: &mut WorldState) -> Result<(), SystemError> {
        self(a, b, world)
    }
}

fn is_spawning(record: &EntityRecord) -> bool {
    record.get::<Enemy>().is_some_and(|e| e.spawning)
}

pub struct CollisionSystem {
    resolver: Box<dyn CombatResolver>,
    margin: f32,
    query: Query,
    ids: Vec<EntityId>,
    candidates: Vec<EntityId>,
    seen: HashSet<(EntityId, EntityId)>,
    hits: Vec<(EntityId, EntityId)>,
}

impl std::fmt::Debug for CollisionSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionSystem")
            .field("margin", &self.margin)
            .field("last_hits", &self.hits.len())
            .finish()
    }
}

impl CollisionSystem {
    pub fn new(resolver: impl CombatResolver + 'static, margin: f32) -> Self {
        Self::with_boxed(Box::new(resolver), margin)
    }

    pub fn with_boxed(resolver: Box<dyn CombatResolver>, margin: f32) -> Self {
        Self {
            resolver,
            margin,
            query: Query::all(&[ComponentKind::Transform, ComponentKind::Collider]),
            ids: Vec::new(),
            candidates: Vec::new(),
            seen: HashSet::new(),
            hits: Vec::new(),
        }
    }

    /// Pairs found in the last step, in discovery order.
    pub fn last_hits(&self) -> &[(EntityId, EntityId)] {
        &self.hits
    }

    /// Broad and narrow phase. Fills `self.hits`.
    fn detect(&mut self, world: &mut WorldState) {
        self.seen.clear();
        self.hits.clear();
        self.ids.clear();
        self.ids.extend_from_slice(world.registry.query(self.query));

        let registry = &world.registry;
        for &id in &self.ids {
            let Some(record) = registry.get(id) else {
                continue;
            };
            let (Some(t), Some(c)) = (record.get::<Transform>(), record.get::<Collider>()) else {
                continue;
            };
            if c.mask == 0 || is_spawning(record) {
                continue;
            }

            world.grid.query_into(t.x, t.y, c.radius + self.margin, &mut self.candidates);
            for &other in &self.candidates {
                if other == id {
                    continue;
                }
                let Some(other_record) = registry.get(other) else {
                    continue;
                };
                if is_spawning(other_record) {
                    continue;
                }
                let (Some(ot), Some(oc)) = (other_record.get::<Transform>(), other_record.get::<Collider>()) else {
                    continue;
                };
                if !self.seen.insert(id.sorted_pair(other)) {
                    continue;
                }
                if !c.interacts_with(oc) {
                    continue;
                }
                let reach = c.radius + oc.radius;
                if t.distance_squared(ot.x, ot.y) < reach * reach {
                    self.hits.push((id, other));
                }
            }
        }
    }
}

impl System for CollisionSystem {
    fn name(&self) -> &str {
        COLLISION_SYSTEM_NAME
    }

    fn run(&mut self, world: &mut WorldState, _step: &StepInfo) -> Result<(), SystemError> {
        self.detect(world);
        trace!(pairs = self.hits.len(), "collision pairs found");
        for &(a, b) in &self.hits {
            // Earlier resolutions may have destroyed either side.
            if world.registry.is_active(a) && world.registry.is_active(b) {
                self.resolver.resolve(a, b, world)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DamageResolver
// ---------------------------------------------------------------------------

/// Default resolver: a projectile that touches something with health deals
/// its damage once, emits [`fx::HIT`], and is queued for destruction.
///
/// Projectiles never damage their owner. Pairs without a projectile, or
/// without a health pool on the other side, are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct DamageResolver;

impl DamageResolver {
    fn apply(bullet: EntityId, target: EntityId, world: &mut WorldState) -> Result<bool, SystemError> {
        let Some(projectile) = world.registry.component::<Projectile>(bullet).copied() else {
            return Ok(false);
        };
        if projectile.owner == Some(target) || world.registry.is_pending_destroy(bullet) {
            return Ok(false);
        }
        let Some(health) = world.registry.component_mut::<Health>(target) else {
            return Ok(false);
        };
        health.current -= projectile.damage;

        let at = world.registry.require::<Transform>(target)?;
        let (x, y) = (at.x, at.y);
        world.events.emit(fx::HIT, [x, y, projectile.damage, 0.0]);
        world.registry.defer_destroy(bullet);
        Ok(true)
    }
}

impl CombatResolver for DamageResolver {
    fn resolve(&mut self, a: EntityId, b: EntityId, world: &mut WorldState) -> Result<(), SystemError> {
        if !Self::apply(a, b, world)? {
            Self::apply(b, a, world)?;
        }
        Ok(())
    }
}
