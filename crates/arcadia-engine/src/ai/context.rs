//! The per-step AI context and the host hooks it exposes.
//!
//! [`AiContext`] is assembled once per LOGIC step from handles the
//! [`BehaviorSystem`](super::library::BehaviorSystem) already holds and is
//! passed by `&mut` into every node tick. It carries no per-entity state.

use arcadia_ecs::prelude::*;
use rand_pcg::Pcg32;

use crate::config::EnemyTuning;
use crate::events::FastEventBus;

pub type PanelId = u32;

/// Axis-aligned rectangle in world units; `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }
}

/// Parameters for a projectile fired by an AI leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileSpawn {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub damage: f32,
    pub owner: Option<EntityId>,
    pub config_id: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParticleShape {
    #[default]
    Circle,
    Square,
    Spark,
}

/// A purely visual particle; owned by the host, not the registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSpawn {
    pub x: f32,
    pub y: f32,
    /// `0xRRGGBB`
    pub color: u32,
    pub vx: f32,
    pub vy: f32,
    pub life: f32,
    pub size: f32,
    pub shape: ParticleShape,
}

/// Standard enemy projectile radius.
pub const PROJECTILE_RADIUS: f32 = 4.0;
/// Seconds before an unspent projectile expires.
pub const PROJECTILE_LIFETIME: f32 = 3.0;

/// Spawn an enemy projectile entity that hits the player and structures.
pub fn spawn_standard_projectile(registry: &mut EntityRegistry, spawn: &ProjectileSpawn) -> EntityId {
    registry.spawn(
        &[Tag::EnemyBullet],
        [
            Transform {
                x: spawn.x,
                y: spawn.y,
                rotation: spawn.vy.atan2(spawn.vx),
            }
            .into(),
            Velocity::new(spawn.vx, spawn.vy).into(),
            Collider::new(PROJECTILE_RADIUS, layers::ENEMY_BULLET, layers::PLAYER | layers::STRUCTURE).into(),
            Projectile {
                damage: spawn.damage,
                owner: spawn.owner,
                config_id: spawn.config_id,
            }
            .into(),
            Lifetime {
                remaining: PROJECTILE_LIFETIME,
            }
            .into(),
        ],
    )
}

/// Side effects and world queries supplied by the host.
///
/// Every method has a do-nothing default so hosts implement only what they
/// render or simulate.
pub trait WorldHooks {
    fn panel_rect(&self, _id: PanelId) -> Option<Rect> {
        None
    }

    fn all_panel_rects(&self) -> Vec<(PanelId, Rect)> {
        Vec::new()
    }

    fn damage_panel(&mut self, _id: PanelId, _amount: f32) {}

    /// The default spawns a [`spawn_standard_projectile`] entity.
    fn spawn_projectile(&mut self, registry: &mut EntityRegistry, spawn: ProjectileSpawn) -> EntityId {
        spawn_standard_projectile(registry, &spawn)
    }

    fn spawn_particle(&mut self, _particle: ParticleSpawn) {}

    fn spawn_fx(&mut self, _kind: &str, _x: f32, _y: f32, _angle: f32) {}

    /// `pan` is the sound source's world x coordinate.
    fn play_sound(&mut self, _key: &str, _pan: f32) {}

    fn upgrade_level(&self, _key: &str) -> u32 {
        0
    }
}

/// Hooks that do nothing beyond the trait defaults.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl WorldHooks for NoopHooks {}

// ---------------------------------------------------------------------------
// AiContext
// ---------------------------------------------------------------------------

pub struct AiContext<'a> {
    pub registry: &'a mut EntityRegistry,
    pub hooks: &'a mut dyn WorldHooks,
    pub tuning: &'a EnemyTuning,
    pub events: &'a mut FastEventBus,
    pub rng: &'a mut Pcg32,
    /// Fixed step length in seconds.
    pub delta: f32,
    /// Simulation time at the start of this step.
    pub time: f64,
}

impl AiContext<'_> {
    pub fn ai_state(&self, entity: EntityId) -> Result<&AiState, EcsError> {
        self.registry.require::<AiState>(entity)
    }

    pub fn ai_state_mut(&mut self, entity: EntityId) -> Result<&mut AiState, EcsError> {
        self.registry.require_mut::<AiState>(entity)
    }

    /// A copy of the entity's transform.
    pub fn transform(&self, entity: EntityId) -> Result<Transform, EcsError> {
        self.registry.require::<Transform>(entity).copied()
    }

    /// The entity's enemy variant; non-enemies read driller tuning.
    pub fn variant(&self, entity: EntityId) -> EnemyVariant {
        self.registry
            .component::<Enemy>(entity)
            .map(|e| e.variant)
            .unwrap_or_default()
    }

    /// `explicit`, else the variant's tuning value for `key`, else `fallback`.
    pub fn param(&self, entity: EntityId, explicit: Option<f32>, key: &str, fallback: f32) -> f32 {
        explicit.unwrap_or_else(|| self.tuning.param_or(self.variant(entity), key, fallback))
    }

    /// The first active player that has a transform.
    pub fn player(&self) -> Option<(EntityId, Transform)> {
        self.registry
            .get_by_tag(Tag::Player)
            .iter()
            .find_map(|&id| self.registry.component::<Transform>(id).map(|t| (id, *t)))
    }

    /// Steer `entity` toward `(x, y)` at `speed`; returns the remaining
    /// distance. Also turns the entity to face the target.
    pub fn steer_toward(&mut self, entity: EntityId, x: f32, y: f32, speed: f32) -> Result<f32, EcsError> {
        let from = self.transform(entity)?;
        let (dx, dy) = (x - from.x, y - from.y);
        let distance = (dx * dx + dy * dy).sqrt();
        let (vx, vy) = if distance > f32::EPSILON {
            (dx / distance * speed, dy / distance * speed)
        } else {
            (0.0, 0.0)
        };
        self.set_velocity(entity, vx, vy)?;
        if distance > f32::EPSILON {
            self.registry.require_mut::<Transform>(entity)?.rotation = dy.atan2(dx);
        }
        Ok(distance)
    }

    /// Write the velocity in place; attach one if the entity has none.
    pub fn set_velocity(&mut self, entity: EntityId, vx: f32, vy: f32) -> Result<(), EcsError> {
        match self.registry.component_mut::<Velocity>(entity) {
            Some(v) => {
                *v = Velocity::new(vx, vy);
                Ok(())
            }
            None => self.registry.add_component(entity, Velocity::new(vx, vy)),
        }
    }

    /// Zero the entity's velocity, if it has one.
    pub fn stop(&mut self, entity: EntityId) {
        if let Some(v) = self.registry.component_mut::<Velocity>(entity) {
            *v = Velocity::default();
        }
    }
}
