//! Behavior-tree AI for non-player actors.
//!
//! Trees are authored as JSON ([`RawNodeDef`]), validated into [`NodeDef`],
//! and built into immutable [`Node`] trees by a [`TreeBuilder`] that resolves
//! leaf keys through a [`NodeRegistry`]. A [`BehaviorLibrary`] names the built
//! trees and the [`BehaviorSystem`] ticks them once per LOGIC step for every
//! entity carrying [`Behavior`](arcadia_ecs::component::Behavior) and
//! [`AiState`](arcadia_ecs::component::AiState).

pub mod builder;
pub mod context;
pub mod leaves;
pub mod library;
pub mod node;

pub use builder::{NodeDef, NodeRegistry, RawNodeDef, TreeBuilder};
pub use context::{
    spawn_standard_projectile, AiContext, NoopHooks, PanelId, ParticleShape, ParticleSpawn, ProjectileSpawn,
    Rect, WorldHooks,
};
pub use library::{BehaviorLibrary, BehaviorSystem, BEHAVIOR_SYSTEM_NAME};
pub use node::{Leaf, Node, Status};

/// Errors raised while turning behavior definitions into trees.
///
/// All of these are content errors: they surface when a library is loaded,
/// never while the simulation runs.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("unknown node type `{0}`")]
    UnknownNodeType(String),

    #[error("decorator `{node}` needs exactly one child, got {count}")]
    DecoratorChildCount { node: String, count: usize },

    #[error("MemorySequence requires a non-empty `id`")]
    MissingMemoryId,

    #[error("leaf `{node}` does not take children")]
    UnexpectedChildren { node: String },

    #[error("invalid arguments for `{node}`: {reason}")]
    InvalidArgs { node: String, reason: String },

    #[error("unknown behavior tree `{0}`")]
    UnknownTree(String),

    #[error("more than {} MemorySequence ids in one library", u16::MAX)]
    TooManyMemorySlots,

    #[error("failed to parse behavior JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the AI unit tests.

    use std::cell::RefCell;
    use std::rc::Rc;

    use arcadia_ecs::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use super::context::{AiContext, PanelId, ParticleSpawn, ProjectileSpawn, Rect, WorldHooks};
    use super::node::{Leaf, Node, Status};
    use crate::config::EnemyTuning;
    use crate::events::FastEventBus;

    pub type CallLog = Rc<RefCell<Vec<&'static str>>>;

    /// Leaf that records its name and replays a scripted status list,
    /// repeating the last entry once exhausted.
    pub struct Scripted {
        name: &'static str,
        script: Vec<Status>,
        cursor: RefCell<usize>,
        log: CallLog,
    }

    impl Scripted {
        pub fn always(name: &'static str, status: Status, log: &CallLog) -> Self {
            Self::sequence(name, &[status], log)
        }

        pub fn sequence(name: &'static str, script: &[Status], log: &CallLog) -> Self {
            Self {
                name,
                script: script.to_vec(),
                cursor: RefCell::new(0),
                log: Rc::clone(log),
            }
        }
    }

    impl Leaf for Scripted {
        fn tick(&self, _entity: EntityId, _ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
            self.log.borrow_mut().push(self.name);
            let mut cursor = self.cursor.borrow_mut();
            let status = self.script[(*cursor).min(self.script.len() - 1)];
            *cursor += 1;
            Ok(status)
        }
    }

    /// Host double that owns panels and records every side effect.
    #[derive(Debug, Default)]
    pub struct RecordingHooks {
        pub panels: Vec<(PanelId, Rect)>,
        pub panel_damage: Vec<(PanelId, f32)>,
        pub projectiles: Vec<ProjectileSpawn>,
        pub particles: Vec<ParticleSpawn>,
        pub effects: Vec<String>,
        pub sounds: Vec<String>,
        pub panel_armor: u32,
    }

    impl WorldHooks for RecordingHooks {
        fn panel_rect(&self, id: PanelId) -> Option<Rect> {
            self.panels.iter().find(|(p, _)| *p == id).map(|(_, r)| *r)
        }

        fn all_panel_rects(&self) -> Vec<(PanelId, Rect)> {
            self.panels.clone()
        }

        fn damage_panel(&mut self, id: PanelId, amount: f32) {
            self.panel_damage.push((id, amount));
        }

        fn spawn_projectile(&mut self, registry: &mut EntityRegistry, spawn: ProjectileSpawn) -> EntityId {
            self.projectiles.push(spawn);
            super::context::spawn_standard_projectile(registry, &spawn)
        }

        fn spawn_particle(&mut self, particle: ParticleSpawn) {
            self.particles.push(particle);
        }

        fn spawn_fx(&mut self, kind: &str, _x: f32, _y: f32, _angle: f32) {
            self.effects.push(kind.to_string());
        }

        fn play_sound(&mut self, key: &str, _pan: f32) {
            self.sounds.push(key.to_string());
        }

        fn upgrade_level(&self, key: &str) -> u32 {
            if key == "panel_armor" {
                self.panel_armor
            } else {
                0
            }
        }
    }

    /// Everything an [`AiContext`] borrows, plus one ready-made agent.
    pub struct Fixture {
        pub registry: EntityRegistry,
        pub hooks: RecordingHooks,
        pub tuning: EnemyTuning,
        pub events: FastEventBus,
        pub rng: Pcg32,
        pub delta: f32,
        pub time: f64,
        pub log: CallLog,
        pub agent: EntityId,
    }

    impl Fixture {
        pub fn new() -> Self {
            let mut registry = EntityRegistry::new();
            let agent = Self::agent_in(&mut registry, 0.0, 0.0);
            Self {
                registry,
                hooks: RecordingHooks::default(),
                tuning: EnemyTuning::default(),
                events: FastEventBus::new(64),
                rng: Pcg32::seed_from_u64(7),
                delta: 0.25,
                time: 0.0,
                log: CallLog::default(),
                agent,
            }
        }

        fn agent_in(registry: &mut EntityRegistry, x: f32, y: f32) -> EntityId {
            registry.spawn(
                &[Tag::Enemy],
                [
                    Transform::at(x, y).into(),
                    Velocity::default().into(),
                    AiState::default().into(),
                ],
            )
        }

        pub fn spawn_agent(&mut self) -> EntityId {
            Self::agent_in(&mut self.registry, 0.0, 0.0)
        }

        /// An agent of the given variant at `(x, y)`.
        pub fn spawn_enemy(&mut self, variant: EnemyVariant, x: f32, y: f32) -> EntityId {
            let id = Self::agent_in(&mut self.registry, x, y);
            self.registry
                .add_component(id, Enemy::ready(variant))
                .expect("fresh entity");
            id
        }

        pub fn spawn_player(&mut self, x: f32, y: f32) -> EntityId {
            self.registry.spawn(
                &[Tag::Player],
                [Transform::at(x, y).into(), Health::full(100.0).into()],
            )
        }

        pub fn with_ctx<R>(&mut self, f: impl FnOnce(&mut AiContext<'_>) -> R) -> R {
            let mut ctx = AiContext {
                registry: &mut self.registry,
                hooks: &mut self.hooks,
                tuning: &self.tuning,
                events: &mut self.events,
                rng: &mut self.rng,
                delta: self.delta,
                time: self.time,
            };
            f(&mut ctx)
        }

        pub fn tick_entity(&mut self, node: &Node, entity: EntityId) -> Result<Status, EcsError> {
            self.with_ctx(|ctx| node.tick(entity, ctx))
        }

        pub fn tick(&mut self, node: &Node) -> Status {
            let agent = self.agent;
            self.tick_entity(node, agent).expect("tick failed")
        }

        /// Tick a single leaf for `entity`.
        pub fn run_leaf(&mut self, leaf: &dyn Leaf, entity: EntityId) -> Status {
            self.with_ctx(|ctx| leaf.tick(entity, ctx)).expect("leaf failed")
        }

        pub fn calls(&self) -> Vec<&'static str> {
            self.log.borrow().clone()
        }

        pub fn memory_index(&self, slot: MemorySlot) -> u32 {
            self.ai(self.agent).memory_index(slot)
        }

        pub fn ai(&self, entity: EntityId) -> &AiState {
            self.registry.component::<AiState>(entity).expect("agent has AiState")
        }

        pub fn velocity(&self, entity: EntityId) -> (f32, f32) {
            let v = self.registry.component::<Velocity>(entity).expect("agent has Velocity");
            (v.vx, v.vy)
        }

        pub fn event_ids(&self) -> Vec<u32> {
            let mut ids = Vec::new();
            self.events.read_events(0, |e| ids.push(e.id));
            ids
        }
    }
}
