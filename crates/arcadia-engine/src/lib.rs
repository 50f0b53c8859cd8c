//! Arcadia Engine -- the simulation driver for a real-time arcade game.
//!
//! This crate builds on [`arcadia_ecs`] to provide everything that runs once
//! per fixed step: a phased [`Scheduler`](tick::Scheduler), motion
//! integration into a uniform [`SpatialGrid`](spatial::SpatialGrid),
//! layer-masked circle collision, behavior-tree AI, lifetime and death
//! handling, and a [`FastEventBus`](events::FastEventBus) that carries
//! effect and audio triggers out to the host.
//!
//! # Quick Start
//!
//! ```
//! use std::rc::Rc;
//! use arcadia_engine::prelude::*;
//!
//! let trees = r#"{ "chase": { "type": "ChasePlayer", "args": [30.0] } }"#;
//! let library = BehaviorLibrary::from_json(trees, &NodeRegistry::with_builtin_leaves()).unwrap();
//! let chase = library.tree_id("chase").unwrap();
//!
//! let mut world =
//!     SimulationWorld::with_core_systems(EngineConfig::default(), CoreServices::new(Rc::new(library))).unwrap();
//! world.registry_mut().spawn(&[Tag::Player], [Transform::at(0.0, 0.0).into()]);
//! let hunter = world.registry_mut().spawn(
//!     &[Tag::Enemy],
//!     [
//!         Transform::at(100.0, 0.0).into(),
//!         Enemy::ready(EnemyVariant::Hunter).into(),
//!         Behavior { tree: chase }.into(),
//!         AiState::default().into(),
//!     ],
//! );
//!
//! world.update(0.1, 0.1);
//! let x = world.registry().component::<Transform>(hunter).unwrap().x;
//! assert!(x < 100.0);
//! ```

#![deny(unsafe_code)]

pub mod ai;
pub mod collision;
pub mod config;
pub mod events;
pub mod lifecycle;
pub mod logging;
pub mod physics;
pub mod spatial;
pub mod tick;
pub mod world;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use arcadia_ecs;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the ECS prelude.
    pub use arcadia_ecs::prelude::*;

    pub use crate::config::{ConfigError, EngineConfig, EnemyTuning, SchedulerConfig, VariantTuning};
    pub use crate::events::{fx, EventReader, FastEvent, FastEventBus};
    pub use crate::tick::{Phase, Scheduler, StepInfo, System, SystemError, TickDiagnostics};
    pub use crate::world::{CoreServices, SimulationWorld, WorldState};

    // Systems.
    pub use crate::collision::{CollisionSystem, CombatResolver, DamageResolver, COLLISION_SYSTEM_NAME};
    pub use crate::lifecycle::{CleanupSystem, LifetimeSystem};
    pub use crate::physics::{MotionSystem, MOTION_SYSTEM_NAME};
    pub use crate::spatial::SpatialGrid;

    // Behavior trees.
    pub use crate::ai::{
        AiContext, BehaviorLibrary, BehaviorSystem, BuildError, Leaf, Node, NodeRegistry, NoopHooks,
        ProjectileSpawn, RawNodeDef, Rect, Status, WorldHooks,
    };
}
