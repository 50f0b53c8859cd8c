//! Arcadia ECS -- entity storage for the Arcadia simulation core.
//!
//! Entities live in an [`EntityRegistry`](registry::EntityRegistry). Each one
//! carries at most one component per [`ComponentKind`](component::ComponentKind),
//! a [`TagSet`](tag::TagSet), and an active flag. Entity records and component
//! instances are recycled through object pools, and structural predicates
//! ([`Query`](query::Query)) are cached and kept up to date incrementally.
//!
//! # Quick Start
//!
//! ```
//! use arcadia_ecs::prelude::*;
//!
//! let mut registry = EntityRegistry::new();
//! let enemy = registry.spawn(
//!     &[Tag::Enemy],
//!     [Transform::at(0.0, 0.0).into(), Velocity::new(1.0, 0.0).into()],
//! );
//!
//! let movers = Query::all(&[ComponentKind::Transform, ComponentKind::Velocity]);
//! assert_eq!(registry.query(movers), &[enemy]);
//!
//! registry.destroy_entity(enemy);
//! assert!(registry.query(movers).is_empty());
//! assert!(registry.get(enemy).is_none());
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod entity;
pub mod pool;
pub mod query;
pub mod registry;
pub mod snapshot;
pub mod tag;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by registry operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (destroyed, recycled, or never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },

    /// A live entity lacks a component its caller requires.
    #[error("entity {entity:?} has no {kind} component")]
    MissingComponent {
        entity: entity::EntityId,
        kind: component::ComponentKind,
    },

    /// Encoding a snapshot failed.
    #[error("snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{
        layers, AiMode, AiState, AiTarget, AiTimers, Behavior, Collider, Component, ComponentData,
        ComponentKind, ComponentMask, ComponentSet, Enemy, EnemyVariant, Health, Lifetime,
        MemorySlot, Projectile, Transform, TreeId, Velocity,
    };
    pub use crate::entity::EntityId;
    pub use crate::pool::{ComponentPool, ObjectPool};
    pub use crate::query::Query;
    pub use crate::registry::{EntityRecord, EntityRegistry, PoolStats};
    pub use crate::snapshot::RegistrySnapshot;
    pub use crate::tag::{Tag, TagSet};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
