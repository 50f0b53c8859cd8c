//! Point-in-time capture of registry contents, for determinism checks.
//!
//! [`RegistrySnapshot`] lists every active entity (sorted by id) with its tags
//! and components. Two simulations fed the same inputs must produce snapshots
//! with identical [`state_hash`](RegistrySnapshot::state_hash)es. Restoring
//! from a snapshot is deliberately not supported.

use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::entity::EntityId;
use crate::registry::EntityRegistry;
use crate::tag::Tag;
use crate::EcsError;

/// One entity as captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub tags: Vec<Tag>,
    /// Present components in kind order.
    pub components: Vec<Component>,
}

/// Serializable view of every active entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub entities: Vec<EntitySnapshot>,
}

impl RegistrySnapshot {
    pub fn capture(registry: &EntityRegistry) -> Self {
        let mut entities: Vec<EntitySnapshot> = registry
            .iter()
            .map(|record| EntitySnapshot {
                id: record.id(),
                tags: record.tags().iter().collect(),
                components: record.components().iter().cloned().collect(),
            })
            .collect();
        entities.sort_by_key(|e| e.id);
        Self { entities }
    }

    pub fn to_json(&self) -> Result<String, EcsError> {
        Ok(serde_json::to_string(self)?)
    }

    /// BLAKE3 digest of the JSON encoding, as lowercase hex.
    pub fn state_hash(&self) -> Result<String, EcsError> {
        let bytes = serde_json::to_vec(self)?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
