//! Named behavior trees and the LOGIC-phase system that runs them.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use arcadia_ecs::prelude::*;
use tracing::{debug, trace};

use super::builder::{NodeRegistry, RawNodeDef, TreeBuilder};
use super::context::AiContext;
use super::node::Node;
use super::BuildError;
use crate::config::EnemyTuning;
use crate::tick::{StepInfo, System, SystemError};
use crate::world::WorldState;

/// System name used in diagnostics.
pub const BEHAVIOR_SYSTEM_NAME: &str = "behavior";

/// Built trees addressable by name or [`TreeId`].
#[derive(Debug, Default)]
pub struct BehaviorLibrary {
    trees: Vec<(String, Node)>,
    by_name: HashMap<String, TreeId>,
}

impl BehaviorLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every tree of a JSON object `{ name: node definition }`.
    ///
    /// Trees are assigned ids in name order, and all of them share one
    /// MemorySequence slot namespace.
    pub fn from_json(json: &str, registry: &NodeRegistry) -> Result<Self, BuildError> {
        let defs: BTreeMap<String, RawNodeDef> = serde_json::from_str(json)?;
        let mut builder = TreeBuilder::new(registry);
        let mut library = Self::new();
        for (name, raw) in defs {
            let tree = builder.build_raw(raw)?;
            debug!(tree = %name, nodes = tree.node_count(), "behavior tree built");
            library.insert(name, tree);
        }
        Ok(library)
    }

    /// Add a tree, replacing (and keeping the id of) any tree of that name.
    pub fn insert(&mut self, name: impl Into<String>, tree: Node) -> TreeId {
        let name = name.into();
        if let Some(&id) = self.by_name.get(&name) {
            self.trees[id.0 as usize].1 = tree;
            return id;
        }
        let id = TreeId(self.trees.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.trees.push((name, tree));
        id
    }

    pub fn tree_id(&self, name: &str) -> Option<TreeId> {
        self.by_name.get(name).copied()
    }

    /// Like [`tree_id`](Self::tree_id), with a [`BuildError::UnknownTree`] miss.
    pub fn require(&self, name: &str) -> Result<TreeId, BuildError> {
        self.tree_id(name).ok_or_else(|| BuildError::UnknownTree(name.to_string()))
    }

    pub fn get(&self, id: TreeId) -> Option<&Node> {
        self.trees.get(id.0 as usize).map(|(_, tree)| tree)
    }

    pub fn name(&self, id: TreeId) -> Option<&str> {
        self.trees.get(id.0 as usize).map(|(name, _)| name.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.trees.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

// ---------------------------------------------------------------------------
// BehaviorSystem
// ---------------------------------------------------------------------------

/// Ticks the tree of every entity that has [`Behavior`] and [`AiState`].
///
/// Before each tree runs the entity's `cooldown` and `retarget` timers are
/// counted down by the step delta. Enemies that are still spawning are
/// skipped entirely. An error from any tree ends the system's step.
#[derive(Debug)]
pub struct BehaviorSystem {
    library: Rc<BehaviorLibrary>,
    tuning: EnemyTuning,
    query: Query,
    scratch: Vec<EntityId>,
}

impl BehaviorSystem {
    pub fn new(library: Rc<BehaviorLibrary>, tuning: EnemyTuning) -> Self {
        Self {
            library,
            tuning,
            query: Query::all(&[ComponentKind::Behavior, ComponentKind::AiState]),
            scratch: Vec::new(),
        }
    }

    pub fn library(&self) -> &BehaviorLibrary {
        &self.library
    }

    pub fn tuning(&self) -> &EnemyTuning {
        &self.tuning
    }
}

impl System for BehaviorSystem {
    fn name(&self) -> &str {
        BEHAVIOR_SYSTEM_NAME
    }

    fn run(&mut self, world: &mut WorldState, step: &StepInfo) -> Result<(), SystemError> {
        self.scratch.clear();
        self.scratch.extend_from_slice(world.registry.query(self.query));

        let mut ctx = AiContext {
            registry: &mut world.registry,
            hooks: world.hooks.as_mut(),
            tuning: &self.tuning,
            events: &mut world.events,
            rng: &mut world.rng,
            delta: step.delta,
            time: step.time,
        };
        let mut ticked = 0usize;
        for &id in &self.scratch {
            let Some(record) = ctx.registry.get(id) else {
                continue;
            };
            if record.get::<Enemy>().is_some_and(|e| e.spawning) {
                continue;
            }
            let tree_id = record.get::<Behavior>().map(|b| b.tree).unwrap_or_default();
            let tree = self.library.get(tree_id).ok_or_else(|| {
                SystemError::failed(
                    BEHAVIOR_SYSTEM_NAME,
                    format!("entity {id} references unknown tree {}", tree_id.0),
                )
            })?;

            let timers = &mut ctx.registry.require_mut::<AiState>(id)?.timers;
            timers.cooldown = (timers.cooldown - step.delta).max(0.0);
            timers.retarget = (timers.retarget - step.delta).max(0.0);

            tree.tick(id, &mut ctx)?;
            ticked += 1;
        }
        trace!(ticked, "behavior trees ticked");
        Ok(())
    }
}
