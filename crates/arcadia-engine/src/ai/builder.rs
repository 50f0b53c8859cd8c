//! Behavior definitions as data, and the builder that turns them into trees.
//!
//! The JSON shape of one node is
//!
//! ```json
//! { "type": "MemorySequence", "id": "drill_loop", "children": [
//!     { "type": "FindNearestPanel" },
//!     { "type": "MoveToTarget", "args": [60.0] },
//!     { "type": "DrillPanel", "args": [null, 2.5] }
//! ] }
//! ```
//!
//! `args` is positional. Each leaf deserializes it into its own parameter
//! struct, so `null` or a short array leaves trailing optional parameters to
//! tuning defaults.

use std::collections::HashMap;
use std::fmt;

use arcadia_ecs::component::MemorySlot;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::node::{Leaf, Node};
use super::BuildError;

/// A node exactly as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNodeDef {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RawNodeDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl RawNodeDef {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            args: Vec::new(),
            children: Vec::new(),
            id: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = Value>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = RawNodeDef>) -> Self {
        self.children = children.into_iter().collect();
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A structurally valid node definition.
///
/// Leaf keys are not resolved yet; that happens against a [`NodeRegistry`]
/// in [`TreeBuilder::build`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeDef {
    Sequence(Vec<NodeDef>),
    Selector(Vec<NodeDef>),
    Parallel(Vec<NodeDef>),
    MemorySequence { id: String, children: Vec<NodeDef> },
    Inverter(Box<NodeDef>),
    Succeeder(Box<NodeDef>),
    Leaf { key: String, args: Vec<Value> },
}

fn convert_all(children: Vec<RawNodeDef>) -> Result<Vec<NodeDef>, BuildError> {
    children.into_iter().map(NodeDef::try_from).collect()
}

fn single_child(node: &str, children: Vec<RawNodeDef>) -> Result<Box<NodeDef>, BuildError> {
    let count = children.len();
    match <[RawNodeDef; 1]>::try_from(children) {
        Ok([child]) => Ok(Box::new(NodeDef::try_from(child)?)),
        Err(_) => Err(BuildError::DecoratorChildCount {
            node: node.to_string(),
            count,
        }),
    }
}

impl TryFrom<RawNodeDef> for NodeDef {
    type Error = BuildError;

    fn try_from(raw: RawNodeDef) -> Result<Self, Self::Error> {
        let RawNodeDef { kind, args, children, id } = raw;
        Ok(match kind.as_str() {
            "Sequence" => NodeDef::Sequence(convert_all(children)?),
            "Selector" => NodeDef::Selector(convert_all(children)?),
            "Parallel" => NodeDef::Parallel(convert_all(children)?),
            "MemorySequence" => {
                let id = id.filter(|s| !s.is_empty()).ok_or(BuildError::MissingMemoryId)?;
                NodeDef::MemorySequence {
                    id,
                    children: convert_all(children)?,
                }
            }
            "Inverter" => NodeDef::Inverter(single_child(&kind, children)?),
            "Succeeder" => NodeDef::Succeeder(single_child(&kind, children)?),
            _ if !children.is_empty() => return Err(BuildError::UnexpectedChildren { node: kind }),
            _ => NodeDef::Leaf { key: kind, args },
        })
    }
}

// ---------------------------------------------------------------------------
// NodeRegistry
// ---------------------------------------------------------------------------

/// Builds one leaf from its positional arguments.
pub type LeafFactory = Box<dyn Fn(&[Value]) -> Result<Box<dyn Leaf>, BuildError>>;

/// Maps leaf type strings to factories.
#[derive(Default)]
pub struct NodeRegistry {
    factories: HashMap<String, LeafFactory>,
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("NodeRegistry").field("leaves", &keys).finish()
    }
}

impl NodeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every leaf in [`super::leaves`].
    pub fn with_builtin_leaves() -> Self {
        let mut registry = Self::new();
        super::leaves::register_builtin(&mut registry);
        registry
    }

    /// Register (or replace) the factory for `key`.
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F)
    where
        F: Fn(&[Value]) -> Result<Box<dyn Leaf>, BuildError> + 'static,
    {
        self.factories.insert(key.into(), Box::new(factory));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn create(&self, key: &str, args: &[Value]) -> Result<Box<dyn Leaf>, BuildError> {
        let factory = self
            .factories
            .get(key)
            .ok_or_else(|| BuildError::UnknownNodeType(key.to_string()))?;
        factory(args)
    }
}

/// Deserialize positional leaf arguments into a parameter struct.
///
/// Numbers that do not fit an `f32` (`1e39` would become infinity) are
/// rejected before the struct sees them.
pub fn parse_args<T: DeserializeOwned>(node: &str, args: &[Value]) -> Result<T, BuildError> {
    if let Some(bad) = args.iter().find_map(non_finite_number) {
        return Err(BuildError::InvalidArgs {
            node: node.to_string(),
            reason: format!("{bad} is out of range for a 32-bit float"),
        });
    }
    serde_json::from_value(Value::Array(args.to_vec())).map_err(|e| BuildError::InvalidArgs {
        node: node.to_string(),
        reason: e.to_string(),
    })
}

fn non_finite_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| !(*v as f32).is_finite()),
        Value::Array(items) => items.iter().find_map(non_finite_number),
        Value::Object(fields) => fields.values().find_map(non_finite_number),
        _ => None,
    }
}

/// Reject any arguments for a leaf that takes none.
pub fn no_args(node: &str, args: &[Value]) -> Result<(), BuildError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(BuildError::InvalidArgs {
            node: node.to_string(),
            reason: format!("expected no arguments, got {}", args.len()),
        })
    }
}

// ---------------------------------------------------------------------------
// TreeBuilder
// ---------------------------------------------------------------------------

/// Builds [`Node`] trees, interning MemorySequence ids into [`MemorySlot`]s.
///
/// One builder should build every tree of a library so that equal ids share a
/// slot and distinct ids never collide.
pub struct TreeBuilder<'r> {
    registry: &'r NodeRegistry,
    slots: HashMap<String, MemorySlot>,
}

impl<'r> TreeBuilder<'r> {
    pub fn new(registry: &'r NodeRegistry) -> Self {
        Self {
            registry,
            slots: HashMap::new(),
        }
    }

    /// Slot assigned to a MemorySequence id, if it has been seen.
    pub fn slot_of(&self, id: &str) -> Option<MemorySlot> {
        self.slots.get(id).copied()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn intern(&mut self, id: &str) -> Result<MemorySlot, BuildError> {
        if let Some(slot) = self.slots.get(id) {
            return Ok(*slot);
        }
        let next = u16::try_from(self.slots.len()).map_err(|_| BuildError::TooManyMemorySlots)?;
        let slot = MemorySlot(next);
        self.slots.insert(id.to_string(), slot);
        Ok(slot)
    }

    pub fn build_raw(&mut self, raw: RawNodeDef) -> Result<Node, BuildError> {
        let def = NodeDef::try_from(raw)?;
        self.build(&def)
    }

    pub fn build(&mut self, def: &NodeDef) -> Result<Node, BuildError> {
        Ok(match def {
            NodeDef::Sequence(children) => Node::Sequence(self.build_all(children)?),
            NodeDef::Selector(children) => Node::Selector(self.build_all(children)?),
            NodeDef::Parallel(children) => Node::Parallel(self.build_all(children)?),
            NodeDef::MemorySequence { id, children } => {
                let slot = self.intern(id)?;
                Node::MemorySequence {
                    slot,
                    children: self.build_all(children)?,
                }
            }
            NodeDef::Inverter(child) => Node::Inverter(Box::new(self.build(child)?)),
            NodeDef::Succeeder(child) => Node::Succeeder(Box::new(self.build(child)?)),
            NodeDef::Leaf { key, args } => Node::Leaf {
                key: key.clone(),
                leaf: self.registry.create(key, args)?,
            },
        })
    }

    fn build_all(&mut self, children: &[NodeDef]) -> Result<Vec<Node>, BuildError> {
        children.iter().map(|child| self.build(child)).collect()
    }
}
