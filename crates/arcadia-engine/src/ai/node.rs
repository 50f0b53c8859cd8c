//! Behavior tree nodes and their tick semantics.
//!
//! A built [`Node`] tree is immutable and shared by every entity that runs
//! it. Anything an entity needs to remember between ticks (the resume index
//! of a [`Node::MemorySequence`], leaf timers, targets) lives in that entity's
//! [`AiState`](arcadia_ecs::component::AiState).

use std::fmt;

use arcadia_ecs::prelude::*;
use tracing::warn;

use super::context::AiContext;

/// Result of ticking a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Failure,
    Running,
}

/// Game-specific action or condition at the bottom of a tree.
pub trait Leaf {
    fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError>;
}

pub enum Node {
    /// Stops at the first child that does not succeed.
    Sequence(Vec<Node>),
    /// Stops at the first child that does not fail.
    Selector(Vec<Node>),
    /// Ticks every child. Any failure fails; otherwise any running runs.
    Parallel(Vec<Node>),
    /// A sequence that resumes at the running child on the next tick.
    MemorySequence { slot: MemorySlot, children: Vec<Node> },
    Inverter(Box<Node>),
    Succeeder(Box<Node>),
    Leaf { key: String, leaf: Box<dyn Leaf> },
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Sequence(children) => f.debug_tuple("Sequence").field(children).finish(),
            Node::Selector(children) => f.debug_tuple("Selector").field(children).finish(),
            Node::Parallel(children) => f.debug_tuple("Parallel").field(children).finish(),
            Node::MemorySequence { slot, children } => f
                .debug_struct("MemorySequence")
                .field("slot", slot)
                .field("children", children)
                .finish(),
            Node::Inverter(child) => f.debug_tuple("Inverter").field(child).finish(),
            Node::Succeeder(child) => f.debug_tuple("Succeeder").field(child).finish(),
            Node::Leaf { key, .. } => f.debug_tuple("Leaf").field(key).finish(),
        }
    }
}

impl Node {
    pub fn leaf(key: impl Into<String>, leaf: impl Leaf + 'static) -> Self {
        Node::Leaf {
            key: key.into(),
            leaf: Box::new(leaf),
        }
    }

    pub fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
        match self {
            Node::Sequence(children) => {
                for child in children {
                    let status = child.tick(entity, ctx)?;
                    if status != Status::Success {
                        return Ok(status);
                    }
                }
                Ok(Status::Success)
            }
            Node::Selector(children) => {
                for child in children {
                    let status = child.tick(entity, ctx)?;
                    if status != Status::Failure {
                        return Ok(status);
                    }
                }
                Ok(Status::Failure)
            }
            Node::Parallel(children) => {
                let mut any_failed = false;
                let mut any_running = false;
                for child in children {
                    match child.tick(entity, ctx)? {
                        Status::Failure => any_failed = true,
                        Status::Running => any_running = true,
                        Status::Success => {}
                    }
                }
                Ok(if any_failed {
                    Status::Failure
                } else if any_running {
                    Status::Running
                } else {
                    Status::Success
                })
            }
            Node::MemorySequence { slot, children } => {
                let mut start = ctx.ai_state(entity)?.memory_index(*slot) as usize;
                if start > 0 && start >= children.len() {
                    // Slots are shared by id across trees, so a longer sequence may
                    // have left an index this one does not have.
                    warn!(
                        entity = %entity,
                        slot = slot.0,
                        start,
                        len = children.len(),
                        "resume index out of range"
                    );
                    ctx.ai_state_mut(entity)?.set_memory_index(*slot, 0);
                    start = 0;
                }
                for (index, child) in children.iter().enumerate().skip(start) {
                    match child.tick(entity, ctx)? {
                        Status::Success => {}
                        Status::Running => {
                            ctx.ai_state_mut(entity)?.set_memory_index(*slot, index as u32);
                            return Ok(Status::Running);
                        }
                        Status::Failure => {
                            ctx.ai_state_mut(entity)?.set_memory_index(*slot, 0);
                            return Ok(Status::Failure);
                        }
                    }
                }
                ctx.ai_state_mut(entity)?.set_memory_index(*slot, 0);
                Ok(Status::Success)
            }
            Node::Inverter(child) => Ok(match child.tick(entity, ctx)? {
                Status::Success => Status::Failure,
                Status::Failure => Status::Success,
                Status::Running => Status::Running,
            }),
            Node::Succeeder(child) => Ok(match child.tick(entity, ctx)? {
                Status::Running => Status::Running,
                Status::Success | Status::Failure => Status::Success,
            }),
            Node::Leaf { leaf, .. } => leaf.tick(entity, ctx),
        }
    }

    /// Total nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + match self {
            Node::Sequence(c) | Node::Selector(c) | Node::Parallel(c) => c.iter().map(Node::node_count).sum(),
            Node::MemorySequence { children, .. } => children.iter().map(Node::node_count).sum(),
            Node::Inverter(child) | Node::Succeeder(child) => child.node_count(),
            Node::Leaf { .. } => 0,
        }
    }
}
