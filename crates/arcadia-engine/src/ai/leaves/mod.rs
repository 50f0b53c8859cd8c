//! Built-in leaf library.
//!
//! | module      | leaves                                                                  |
//! |-------------|-------------------------------------------------------------------------|
//! | [`common`]  | `Wait`, `IsHealthBelow`, `HasTarget`, `ClearTarget`, `MoveToTarget`, `StopMoving` |
//! | [`driller`] | `FindNearestPanel`, `DrillPanel`                                         |
//! | [`hunter`]  | `IsPlayerInRange`, `TargetPlayer`, `ChasePlayer`, `FireAtPlayer`         |
//! | [`daemon`]  | `Wander`, `TeleportNearPlayer`, `PulseBurst`                             |
//!
//! Optional numeric arguments left out of a definition are read from the
//! entity's variant tuning on every tick.

pub mod common;
pub mod daemon;
pub mod driller;
pub mod hunter;

use arcadia_ecs::prelude::*;
use serde_json::Value;

use super::builder::NodeRegistry;
use super::context::AiContext;
use super::node::Leaf;
use super::BuildError;

/// A leaf with a fixed type string that builds itself from positional args.
pub trait BuiltinLeaf: Leaf + Sized + 'static {
    const KEY: &'static str;

    fn from_args(args: &[Value]) -> Result<Self, BuildError>;
}

fn add<L: BuiltinLeaf>(registry: &mut NodeRegistry) {
    registry.register(L::KEY, |args| Ok(Box::new(L::from_args(args)?) as Box<dyn Leaf>));
}

/// Register every built-in leaf.
pub fn register_builtin(registry: &mut NodeRegistry) {
    add::<common::Wait>(registry);
    add::<common::IsHealthBelow>(registry);
    add::<common::HasTarget>(registry);
    add::<common::ClearTarget>(registry);
    add::<common::MoveToTarget>(registry);
    add::<common::StopMoving>(registry);

    add::<driller::FindNearestPanel>(registry);
    add::<driller::DrillPanel>(registry);

    add::<hunter::IsPlayerInRange>(registry);
    add::<hunter::TargetPlayer>(registry);
    add::<hunter::ChasePlayer>(registry);
    add::<hunter::FireAtPlayer>(registry);

    add::<daemon::Wander>(registry);
    add::<daemon::TeleportNearPlayer>(registry);
    add::<daemon::PulseBurst>(registry);
}

/// Fail unless every given value is finite and non-negative.
pub(crate) fn check_non_negative(node: &str, values: &[(&str, Option<f32>)]) -> Result<(), BuildError> {
    for (name, value) in values {
        if let Some(v) = value {
            if !(v.is_finite() && *v >= 0.0) {
                return Err(BuildError::InvalidArgs {
                    node: node.to_string(),
                    reason: format!("`{name}` must be finite and non-negative, got {v}"),
                });
            }
        }
    }
    Ok(())
}

/// World position of the entity's current target.
///
/// A target entity that no longer exists (or has no transform) clears the
/// target and yields `None`.
pub(crate) fn target_position(ctx: &mut AiContext<'_>, entity: EntityId) -> Result<Option<(f32, f32)>, EcsError> {
    let target = ctx.ai_state(entity)?.target;
    Ok(match target {
        None => None,
        Some(AiTarget::Point { x, y }) | Some(AiTarget::Panel { x, y, .. }) => Some((x, y)),
        Some(AiTarget::Entity(other)) => match ctx.registry.component::<Transform>(other) {
            Some(t) => Some((t.x, t.y)),
            None => {
                ctx.ai_state_mut(entity)?.target = None;
                None
            }
        },
    })
}

/// Unit vector from `(x0, y0)` toward `(x1, y1)`, or `(1, 0)` when they meet.
pub(crate) fn direction(x0: f32, y0: f32, x1: f32, y1: f32) -> (f32, f32) {
    let (dx, dy) = (x1 - x0, y1 - y0);
    let len = (dx * dx + dy * dy).sqrt();
    if len > f32::EPSILON {
        (dx / len, dy / len)
    } else {
        (1.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_is_registered() {
        let registry = NodeRegistry::with_builtin_leaves();
        for key in [
            common::Wait::KEY,
            common::IsHealthBelow::KEY,
            common::HasTarget::KEY,
            common::ClearTarget::KEY,
            common::MoveToTarget::KEY,
            common::StopMoving::KEY,
            driller::FindNearestPanel::KEY,
            driller::DrillPanel::KEY,
            hunter::IsPlayerInRange::KEY,
            hunter::TargetPlayer::KEY,
            hunter::ChasePlayer::KEY,
            hunter::FireAtPlayer::KEY,
            daemon::Wander::KEY,
            daemon::TeleportNearPlayer::KEY,
            daemon::PulseBurst::KEY,
        ] {
            assert!(registry.contains(key), "{key} missing");
        }
        assert_eq!(registry.len(), 15);
    }

    #[test]
    fn negative_args_are_rejected() {
        let err = check_non_negative("X", &[("a", Some(1.0)), ("b", Some(-1.0))]).unwrap_err();
        assert!(matches!(err, BuildError::InvalidArgs { ref reason, .. } if reason.contains("`b`")));
        check_non_negative("X", &[("a", None)]).unwrap();
    }

    #[test]
    fn direction_handles_coincident_points() {
        assert_eq!(direction(1.0, 1.0, 1.0, 1.0), (1.0, 0.0));
        assert_eq!(direction(0.0, 0.0, 0.0, -3.0), (0.0, -1.0));
    }
}
