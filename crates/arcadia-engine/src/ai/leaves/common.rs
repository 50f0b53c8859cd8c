//! Leaves shared by every enemy variant.

use arcadia_ecs::prelude::*;
use serde::Deserialize;
use serde_json::Value;

use super::{check_non_negative, target_position, BuiltinLeaf};
use crate::ai::builder::{no_args, parse_args};
use crate::ai::context::AiContext;
use crate::ai::node::{Leaf, Status};
use crate::ai::BuildError;

/// Runs for `seconds`, then succeeds.
///
/// Progress is kept in `timers.action`; a zero timer starts a new wait.
#[derive(Debug, Clone, Deserialize)]
pub struct Wait {
    pub seconds: f32,
}

impl BuiltinLeaf for Wait {
    const KEY: &'static str = "Wait";

    fn from_args(args: &[Value]) -> Result<Self, BuildError> {
        let leaf: Self = parse_args(Self::KEY, args)?;
        check_non_negative(Self::KEY, &[("seconds", Some(leaf.seconds))])?;
        Ok(leaf)
    }
}

impl Leaf for Wait {
    fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
        let delta = ctx.delta;
        let timers = &mut ctx.ai_state_mut(entity)?.timers;
        if timers.action <= 0.0 {
            if self.seconds <= 0.0 {
                return Ok(Status::Success);
            }
            timers.action = self.seconds;
        }
        timers.action -= delta;
        if timers.action <= 0.0 {
            timers.action = 0.0;
            Ok(Status::Success)
        } else {
            Ok(Status::Running)
        }
    }
}

/// Succeeds while `current / max` is strictly below `fraction`.
/// Entities without health fail.
#[derive(Debug, Clone, Deserialize)]
pub struct IsHealthBelow {
    pub fraction: f32,
}

impl BuiltinLeaf for IsHealthBelow {
    const KEY: &'static str = "IsHealthBelow";

    fn from_args(args: &[Value]) -> Result<Self, BuildError> {
        let leaf: Self = parse_args(Self::KEY, args)?;
        check_non_negative(Self::KEY, &[("fraction", Some(leaf.fraction))])?;
        Ok(leaf)
    }
}

impl Leaf for IsHealthBelow {
    fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
        Ok(match ctx.registry.component::<Health>(entity) {
            Some(health) if health.fraction() < self.fraction => Status::Success,
            _ => Status::Failure,
        })
    }
}

/// Succeeds when the entity has a live target. A dead entity target is
/// cleared first.
#[derive(Debug, Clone, Copy, Default)]
pub struct HasTarget;

impl BuiltinLeaf for HasTarget {
    const KEY: &'static str = "HasTarget";

    fn from_args(args: &[Value]) -> Result<Self, BuildError> {
        no_args(Self::KEY, args).map(|_| Self)
    }
}

impl Leaf for HasTarget {
    fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
        let target = ctx.ai_state(entity)?.target;
        if let Some(AiTarget::Entity(other)) = target {
            if !ctx.registry.is_active(other) {
                ctx.ai_state_mut(entity)?.target = None;
                return Ok(Status::Failure);
            }
        }
        Ok(if target.is_some() {
            Status::Success
        } else {
            Status::Failure
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClearTarget;

impl BuiltinLeaf for ClearTarget {
    const KEY: &'static str = "ClearTarget";

    fn from_args(args: &[Value]) -> Result<Self, BuildError> {
        no_args(Self::KEY, args).map(|_| Self)
    }
}

impl Leaf for ClearTarget {
    fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
        let state = ctx.ai_state_mut(entity)?;
        state.target = None;
        state.mode = AiMode::Idle;
        Ok(Status::Success)
    }
}

/// Steers toward the current target. Succeeds (and stops) once within
/// `arrive_radius`; fails without a target.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MoveToTarget {
    pub speed: Option<f32>,
    pub arrive_radius: Option<f32>,
}

impl BuiltinLeaf for MoveToTarget {
    const KEY: &'static str = "MoveToTarget";

    fn from_args(args: &[Value]) -> Result<Self, BuildError> {
        let leaf: Self = parse_args(Self::KEY, args)?;
        check_non_negative(Self::KEY, &[("speed", leaf.speed), ("arrive_radius", leaf.arrive_radius)])?;
        Ok(leaf)
    }
}

impl Leaf for MoveToTarget {
    fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
        let Some((x, y)) = target_position(ctx, entity)? else {
            ctx.stop(entity);
            return Ok(Status::Failure);
        };
        let speed = ctx.param(entity, self.speed, "speed", 60.0);
        let arrive = ctx.param(entity, self.arrive_radius, "arrive_radius", 8.0);

        let at = ctx.transform(entity)?;
        if at.distance_squared(x, y) <= arrive * arrive {
            ctx.stop(entity);
            return Ok(Status::Success);
        }
        ctx.steer_toward(entity, x, y, speed)?;
        ctx.ai_state_mut(entity)?.mode = AiMode::Seeking;
        Ok(Status::Running)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StopMoving;

impl BuiltinLeaf for StopMoving {
    const KEY: &'static str = "StopMoving";

    fn from_args(args: &[Value]) -> Result<Self, BuildError> {
        no_args(Self::KEY, args).map(|_| Self)
    }
}

impl Leaf for StopMoving {
    fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
        ctx.stop(entity);
        Ok(Status::Success)
    }
}
