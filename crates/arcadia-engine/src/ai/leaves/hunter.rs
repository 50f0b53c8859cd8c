//! Hunter leaves: track the player and shoot at range.

use arcadia_ecs::prelude::*;
use serde::Deserialize;
use serde_json::Value;

use super::{check_non_negative, direction, BuiltinLeaf};
use crate::ai::builder::{no_args, parse_args};
use crate::ai::context::{AiContext, ProjectileSpawn};
use crate::ai::node::{Leaf, Status};
use crate::ai::BuildError;
use crate::events::fx;

/// Succeeds when a player is within `range` (inclusive).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IsPlayerInRange {
    pub range: Option<f32>,
}

impl BuiltinLeaf for IsPlayerInRange {
    const KEY: &'static str = "IsPlayerInRange";

    fn from_args(args: &[Value]) -> Result<Self, BuildError> {
        let leaf: Self = parse_args(Self::KEY, args)?;
        check_non_negative(Self::KEY, &[("range", leaf.range)])?;
        Ok(leaf)
    }
}

impl Leaf for IsPlayerInRange {
    fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
        let Some((_, player)) = ctx.player() else {
            return Ok(Status::Failure);
        };
        let range = ctx.param(entity, self.range, "range", 300.0);
        let at = ctx.transform(entity)?;
        Ok(if at.distance_squared(player.x, player.y) <= range * range {
            Status::Success
        } else {
            Status::Failure
        })
    }
}

/// Makes the player the current target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetPlayer;

impl BuiltinLeaf for TargetPlayer {
    const KEY: &'static str = "TargetPlayer";

    fn from_args(args: &[Value]) -> Result<Self, BuildError> {
        no_args(Self::KEY, args).map(|_| Self)
    }
}

impl Leaf for TargetPlayer {
    fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
        let Some((player, _)) = ctx.player() else {
            return Ok(Status::Failure);
        };
        ctx.ai_state_mut(entity)?.target = Some(AiTarget::Entity(player));
        Ok(Status::Success)
    }
}

/// Steers straight at the player. Runs indefinitely; fails (and stops) when
/// there is no player.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChasePlayer {
    pub speed: Option<f32>,
}

impl BuiltinLeaf for ChasePlayer {
    const KEY: &'static str = "ChasePlayer";

    fn from_args(args: &[Value]) -> Result<Self, BuildError> {
        let leaf: Self = parse_args(Self::KEY, args)?;
        check_non_negative(Self::KEY, &[("speed", leaf.speed)])?;
        Ok(leaf)
    }
}

impl Leaf for ChasePlayer {
    fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
        let Some((_, player)) = ctx.player() else {
            ctx.stop(entity);
            return Ok(Status::Failure);
        };
        let speed = ctx.param(entity, self.speed, "speed", 90.0);
        ctx.steer_toward(entity, player.x, player.y, speed)?;
        ctx.ai_state_mut(entity)?.mode = AiMode::Seeking;
        Ok(Status::Running)
    }
}

/// Fires one projectile at the player, then starts `cooldown`.
///
/// Fails while the cooldown timer is still counting down, or when there is
/// no player.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FireAtPlayer {
    pub projectile_speed: Option<f32>,
    pub damage: Option<f32>,
    pub cooldown: Option<f32>,
}

impl BuiltinLeaf for FireAtPlayer {
    const KEY: &'static str = "FireAtPlayer";

    fn from_args(args: &[Value]) -> Result<Self, BuildError> {
        let leaf: Self = parse_args(Self::KEY, args)?;
        check_non_negative(
            Self::KEY,
            &[
                ("projectile_speed", leaf.projectile_speed),
                ("damage", leaf.damage),
                ("cooldown", leaf.cooldown),
            ],
        )?;
        Ok(leaf)
    }
}

impl Leaf for FireAtPlayer {
    fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
        if ctx.ai_state(entity)?.timers.cooldown > 0.0 {
            return Ok(Status::Failure);
        }
        let Some((_, player)) = ctx.player() else {
            return Ok(Status::Failure);
        };
        let speed = ctx.param(entity, self.projectile_speed, "projectile_speed", 240.0);
        let damage = ctx.param(entity, self.damage, "damage", 8.0);
        let cooldown = ctx.param(entity, self.cooldown, "fire_cooldown", 1.2);

        let at = ctx.transform(entity)?;
        let (dx, dy) = direction(at.x, at.y, player.x, player.y);
        ctx.hooks.spawn_projectile(
            ctx.registry,
            ProjectileSpawn {
                x: at.x,
                y: at.y,
                vx: dx * speed,
                vy: dy * speed,
                damage,
                owner: Some(entity),
                config_id: None,
            },
        );
        ctx.events.emit(fx::PROJECTILE_FIRED, [at.x, at.y, dx * speed, dy * speed]);
        ctx.hooks.play_sound("enemy_shoot", at.x);

        let state = ctx.ai_state_mut(entity)?;
        state.timers.cooldown = cooldown;
        state.mode = AiMode::Cooldown;
        Ok(Status::Success)
    }
}
