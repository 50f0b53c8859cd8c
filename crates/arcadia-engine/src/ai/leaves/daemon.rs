//! Daemon leaves: erratic wandering, teleports, and projectile rings.

use std::f32::consts::TAU;

use arcadia_ecs::prelude::*;
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::{check_non_negative, BuiltinLeaf};
use crate::ai::builder::parse_args;
use crate::ai::context::{AiContext, ProjectileSpawn};
use crate::ai::node::{Leaf, Status};
use crate::ai::BuildError;
use crate::events::fx;

/// Drifts on a random heading, picking a new one whenever the `retarget`
/// timer has run out. Always running.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Wander {
    pub speed: Option<f32>,
    pub interval: Option<f32>,
}

impl BuiltinLeaf for Wander {
    const KEY: &'static str = "Wander";

    fn from_args(args: &[Value]) -> Result<Self, BuildError> {
        let leaf: Self = parse_args(Self::KEY, args)?;
        check_non_negative(Self::KEY, &[("speed", leaf.speed), ("interval", leaf.interval)])?;
        Ok(leaf)
    }
}

impl Leaf for Wander {
    fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
        let speed = ctx.param(entity, self.speed, "speed", 50.0);
        let interval = ctx.param(entity, self.interval, "wander_interval", 2.0);

        if ctx.ai_state(entity)?.timers.retarget <= 0.0 {
            let heading = ctx.rng.gen_range(0.0..TAU);
            let state = ctx.ai_state_mut(entity)?;
            state.heading = heading;
            state.timers.retarget = interval;
        }
        let state = ctx.ai_state_mut(entity)?;
        state.mode = AiMode::Wandering;
        let heading = state.heading;
        ctx.set_velocity(entity, heading.cos() * speed, heading.sin() * speed)?;
        ctx.registry.require_mut::<Transform>(entity)?.rotation = heading;
        Ok(Status::Running)
    }
}

/// Jumps to a random point between `min` and `max` units from the player.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeleportNearPlayer {
    pub min: Option<f32>,
    pub max: Option<f32>,
}

impl BuiltinLeaf for TeleportNearPlayer {
    const KEY: &'static str = "TeleportNearPlayer";

    fn from_args(args: &[Value]) -> Result<Self, BuildError> {
        let leaf: Self = parse_args(Self::KEY, args)?;
        check_non_negative(Self::KEY, &[("min", leaf.min), ("max", leaf.max)])?;
        if let (Some(min), Some(max)) = (leaf.min, leaf.max) {
            if min > max {
                return Err(BuildError::InvalidArgs {
                    node: Self::KEY.to_string(),
                    reason: format!("min ({min}) exceeds max ({max})"),
                });
            }
        }
        Ok(leaf)
    }
}

impl Leaf for TeleportNearPlayer {
    fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
        let Some((_, player)) = ctx.player() else {
            return Ok(Status::Failure);
        };
        let a = ctx.param(entity, self.min, "teleport_min", 80.0);
        let b = ctx.param(entity, self.max, "teleport_max", 160.0);
        if !(a.is_finite() && b.is_finite()) {
            warn!(entity = %entity, min = a, max = b, "teleport band is not finite");
            return Ok(Status::Failure);
        }
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

        let distance = ctx.rng.gen_range(lo..=hi);
        let angle = ctx.rng.gen_range(0.0..TAU);
        let (x, y) = (player.x + angle.cos() * distance, player.y + angle.sin() * distance);

        let transform = ctx.registry.require_mut::<Transform>(entity)?;
        let (from_x, from_y) = (transform.x, transform.y);
        transform.x = x;
        transform.y = y;
        ctx.stop(entity);

        ctx.events.emit(fx::TELEPORT, [from_x, from_y, x, y]);
        ctx.hooks.spawn_fx("teleport", x, y, angle);
        ctx.hooks.play_sound("daemon_teleport", x);
        Ok(Status::Success)
    }
}

/// Fires `count` projectiles in an evenly spaced ring.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PulseBurst {
    pub count: Option<f32>,
    pub speed: Option<f32>,
    pub damage: Option<f32>,
}

impl BuiltinLeaf for PulseBurst {
    const KEY: &'static str = "PulseBurst";

    fn from_args(args: &[Value]) -> Result<Self, BuildError> {
        let leaf: Self = parse_args(Self::KEY, args)?;
        check_non_negative(
            Self::KEY,
            &[("count", leaf.count), ("speed", leaf.speed), ("damage", leaf.damage)],
        )?;
        Ok(leaf)
    }
}

impl Leaf for PulseBurst {
    fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
        let count = ctx.param(entity, self.count, "pulse_count", 8.0).round().max(1.0) as u32;
        let speed = ctx.param(entity, self.speed, "pulse_speed", 180.0);
        let damage = ctx.param(entity, self.damage, "pulse_damage", 5.0);
        let at = ctx.transform(entity)?;

        for i in 0..count {
            let angle = TAU * i as f32 / count as f32;
            ctx.hooks.spawn_projectile(
                ctx.registry,
                ProjectileSpawn {
                    x: at.x,
                    y: at.y,
                    vx: angle.cos() * speed,
                    vy: angle.sin() * speed,
                    damage,
                    owner: Some(entity),
                    config_id: None,
                },
            );
        }
        ctx.events.emit(fx::PULSE, [at.x, at.y, count as f32, damage]);
        ctx.hooks.spawn_fx("pulse", at.x, at.y, 0.0);
        ctx.ai_state_mut(entity)?.mode = AiMode::Attacking;
        Ok(Status::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::Fixture;
    use serde_json::json;

    #[test]
    fn wander_keeps_heading_until_retarget() {
        let mut fix = Fixture::new();
        let daemon = fix.spawn_enemy(EnemyVariant::Daemon, 0.0, 0.0);
        assert_eq!(fix.run_leaf(&Wander::default(), daemon), Status::Running);
        let first = fix.velocity(daemon);
        let speed = (first.0 * first.0 + first.1 * first.1).sqrt();
        assert!((speed - 50.0).abs() < 1e-3);
        assert_eq!(fix.ai(daemon).timers.retarget, 2.0);
        assert_eq!(fix.ai(daemon).mode, AiMode::Wandering);

        fix.run_leaf(&Wander::default(), daemon);
        assert_eq!(fix.velocity(daemon), first);
    }

    #[test]
    fn teleport_lands_within_band() {
        let mut fix = Fixture::new();
        let daemon = fix.spawn_enemy(EnemyVariant::Daemon, 500.0, 500.0);
        fix.spawn_player(10.0, -10.0);
        let leaf = TeleportNearPlayer::from_args(&[json!(20.0), json!(30.0)]).unwrap();
        for _ in 0..20 {
            assert_eq!(fix.run_leaf(&leaf, daemon), Status::Success);
            let t = *fix.registry.component::<Transform>(daemon).unwrap();
            let d = t.distance_squared(10.0, -10.0).sqrt();
            assert!((19.99..=30.01).contains(&d), "landed {d} away");
        }
        assert_eq!(fix.event_ids()[0], fx::TELEPORT);
        assert_eq!(fix.hooks.effects.len(), 20);
    }

    #[test]
    fn teleport_rejects_inverted_band() {
        assert!(TeleportNearPlayer::from_args(&[json!(9.0), json!(3.0)]).is_err());
    }

    #[test]
    fn teleport_fails_on_a_non_finite_band() {
        let mut fix = Fixture::new();
        let daemon = fix.spawn_enemy(EnemyVariant::Daemon, 500.0, 500.0);
        fix.spawn_player(0.0, 0.0);
        fix.tuning
            .enemies
            .get_mut("daemon")
            .unwrap()
            .params
            .insert("teleport_max".into(), f32::INFINITY);

        assert_eq!(fix.run_leaf(&TeleportNearPlayer::default(), daemon), Status::Failure);
        let t = *fix.registry.component::<Transform>(daemon).unwrap();
        assert_eq!((t.x, t.y), (500.0, 500.0));
        assert!(fix.event_ids().is_empty());
    }

    #[test]
    fn pulse_fires_an_even_ring() {
        let mut fix = Fixture::new();
        let daemon = fix.spawn_enemy(EnemyVariant::Daemon, 0.0, 0.0);
        assert_eq!(fix.run_leaf(&PulseBurst::from_args(&[json!(4)]).unwrap(), daemon), Status::Success);
        let shots = &fix.hooks.projectiles;
        assert_eq!(shots.len(), 4);
        assert!((shots[0].vx - 180.0).abs() < 1e-3);
        assert!((shots[1].vy - 180.0).abs() < 1e-3);
        assert!(shots.iter().all(|s| s.owner == Some(daemon) && s.damage == 5.0));
        assert_eq!(fix.event_ids(), vec![fx::PULSE]);
    }
}
