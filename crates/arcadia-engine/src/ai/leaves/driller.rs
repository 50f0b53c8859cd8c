//! Driller leaves: walk to the nearest panel and drill it.

use arcadia_ecs::prelude::*;
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;

use super::{check_non_negative, BuiltinLeaf};
use crate::ai::builder::{no_args, parse_args};
use crate::ai::context::{AiContext, ParticleShape, ParticleSpawn};
use crate::ai::node::{Leaf, Status};
use crate::ai::BuildError;
use crate::events::fx;

/// Damage reduction per `panel_armor` upgrade level.
pub const ARMOR_PER_LEVEL: f32 = 0.25;

const SPARK_COLOR: u32 = 0xffc040;

/// Targets the center of the closest panel. Fails when there are none.
/// Equal distances resolve to the panel listed first by the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct FindNearestPanel;

impl BuiltinLeaf for FindNearestPanel {
    const KEY: &'static str = "FindNearestPanel";

    fn from_args(args: &[Value]) -> Result<Self, BuildError> {
        no_args(Self::KEY, args).map(|_| Self)
    }
}

impl Leaf for FindNearestPanel {
    fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
        let at = ctx.transform(entity)?;
        let mut best: Option<(f32, AiTarget)> = None;
        for (id, rect) in ctx.hooks.all_panel_rects() {
            let (x, y) = rect.center();
            let d = at.distance_squared(x, y);
            if best.as_ref().map_or(true, |(best_d, _)| d < *best_d) {
                best = Some((d, AiTarget::Panel { id, x, y }));
            }
        }
        let Some((_, target)) = best else {
            return Ok(Status::Failure);
        };
        let state = ctx.ai_state_mut(entity)?;
        state.target = Some(target);
        state.mode = AiMode::Seeking;
        Ok(Status::Success)
    }
}

/// Damages the targeted panel every tick for `duration` seconds.
///
/// Damage per tick is `damage_per_sec * delta / (1 + 0.25 * armor)`, where
/// `armor` is the host's `panel_armor` upgrade level. Fails when the target is
/// not a panel or the panel is gone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DrillPanel {
    pub damage_per_sec: Option<f32>,
    pub duration: Option<f32>,
}

impl BuiltinLeaf for DrillPanel {
    const KEY: &'static str = "DrillPanel";

    fn from_args(args: &[Value]) -> Result<Self, BuildError> {
        let leaf: Self = parse_args(Self::KEY, args)?;
        check_non_negative(
            Self::KEY,
            &[("damage_per_sec", leaf.damage_per_sec), ("duration", leaf.duration)],
        )?;
        Ok(leaf)
    }
}

impl Leaf for DrillPanel {
    fn tick(&self, entity: EntityId, ctx: &mut AiContext<'_>) -> Result<Status, EcsError> {
        let Some(AiTarget::Panel { id, x, y }) = ctx.ai_state(entity)?.target else {
            return Ok(Status::Failure);
        };
        if ctx.hooks.panel_rect(id).is_none() {
            let state = ctx.ai_state_mut(entity)?;
            state.target = None;
            state.mode = AiMode::Idle;
            state.timers.action = 0.0;
            return Ok(Status::Failure);
        }

        let dps = ctx.param(entity, self.damage_per_sec, "damage_per_sec", 10.0);
        let duration = ctx.param(entity, self.duration, "drill_duration", 3.0);
        let armor = ctx.hooks.upgrade_level("panel_armor") as f32;
        let amount = dps * ctx.delta / (1.0 + ARMOR_PER_LEVEL * armor);
        let delta = ctx.delta;

        ctx.stop(entity);
        {
            let state = ctx.ai_state_mut(entity)?;
            if state.timers.action <= 0.0 {
                state.timers.action = duration;
            }
            state.mode = AiMode::Attacking;
        }

        ctx.hooks.damage_panel(id, amount);
        ctx.events.emit(fx::PANEL_DAMAGED, [x, y, amount, id as f32]);
        let angle = ctx.rng.gen_range(0.0..std::f32::consts::TAU);
        ctx.hooks.spawn_particle(ParticleSpawn {
            x,
            y,
            color: SPARK_COLOR,
            vx: angle.cos() * 40.0,
            vy: angle.sin() * 40.0,
            life: 0.3,
            size: 2.0,
            shape: ParticleShape::Spark,
        });

        let state = ctx.ai_state_mut(entity)?;
        state.timers.action -= delta;
        if state.timers.action <= 0.0 {
            state.timers.action = 0.0;
            state.mode = AiMode::Idle;
            Ok(Status::Success)
        } else {
            Ok(Status::Running)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::context::Rect;
    use crate::ai::testing::Fixture;
    use serde_json::json;

    fn fixture_with_panels() -> Fixture {
        let mut fix = Fixture::new();
        fix.hooks.panels = vec![
            (7, Rect::new(100.0, 0.0, 10.0, 10.0)),
            (3, Rect::new(-40.0, -5.0, 10.0, 10.0)),
            (9, Rect::new(20.0, -5.0, 10.0, 10.0)),
        ];
        fix
    }

    #[test]
    fn finds_the_closest_panel_center() {
        let mut fix = fixture_with_panels();
        let agent = fix.agent;
        assert_eq!(fix.run_leaf(&FindNearestPanel, agent), Status::Success);
        assert_eq!(fix.ai(agent).target, Some(AiTarget::Panel { id: 9, x: 25.0, y: 0.0 }));
    }

    #[test]
    fn no_panels_fails() {
        let mut fix = Fixture::new();
        let agent = fix.agent;
        assert_eq!(fix.run_leaf(&FindNearestPanel, agent), Status::Failure);
        assert_eq!(fix.ai(agent).target, None);
    }

    #[test]
    fn drills_for_duration() {
        let mut fix = fixture_with_panels();
        let agent = fix.agent;
        fix.run_leaf(&FindNearestPanel, agent);
        let drill = DrillPanel::from_args(&[json!(8.0), json!(0.5)]).unwrap();

        assert_eq!(fix.run_leaf(&drill, agent), Status::Running);
        assert_eq!(fix.ai(agent).mode, AiMode::Attacking);
        assert_eq!(fix.run_leaf(&drill, agent), Status::Success);
        assert_eq!(fix.hooks.panel_damage, vec![(9, 2.0), (9, 2.0)]);
        assert_eq!(fix.event_ids(), vec![fx::PANEL_DAMAGED, fx::PANEL_DAMAGED]);
        assert_eq!(fix.hooks.particles.len(), 2);
    }

    #[test]
    fn armor_upgrades_reduce_damage() {
        let mut fix = fixture_with_panels();
        fix.hooks.panel_armor = 4;
        let agent = fix.agent;
        fix.run_leaf(&FindNearestPanel, agent);
        fix.run_leaf(&DrillPanel::from_args(&[json!(8.0)]).unwrap(), agent);
        assert_eq!(fix.hooks.panel_damage, vec![(9, 1.0)]);
    }

    #[test]
    fn vanished_panel_fails_and_clears_target() {
        let mut fix = fixture_with_panels();
        let agent = fix.agent;
        fix.run_leaf(&FindNearestPanel, agent);
        fix.hooks.panels.retain(|(id, _)| *id != 9);
        assert_eq!(fix.run_leaf(&DrillPanel::default(), agent), Status::Failure);
        assert_eq!(fix.ai(agent).target, None);
        assert!(fix.hooks.panel_damage.is_empty());
    }

    #[test]
    fn non_panel_target_fails() {
        let mut fix = Fixture::new();
        let agent = fix.agent;
        fix.registry.component_mut::<AiState>(agent).unwrap().target = Some(AiTarget::Point { x: 0.0, y: 0.0 });
        assert_eq!(fix.run_leaf(&DrillPanel::default(), agent), Status::Failure);
    }
}
