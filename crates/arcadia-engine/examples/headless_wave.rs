//! Headless wave -- a mixed enemy wave against a stationary player and two
//! shield panels, with no renderer attached.
//!
//! Run with:
//!   cargo run --example headless_wave -p arcadia-engine -- [seconds] [seed]
//!
//! Set `RUST_LOG=debug` to see per-frame scheduler output.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::Context;
use arcadia_engine::logging::init_tracing;
use arcadia_engine::prelude::*;
use tracing::{info, warn};

const TREES: &str = r#"{
    "driller": { "type": "MemorySequence", "id": "drill", "children": [
        { "type": "FindNearestPanel" },
        { "type": "MoveToTarget" },
        { "type": "DrillPanel" },
        { "type": "Wait", "args": [0.5] }
    ]},
    "hunter": { "type": "Selector", "children": [
        { "type": "Sequence", "children": [
            { "type": "IsPlayerInRange" },
            { "type": "TargetPlayer" },
            { "type": "StopMoving" },
            { "type": "Succeeder", "children": [{ "type": "FireAtPlayer" }] }
        ]},
        { "type": "Sequence", "children": [
            { "type": "ClearTarget" },
            { "type": "ChasePlayer" }
        ]}
    ]},
    "daemon": { "type": "Parallel", "children": [
        { "type": "Wander" },
        { "type": "MemorySequence", "id": "burst", "children": [
            { "type": "Wait", "args": [2.0] },
            { "type": "Succeeder", "children": [
                { "type": "Sequence", "children": [
                    { "type": "IsHealthBelow", "args": [0.5] },
                    { "type": "TeleportNearPlayer" }
                ]}
            ]},
            { "type": "PulseBurst" }
        ]}
    ]}
}"#;

const WAVE_SIZE: usize = 18;

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct HostTally {
    panel_hp: BTreeMap<u32, f32>,
    effects: usize,
    sounds: usize,
}

/// Two panels flanking the player; damage is subtracted from their hit points.
struct ArenaHost {
    tally: Rc<RefCell<HostTally>>,
}

impl WorldHooks for ArenaHost {
    fn panel_rect(&self, id: u32) -> Option<Rect> {
        self.all_panel_rects().into_iter().find(|(p, _)| *p == id).map(|(_, r)| r)
    }

    fn all_panel_rects(&self) -> Vec<(u32, Rect)> {
        let tally = self.tally.borrow();
        [(1, Rect::new(-160.0, -20.0, 24.0, 40.0)), (2, Rect::new(136.0, -20.0, 24.0, 40.0))]
            .into_iter()
            .filter(|(id, _)| tally.panel_hp.get(id).is_some_and(|hp| *hp > 0.0))
            .collect()
    }

    fn damage_panel(&mut self, id: u32, amount: f32) {
        if let Some(hp) = self.tally.borrow_mut().panel_hp.get_mut(&id) {
            *hp = (*hp - amount).max(0.0);
        }
    }

    fn spawn_fx(&mut self, _kind: &str, _x: f32, _y: f32, _angle: f32) {
        self.tally.borrow_mut().effects += 1;
    }

    fn play_sound(&mut self, _key: &str, _pan: f32) {
        self.tally.borrow_mut().sounds += 1;
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn spawn_wave(world: &mut SimulationWorld, library: &BehaviorLibrary) -> anyhow::Result<EntityId> {
    let registry = world.registry_mut();
    let player = registry.spawn(
        &[Tag::Player],
        [
            Transform::at(0.0, 0.0).into(),
            Collider::new(10.0, layers::PLAYER, layers::ENEMY_BULLET).into(),
            Health::full(500.0).into(),
        ],
    );

    for i in 0..WAVE_SIZE {
        let variant = EnemyVariant::ALL[i % EnemyVariant::ALL.len()];
        let tree = library
            .require(variant.name())
            .with_context(|| format!("no tree for {}", variant.name()))?;
        let angle = i as f32 / WAVE_SIZE as f32 * std::f32::consts::TAU;
        registry.spawn(
            &[Tag::Enemy],
            [
                Transform::at(angle.cos() * 320.0, angle.sin() * 320.0).into(),
                Velocity::default().into(),
                Collider::new(12.0, layers::ENEMY, layers::BULLET).into(),
                Health::full(40.0).into(),
                Enemy::spawning(variant, 0.25 * i as f32).into(),
                Behavior { tree }.into(),
                AiState::default().into(),
            ],
        );
    }
    Ok(player)
}

fn parse_arg<T: std::str::FromStr>(index: usize, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::args().nth(index) {
        Some(raw) => raw.parse().with_context(|| format!("argument {index} ({raw:?})")),
        None => Ok(default),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let seconds: f64 = parse_arg(1, 20.0)?;
    let seed: u64 = parse_arg(2, 1)?;

    let library = Rc::new(
        BehaviorLibrary::from_json(TREES, &NodeRegistry::with_builtin_leaves()).context("loading behavior trees")?,
    );
    let config = EngineConfig {
        rng_seed: seed,
        ..Default::default()
    };
    let mut world = SimulationWorld::with_core_systems(config, CoreServices::new(Rc::clone(&library)))?;

    let tally = Rc::new(RefCell::new(HostTally {
        panel_hp: BTreeMap::from([(1, 200.0), (2, 200.0)]),
        ..Default::default()
    }));
    world.set_hooks(Box::new(ArenaHost {
        tally: Rc::clone(&tally),
    }));
    let player = spawn_wave(&mut world, &library)?;
    info!(seconds, seed, enemies = WAVE_SIZE, "wave started");

    let frame = 1.0 / 60.0;
    let frames = (seconds / frame).round() as u64;
    let mut reader = EventReader::new();
    let mut counts: BTreeMap<u32, u64> = BTreeMap::new();

    for i in 0..frames {
        world.update(frame, i as f64 * frame);
        reader.read(world.events(), |e| *counts.entry(e.id).or_default() += 1);
        if !world.registry().is_active(player) {
            warn!(frame = i, "player destroyed");
            break;
        }
    }

    let enemies_left = world.registry().get_by_tag(Tag::Enemy).len();
    let player_hp = world.registry().component::<Health>(player).map(|h| h.current);
    let tally = tally.borrow();
    info!(
        steps = world.scheduler().step_count(),
        enemies_left,
        ?player_hp,
        panels = ?tally.panel_hp,
        effects = tally.effects,
        sounds = tally.sounds,
        failures = world.scheduler().total_failures(),
        missed_events = reader.missed(),
        "wave finished"
    );
    for (id, count) in &counts {
        info!(event = id, count, "fast events");
    }
    info!(digest = %world.state_hash()?, "final state");
    Ok(())
}
