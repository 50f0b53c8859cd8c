//! End-to-end scenarios driving a full `SimulationWorld`.
//!
//! These check behavior that only shows up when the phases run together:
//! motion feeding the broad phase, collision feeding the resolver, and the
//! STATE phase destroying what the resolver queued. The last scenario runs a
//! mixed wave twice and compares BLAKE3 digests.

use std::cell::RefCell;
use std::rc::Rc;

use arcadia_engine::prelude::*;

fn quarter_step_config() -> EngineConfig {
    EngineConfig {
        scheduler: SchedulerConfig {
            fixed_step: 0.25,
            max_delta: 1.0,
            time_scale: 1.0,
        },
        ..Default::default()
    }
}

fn empty_library() -> Rc<BehaviorLibrary> {
    Rc::new(BehaviorLibrary::new())
}

// ---------------------------------------------------------------------------
// Physics + collision
// ---------------------------------------------------------------------------

#[test]
fn bullet_overlapping_enemy_is_reported_once() {
    let hits: Rc<RefCell<Vec<(EntityId, EntityId)>>> = Rc::default();
    let sink = Rc::clone(&hits);
    let services = CoreServices {
        library: empty_library(),
        tuning: EnemyTuning::default(),
        resolver: Box::new(move |a: EntityId, b: EntityId, _: &mut WorldState| -> Result<(), SystemError> {
            sink.borrow_mut().push((a, b));
            Ok(())
        }),
    };
    let mut world = SimulationWorld::with_core_systems(quarter_step_config(), services).unwrap();

    let enemy = world.registry_mut().spawn(
        &[Tag::Enemy],
        [
            Transform::at(0.0, 0.0).into(),
            Collider::new(1.0, layers::ENEMY, layers::BULLET).into(),
        ],
    );
    let bullet = world.registry_mut().spawn(
        &[Tag::Bullet],
        [
            Transform::at(0.5, 0.0).into(),
            Collider::new(1.0, layers::BULLET, layers::ENEMY).into(),
        ],
    );

    assert_eq!(world.update(0.25, 0.25), 1);
    assert_eq!(*hits.borrow(), vec![(enemy, bullet)]);
}

#[test]
fn resolver_sees_positions_from_the_same_step() {
    let hits: Rc<RefCell<Vec<(u64, EntityId, EntityId)>>> = Rc::default();
    let sink = Rc::clone(&hits);
    let step = Rc::new(RefCell::new(0u64));
    let step_counter = Rc::clone(&step);
    let services = CoreServices {
        library: empty_library(),
        tuning: EnemyTuning::default(),
        resolver: Box::new(move |a: EntityId, b: EntityId, _: &mut WorldState| -> Result<(), SystemError> {
            sink.borrow_mut().push((*step_counter.borrow(), a, b));
            Ok(())
        }),
    };
    let mut world = SimulationWorld::with_core_systems(quarter_step_config(), services).unwrap();
    let counter = Rc::clone(&step);
    world.scheduler_mut().register_fn(Phase::Input, "count", move |_, info| {
        *counter.borrow_mut() = info.step;
        Ok(())
    });

    // Closing at 8 units/s from 6 apart with radius 1 each: overlap after 0.5 s.
    world.registry_mut().spawn(
        &[],
        [
            Transform::at(0.0, 0.0).into(),
            Velocity::new(4.0, 0.0).into(),
            Collider::new(1.0, 1, 1).into(),
        ],
    );
    world.registry_mut().spawn(
        &[],
        [
            Transform::at(6.0, 0.0).into(),
            Velocity::new(-4.0, 0.0).into(),
            Collider::new(1.0, 1, 1).into(),
        ],
    );

    world.update(0.25, 0.25);
    assert!(hits.borrow().is_empty(), "4 apart after one step");
    world.update(0.25, 0.5);
    assert!(hits.borrow().is_empty(), "exactly touching is not an overlap");
    world.update(0.25, 0.75);
    assert_eq!(hits.borrow().len(), 1);
    assert_eq!(hits.borrow()[0].0, 2);
}

#[test]
fn damage_kills_and_cleanup_destroys() {
    let mut world =
        SimulationWorld::with_core_systems(quarter_step_config(), CoreServices::new(empty_library())).unwrap();
    let enemy = world.registry_mut().spawn(
        &[Tag::Enemy],
        [
            Transform::at(0.0, 0.0).into(),
            Collider::new(2.0, layers::ENEMY, layers::BULLET).into(),
            Health::full(5.0).into(),
            Enemy::ready(EnemyVariant::Driller).into(),
        ],
    );
    let bullet = world.registry_mut().spawn(
        &[Tag::Bullet],
        [
            Transform::at(1.0, 0.0).into(),
            Collider::new(1.0, layers::BULLET, layers::ENEMY).into(),
            Projectile {
                damage: 5.0,
                owner: None,
                config_id: None,
            }
            .into(),
        ],
    );

    world.update(0.25, 0.25);
    assert!(!world.registry().is_active(enemy));
    assert!(!world.registry().is_active(bullet));
    assert_eq!(world.registry().active_count(), 0);

    let mut ids = Vec::new();
    world.events().read_events(0, |e| ids.push(e.id));
    assert_eq!(ids, vec![fx::HIT, fx::DEATH]);

    let tagged = Query::all(&[ComponentKind::Transform]).with_tag(Tag::Enemy);
    assert!(world.registry_mut().query(tagged).is_empty());
    assert!(world.registry().get_by_tag(Tag::Bullet).is_empty());
}

#[test]
fn expired_projectiles_are_removed() {
    let mut world =
        SimulationWorld::with_core_systems(quarter_step_config(), CoreServices::new(empty_library())).unwrap();
    let shot = world.registry_mut().spawn(
        &[Tag::EnemyBullet],
        [Transform::at(0.0, 0.0).into(), Lifetime { remaining: 0.5 }.into()],
    );
    world.update(0.25, 0.25);
    assert!(world.registry().is_active(shot));
    world.update(0.25, 0.5);
    assert!(!world.registry().is_active(shot));
}

#[test]
fn failing_host_system_does_not_stop_the_simulation() {
    let mut world =
        SimulationWorld::with_core_systems(quarter_step_config(), CoreServices::new(empty_library())).unwrap();
    world
        .scheduler_mut()
        .register_fn(Phase::Logic, "broken", |_, _| Err(SystemError::failed("broken", "always fails")));
    let mover = world
        .registry_mut()
        .spawn(&[], [Transform::at(0.0, 0.0).into(), Velocity::new(4.0, 0.0).into()]);

    assert_eq!(world.update(0.5, 0.5), 2);
    assert_eq!(world.registry().component::<Transform>(mover).map(|t| t.x), Some(2.0));
    assert_eq!(world.scheduler().total_failures(), 2);
    let failure = &world.scheduler().last_diagnostics().failures[0];
    assert_eq!((failure.phase, failure.system.as_str()), (Phase::Logic, "broken"));
}

// ---------------------------------------------------------------------------
// Full wave and determinism
// ---------------------------------------------------------------------------

const WAVE_TREES: &str = r#"{
    "driller": { "type": "MemorySequence", "id": "drill", "children": [
        { "type": "FindNearestPanel" },
        { "type": "MoveToTarget" },
        { "type": "DrillPanel", "args": [null, 1.0] },
        { "type": "Wait", "args": [0.5] }
    ]},
    "hunter": { "type": "Selector", "children": [
        { "type": "Sequence", "children": [
            { "type": "IsPlayerInRange", "args": [200.0] },
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
            { "type": "Wait", "args": [1.5] },
            { "type": "Inverter", "children": [{ "type": "HasTarget" }] },
            { "type": "Succeeder", "children": [
                { "type": "Sequence", "children": [
                    { "type": "IsHealthBelow", "args": [0.5] },
                    { "type": "TeleportNearPlayer" }
                ]}
            ]},
            { "type": "PulseBurst", "args": [6] }
        ]}
    ]}
}"#;

/// Host double exposing two panels and tallying the damage they take.
#[derive(Default)]
struct PanelHost {
    damage: Rc<RefCell<f32>>,
}

impl WorldHooks for PanelHost {
    fn panel_rect(&self, id: u32) -> Option<Rect> {
        self.all_panel_rects().into_iter().find(|(p, _)| *p == id).map(|(_, r)| r)
    }

    fn all_panel_rects(&self) -> Vec<(u32, Rect)> {
        vec![(1, Rect::new(-120.0, -10.0, 20.0, 20.0)), (2, Rect::new(100.0, -10.0, 20.0, 20.0))]
    }

    fn damage_panel(&mut self, _id: u32, amount: f32) {
        *self.damage.borrow_mut() += amount;
    }
}

fn spawn_wave(world: &mut SimulationWorld, library: &BehaviorLibrary) {
    let registry = world.registry_mut();
    registry.spawn(
        &[Tag::Player],
        [
            Transform::at(0.0, 0.0).into(),
            Collider::new(8.0, layers::PLAYER, layers::ENEMY_BULLET).into(),
            Health::full(1000.0).into(),
        ],
    );
    for i in 0..12 {
        let variant = EnemyVariant::ALL[i % 3];
        let angle = i as f32 * 0.5;
        let tree = library.tree_id(variant.name()).unwrap();
        let health = if variant == EnemyVariant::Daemon && i % 2 == 0 { 20.0 } else { 60.0 };
        registry.spawn(
            &[Tag::Enemy],
            [
                Transform::at(angle.cos() * 250.0, angle.sin() * 250.0).into(),
                Velocity::default().into(),
                Collider::new(10.0, layers::ENEMY, layers::BULLET).into(),
                Health { current: health, max: 60.0 }.into(),
                Enemy::spawning(variant, 0.2 * i as f32).into(),
                Behavior { tree }.into(),
                AiState::default().into(),
            ],
        );
    }
}

fn run_wave(seed: u64) -> (String, u64, f32) {
    let library = BehaviorLibrary::from_json(WAVE_TREES, &NodeRegistry::with_builtin_leaves()).unwrap();
    let library = Rc::new(library);
    let config = EngineConfig {
        rng_seed: seed,
        ..Default::default()
    };
    let mut world = SimulationWorld::with_core_systems(config, CoreServices::new(Rc::clone(&library))).unwrap();
    let host = PanelHost::default();
    let damage = Rc::clone(&host.damage);
    world.set_hooks(Box::new(host));
    spawn_wave(&mut world, &library);

    for frame in 0..600 {
        world.update(1.0 / 60.0, frame as f64 / 60.0);
    }
    assert_eq!(world.scheduler().total_failures(), 0);
    let digest = world.state_hash().unwrap();
    let events = world.events().write_cursor();
    let panel_damage = *damage.borrow();
    (digest, events, panel_damage)
}

#[test]
fn mixed_wave_runs_and_touches_every_collaborator() {
    let (_, events, panel_damage) = run_wave(7);
    assert!(events > 0);
    assert!(panel_damage > 0.0, "drillers reached a panel");
}

#[test]
fn identical_seeds_produce_identical_digests() {
    let (a, events_a, damage_a) = run_wave(99);
    let (b, events_b, damage_b) = run_wave(99);
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
    assert_eq!(events_a, events_b);
    assert_eq!(damage_a, damage_b);
}
