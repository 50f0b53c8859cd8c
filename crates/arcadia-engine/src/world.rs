//! Simulation state and the driver that steps it.
//!
//! [`WorldState`] is everything a system may touch; [`SimulationWorld`] pairs
//! it with a [`Scheduler`] and is what a host owns.

use std::fmt;
use std::rc::Rc;

use arcadia_ecs::prelude::*;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use tracing::{debug, info};

use crate::ai::{BehaviorLibrary, BehaviorSystem, NoopHooks, WorldHooks};
use crate::collision::{CollisionSystem, CombatResolver, DamageResolver};
use crate::config::{ConfigError, EngineConfig, EnemyTuning};
use crate::events::FastEventBus;
use crate::lifecycle::{CleanupSystem, LifetimeSystem};
use crate::physics::MotionSystem;
use crate::spatial::SpatialGrid;
use crate::tick::{Phase, Scheduler, System};

/// Mutable state shared by every system.
pub struct WorldState {
    pub registry: EntityRegistry,
    pub grid: SpatialGrid,
    pub events: FastEventBus,
    /// The only randomness gameplay code may use.
    pub rng: Pcg32,
    pub hooks: Box<dyn WorldHooks>,
}

impl fmt::Debug for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldState")
            .field("active_entities", &self.registry.active_count())
            .field("grid_entries", &self.grid.len())
            .field("event_cursor", &self.events.write_cursor())
            .finish_non_exhaustive()
    }
}

impl WorldState {
    /// Fresh state with [`NoopHooks`].
    ///
    /// # Panics
    ///
    /// If `config.grid_cell_size` is not positive; call
    /// [`EngineConfig::validate`] first when the config is untrusted.
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_hooks(config, Box::new(NoopHooks))
    }

    pub fn with_hooks(config: &EngineConfig, hooks: Box<dyn WorldHooks>) -> Self {
        Self {
            registry: EntityRegistry::new(),
            grid: SpatialGrid::new(config.grid_cell_size),
            events: FastEventBus::new(config.event_capacity),
            rng: Pcg32::seed_from_u64(config.rng_seed),
            hooks,
        }
    }

    /// Restart the RNG stream.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = Pcg32::seed_from_u64(seed);
    }
}

// ---------------------------------------------------------------------------
// SimulationWorld
// ---------------------------------------------------------------------------

/// Collaborators needed by the standard system set.
pub struct CoreServices {
    pub library: Rc<BehaviorLibrary>,
    pub tuning: EnemyTuning,
    pub resolver: Box<dyn CombatResolver>,
}

impl CoreServices {
    /// Services using [`DamageResolver`] and default tuning.
    pub fn new(library: Rc<BehaviorLibrary>) -> Self {
        Self {
            library,
            tuning: EnemyTuning::default(),
            resolver: Box::new(DamageResolver),
        }
    }
}

/// A scheduler plus the state it drives.
pub struct SimulationWorld {
    config: EngineConfig,
    state: WorldState,
    scheduler: Scheduler,
}

impl fmt::Debug for SimulationWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationWorld")
            .field("state", &self.state)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

impl SimulationWorld {
    /// An empty world with no systems registered.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let scheduler = Scheduler::new(config.scheduler)?;
        let state = WorldState::new(&config);
        Ok(Self {
            config,
            state,
            scheduler,
        })
    }

    /// A world running the standard systems:
    ///
    /// | phase     | systems              |
    /// |-----------|----------------------|
    /// | Logic     | behavior             |
    /// | Physics   | motion               |
    /// | Collision | collision            |
    /// | State     | lifetime, cleanup    |
    pub fn with_core_systems(config: EngineConfig, services: CoreServices) -> Result<Self, ConfigError> {
        let mut world = Self::new(config)?;
        let CoreServices {
            library,
            tuning,
            resolver,
        } = services;
        tuning.validate()?;
        let margin = world.config.collision_margin;
        world.register_system(Phase::Logic, BehaviorSystem::new(library, tuning));
        world.register_system(Phase::Physics, MotionSystem::new());
        world.register_system(Phase::Collision, CollisionSystem::with_boxed(resolver, margin));
        world.register_system(Phase::State, LifetimeSystem::default());
        world.register_system(Phase::State, CleanupSystem::default());
        info!(systems = world.scheduler.system_count(), "core systems registered");
        Ok(world)
    }

    pub fn register_system(&mut self, phase: Phase, system: impl System + 'static) {
        self.scheduler.register_system(phase, system);
    }

    /// Replace the host hooks.
    pub fn set_hooks(&mut self, hooks: Box<dyn WorldHooks>) {
        self.state.hooks = hooks;
    }

    /// Feed one frame of wall time; returns the number of fixed steps run.
    pub fn update(&mut self, raw_delta: f64, raw_time: f64) -> u32 {
        let steps = self.scheduler.update(raw_delta, raw_time, &mut self.state);
        if steps > 0 {
            debug!(
                steps,
                step_count = self.scheduler.step_count(),
                entities = self.state.registry.active_count(),
                "frame advanced"
            );
        }
        steps
    }

    /// BLAKE3 digest of the registry, for determinism checks.
    pub fn state_hash(&self) -> Result<String, EcsError> {
        self.snapshot().state_hash()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot::capture(&self.state.registry)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut WorldState {
        &mut self.state
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.state.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.state.registry
    }

    pub fn events(&self) -> &FastEventBus {
        &self.state.events
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }
}
