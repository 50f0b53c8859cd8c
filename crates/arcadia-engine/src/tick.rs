//! Fixed-timestep, phased scheduler.
//!
//! The [`Scheduler`] turns variable frame deltas into a whole number of fixed
//! simulation steps. Each step runs every [`Phase`] in order, and within a
//! phase every registered [`System`] in registration order:
//!
//! ```text
//! Input -> Logic -> Physics -> Collision -> State -> Render
//! ```
//!
//! Systems are fault-isolated. A system that returns an error or panics is
//! logged and counted, and the rest of the step carries on.
//!
//! # Example
//!
//! ```
//! use arcadia_engine::prelude::*;
//!
//! let config = SchedulerConfig { fixed_step: 0.25, max_delta: 1.0, time_scale: 1.0 };
//! let mut scheduler = Scheduler::new(config).unwrap();
//! let mut world = WorldState::new(&EngineConfig::default());
//!
//! scheduler.register_fn(Phase::Logic, "spawn", |world, _step| {
//!     world.registry.create_entity();
//!     Ok(())
//! });
//!
//! // 0.6 s of frame time is two full steps with 0.1 s left over.
//! assert_eq!(scheduler.update(0.6, 0.6, &mut world), 2);
//! assert_eq!(world.registry.active_count(), 2);
//! assert_eq!(scheduler.simulation_time(), 0.5);
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use arcadia_ecs::EcsError;
use tracing::{error, trace, warn};

use crate::config::{ConfigError, SchedulerConfig};
use crate::world::WorldState;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Ordered buckets of systems. The discriminant is the execution position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Input = 0,
    Logic = 1,
    Physics = 2,
    Collision = 3,
    State = 4,
    Render = 5,
}

impl Phase {
    pub const COUNT: usize = 6;

    pub const ALL: [Phase; Self::COUNT] = [
        Phase::Input,
        Phase::Logic,
        Phase::Physics,
        Phase::Collision,
        Phase::State,
        Phase::Render,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Input => "input",
            Phase::Logic => "logic",
            Phase::Physics => "physics",
            Phase::Collision => "collision",
            Phase::State => "state",
            Phase::Render => "render",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Per-step timing handed to every system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepInfo {
    /// Fixed step length in seconds.
    pub delta: f32,
    /// Simulation time at the start of this step.
    pub time: f64,
    /// Zero-based index of this step.
    pub step: u64,
}

/// Errors a system may return. Caught and logged by the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error("system '{system}' failed: {reason}")]
    Failed { system: String, reason: String },
}

impl SystemError {
    pub fn failed(system: impl Into<String>, reason: impl Into<String>) -> Self {
        SystemError::Failed {
            system: system.into(),
            reason: reason.into(),
        }
    }
}

/// A unit of simulation logic run once per step in its phase.
pub trait System {
    fn name(&self) -> &str;

    fn run(&mut self, world: &mut WorldState, step: &StepInfo) -> Result<(), SystemError>;
}

/// Adapts a closure into a [`System`].
pub struct FnSystem<F> {
    name: String,
    func: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&mut WorldState, &StepInfo) -> Result<(), SystemError>,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self { name: name.into(), func }
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut WorldState, &StepInfo) -> Result<(), SystemError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, world: &mut WorldState, step: &StepInfo) -> Result<(), SystemError> {
        (self.func)(world, step)
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// A caught system failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemFailure {
    pub phase: Phase,
    pub system: String,
    pub message: String,
}

/// Timing and failures for the last step run.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    pub step: u64,
    /// Wall-clock time per system, in execution order.
    pub system_times: Vec<(Phase, String, Duration)>,
    pub failures: Vec<SystemFailure>,
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct Scheduler {
    config: SchedulerConfig,
    phases: [Vec<Box<dyn System>>; Phase::COUNT],
    accumulator: f64,
    step_count: u64,
    last_raw_time: f64,
    last_diagnostics: TickDiagnostics,
    total_failures: u64,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("accumulator", &self.accumulator)
            .field("step_count", &self.step_count)
            .field("system_count", &self.system_count())
            .finish()
    }
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            phases: Default::default(),
            accumulator: 0.0,
            step_count: 0,
            last_raw_time: 0.0,
            last_diagnostics: TickDiagnostics::default(),
            total_failures: 0,
        })
    }

    /// Append `system` to `phase`. It runs after every system already there.
    pub fn register_system(&mut self, phase: Phase, system: impl System + 'static) {
        self.register_boxed(phase, Box::new(system));
    }

    pub fn register_boxed(&mut self, phase: Phase, system: Box<dyn System>) {
        trace!(phase = %phase, system = system.name(), "system registered");
        self.phases[phase as usize].push(system);
    }

    /// Register a closure system.
    pub fn register_fn<F>(&mut self, phase: Phase, name: &str, func: F)
    where
        F: FnMut(&mut WorldState, &StepInfo) -> Result<(), SystemError> + 'static,
    {
        self.register_system(phase, FnSystem::new(name, func));
    }

    /// Feed one frame of wall time. Returns the number of steps run.
    ///
    /// Negative or NaN deltas count as zero; deltas above `max_delta` are
    /// clamped so a long stall cannot trigger a burst of catch-up steps.
    pub fn update(&mut self, raw_delta: f64, raw_time: f64, world: &mut WorldState) -> u32 {
        self.last_raw_time = raw_time;
        let delta = if raw_delta.is_nan() || raw_delta < 0.0 {
            warn!(raw_delta, "ignoring invalid frame delta");
            0.0
        } else if raw_delta > self.config.max_delta {
            warn!(raw_delta, max_delta = self.config.max_delta, "clamping frame delta");
            self.config.max_delta
        } else {
            raw_delta
        };

        self.accumulator += delta * self.config.time_scale;
        let mut steps = 0;
        while self.accumulator >= self.config.fixed_step {
            self.step(world);
            self.accumulator -= self.config.fixed_step;
            steps += 1;
        }
        steps
    }

    /// Run exactly one full phase sweep, ignoring the accumulator.
    pub fn step(&mut self, world: &mut WorldState) {
        let info = StepInfo {
            delta: self.config.fixed_step as f32,
            time: self.simulation_time(),
            step: self.step_count,
        };
        let step_start = Instant::now();
        let mut diagnostics = TickDiagnostics {
            step: self.step_count,
            ..Default::default()
        };

        for phase in Phase::ALL {
            for system in self.phases[phase as usize].iter_mut() {
                let started = Instant::now();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| system.run(world, &info)));
                let elapsed = started.elapsed();

                let failure = match outcome {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => {
                        error!(phase = %phase, system = system.name(), step = info.step, error = %e, "system failed");
                        Some(e.to_string())
                    }
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        error!(phase = %phase, system = system.name(), step = info.step, panic = %message, "system panicked");
                        Some(message)
                    }
                };
                if let Some(message) = failure {
                    diagnostics.failures.push(SystemFailure {
                        phase,
                        system: system.name().to_owned(),
                        message,
                    });
                }
                diagnostics.system_times.push((phase, system.name().to_owned(), elapsed));
            }
        }

        self.step_count += 1;
        self.total_failures += diagnostics.failures.len() as u64;
        diagnostics.total_time = step_start.elapsed();
        trace!(step = info.step, failures = diagnostics.failures.len(), "step complete");
        self.last_diagnostics = diagnostics;
    }

    // -- accessors ----------------------------------------------------------

    /// Steps run so far.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// `step_count * fixed_step`, computed by multiplication to avoid drift.
    pub fn simulation_time(&self) -> f64 {
        self.step_count as f64 * self.config.fixed_step
    }

    /// Unconsumed time, always in `[0, fixed_step)` after `update`.
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Fraction of a step left in the accumulator, for render interpolation.
    pub fn interpolation_alpha(&self) -> f64 {
        self.accumulator / self.config.fixed_step
    }

    pub fn fixed_step(&self) -> f64 {
        self.config.fixed_step
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn time_scale(&self) -> f64 {
        self.config.time_scale
    }

    /// Change the time scale (0 freezes). Invalid values are rejected.
    pub fn set_time_scale(&mut self, scale: f64) -> Result<(), ConfigError> {
        if !(scale.is_finite() && scale >= 0.0) {
            return Err(ConfigError::TimeScale(scale));
        }
        self.config.time_scale = scale;
        Ok(())
    }

    /// Raw time passed to the most recent `update`.
    pub fn last_frame_time(&self) -> f64 {
        self.last_raw_time
    }

    pub fn system_count(&self) -> usize {
        self.phases.iter().map(Vec::len).sum()
    }

    /// Names of the systems in `phase`, in execution order.
    pub fn system_names(&self, phase: Phase) -> Vec<&str> {
        self.phases[phase as usize].iter().map(|s| s.name()).collect()
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }

    /// Failures caught across every step so far.
    pub fn total_failures(&self) -> u64 {
        self.total_failures
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
