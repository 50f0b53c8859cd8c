//! Engine and enemy tuning configuration.
//!
//! Both structs deserialize from JSON with every field optional: missing
//! fields keep their [`Default`] values.

use std::collections::BTreeMap;

use arcadia_ecs::component::EnemyVariant;
use serde::{Deserialize, Serialize};

/// Errors produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("fixed_step must be positive and finite, got {0}")]
    FixedStep(f64),

    #[error("max_delta ({max_delta}) must be finite and at least fixed_step ({fixed_step})")]
    MaxDelta { max_delta: f64, fixed_step: f64 },

    #[error("time_scale must be finite and non-negative, got {0}")]
    TimeScale(f64),

    #[error("grid_cell_size must be positive and finite, got {0}")]
    CellSize(f32),

    #[error("collision_margin must be finite and non-negative, got {0}")]
    Margin(f32),

    #[error("event_capacity must be at least 1")]
    EventCapacity,

    #[error("tuning `{variant}.{key}` must be finite and non-negative, got {value}")]
    Tuning { variant: String, key: String, value: f32 },

    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// SchedulerConfig
// ---------------------------------------------------------------------------

/// Fixed-timestep parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds advanced by one sweep.
    pub fixed_step: f64,
    /// Upper bound on a single frame's raw delta, in seconds.
    pub max_delta: f64,
    /// Multiplier on raw time. 0 freezes the simulation.
    pub time_scale: f64,
}

impl Default for SchedulerConfig {
    /// 60 Hz with a quarter-second frame cap.
    fn default() -> Self {
        Self {
            fixed_step: 1.0 / 60.0,
            max_delta: 0.25,
            time_scale: 1.0,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_step > 0.0 && self.fixed_step.is_finite()) {
            return Err(ConfigError::FixedStep(self.fixed_step));
        }
        if !(self.max_delta.is_finite() && self.max_delta >= self.fixed_step) {
            return Err(ConfigError::MaxDelta {
                max_delta: self.max_delta,
                fixed_step: self.fixed_step,
            });
        }
        if !(self.time_scale.is_finite() && self.time_scale >= 0.0) {
            return Err(ConfigError::TimeScale(self.time_scale));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Top-level simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scheduler: SchedulerConfig,
    /// Side length of a spatial grid cell, in world units.
    pub grid_cell_size: f32,
    /// Extra radius added to every broad-phase query.
    pub collision_margin: f32,
    /// Fast event ring capacity; rounded up to a power of two.
    pub event_capacity: usize,
    pub rng_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            grid_cell_size: 64.0,
            collision_margin: 0.0,
            event_capacity: 4096,
            rng_seed: 0,
        }
    }
}

impl EngineConfig {
    /// Parse and validate.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.validate()?;
        if !(self.grid_cell_size > 0.0 && self.grid_cell_size.is_finite()) {
            return Err(ConfigError::CellSize(self.grid_cell_size));
        }
        if !(self.collision_margin >= 0.0 && self.collision_margin.is_finite()) {
            return Err(ConfigError::Margin(self.collision_margin));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::EventCapacity);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EnemyTuning
// ---------------------------------------------------------------------------

/// Numeric parameters for one enemy variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantTuning {
    pub params: BTreeMap<String, f32>,
}

impl VariantTuning {
    fn from_pairs(pairs: &[(&str, f32)]) -> Self {
        Self {
            params: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }
}

/// Per-variant tuning, keyed by lowercase variant name
/// (`"driller"`, `"hunter"`, `"daemon"`).
///
/// Behavior leaves read their optional arguments from here when a tree
/// definition leaves them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    pub enemies: BTreeMap<String, VariantTuning>,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        let mut enemies = BTreeMap::new();
        enemies.insert(
            EnemyVariant::Driller.name().to_string(),
            VariantTuning::from_pairs(&[
                ("speed", 60.0),
                ("arrive_radius", 8.0),
                ("damage_per_sec", 10.0),
                ("drill_duration", 3.0),
                ("max_health", 30.0),
            ]),
        );
        enemies.insert(
            EnemyVariant::Hunter.name().to_string(),
            VariantTuning::from_pairs(&[
                ("speed", 90.0),
                ("range", 300.0),
                ("projectile_speed", 240.0),
                ("damage", 8.0),
                ("fire_cooldown", 1.2),
                ("max_health", 40.0),
            ]),
        );
        enemies.insert(
            EnemyVariant::Daemon.name().to_string(),
            VariantTuning::from_pairs(&[
                ("speed", 50.0),
                ("wander_interval", 2.0),
                ("teleport_min", 80.0),
                ("teleport_max", 160.0),
                ("pulse_count", 8.0),
                ("pulse_speed", 180.0),
                ("pulse_damage", 5.0),
                ("max_health", 60.0),
            ]),
        );
        Self { enemies }
    }
}

impl EnemyTuning {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Every value is a speed, range, duration or amount, so each must be a
    /// finite number no smaller than zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (variant, tuning) in &self.enemies {
            for (key, &value) in &tuning.params {
                if !(value.is_finite() && value >= 0.0) {
                    return Err(ConfigError::Tuning {
                        variant: variant.clone(),
                        key: key.clone(),
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn param(&self, variant: EnemyVariant, key: &str) -> Option<f32> {
        self.enemies.get(variant.name())?.params.get(key).copied()
    }

    pub fn param_or(&self, variant: EnemyVariant, key: &str, fallback: f32) -> f32 {
        self.param(variant, key).unwrap_or(fallback)
    }
}
