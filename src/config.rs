//! # Configuration
//!
//! Every tunable constant of the simulation lives in one of the structs below.
//! All of them deserialize from partial JSON (missing fields take their
//! defaults), so a config file only needs the values it overrides.
//!
//! ```rust
//! use gridrace::config::SimConfig;
//!
//! let config: SimConfig = serde_json::from_str(r#"{"trainer": {"batch_size": 16}}"#).unwrap();
//! assert_eq!(config.trainer.batch_size, 16);
//! assert_eq!(config.physics.max_speed, 5.0);
//! ```

use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;
use std::path::Path;
use std::time::Duration;

use crate::error::{RaceError, Result};
use crate::loss::LossKind;
use crate::optimizer::OptimizerKind;

/// How turning authority depends on speed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SteeringModel {
    /// Fixed turn rate whenever the car is moving.
    Constant,
    /// `turn_rate * |speed| / max_speed`.
    SpeedScaled,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub acceleration: f32,
    pub deceleration: f32,
    pub max_speed: f32,
    /// Radians per tick.
    pub turn_rate: f32,
    /// Cars slower than this cannot turn.
    pub min_turn_speed: f32,
    pub steering: SteeringModel,
    /// Half the side of a car's square bounding box.
    pub car_half_extent: f32,
    /// Extra distance added to the car size for car-car contact.
    pub car_buffer: f32,
    /// Speed multiplier applied to both cars on contact.
    pub collision_damping: f32,
    /// Gap between cars spawned around the same start cell. Never less than
    /// the car-car contact distance in practice.
    pub spawn_spacing: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            acceleration: 0.2,
            deceleration: 0.05,
            max_speed: 5.0,
            turn_rate: 0.05,
            min_turn_speed: 0.01,
            steering: SteeringModel::SpeedScaled,
            car_half_extent: 10.0,
            car_buffer: 5.0,
            collision_damping: 0.5,
            spawn_spacing: 16.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Ray angles relative to the car heading, radians.
    pub ray_angles: Vec<f32>,
    pub max_range: f32,
    pub step: f32,
    /// "Near finish" threshold, in cells.
    pub near_finish_cells: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig {
            ray_angles: vec![0.0, -FRAC_PI_2, FRAC_PI_2],
            max_range: 200.0,
            step: 2.0,
            near_finish_cells: 2.0,
        }
    }
}

/// The two reward regimes. They are not interchangeable: each comes with its
/// own learning rate in [`TrainerConfig::for_scale`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardScale {
    /// Shaped rewards in [-1, 1], finish bonus +10.
    Fine,
    /// Rewards in the tens and hundreds.
    Coarse,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub scale: RewardScale,
    pub crash_penalty: f32,
    pub finish_bonus: f32,
    /// Per pixel of reduced distance to the finish.
    pub distance_weight: f32,
    pub wall_danger_distance: f32,
    pub wall_danger_penalty: f32,
    pub wall_safe_distance: f32,
    pub wall_safe_bonus: f32,
    /// Per unit of track-progress gained.
    pub progress_weight: f32,
    pub target_speed: f32,
    pub target_speed_tolerance: f32,
    pub speed_bonus: f32,
    pub step_penalty: f32,
}

impl RewardConfig {
    pub fn fine() -> Self {
        RewardConfig {
            scale: RewardScale::Fine,
            crash_penalty: -1.0,
            finish_bonus: 10.0,
            distance_weight: 0.02,
            wall_danger_distance: 15.0,
            wall_danger_penalty: -0.1,
            wall_safe_distance: 40.0,
            wall_safe_bonus: 0.01,
            progress_weight: 2.0,
            target_speed: 3.0,
            target_speed_tolerance: 1.0,
            speed_bonus: 0.02,
            step_penalty: -0.01,
        }
    }

    pub fn coarse() -> Self {
        RewardConfig {
            scale: RewardScale::Coarse,
            crash_penalty: -100.0,
            finish_bonus: 200.0,
            distance_weight: 1.0,
            wall_danger_distance: 15.0,
            wall_danger_penalty: -5.0,
            wall_safe_distance: 40.0,
            wall_safe_bonus: 0.5,
            progress_weight: 50.0,
            target_speed: 3.0,
            target_speed_tolerance: 1.0,
            speed_bonus: 1.0,
            step_penalty: -1.0,
        }
    }

    pub fn for_scale(scale: RewardScale) -> Self {
        match scale {
            RewardScale::Fine => Self::fine(),
            RewardScale::Coarse => Self::coarse(),
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self::fine()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f32,
    pub gamma: f32,
    pub replay_capacity: usize,
    pub batch_size: usize,
    pub target_update_freq: usize,
    /// Run a gradient step on every n-th replay call.
    pub replay_every: usize,
    pub epsilon_start: f32,
    pub epsilon_min: f32,
    pub epsilon_decay: f32,
    pub dropout: f32,
    pub loss: LossKind,
    pub optimizer: OptimizerKind,
    pub gradient_clip: Option<f32>,
    pub model_id: String,
    pub seed: Option<u64>,
    pub metrics_window: usize,
}

impl TrainerConfig {
    /// Defaults with the learning rate tuned for the given reward scale.
    pub fn for_scale(scale: RewardScale) -> Self {
        let learning_rate = match scale {
            RewardScale::Fine => 1e-3,
            RewardScale::Coarse => 1e-4,
        };
        TrainerConfig {
            learning_rate,
            ..Self::default()
        }
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            hidden_layers: vec![64, 64],
            learning_rate: 1e-3,
            gamma: 0.95,
            replay_capacity: 10_000,
            batch_size: 32,
            target_update_freq: 100,
            replay_every: 4,
            epsilon_start: 1.0,
            epsilon_min: 0.01,
            epsilon_decay: 0.995,
            dropout: 0.0,
            loss: LossKind::Huber { delta: 1.0 },
            optimizer: OptimizerKind::Adam,
            gradient_clip: Some(10.0),
            model_id: "gridrace-dqn".to_string(),
            seed: None,
            metrics_window: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Simulated seconds per tick, used for lap times.
    pub tick_seconds: f32,
    /// Wall-clock interval between status reports.
    pub status_interval_ms: u64,
    pub training_enabled: bool,
    pub seed: Option<u64>,
}

impl RaceConfig {
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }
}

impl Default for RaceConfig {
    fn default() -> Self {
        RaceConfig {
            tick_seconds: 1.0 / 60.0,
            status_interval_ms: 1000,
            training_enabled: true,
            seed: None,
        }
    }
}

/// Aggregate configuration for a race with optional training.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SimConfig {
    pub physics: PhysicsConfig,
    pub sensors: SensorConfig,
    pub reward: RewardConfig,
    pub trainer: TrainerConfig,
    pub race: RaceConfig,
}

impl SimConfig {
    /// Defaults for a reward scale, with the matching learning rate.
    pub fn for_scale(scale: RewardScale) -> Self {
        SimConfig {
            reward: RewardConfig::for_scale(scale),
            trainer: TrainerConfig::for_scale(scale),
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.trainer;
        if t.replay_capacity == 0 {
            return Err(RaceError::invalid_parameter("replay_capacity", "must be greater than 0"));
        }
        if t.batch_size == 0 {
            return Err(RaceError::invalid_parameter("batch_size", "must be greater than 0"));
        }
        if t.batch_size > t.replay_capacity {
            return Err(RaceError::invalid_parameter(
                "batch_size",
                "must not exceed replay_capacity",
            ));
        }
        if t.replay_every == 0 || t.target_update_freq == 0 {
            return Err(RaceError::invalid_parameter(
                "replay_every/target_update_freq",
                "must be greater than 0",
            ));
        }
        if !(0.0..=1.0).contains(&t.gamma) {
            return Err(RaceError::invalid_parameter("gamma", "must be within [0, 1]"));
        }
        if !(0.0 <= t.epsilon_min && t.epsilon_min <= t.epsilon_start && t.epsilon_start <= 1.0) {
            return Err(RaceError::invalid_parameter(
                "epsilon",
                "expected 0 <= epsilon_min <= epsilon_start <= 1",
            ));
        }
        if !(0.0..1.0).contains(&t.dropout) {
            return Err(RaceError::invalid_parameter("dropout", "must be within [0, 1)"));
        }
        if t.hidden_layers.iter().any(|&n| n == 0) {
            return Err(RaceError::invalid_parameter("hidden_layers", "sizes must be positive"));
        }
        let p = &self.physics;
        if !(p.max_speed > 0.0) || p.acceleration < 0.0 || p.deceleration < 0.0 {
            return Err(RaceError::invalid_parameter(
                "physics",
                "max_speed must be positive, acceleration/deceleration non-negative",
            ));
        }
        if !(p.car_half_extent > 0.0) || p.car_buffer < 0.0 || p.spawn_spacing < 0.0 {
            return Err(RaceError::invalid_parameter(
                "physics",
                "car_half_extent must be positive, car_buffer/spawn_spacing non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&p.collision_damping) {
            return Err(RaceError::invalid_parameter("collision_damping", "must be within [0, 1]"));
        }
        let s = &self.sensors;
        if !(s.step > 0.0) || !(s.max_range > 0.0) || s.ray_angles.is_empty() {
            return Err(RaceError::invalid_parameter(
                "sensors",
                "need at least one ray, a positive step and a positive range",
            ));
        }
        if !(self.race.tick_seconds > 0.0) {
            return Err(RaceError::invalid_parameter("tick_seconds", "must be positive"));
        }
        Ok(())
    }
}
