//! # State Encoder
//!
//! Turns a car, the track and the other cars into the fixed-length feature
//! vector the Q-network consumes. Normalization constants come from the track
//! dimensions at construction, so an encoder must be rebuilt when the track
//! is replaced.
//!
//! Feature layout (`n` = number of sensor rays):
//!
//! | index | feature | range |
//! |---|---|---|
//! | 0, 1 | x / width, y / height | [0, 1] |
//! | 2 | heading / PI | [-1, 1] |
//! | 3 | speed / max speed | [-0.5, 1] |
//! | 4, 5 | velocity x, y / max speed | [-1, 1] |
//! | 6 | distance to finish / track diagonal (1 without a finish) | [0, 1] |
//! | 7 .. 7+n | ray distances / sensor range | [0, 1] |
//! | 7+n | nearest wall / sensor range | [0, 1] |
//! | 8+n | track progress | [0, 1] |
//! | 9+n, 10+n | sin, cos of heading | [-1, 1] |
//! | 11+n | near finish flag | {0, 1} |
//! | 12+n | nearest car distance / diagonal (1 when alone) | [0, 1] |
//! | 13+n | nearest car bearing / PI (0 when alone) | [-1, 1] |

use ndarray::Array1;
use std::f32::consts::PI;

use crate::car::Car;
use crate::collision;
use crate::config::{PhysicsConfig, SensorConfig};
use crate::geometry::wrap_angle;
use crate::track::Track;

/// Measurements the reward shaper needs, taken alongside an encoding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub distance_to_finish: Option<f32>,
    pub nearest_wall: f32,
    pub progress: f32,
    pub speed: f32,
    pub crashed: bool,
    pub finished: bool,
}

#[derive(Clone, Debug)]
pub struct StateEncoder {
    width: f32,
    height: f32,
    diagonal: f32,
    max_speed: f32,
    near_finish_distance: f32,
    sensors: SensorConfig,
}

impl StateEncoder {
    pub fn for_track(track: &Track, physics: &PhysicsConfig, sensors: &SensorConfig) -> Self {
        let width = track.pixel_width().max(1.0);
        let height = track.pixel_height().max(1.0);
        StateEncoder {
            width,
            height,
            diagonal: width.hypot(height),
            max_speed: physics.max_speed,
            near_finish_distance: sensors.near_finish_cells * track.cell_size(),
            sensors: sensors.clone(),
        }
    }

    /// Length of every vector this encoder produces.
    pub fn state_size(&self) -> usize {
        Self::state_size_for(&self.sensors)
    }

    pub fn state_size_for(sensors: &SensorConfig) -> usize {
        14 + sensors.ray_angles.len()
    }

    pub fn sensors(&self) -> &SensorConfig {
        &self.sensors
    }

    pub fn observe(&self, car: &Car, track: &Track) -> Observation {
        Observation {
            distance_to_finish: collision::distance_to_finish(car, track),
            nearest_wall: collision::nearest_wall_distance(car, track, &self.sensors),
            progress: collision::track_progress(car, track),
            speed: car.speed,
            crashed: car.crashed,
            finished: car.finished,
        }
    }

    pub fn encode(&self, car: &Car, track: &Track, others: &[Car]) -> Array1<f32> {
        self.encode_observed(car, track, others).0
    }

    /// Encode and return the reward measurements from the same sensor pass.
    pub fn encode_observed(&self, car: &Car, track: &Track, others: &[Car]) -> (Array1<f32>, Observation) {
        let rays = collision::wall_distances(car, track, &self.sensors);
        let range = self.sensors.max_range.max(f32::EPSILON);
        let nearest_wall = rays.iter().copied().fold(self.sensors.max_range, f32::min);
        let distance_to_finish = collision::distance_to_finish(car, track);
        let progress = collision::track_progress(car, track);
        let heading = wrap_angle(car.angle);

        let mut features = Vec::with_capacity(self.state_size());
        features.push(unit(car.position.x / self.width));
        features.push(unit(car.position.y / self.height));
        features.push(heading / PI);
        features.push(car.speed / self.max_speed);
        features.push(car.velocity.x / self.max_speed);
        features.push(car.velocity.y / self.max_speed);
        features.push(
            distance_to_finish
                .map(|d| unit(d / self.diagonal))
                .unwrap_or(1.0),
        );
        features.extend(rays.iter().map(|d| unit(d / range)));
        features.push(unit(nearest_wall / range));
        features.push(progress);
        features.push(heading.sin());
        features.push(heading.cos());
        let near_finish = distance_to_finish
            .map(|d| d < self.near_finish_distance)
            .unwrap_or(false);
        features.push(if near_finish { 1.0 } else { 0.0 });
        match collision::nearest_car(car, others) {
            Some((distance, bearing)) => {
                features.push(unit(distance / self.diagonal));
                features.push(bearing / PI);
            }
            None => {
                features.push(1.0);
                features.push(0.0);
            }
        }

        let observation = Observation {
            distance_to_finish,
            nearest_wall,
            progress,
            speed: car.speed,
            crashed: car.crashed,
            finished: car.finished,
        };
        (Array1::from_vec(features), observation)
    }
}

fn unit(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}
