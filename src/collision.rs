//! # Collision & Progress Oracle
//!
//! Pure queries over a car, the track and the other cars. Nothing here moves
//! a car except [`resolve_car_collision`], which applies the positional
//! correction for a car-car contact.

use crate::car::Car;
use crate::config::{PhysicsConfig, SensorConfig};
use crate::geometry::{wrap_angle, Vec2};
use crate::track::Track;

/// True when any bounding-box corner at `center` is outside the grid or in a wall.
pub fn hits_wall(car: &Car, center: Vec2, track: &Track) -> bool {
    car.corners_at(center)
        .iter()
        .any(|&corner| track.is_blocked(corner))
}

/// Contact distance between two cars: the mean car size plus the buffer.
pub fn contact_distance(a: &Car, b: &Car, buffer: f32) -> f32 {
    (a.size + b.size) * 0.5 + buffer
}

pub fn cars_collide(a: &Car, b: &Car, buffer: f32) -> bool {
    a.position.distance(b.position) < contact_distance(a, b, buffer)
}

/// Push two touching cars apart along the line between their centres and
/// damp both speeds.
///
/// Each car takes half the overlap unless a wall is in the way: a car with
/// less room moves as far as the walls allow and the other car takes the
/// rest. Speeds are damped even when the walls leave no room to separate.
/// Returns false, changing nothing, when the cars do not touch or their
/// centres coincide.
pub fn resolve_car_collision(a: &mut Car, b: &mut Car, config: &PhysicsConfig, track: &Track) -> bool {
    let Some((normal, overlap)) = contact(a, b, config.car_buffer) else {
        return false;
    };
    let room_a = free_travel(a, normal * -1.0, overlap, track);
    let room_b = free_travel(b, normal, overlap, track);

    let push_a = (overlap * 0.5).min(room_a);
    let push_b = (overlap - push_a).min(room_b);
    let push_a = (overlap - push_b).min(room_a);
    a.position -= normal * push_a;
    b.position += normal * push_b;
    damp(a, b, config.collision_damping);
    true
}

/// Unit normal from `a` to `b` and the overlap, when the cars touch.
fn contact(a: &Car, b: &Car, buffer: f32) -> Option<(Vec2, f32)> {
    let delta = b.position - a.position;
    let distance = delta.length();
    let threshold = contact_distance(a, b, buffer);
    if distance >= threshold || !(distance > f32::EPSILON) {
        return None;
    }
    Some((delta * (1.0 / distance), threshold - distance))
}

fn damp(a: &mut Car, b: &mut Car, damping: f32) {
    a.speed *= damping;
    b.speed *= damping;
    a.sync_velocity();
    b.sync_velocity();
}

/// Longest move of at most `limit` along `direction` that keeps the car
/// clear of walls.
fn free_travel(car: &Car, direction: Vec2, limit: f32, track: &Track) -> f32 {
    if !hits_wall(car, car.position + direction * limit, track) {
        return limit;
    }
    if hits_wall(car, car.position, track) {
        return 0.0;
    }
    let (mut lo, mut hi) = (0.0, limit);
    for _ in 0..16 {
        let mid = (lo + hi) * 0.5;
        if hits_wall(car, car.position + direction * mid, track) {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    lo
}

/// True when the car centre is within one cell of `target`.
pub fn within_cell(car: &Car, target: Vec2, track: &Track) -> bool {
    car.position.distance(target) < track.cell_size()
}

pub fn is_at_finish(car: &Car, track: &Track) -> bool {
    track
        .finish_center()
        .map(|finish| within_cell(car, finish, track))
        .unwrap_or(false)
}

/// First checkpoint within reach that the car has not passed this lap.
pub fn reached_checkpoint(car: &Car, track: &Track) -> Option<usize> {
    track
        .checkpoints()
        .iter()
        .enumerate()
        .find(|(index, pos)| {
            !car.checkpoints_passed.contains(index)
                && within_cell(car, track.cell_center(**pos), track)
        })
        .map(|(index, _)| index)
}

/// Distance along one ray until it leaves the grid or enters a wall.
pub fn ray_distance(origin: Vec2, angle: f32, track: &Track, sensors: &SensorConfig) -> f32 {
    let direction = Vec2::from_angle(angle);
    let mut distance = sensors.step;
    while distance < sensors.max_range {
        if track.is_blocked(origin + direction * distance) {
            return distance;
        }
        distance += sensors.step;
    }
    sensors.max_range
}

/// One distance per configured ray, relative to the car heading.
pub fn wall_distances(car: &Car, track: &Track, sensors: &SensorConfig) -> Vec<f32> {
    sensors
        .ray_angles
        .iter()
        .map(|offset| ray_distance(car.position, car.angle + offset, track, sensors))
        .collect()
}

pub fn nearest_wall_distance(car: &Car, track: &Track, sensors: &SensorConfig) -> f32 {
    wall_distances(car, track, sensors)
        .into_iter()
        .fold(sensors.max_range, f32::min)
}

/// Distance and heading-relative bearing (radians, (-PI, PI]) to the closest other car.
pub fn nearest_car<'a, I>(car: &Car, others: I) -> Option<(f32, f32)>
where
    I: IntoIterator<Item = &'a Car>,
{
    others
        .into_iter()
        .filter(|other| other.id != car.id)
        .map(|other| {
            let delta = other.position - car.position;
            (delta.length(), wrap_angle(delta.angle() - car.angle))
        })
        .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
}

pub fn distance_to_finish(car: &Car, track: &Track) -> Option<f32> {
    track.finish_center().map(|finish| car.position.distance(finish))
}

/// Straight-line distance from the start centre over the start-to-finish
/// distance, clamped to [0, 1]. Zero when start or finish is missing.
pub fn track_progress(car: &Car, track: &Track) -> f32 {
    match (track.start_center(), track.finish_center()) {
        (Some(start), Some(finish)) => {
            let total = start.distance(finish);
            if total <= f32::EPSILON {
                return 0.0;
            }
            (car.position.distance(start) / total).clamp(0.0, 1.0)
        }
        _ => 0.0,
    }
}
