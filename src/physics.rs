//! # Car Physics
//!
//! [`advance`] moves one car by one tick. It is a pure function of the car,
//! the control input and the physics constants: no randomness, no track
//! access. Whether the new position is legal is decided afterwards by the
//! [`collision`](crate::collision) oracle and the race.
//!
//! Per tick:
//!
//! 1. Speed: `+acceleration` while accelerating, `-acceleration` while
//!    braking, otherwise decays towards zero by `deceleration` without
//!    crossing it. Clamped to `[-max_speed / 2, max_speed]`.
//! 2. Heading: turns only when `|speed| > min_turn_speed`.
//! 3. Position: `position + (cos, sin)(heading) * speed`.

use crate::car::{Car, ControlInput};
use crate::config::{PhysicsConfig, SteeringModel};
use crate::geometry::wrap_angle;

/// Advance a car by one tick. Terminal cars are returned unchanged.
pub fn advance(car: &Car, input: ControlInput, config: &PhysicsConfig) -> Car {
    let mut next = car.clone();
    if car.is_terminal() {
        return next;
    }

    next.speed = next_speed(car.speed, input, config);

    if next.speed.abs() > config.min_turn_speed {
        let rate = turn_rate(next.speed, config);
        let direction = match (input.steer_left, input.steer_right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        };
        next.angle = wrap_angle(next.angle + direction * rate);
    }

    next.sync_velocity();
    next.position += next.velocity;
    next
}

/// Speed after one tick of the given input.
pub fn next_speed(speed: f32, input: ControlInput, config: &PhysicsConfig) -> f32 {
    let thrust = match (input.accelerate, input.brake) {
        (true, false) => config.acceleration,
        (false, true) => -config.acceleration,
        _ => 0.0,
    };

    let speed = if thrust != 0.0 {
        speed + thrust
    } else if speed > 0.0 {
        (speed - config.deceleration).max(0.0)
    } else if speed < 0.0 {
        (speed + config.deceleration).min(0.0)
    } else {
        0.0
    };

    speed.clamp(-config.max_speed * 0.5, config.max_speed)
}

/// Heading change per tick at the given speed.
pub fn turn_rate(speed: f32, config: &PhysicsConfig) -> f32 {
    match config.steering {
        SteeringModel::Constant => config.turn_rate,
        SteeringModel::SpeedScaled => {
            config.turn_rate * (speed.abs() / config.max_speed).min(1.0)
        }
    }
}

