use crate::config::RewardConfig;
use crate::encoder::Observation;

/// Shaped reward for one transition from `before` to `after`.
///
/// Terminal transitions return the crash penalty or the finish bonus alone.
/// Otherwise the reward sums the distance-to-finish gain, a wall proximity
/// term (penalty below the danger distance, bonus above the safe distance),
/// the progress gain, a bonus for driving near the target speed and the
/// per-step penalty.
pub fn shape(before: &Observation, after: &Observation, config: &RewardConfig) -> f32 {
    if after.crashed {
        return config.crash_penalty;
    }
    if after.finished {
        return config.finish_bonus;
    }

    let mut reward = config.step_penalty;

    if let (Some(prev), Some(next)) = (before.distance_to_finish, after.distance_to_finish) {
        reward += config.distance_weight * (prev - next);
    }

    if after.nearest_wall < config.wall_danger_distance {
        reward += config.wall_danger_penalty;
    } else if after.nearest_wall > config.wall_safe_distance {
        reward += config.wall_safe_bonus;
    }

    reward += config.progress_weight * (after.progress - before.progress);

    if (after.speed - config.target_speed).abs() <= config.target_speed_tolerance {
        reward += config.speed_bonus;
    }

    reward
}
