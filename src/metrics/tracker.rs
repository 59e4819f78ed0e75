use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Emitted at every episode boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStats {
    /// 1-based episode index
    pub episode: usize,
    pub total_reward: f32,
    /// Steps taken in the episode
    pub length: usize,
    /// Mean total reward of the last `window` episodes, this one included
    pub running_average: f32,
    pub finished: bool,
}

/// Stores training metrics over time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Loss values over time
    pub losses: VecDeque<f32>,

    /// Rewards per episode
    pub episode_rewards: VecDeque<f32>,

    /// Episode lengths
    pub episode_lengths: VecDeque<usize>,

    /// Epsilon values, one per training step
    pub epsilons: VecDeque<f32>,
}

/// Tracks episode and training-step metrics for the status collaborator.
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    metrics: TrainingMetrics,
    history_size: usize,
    window: usize,

    episode_count: usize,
    successes: usize,

    // Step tracking
    total_steps: usize,
    training_steps: usize,
    last_action: Option<&'static str>,
}

impl MetricsTracker {
    pub fn new(window: usize, history_size: usize) -> Self {
        let window = window.max(1);
        let history_size = history_size.max(window);
        MetricsTracker {
            metrics: TrainingMetrics::default(),
            history_size,
            window,
            episode_count: 0,
            successes: 0,
            total_steps: 0,
            training_steps: 0,
            last_action: None,
        }
    }

    /// Record a completed training step.
    pub fn record_training_step(&mut self, loss: f32, epsilon: f32) {
        push_bounded(&mut self.metrics.losses, loss, self.history_size);
        push_bounded(&mut self.metrics.epsilons, epsilon, self.history_size);
        self.training_steps += 1;
    }

    pub fn record_action(&mut self, label: &'static str) {
        self.last_action = Some(label);
    }

    /// Count one simulated transition.
    pub fn step(&mut self) {
        self.total_steps += 1;
    }

    /// Record a completed episode and return its stats.
    pub fn record_episode(&mut self, total_reward: f32, length: usize, finished: bool) -> EpisodeStats {
        push_bounded(&mut self.metrics.episode_rewards, total_reward, self.history_size);
        push_bounded(&mut self.metrics.episode_lengths, length, self.history_size);
        self.episode_count += 1;
        if finished {
            self.successes += 1;
        }

        EpisodeStats {
            episode: self.episode_count,
            total_reward,
            length,
            running_average: self.running_average().unwrap_or(total_reward),
            finished,
        }
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Completed episodes, also reported as attempts.
    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn successes(&self) -> usize {
        self.successes
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn training_steps(&self) -> usize {
        self.training_steps
    }

    pub fn last_action(&self) -> Option<&'static str> {
        self.last_action
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Moving average of episode rewards over the configured window.
    pub fn running_average(&self) -> Option<f32> {
        self.avg_episode_reward(self.window)
    }

    /// Get recent average episode reward
    pub fn avg_episode_reward(&self, window: usize) -> Option<f32> {
        mean_of_last(&self.metrics.episode_rewards, window)
    }

    pub fn save(&self, path: &std::path::Path) -> crate::error::Result<()> {
        let serialized = serde_json::to_string_pretty(&self.metrics)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new(10, 1000)
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, value: T, bound: usize) {
    if queue.len() >= bound {
        queue.pop_front();
    }
    queue.push_back(value);
}

fn mean_of_last(values: &VecDeque<f32>, window: usize) -> Option<f32> {
    if values.is_empty() || window == 0 {
        return None;
    }
    let n = window.min(values.len());
    let sum: f32 = values.iter().rev().take(n).sum();
    Some(sum / n as f32)
}
