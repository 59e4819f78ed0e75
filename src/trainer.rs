//! # Training Loop
//!
//! [`Trainer`] wraps a [`DqnAgent`] with everything an online DQN needs around
//! the gradient step: the replay buffer, the prior state of every
//! agent-controlled car, reward shaping, replay throttling, the
//! training-in-progress guard, episode bookkeeping and model persistence.
//!
//! One trainer is shared by all agent cars of a race. Prior states are keyed
//! by car id, so transitions from different cars never mix.
//!
//! Nothing here fails past its boundary: gradient, numerical and persistence
//! errors are logged and the previous weights stay in place.

use ndarray::Array1;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::agent::DqnAgent;
use crate::car::{Action, CarId, NUM_ACTIONS};
use crate::config::{RewardConfig, SimConfig, TrainerConfig};
use crate::encoder::{Observation, StateEncoder};
use crate::error::{RaceError, Result};
use crate::metrics::{EpisodeStats, MetricsTracker, StatusReport};
use crate::persistence::ModelStore;
use crate::replay_buffer::{Experience, ReplayBuffer};
use crate::reward;

/// Where the trainer is in the select/observe/train cycle, derived from its
/// state. Action selection is a single synchronous call, so it never shows
/// up as a phase of its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrainerPhase {
    /// No car is waiting for an outcome.
    Idle,
    /// At least one car has an action whose outcome is not yet observed.
    Observing,
    /// The training flag is held.
    Training,
}

/// Holds the training flag for its lifetime and clears it on drop, including
/// on early return and unwinding.
#[derive(Debug)]
pub struct TrainingGuard {
    flag: Arc<AtomicBool>,
}

impl TrainingGuard {
    /// `None` when another holder already has the flag.
    pub fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TrainingGuard {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for TrainingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Clone, Debug)]
struct PendingStep {
    state: Array1<f32>,
    action: Action,
    observation: Observation,
}

#[derive(Clone, Copy, Debug, Default)]
struct EpisodeProgress {
    reward: f32,
    steps: usize,
}

/// Result of recording one transition.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub reward: f32,
    pub done: bool,
    /// Set when the transition ended the car's episode.
    pub episode: Option<EpisodeStats>,
}

pub struct Trainer {
    agent: DqnAgent,
    buffer: ReplayBuffer,
    reward: RewardConfig,
    batch_size: usize,
    replay_every: usize,
    replay_calls: usize,
    model_id: String,
    store: Option<Box<dyn ModelStore>>,
    pending: HashMap<CarId, PendingStep>,
    episodes: HashMap<CarId, EpisodeProgress>,
    is_training: Arc<AtomicBool>,
    metrics: MetricsTracker,
}

impl Trainer {
    pub fn new(config: &TrainerConfig, reward: RewardConfig, state_size: usize) -> Result<Self> {
        if config.batch_size == 0 || config.replay_every == 0 {
            return Err(RaceError::invalid_parameter(
                "batch_size/replay_every",
                "must be greater than 0",
            ));
        }
        let agent = DqnAgent::from_config(config, state_size, NUM_ACTIONS)?;
        Ok(Trainer {
            agent,
            buffer: ReplayBuffer::new(config.replay_capacity),
            reward,
            batch_size: config.batch_size,
            replay_every: config.replay_every,
            replay_calls: 0,
            model_id: config.model_id.clone(),
            store: None,
            pending: HashMap::new(),
            episodes: HashMap::new(),
            is_training: Arc::new(AtomicBool::new(false)),
            metrics: MetricsTracker::new(config.metrics_window, 1000),
        })
    }

    /// Trainer sized for the encoder of `config`'s sensors.
    pub fn for_sim(config: &SimConfig) -> Result<Self> {
        Self::new(
            &config.trainer,
            config.reward.clone(),
            StateEncoder::state_size_for(&config.sensors),
        )
    }

    /// Attach a model store and load any saved weights from it.
    ///
    /// A missing, unreadable or incompatible model leaves the fresh weights.
    pub fn with_store(mut self, store: Box<dyn ModelStore>) -> Self {
        match store.load(&self.model_id) {
            Ok(Some(network)) => match self.agent.load_weights(network) {
                Ok(()) => info!(model = %self.model_id, "loaded saved model"),
                Err(e) => warn!(model = %self.model_id, error = %e, "saved model rejected, using fresh weights"),
            },
            Ok(None) => info!(model = %self.model_id, "no saved model, using fresh weights"),
            Err(e) => warn!(model = %self.model_id, error = %e, "failed to load model, using fresh weights"),
        }
        self.store = Some(store);
        self
    }

    pub fn agent(&self) -> &DqnAgent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut DqnAgent {
        &mut self.agent
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    pub fn metrics(&self) -> &MetricsTracker {
        &self.metrics
    }

    pub fn phase(&self) -> TrainerPhase {
        if self.is_training() {
            TrainerPhase::Training
        } else if !self.pending.is_empty() {
            TrainerPhase::Observing
        } else {
            TrainerPhase::Idle
        }
    }

    pub fn epsilon(&self) -> f32 {
        self.agent.epsilon
    }

    pub fn reward_config(&self) -> &RewardConfig {
        &self.reward
    }

    /// Shared training flag, for callers that run gradient steps elsewhere.
    pub fn training_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.is_training)
    }

    pub fn is_training(&self) -> bool {
        self.is_training.load(Ordering::Acquire)
    }

    /// Whether `car` has a state waiting for its next observation.
    pub fn has_pending(&self, car: CarId) -> bool {
        self.pending.contains_key(&car)
    }

    /// Reward accumulated so far by the in-progress episodes.
    pub fn current_reward(&self) -> f32 {
        self.episodes.values().map(|p| p.reward).sum()
    }

    /// Choose an epsilon-greedy action for `car` and remember the state it
    /// was chosen in.
    pub fn select_action(&mut self, car: CarId, state: Array1<f32>, observation: Observation) -> Action {
        let action = match self.agent.act(state.view()).and_then(Action::from_index) {
            Ok(action) => action,
            Err(e) => {
                warn!(car, error = %e, "action selection failed, coasting");
                Action::NoAction
            }
        };
        self.metrics.record_action(action.label());
        self.pending.insert(
            car,
            PendingStep {
                state,
                action,
                observation,
            },
        );
        action
    }

    /// Record the transition from `car`'s pending state to `next_state`.
    ///
    /// Returns `None` when the car has no pending state (first tick of an
    /// episode, or after a reset). A crash or finish closes the episode.
    pub fn observe(&mut self, car: CarId, next_state: Array1<f32>, after: Observation) -> Option<Transition> {
        let pending = self.pending.remove(&car)?;

        let reward = reward::shape(&pending.observation, &after, &self.reward);
        let done = after.crashed || after.finished;
        self.buffer.push(Experience {
            state: pending.state,
            action: pending.action.index(),
            reward,
            next_state,
            done,
        });
        self.metrics.step();

        let progress = self.episodes.entry(car).or_default();
        progress.reward += reward;
        progress.steps += 1;

        let episode = if done {
            Some(self.close_episode(car, after.finished))
        } else {
            None
        };

        Some(Transition {
            reward,
            done,
            episode,
        })
    }

    /// End `car`'s episode without a terminal transition, e.g. on a step cap.
    pub fn truncate_episode(&mut self, car: CarId) -> Option<EpisodeStats> {
        self.pending.remove(&car);
        if self.episodes.get(&car).map_or(true, |p| p.steps == 0) {
            self.episodes.remove(&car);
            return None;
        }
        Some(self.close_episode(car, false))
    }

    /// Forget every prior state and in-progress episode counter.
    pub fn reset_episodes(&mut self) {
        self.pending.clear();
        self.episodes.clear();
    }

    /// Throttled gradient step, run on every `replay_every`-th call.
    ///
    /// Returns the loss of a committed step. Skips (returning `None`) when
    /// the throttle is closed, when fewer than `batch_size` experiences are
    /// stored, when another step holds the training flag, or when the step
    /// failed.
    pub fn replay(&mut self) -> Option<f32> {
        self.replay_calls += 1;
        if self.replay_calls % self.replay_every != 0 {
            return None;
        }
        if self.buffer.len() < self.batch_size {
            return None;
        }
        match self.train_step() {
            Ok(loss) => Some(loss),
            Err(RaceError::TrainingInProgress) => {
                debug!("training step already running, dropping replay");
                None
            }
            Err(e) => {
                warn!(error = %e, "training step failed, keeping previous weights");
                None
            }
        }
    }

    /// One unthrottled gradient step on a sampled batch.
    pub fn train_step(&mut self) -> Result<f32> {
        if self.buffer.len() < self.batch_size {
            return Err(RaceError::EmptyBuffer(format!(
                "{} experiences stored, batch needs {}",
                self.buffer.len(),
                self.batch_size
            )));
        }
        let _guard = TrainingGuard::acquire(&self.is_training).ok_or(RaceError::TrainingInProgress)?;

        let batch = self.buffer.sample(self.batch_size, self.agent.rng_mut());
        let loss = self.agent.train_on_batch(&batch)?;
        self.metrics.record_training_step(loss, self.agent.epsilon);
        debug!(loss, epsilon = self.agent.epsilon, steps = self.agent.train_steps, "training step");
        Ok(loss)
    }

    /// Persist the live network. Errors are logged and reported as `false`.
    pub fn save_model(&self) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        match store.save(&self.model_id, &self.agent.q_network) {
            Ok(()) => {
                info!(model = %self.model_id, "model saved");
                true
            }
            Err(e) => {
                warn!(model = %self.model_id, error = %e, "failed to save model");
                false
            }
        }
    }

    pub fn status(&self, elapsed: std::time::Duration) -> StatusReport {
        StatusReport {
            episode: self.metrics.episode_count() + 1,
            reward: self.current_reward(),
            attempts: self.metrics.episode_count(),
            successes: self.metrics.successes(),
            elapsed,
            epsilon: self.agent.epsilon,
            last_action: self.metrics.last_action(),
        }
    }

    fn close_episode(&mut self, car: CarId, finished: bool) -> EpisodeStats {
        let progress = self.episodes.remove(&car).unwrap_or_default();
        let stats = self.metrics.record_episode(progress.reward, progress.steps, finished);
        info!(
            car,
            episode = stats.episode,
            reward = stats.total_reward,
            steps = stats.length,
            average = stats.running_average,
            finished,
            "episode ended"
        );
        if finished {
            self.save_model();
        }
        stats
    }
}
