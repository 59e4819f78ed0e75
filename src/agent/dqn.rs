use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::activations::Activation;
use crate::config::TrainerConfig;
use crate::error::{RaceError, Result};
use crate::loss::LossKind;
use crate::network::NeuralNetwork;
use crate::optimizer::{GradientClipper, OptimizerKind};
use crate::replay_buffer::Experience;

/// Multiplicative epsilon decay with a floor, counted in training steps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpsilonSchedule {
    pub start: f32,
    pub min: f32,
    pub decay: f32,
}

impl EpsilonSchedule {
    /// `max(min, start * decay^steps)`.
    pub fn at(&self, steps: usize) -> f32 {
        let steps = steps.min(i32::MAX as usize) as i32;
        (self.start * self.decay.powi(steps)).max(self.min)
    }
}

impl Default for EpsilonSchedule {
    fn default() -> Self {
        EpsilonSchedule {
            start: 1.0,
            min: 0.01,
            decay: 0.995,
        }
    }
}

/// Deep Q-Network agent with a live network and a lagged target network.
///
/// The live network picks actions and is regressed towards Bellman targets;
/// the target network only estimates next-state values and is replaced by a
/// full copy of the live network every `target_update_freq` training steps.
///
/// # Example
///
/// ```rust
/// use gridrace::agent::DqnAgentBuilder;
/// use gridrace::replay_buffer::Experience;
/// use ndarray::array;
///
/// let mut agent = DqnAgentBuilder::new()
///     .layer_sizes(&[2, 8, 5])
///     .seed(7)
///     .build()
///     .unwrap();
///
/// let experience = Experience {
///     state: array![0.1, 0.2],
///     action: 0,
///     reward: 1.0,
///     next_state: array![0.2, 0.2],
///     done: false,
/// };
/// let loss = agent.train_on_batch(&[&experience]).unwrap();
/// assert!(loss.is_finite());
/// assert_eq!(agent.train_steps, 1);
/// ```
#[derive(Clone, Debug)]
pub struct DqnAgent {
    /// Live network, used for action selection and updated by gradient steps
    pub q_network: NeuralNetwork,

    /// Target network for next-state value estimates
    pub target_network: NeuralNetwork,

    /// Current exploration rate
    pub epsilon: f32,

    pub schedule: EpsilonSchedule,

    pub target_update_freq: usize,

    pub gamma: f32,

    pub learning_rate: f32,

    /// Completed (committed) training steps
    pub train_steps: usize,

    rng: StdRng,
}

impl DqnAgent {
    /// Agent for `state_size` inputs and `action_size` outputs with the
    /// hidden layers and hyperparameters of `config`.
    pub fn from_config(config: &TrainerConfig, state_size: usize, action_size: usize) -> Result<Self> {
        let mut sizes = vec![state_size];
        sizes.extend_from_slice(&config.hidden_layers);
        sizes.push(action_size);

        let mut builder = DqnAgentBuilder::new()
            .layer_sizes(&sizes)
            .schedule(EpsilonSchedule {
                start: config.epsilon_start,
                min: config.epsilon_min,
                decay: config.epsilon_decay,
            })
            .target_update_freq(config.target_update_freq)
            .gamma(config.gamma)
            .learning_rate(config.learning_rate)
            .optimizer(config.optimizer)
            .loss(config.loss)
            .dropout(config.dropout)
            .gradient_clip(config.gradient_clip);
        if let Some(seed) = config.seed {
            builder = builder.seed(seed);
        }
        builder.build()
    }

    pub fn num_actions(&self) -> usize {
        self.q_network.output_size()
    }

    pub fn state_size(&self) -> usize {
        self.q_network.input_size()
    }

    pub fn q_values(&self, state: ArrayView1<f32>) -> Result<Array1<f32>> {
        self.q_network.predict(state)
    }

    /// Action with the highest live Q-value.
    pub fn greedy_action(&self, state: ArrayView1<f32>) -> Result<usize> {
        let q_values = self.q_values(state)?;
        argmax(q_values.view())
            .ok_or_else(|| RaceError::Numerical("no finite Q-values".to_string()))
    }

    /// Select an action using the epsilon-greedy policy.
    pub fn act(&mut self, state: ArrayView1<f32>) -> Result<usize> {
        if self.rng.gen::<f32>() < self.epsilon {
            Ok(self.rng.gen_range(0..self.num_actions()))
        } else {
            self.greedy_action(state)
        }
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Copy the live weights into the target network.
    pub fn update_target_network(&mut self) {
        match self.target_network.copy_weights_from(&self.q_network) {
            Ok(()) => debug!(train_steps = self.train_steps, "target network synced"),
            Err(e) => warn!(error = %e, "target network sync failed"),
        }
    }

    /// Install externally loaded weights into both networks.
    pub fn load_weights(&mut self, network: NeuralNetwork) -> Result<()> {
        if network.layer_sizes() != self.q_network.layer_sizes() {
            return Err(RaceError::dimension_mismatch(
                format!("{:?}", self.q_network.layer_sizes()),
                format!("{:?}", network.layer_sizes()),
            ));
        }
        if !network.is_finite() {
            return Err(RaceError::Numerical("loaded weights contain NaN or Inf".to_string()));
        }
        self.q_network = network;
        self.update_target_network();
        Ok(())
    }

    /// One DQN gradient step on a batch of experiences.
    ///
    /// Targets equal the live predictions except at the taken action, which
    /// becomes `reward` for terminal transitions and
    /// `reward + gamma * max_a Q_target(next_state, a)` otherwise. The step is
    /// computed on a copy of the live network and only committed if the loss
    /// and the new weights are finite; on error neither network changes.
    ///
    /// Returns the loss before the update.
    pub fn train_on_batch(&mut self, experiences: &[&Experience]) -> Result<f32> {
        if experiences.is_empty() {
            return Err(RaceError::EmptyBuffer("No experiences to train on".to_string()));
        }

        let batch_size = experiences.len();
        let state_size = self.state_size();
        let num_actions = self.num_actions();

        let mut states = Array2::zeros((batch_size, state_size));
        let mut next_states = Array2::zeros((batch_size, state_size));
        for (i, exp) in experiences.iter().enumerate() {
            if exp.state.len() != state_size || exp.next_state.len() != state_size {
                return Err(RaceError::dimension_mismatch(
                    format!("state size {}", state_size),
                    format!("state size {}/{}", exp.state.len(), exp.next_state.len()),
                ));
            }
            if exp.action >= num_actions {
                return Err(RaceError::InvalidAction {
                    action: exp.action,
                    max_actions: num_actions,
                });
            }
            states.row_mut(i).assign(&exp.state);
            next_states.row_mut(i).assign(&exp.next_state);
        }

        let current_q_values = self.q_network.predict_batch(states.view())?;
        let next_q_values = self.target_network.predict_batch(next_states.view())?;

        let mut target_q_values = current_q_values;
        for (i, exp) in experiences.iter().enumerate() {
            target_q_values[[i, exp.action]] = if exp.done {
                exp.reward
            } else {
                let max_next_q = next_q_values
                    .row(i)
                    .iter()
                    .fold(f32::NEG_INFINITY, |max, &val| max.max(val));
                exp.reward + self.gamma * max_next_q
            };
        }

        let mut candidate = self.q_network.clone();
        let loss = candidate.train_minibatch(
            states.view(),
            target_q_values.view(),
            self.learning_rate,
            &mut self.rng,
        )?;
        if !candidate.is_finite() {
            let issues = candidate.numerical_issues();
            warn!(?issues, "discarding gradient step with non-finite weights");
            return Err(RaceError::Numerical(format!(
                "gradient step produced non-finite weights: {:?}",
                issues
            )));
        }

        self.q_network = candidate;
        self.train_steps += 1;
        self.epsilon = self.schedule.at(self.train_steps);
        if self.train_steps % self.target_update_freq == 0 {
            self.update_target_network();
        }

        Ok(loss)
    }
}

/// Index of the largest finite value, first one on ties.
pub fn argmax(values: ArrayView1<f32>) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, best_v)) if best_v >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Builder pattern for DqnAgent
pub struct DqnAgentBuilder {
    layer_sizes: Vec<usize>,
    schedule: EpsilonSchedule,
    optimizer: OptimizerKind,
    loss: LossKind,
    target_update_freq: usize,
    gamma: f32,
    learning_rate: f32,
    dropout: f32,
    gradient_clip: Option<f32>,
    seed: Option<u64>,
}

impl DqnAgentBuilder {
    pub fn new() -> Self {
        DqnAgentBuilder {
            layer_sizes: vec![],
            schedule: EpsilonSchedule::default(),
            optimizer: OptimizerKind::Adam,
            loss: LossKind::default(),
            target_update_freq: 100,
            gamma: 0.95,
            learning_rate: 1e-3,
            dropout: 0.0,
            gradient_clip: None,
            seed: None,
        }
    }

    pub fn layer_sizes(mut self, sizes: &[usize]) -> Self {
        self.layer_sizes = sizes.to_vec();
        self
    }

    /// Fixed exploration rate: no decay.
    pub fn epsilon(mut self, epsilon: f32) -> Self {
        self.schedule = EpsilonSchedule {
            start: epsilon,
            min: epsilon,
            decay: 1.0,
        };
        self
    }

    pub fn schedule(mut self, schedule: EpsilonSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn optimizer(mut self, optimizer: OptimizerKind) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn loss(mut self, loss: LossKind) -> Self {
        self.loss = loss;
        self
    }

    pub fn target_update_freq(mut self, freq: usize) -> Self {
        self.target_update_freq = freq;
        self
    }

    pub fn gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn dropout(mut self, rate: f32) -> Self {
        self.dropout = rate;
        self
    }

    pub fn gradient_clip(mut self, max_norm: Option<f32>) -> Self {
        self.gradient_clip = max_norm;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<DqnAgent> {
        if self.layer_sizes.len() < 2 {
            return Err(RaceError::InvalidParameter {
                name: "layer_sizes".to_string(),
                reason: "Must have at least 2 layers".to_string(),
            });
        }
        if self.target_update_freq == 0 {
            return Err(RaceError::InvalidParameter {
                name: "target_update_freq".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        // ReLU on hidden layers, linear output
        let mut activations = vec![Activation::Relu; self.layer_sizes.len() - 2];
        activations.push(Activation::Linear);

        let q_network = NeuralNetwork::new(&self.layer_sizes, &activations, self.optimizer, &mut rng)?
            .with_loss(self.loss)
            .with_dropout(self.dropout)
            .with_clipper(GradientClipper::from_max_norm(self.gradient_clip));
        let target_network = q_network.clone();

        Ok(DqnAgent {
            q_network,
            target_network,
            epsilon: self.schedule.at(0),
            schedule: self.schedule,
            target_update_freq: self.target_update_freq,
            gamma: self.gamma,
            learning_rate: self.learning_rate,
            train_steps: 0,
            rng,
        })
    }
}

impl Default for DqnAgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
