//! # Reinforcement Learning Agent
//!
//! The Q-function approximator for the racing core: a small feed-forward
//! network mapping an encoded car state to one value per discrete
//! [`Action`](crate::car::Action).
//!
//! ## Core Concepts
//!
//! - **Live network**: chooses actions and receives gradient steps
//! - **Target network**: a lagged copy used for next-state values in the
//!   Bellman backup, synced by full copy every `target_update_freq` steps
//! - **Epsilon-greedy**: explore uniformly with probability epsilon; epsilon
//!   decays once per completed training step, never per tick
//!
//! Transition bookkeeping, replay throttling and persistence are the
//! [`Trainer`](crate::trainer::Trainer)'s job; the agent only selects actions
//! and performs gradient steps.

mod dqn;

pub use dqn::{argmax, DqnAgent, DqnAgentBuilder, EpsilonSchedule};
