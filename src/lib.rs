//! # gridrace - Grid Racing Simulation with an Online DQN Driver
//!
//! gridrace simulates top-down cars on a grid track and trains a Deep
//! Q-Network to drive them from shaped rewards. The simulation is
//! deterministic and tick-driven; the learning loop consumes its transitions
//! online.
//!
//! ## Key Features
//!
//! - **Track**: wall/road/start/finish grid with checkpoints, laps and a JSON file format
//! - **Physics**: speed, steering and position update per tick, pure and deterministic
//! - **Collision & progress**: wall and car-car contact, finish detection, ray sensors
//! - **DQN**: live and target networks, epsilon-greedy, replay buffer, Huber loss, Adam
//! - **Race**: multi-car ticks, ranking, winner, per-car transition routing into training
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gridrace::config::SimConfig;
//! use gridrace::session::TrainingSession;
//! use gridrace::track::{Track, DEFAULT_CELL_SIZE};
//!
//! let track = Track::from_ascii(&["#######", "#S...F#", "#######"], DEFAULT_CELL_SIZE).unwrap();
//! let mut session = TrainingSession::new(track, SimConfig::default(), 1, 300).unwrap();
//!
//! for summary in session.run(500) {
//!     println!("reward {:.2} in {} ticks", summary.total_reward(), summary.ticks);
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`track`] - Grid, cell kinds, editing operations and the track file format
//! - [`car`] - Car state, control inputs and the discrete action space
//! - [`physics`] - One-tick car kinematics
//! - [`collision`] - Wall/car contact, finish, checkpoints, sensors and progress
//! - [`encoder`] - Fixed-length state features for the Q-network
//! - [`reward`] - Shaped reward per transition
//! - [`network`], [`layers`], [`activations`], [`loss`], [`optimizer`] - The Q-network
//! - [`replay_buffer`] - Bounded experience replay
//! - [`agent`] - DQN agent with target network and epsilon schedule
//! - [`trainer`] - Online training loop around the agent
//! - [`persistence`] - Model stores
//! - [`metrics`] - Episode statistics and status snapshots
//! - [`race`] - Race orchestration
//! - [`session`] - Headless training episodes
//! - [`config`] - Tunable constants
//! - [`error`] - Error types and result handling

pub mod activations;
pub mod agent;
pub mod car;
pub mod collision;
pub mod config;
pub mod debug;
pub mod encoder;
pub mod error;
pub mod geometry;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod persistence;
pub mod physics;
pub mod race;
pub mod replay_buffer;
pub mod reward;
pub mod session;
pub mod track;
pub mod trainer;

#[cfg(test)]
mod tests;
