//! # Activation Functions
//!
//! The Q-network uses ReLU on hidden layers and a linear output layer, since
//! action values are unbounded.

pub mod functions;

pub use functions::Activation;
