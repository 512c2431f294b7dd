/// Agent traits driven by the training loop
pub mod agent;

/// Implemented RL algorithms
pub mod algo;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Environment traits and reporting
pub mod env;

/// Crate error types
pub mod error;

/// Exploration policies
pub mod exploration;

/// The grid world MDP simulator
pub mod gridworld;

/// Episode training loop
pub mod train;

mod util;

pub use error::{Error, Result};
