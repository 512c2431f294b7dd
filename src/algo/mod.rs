pub mod tabular;

pub use tabular::{QLearningAgent, SarsaAgent, TabularAgent, TabularAgentConfig};
