use std::collections::{hash_map::Entry, HashMap};
use std::ops::Index;

/// Represents a Markov decision process, defining the dynamics of an environment
/// in which an agent can operate.
///
/// This base trait represents the common case of a discrete-time MDP with one agent
/// and a finite state space and action space.
pub trait Environment {
    /// A representation of the state of the environment to be passed to an agent
    type State;

    /// A representation of an action that an agent can take to affect the environment
    type Action;

    /// Determine if the state is active or terminal
    fn is_active(&self) -> bool;

    /// Update the environment in response to an action taken by an agent, producing a new
    /// state and associated reward
    ///
    /// Once the environment is terminal, `step` is an idempotent no-op: it returns the
    /// current state and a reward of zero without mutating anything.
    ///
    /// **Returns** `(next_state, reward)`
    fn step(&mut self, action: Self::Action) -> (Self::State, f32);

    /// Reset the environment to an initial state
    ///
    /// **Returns** the state
    fn reset(&mut self) -> Self::State;
}

/// An [`Environment`] with a finite, enumerable action set
pub trait DiscreteActionSpace: Environment {
    /// Get the available actions
    ///
    /// The returned vec should never be empty, instead specify an action that represents
    /// doing nothing if necessary.
    fn actions(&self) -> Vec<Self::Action>;
}

/// An accumulator of named scalar metrics, exposed by environments for display and
/// plotting consumers
///
/// Metrics grow monotonically across steps and episodes; a consumer that wants
/// per-episode figures drains the report with [`take`](Report::take) at episode
/// boundaries.
#[derive(Debug, Clone)]
pub struct Report {
    keys: Vec<&'static str>,
    data: HashMap<&'static str, f64>,
}

impl Report {
    /// Initialize a report with the given metric keys, all starting at zero
    pub fn new(keys: Vec<&'static str>) -> Self {
        let data = keys.iter().map(|&k| (k, 0.0)).collect();
        Self { keys, data }
    }

    /// The metric keys in declaration order
    pub fn keys(&self) -> Vec<&'static str> {
        self.keys.clone()
    }

    pub fn get(&self, key: &str) -> Option<&f64> {
        self.data.get(key)
    }

    pub fn entry(&mut self, key: &'static str) -> Entry<'_, &'static str, f64> {
        self.data.entry(key)
    }

    /// Take the accumulated values, resetting all metrics to zero
    pub fn take(&mut self) -> HashMap<&'static str, f64> {
        let fresh = self.keys.iter().map(|&k| (k, 0.0)).collect();
        std::mem::replace(&mut self.data, fresh)
    }

    /// The accumulated values in key declaration order
    pub fn values(&self) -> Vec<f64> {
        self.keys.iter().map(|k| self.data[k]).collect()
    }
}

impl Index<&str> for Report {
    type Output = f64;

    fn index(&self, key: &str) -> &f64 {
        &self.data[key]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_accumulates_and_resets() {
        let mut report = Report::new(vec!["reward", "steps"]);
        report.entry("reward").and_modify(|x| *x += 2.5);
        report.entry("steps").and_modify(|x| *x += 1.0);
        assert_eq!(report["reward"], 2.5);
        assert_eq!(report.values(), vec![2.5, 1.0]);

        let taken = report.take();
        assert_eq!(*taken.get("steps").unwrap(), 1.0);
        assert_eq!(report["reward"], 0.0, "take resets metrics");
    }
}
