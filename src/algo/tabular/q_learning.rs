use crate::{agent::TdAgent, gridworld::Action};

use super::{Hashable, TabularAgent, TdTarget};

/// Off-policy TD target: bootstraps from the best action available in the next state,
/// regardless of which action the policy will actually take
pub struct QLearning;

impl TdTarget for QLearning {}

impl<S: Hashable> TabularAgent<S, QLearning> {
    /// Apply the Q-learning update for one transition
    ///
    /// Target: `reward + bonus + gamma * max_a value[next_state][a]`.
    ///
    /// **Returns** the intrinsic bonus that was applied
    pub fn update(&mut self, state: S, action: Action, env_reward: f32, next_state: S) -> f32 {
        let next = self.next_values(next_state);
        let bootstrap = next.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        self.td_update(state, action, env_reward, bootstrap)
    }
}

impl<S: Hashable> TdAgent<S> for TabularAgent<S, QLearning> {
    fn select_action(&mut self, state: S) -> Action {
        TabularAgent::select_action(self, state)
    }

    // The target does not depend on the next action, so selection happens after the
    // update and sees the freshly written value
    fn transition(&mut self, state: S, action: Action, reward: f32, next_state: S) -> (Action, f32) {
        let bonus = self.update(state, action, reward, next_state);
        let next_action = TabularAgent::select_action(self, next_state);
        (next_action, bonus)
    }

    fn new_episode(&mut self) {
        TabularAgent::new_episode(self)
    }

    fn episode(&self) -> u32 {
        TabularAgent::episode(self)
    }

    fn epsilon(&self) -> f32 {
        TabularAgent::epsilon(self)
    }
}
