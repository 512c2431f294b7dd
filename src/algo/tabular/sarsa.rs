use crate::{agent::TdAgent, gridworld::Action};

use super::{Hashable, TabularAgent, TdTarget};

/// On-policy TD target: bootstraps from the value of the action the policy has
/// actually selected for the next step
pub struct Sarsa;

impl TdTarget for Sarsa {}

impl<S: Hashable> TabularAgent<S, Sarsa> {
    /// Apply the SARSA update for one transition
    ///
    /// Target: `reward + bonus + gamma * value[next_state][next_action]`, where
    /// `next_action` must be the action that will be executed on the following step.
    /// Select it first, pass it here, then carry it forward unchanged.
    ///
    /// **Returns** the intrinsic bonus that was applied
    pub fn update(
        &mut self,
        state: S,
        action: Action,
        env_reward: f32,
        next_state: S,
        next_action: Action,
    ) -> f32 {
        let bootstrap = self.next_values(next_state)[next_action as usize];
        self.td_update(state, action, env_reward, bootstrap)
    }
}

impl<S: Hashable> TdAgent<S> for TabularAgent<S, Sarsa> {
    fn select_action(&mut self, state: S) -> Action {
        TabularAgent::select_action(self, state)
    }

    // On-policy ordering: the next action is selected first, used as the bootstrap,
    // and returned so the caller executes exactly that action
    fn transition(&mut self, state: S, action: Action, reward: f32, next_state: S) -> (Action, f32) {
        let next_action = TabularAgent::select_action(self, next_state);
        let bonus = self.update(state, action, reward, next_state, next_action);
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
