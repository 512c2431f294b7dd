use crate::gridworld::Action;

/// The surface a temporal-difference learner exposes to the training loop
///
/// `transition` performs the strategy-specific value update for one experienced
/// transition and hands back the action to execute on the following step. Each
/// implementation owns the relative ordering of next-action selection and the update:
/// an on-policy learner must select the next action *before* updating, because its
/// target bootstraps from the action that will actually be taken, while an off-policy
/// learner selects only after its update. The caller must execute exactly the action
/// returned; reselecting independently would break the on-policy contract.
pub trait TdAgent<S> {
    /// Select an action for `state` under the current exploration schedule
    fn select_action(&mut self, state: S) -> Action;

    /// Apply the learning update for one transition
    ///
    /// **Returns** `(next_action, intrinsic_bonus)`: the action to execute next and the
    /// exploration bonus that was folded into the update, for diagnostic accumulation
    fn transition(&mut self, state: S, action: Action, reward: f32, next_state: S)
        -> (Action, f32);

    /// Close out the current episode: advance the episode counter and clear
    /// per-episode bookkeeping
    fn new_episode(&mut self);

    /// The number of completed episodes
    fn episode(&self) -> u32;

    /// The exploration rate in effect for the current episode
    fn epsilon(&self) -> f32;
}
