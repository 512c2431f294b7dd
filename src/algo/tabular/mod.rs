use std::{collections::HashMap, fs, hash::Hash, marker::PhantomData, path::Path};

use rand::{rngs::StdRng, SeedableRng};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    assert_interval, decay,
    error::{Error, Result},
    exploration::EpsilonGreedy,
    gridworld::Action,
};

pub mod q_learning;
pub mod sarsa;

pub use q_learning::QLearning;
pub use sarsa::Sarsa;

/// A trait for state types that can be used as keys in the value table
pub trait Hashable: Copy + Eq + Hash {}

impl<T> Hashable for T where T: Copy + Eq + Hash {}

/// Fixed-length vector of action values, one slot per action
///
/// Once a state key exists in the table its vector never changes length, and keys are
/// never removed, so table growth is proportional to the number of distinct states
/// visited during training.
pub type ActionValues = [f32; Action::COUNT];

/// Marker trait for TD target-computation strategies
///
/// The strategies share the whole agent scaffold; they differ only in how the
/// bootstrapped part of the update target is computed, which each strategy's typed
/// `update` method supplies.
pub trait TdTarget {}

/// Configuration for a [`TabularAgent`]
pub struct TabularAgentConfig {
    pub exploration: EpsilonGreedy<decay::Linear>,
    /// Learning rate, in `[0,1]`
    pub alpha: f32,
    /// Discount factor, in `[0,1]`
    pub gamma: f32,
    /// Count-based exploration bonus coefficient; `None` disables the bonus
    pub intrinsic_beta: Option<f32>,
    /// Seed for the agent's random source; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for TabularAgentConfig {
    fn default() -> Self {
        Self {
            exploration: EpsilonGreedy::new(decay::Linear::new(1.0, 0.05, 85.0)),
            alpha: 0.2,
            gamma: 0.95,
            intrinsic_beta: None,
            seed: None,
        }
    }
}

/// A tabular temporal-difference agent over a lazily grown value table
///
/// Generic over the state key `S` and the target strategy `T` ([`QLearning`] or
/// [`Sarsa`]); everything except the target computation is shared. Visit counts are
/// tracked per episode (driving the optional intrinsic bonus) and cumulatively
/// (diagnostics only).
pub struct TabularAgent<S: Hashable, T: TdTarget> {
    table: HashMap<S, ActionValues>,
    exploration: EpsilonGreedy<decay::Linear>,
    alpha: f32,
    gamma: f32,
    episode: u32,
    step_count: u32,
    intrinsic_beta: Option<f32>,
    episode_visits: HashMap<S, u32>,
    total_visits: HashMap<S, u64>,
    rng: StdRng,
    strategy: PhantomData<T>,
}

impl<S: Hashable, T: TdTarget> TabularAgent<S, T> {
    /// Initialize an agent from a config
    ///
    /// **Panics** if `alpha` or `gamma` is not in the interval `[0,1]`
    pub fn new(config: TabularAgentConfig) -> Self {
        assert_interval!(config.alpha, 0.0, 1.0);
        assert_interval!(config.gamma, 0.0, 1.0);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            table: HashMap::new(),
            exploration: config.exploration,
            alpha: config.alpha,
            gamma: config.gamma,
            episode: 0,
            step_count: 0,
            intrinsic_beta: config.intrinsic_beta,
            episode_visits: HashMap::new(),
            total_visits: HashMap::new(),
            rng,
            strategy: PhantomData,
        }
    }

    /// Epsilon-greedy action selection over the state's value vector
    ///
    /// Lazily initializes the state's vector to zeros on first reference.
    pub fn select_action(&mut self, state: S) -> Action {
        let values = *self.table.entry(state).or_default();
        let index = self
            .exploration
            .select(&mut self.rng, self.episode, &values);
        Action::from_repr(index).expect("selected index is within the action set")
    }

    /// The exploration rate in effect for the current episode
    pub fn epsilon(&self) -> f32 {
        self.exploration.epsilon(self.episode)
    }

    /// The number of completed episodes
    pub fn episode(&self) -> u32 {
        self.episode
    }

    /// Steps taken in the current episode
    pub fn steps(&self) -> u32 {
        self.step_count
    }

    /// Read-only view of the value table
    pub fn table(&self) -> &HashMap<S, ActionValues> {
        &self.table
    }

    /// The value vector for a state, if the state has been seen
    pub fn values(&self, state: S) -> Option<&ActionValues> {
        self.table.get(&state)
    }

    /// Overwrite the value vector for a state (priming a policy by hand)
    pub fn set_values(&mut self, state: S, values: ActionValues) {
        self.table.insert(state, values);
    }

    /// Cumulative visit counts across all episodes, for diagnostics
    pub fn total_visits(&self) -> &HashMap<S, u64> {
        &self.total_visits
    }

    /// Advance the episode counter and clear per-episode bookkeeping
    ///
    /// The value table and cumulative visit counts are untouched.
    pub fn new_episode(&mut self) {
        self.episode += 1;
        self.step_count = 0;
        self.episode_visits.clear();
    }

    /// The count-based exploration bonus for visiting `state`
    ///
    /// The per-episode visit count is incremented *before* the bonus is computed, so
    /// the denominator is always at least one. The bonus is `beta / sqrt(n)` with `n`
    /// the number of visits to the state within the current episode.
    fn intrinsic_bonus(&mut self, state: S) -> f32 {
        let Some(beta) = self.intrinsic_beta else {
            return 0.0;
        };
        let n = *self
            .episode_visits
            .entry(state)
            .and_modify(|n| *n += 1)
            .or_insert(1);
        *self.total_visits.entry(state).or_insert(0) += 1;
        beta / (n as f32).sqrt()
    }

    /// Shared TD update scaffold
    ///
    /// Adds the intrinsic bonus to the environment reward, forms the target from the
    /// strategy-supplied bootstrap, and nudges the (state, action) entry by
    /// `alpha * (target - old)`.
    ///
    /// **Returns** the intrinsic bonus that was applied
    fn td_update(&mut self, state: S, action: Action, env_reward: f32, bootstrap: f32) -> f32 {
        let bonus = self.intrinsic_bonus(state);
        let target = env_reward + bonus + self.gamma * bootstrap;
        let values = self.table.entry(state).or_default();
        let q = &mut values[action as usize];
        *q += self.alpha * (target - *q);
        self.step_count += 1;
        bonus
    }

    /// The bootstrap source: the next state's value vector, zero-initialized if new
    fn next_values(&mut self, next_state: S) -> ActionValues {
        *self.table.entry(next_state).or_default()
    }
}

/// Serialized form of an agent's learned state
///
/// An opaque bincode record with no version field. `table` and `episode` are
/// mandatory; the intrinsic-reward fields are optional so snapshots from builds
/// without the bonus still load.
#[derive(Deserialize)]
struct Snapshot<S: Hashable> {
    table: HashMap<S, ActionValues>,
    episode: u32,
    intrinsic_beta: Option<f32>,
    total_visits: Option<HashMap<S, u64>>,
}

/// The mandatory core of [`Snapshot`], accepted as a fallback on load
#[derive(Deserialize)]
struct CoreSnapshot<S: Hashable> {
    table: HashMap<S, ActionValues>,
    episode: u32,
}

/// Borrowed mirror of [`Snapshot`] for encoding without cloning the table
#[derive(Serialize)]
struct SnapshotRef<'a, S: Hashable> {
    table: &'a HashMap<S, ActionValues>,
    episode: u32,
    intrinsic_beta: Option<f32>,
    total_visits: Option<&'a HashMap<S, u64>>,
}

impl<S: Hashable, T: TdTarget> TabularAgent<S, T> {
    /// Persist the value table, episode counter, and intrinsic-reward state
    ///
    /// The payload is written to a temporary sibling file and renamed into place, so a
    /// concurrent reader never observes a partial snapshot and a failed write leaves
    /// any previous snapshot intact. The in-memory table is unaffected either way.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()>
    where
        S: Serialize,
    {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let payload = bincode::serialize(&SnapshotRef {
            table: &self.table,
            episode: self.episode,
            intrinsic_beta: self.intrinsic_beta,
            total_visits: Some(&self.total_visits),
        })
        .map_err(Error::Encode)?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Replace the agent's learned state from a snapshot
    ///
    /// The value table and episode counter are mandatory; a payload carrying only
    /// those two fields (an older snapshot) loads with defaults substituted for the
    /// optional intrinsic-reward fields. On any decode failure the agent is left
    /// completely untouched.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()>
    where
        S: DeserializeOwned,
    {
        let bytes = fs::read(path)?;
        let (table, episode, beta, total_visits) =
            match bincode::deserialize::<Snapshot<S>>(&bytes) {
                Ok(snapshot) => (
                    snapshot.table,
                    snapshot.episode,
                    snapshot.intrinsic_beta,
                    snapshot.total_visits.unwrap_or_default(),
                ),
                Err(_) => {
                    let core = bincode::deserialize::<CoreSnapshot<S>>(&bytes)
                        .map_err(Error::MalformedSnapshot)?;
                    (core.table, core.episode, None, HashMap::new())
                }
            };

        self.table = table;
        self.episode = episode;
        self.total_visits = total_visits;
        // A snapshot without a bonus coefficient keeps the configured one
        if beta.is_some() {
            self.intrinsic_beta = beta;
        }
        self.episode_visits.clear();
        self.step_count = 0;
        Ok(())
    }
}

/// A Q-learning agent over a grid-world style state key
pub type QLearningAgent<S> = TabularAgent<S, QLearning>;

/// A SARSA agent over a grid-world style state key
pub type SarsaAgent<S> = TabularAgent<S, Sarsa>;
