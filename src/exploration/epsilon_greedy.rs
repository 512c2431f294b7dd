use rand::{seq::IteratorRandom, Rng};

use crate::decay::Decay;

use super::Choice;

/// Epsilon greedy exploration policy with time-decaying epsilon threshold
///
/// All randomness is drawn from a caller-supplied [`Rng`] so deterministic sequences
/// can be injected in tests.
pub struct EpsilonGreedy<D: Decay> {
    epsilon: D,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy with a decay strategy
    pub fn new(decay: D) -> Self {
        Self { epsilon: decay }
    }

    /// The exploration rate for the given episode
    pub fn epsilon(&self, episode: u32) -> f32 {
        self.epsilon.evaluate(episode as f32)
    }

    /// Invoke epsilon greedy policy for the current episode
    pub fn choose<R: Rng>(&self, rng: &mut R, episode: u32) -> Choice {
        if rng.gen::<f32>() > self.epsilon(episode) {
            Choice::Exploit
        } else {
            Choice::Explore
        }
    }

    /// Select an action index over a vector of action values
    ///
    /// Explores with a uniformly random index regardless of the value estimates.
    /// Exploits by choosing uniformly among *all* indices achieving the maximum value,
    /// not the first one, since freshly initialized states hold an all-zero tie.
    pub fn select<R: Rng, const N: usize>(
        &self,
        rng: &mut R,
        episode: u32,
        values: &[f32; N],
    ) -> usize {
        match self.choose(rng, episode) {
            Choice::Explore => rng.gen_range(0..N),
            Choice::Exploit => {
                let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                (0..N)
                    .filter(|&i| values[i] == max)
                    .choose(rng)
                    .expect("There is always at least one maximal action")
            }
        }
    }
}
