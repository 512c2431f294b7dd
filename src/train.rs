use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

use crate::{agent::TdAgent, env::Environment, gridworld::Action};

/// Configuration for a training run
pub struct TrainConfig {
    /// Total episode budget; training stops when the agent's episode counter reaches it
    pub episodes: u32,
    /// Step cap per episode, ending episodes the environment never terminates
    pub max_steps: u32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            episodes: 100,
            max_steps: 500,
        }
    }
}

/// Per-episode record handed to metrics consumers
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeStats {
    /// Total environment reward collected over the episode
    pub reward: f32,
    /// Total intrinsic bonus folded into updates over the episode
    pub intrinsic_reward: f32,
    /// Steps taken before termination or the step cap
    pub steps: u32,
}

/// Drive an agent through an environment until the episode budget is spent
///
/// Each iteration executes the current action, applies the agent's learning update
/// (which also yields the next action, honoring each strategy's selection ordering),
/// and closes the episode when the environment terminates or the step cap is hit.
/// Counting episodes off the agent means a loaded agent resumes against the same
/// budget rather than starting over.
///
/// `stop` is checked only at step boundaries; on cancellation the agent is left
/// consistent and immediately saveable, and the completed episodes' stats are
/// returned.
pub fn train<E, A>(
    env: &mut E,
    agent: &mut A,
    config: &TrainConfig,
    stop: Option<&AtomicBool>,
) -> Vec<EpisodeStats>
where
    E: Environment<Action = Action>,
    E::State: Copy,
    A: TdAgent<E::State>,
{
    let mut stats = Vec::new();
    let mut state = env.reset();
    let mut action = agent.select_action(state);
    let (mut reward_sum, mut bonus_sum, mut steps) = (0.0f32, 0.0f32, 0u32);

    while agent.episode() < config.episodes {
        if stop.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            info!(
                "training cancelled in episode {} after {steps} steps",
                agent.episode()
            );
            break;
        }

        let (next_state, reward) = env.step(action);
        let done = !env.is_active();
        let (next_action, bonus) = agent.transition(state, action, reward, next_state);
        reward_sum += reward;
        bonus_sum += bonus;
        steps += 1;

        if done || steps >= config.max_steps {
            info!(
                "episode {}/{}: {steps} steps, reward {reward_sum:.2}, epsilon {:.3}",
                agent.episode() + 1,
                config.episodes,
                agent.epsilon(),
            );
            stats.push(EpisodeStats {
                reward: reward_sum,
                intrinsic_reward: bonus_sum,
                steps,
            });
            agent.new_episode();
            state = env.reset();
            action = agent.select_action(state);
            (reward_sum, bonus_sum, steps) = (0.0, 0.0, 0);
        } else {
            state = next_state;
            action = next_action;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use crate::{
        algo::tabular::{QLearningAgent, SarsaAgent, TabularAgentConfig},
        decay,
        exploration::EpsilonGreedy,
        gridworld::{GridState, GridWorld},
    };

    use super::*;

    fn forced_greedy() -> EpsilonGreedy<decay::Linear> {
        EpsilonGreedy::new(decay::Linear::new(0.0, 0.0, 0.0))
    }

    #[test]
    fn episode_budget_is_respected() {
        let mut env = GridWorld::from_ascii("A.A").with_seed(3);
        let mut agent = QLearningAgent::<GridState>::new(TabularAgentConfig {
            seed: Some(3),
            ..Default::default()
        });
        let config = TrainConfig {
            episodes: 5,
            max_steps: 20,
        };
        let stats = train(&mut env, &mut agent, &config, None);
        assert_eq!(stats.len(), 5);
        assert_eq!(agent.episode(), 5);
        for episode in &stats {
            assert!(episode.steps <= 20);
        }
    }

    #[test]
    fn primed_greedy_agent_reaches_the_apple() {
        // Apple at column 2 of row 0, agent at (0,0); with exploration off and the
        // table primed to prefer Right, the apple falls within two moves.
        let mut env = GridWorld::from_ascii(
            "..A
             ...
             ...",
        )
        .with_seed(0);
        let mut agent = QLearningAgent::<GridState>::new(TabularAgentConfig {
            exploration: forced_greedy(),
            seed: Some(0),
            ..Default::default()
        });
        agent.set_values(((0, 0), false), [0.0, 0.0, 0.0, 1.0]);
        agent.set_values(((1, 0), false), [0.0, 0.0, 0.0, 1.0]);

        let config = TrainConfig {
            episodes: 1,
            max_steps: 10,
        };
        let stats = train(&mut env, &mut agent, &config, None);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].steps, 2);
        assert_eq!(stats[0].reward, 1.0);
    }

    #[test]
    fn step_cap_ends_stuck_episodes() {
        // The agent is boxed in next to an apple it spawned on and can never consume
        let mut env = GridWorld::from_ascii("A#").with_seed(1);
        let mut agent = SarsaAgent::<GridState>::new(TabularAgentConfig {
            seed: Some(1),
            ..Default::default()
        });
        let config = TrainConfig {
            episodes: 2,
            max_steps: 7,
        };
        let stats = train(&mut env, &mut agent, &config, None);
        assert_eq!(stats.len(), 2);
        assert!(stats.iter().all(|ep| ep.steps == 7 && ep.reward == 0.0));
    }

    #[test]
    fn pre_set_stop_flag_cancels_immediately() {
        let mut env = GridWorld::from_ascii("A.A").with_seed(2);
        let mut agent = QLearningAgent::<GridState>::new(TabularAgentConfig {
            seed: Some(2),
            ..Default::default()
        });
        let stop = AtomicBool::new(true);
        let stats = train(
            &mut env,
            &mut agent,
            &TrainConfig::default(),
            Some(&stop),
        );
        assert!(stats.is_empty());
        assert_eq!(agent.episode(), 0, "agent is left consistent and saveable");
    }

    #[test]
    fn intrinsic_bonus_reaches_the_stats() {
        let mut env = GridWorld::from_ascii("A.A").with_seed(4);
        let mut agent = QLearningAgent::<GridState>::new(TabularAgentConfig {
            intrinsic_beta: Some(0.1),
            seed: Some(4),
            ..Default::default()
        });
        let config = TrainConfig {
            episodes: 3,
            max_steps: 20,
        };
        let stats = train(&mut env, &mut agent, &config, None);
        assert!(stats.iter().all(|ep| ep.intrinsic_reward > 0.0));
    }
}
