use std::{error::Error, fs, path::Path};

use gridrl::{
    algo::tabular::{QLearningAgent, SarsaAgent, TabularAgentConfig},
    gridworld::{levels, GridState, GridWorld},
    train::{train, EpisodeStats, TrainConfig},
};

const SEED: u64 = 7;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let out = Path::new("demos/out");
    fs::create_dir_all(out)?;

    let config = TrainConfig {
        episodes: 200,
        max_steps: 500,
    };

    let mut env = GridWorld::from_ascii(levels::VAULT).with_seed(SEED);
    let mut agent = QLearningAgent::<GridState>::new(TabularAgentConfig {
        intrinsic_beta: Some(0.1),
        seed: Some(SEED),
        ..Default::default()
    });
    let stats = train(&mut env, &mut agent, &config, None);
    agent.save(out.join("q_learning_vault.bin"))?;
    write_stats(&out.join("q_learning_vault.csv"), &stats)?;
    summarize("Q-learning", &stats);

    let mut env = GridWorld::from_ascii(levels::VAULT).with_seed(SEED);
    let mut agent = SarsaAgent::<GridState>::new(TabularAgentConfig {
        seed: Some(SEED),
        ..Default::default()
    });
    let stats = train(&mut env, &mut agent, &config, None);
    agent.save(out.join("sarsa_vault.bin"))?;
    write_stats(&out.join("sarsa_vault.csv"), &stats)?;
    summarize("SARSA", &stats);

    Ok(())
}

fn write_stats(path: &Path, stats: &[EpisodeStats]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["episode", "reward", "intrinsic_reward", "steps"])?;
    for (i, episode) in stats.iter().enumerate() {
        wtr.write_record([
            i.to_string(),
            episode.reward.to_string(),
            episode.intrinsic_reward.to_string(),
            episode.steps.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn summarize(name: &str, stats: &[EpisodeStats]) {
    let mean = stats.iter().map(|ep| ep.reward).sum::<f32>() / stats.len() as f32;
    println!("{name}: {} episodes, mean reward {mean:.3}", stats.len());
}
