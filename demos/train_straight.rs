//! Headless DQN training on a straight corridor.
//!
//! Logs at INFO. Every 100 episodes the session reports the running reward
//! average and the exploration rate; weights and training
//! metrics are saved under `models/`.

use gridrace::config::{RewardScale, SimConfig};
use gridrace::persistence::FileModelStore;
use gridrace::session::TrainingSession;
use gridrace::track::{Track, DEFAULT_CELL_SIZE};

const EPISODES: usize = 500;
const MAX_STEPS: u64 = 300;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let track = Track::from_ascii(
        &[
            "##########",
            "#........#",
            "#S......F#",
            "#........#",
            "##########",
        ],
        DEFAULT_CELL_SIZE,
    )?;

    let mut config = SimConfig::for_scale(RewardScale::Fine);
    config.trainer.seed = Some(42);
    config.race.status_interval_ms = 5_000;

    let store = FileModelStore::new("models");
    let mut session = TrainingSession::with_store(track, config, 1, MAX_STEPS, Box::new(store))?;

    let summaries = session.run(EPISODES);
    let finished = summaries.iter().filter(|s| s.winner.is_some()).count();
    let last: Vec<f32> = summaries.iter().rev().take(50).map(|s| s.total_reward()).collect();
    let average = last.iter().sum::<f32>() / last.len().max(1) as f32;

    println!("Finished {} of {} episodes", finished, EPISODES);
    println!("Average reward over the last {} episodes: {:.3}", last.len(), average);
    if let Some(trainer) = session.trainer() {
        println!(
            "Training steps: {}, epsilon: {:.4}",
            trainer.agent().train_steps,
            trainer.epsilon()
        );
        std::fs::create_dir_all("models")?;
        trainer.metrics().save(std::path::Path::new("models/metrics.json"))?;
    }
    Ok(())
}
