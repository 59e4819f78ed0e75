//! Headless training: run episodes of an agents-only race back to back.

use tracing::info;

use crate::car::{CarId, ControlInput};
use crate::config::SimConfig;
use crate::error::{RaceError, Result};
use crate::metrics::EpisodeStats;
use crate::persistence::ModelStore;
use crate::race::{Driver, Race, RaceEvent};
use crate::track::Track;
use crate::trainer::Trainer;

/// Outcome of one race episode.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeSummary {
    pub ticks: u64,
    pub winner: Option<CarId>,
    /// One entry per agent car, in the order their episodes ended.
    pub episodes: Vec<EpisodeStats>,
    /// Gradient steps committed during the episode.
    pub training_steps: usize,
    /// True when the step cap ended the episode.
    pub truncated: bool,
}

impl EpisodeSummary {
    pub fn total_reward(&self) -> f32 {
        self.episodes.iter().map(|stats| stats.total_reward).sum()
    }
}

pub struct TrainingSession {
    race: Race,
    max_steps: u64,
}

impl TrainingSession {
    /// A race on `track` with `agents` agent cars sharing one trainer.
    pub fn new(track: Track, config: SimConfig, agents: usize, max_steps: u64) -> Result<Self> {
        Self::build(track, config, agents, max_steps, None)
    }

    /// Like [`TrainingSession::new`], loading and saving weights through `store`.
    pub fn with_store(
        track: Track,
        config: SimConfig,
        agents: usize,
        max_steps: u64,
        store: Box<dyn ModelStore>,
    ) -> Result<Self> {
        Self::build(track, config, agents, max_steps, Some(store))
    }

    fn build(
        track: Track,
        config: SimConfig,
        agents: usize,
        max_steps: u64,
        store: Option<Box<dyn ModelStore>>,
    ) -> Result<Self> {
        config.validate()?;
        if agents == 0 || max_steps == 0 {
            return Err(RaceError::invalid_parameter(
                "agents/max_steps",
                "must be greater than 0",
            ));
        }
        if track.start().is_none() {
            return Err(RaceError::InvalidTrack("track has no start cell".to_string()));
        }

        let mut trainer = Trainer::for_sim(&config)?;
        if let Some(store) = store {
            trainer = trainer.with_store(store);
        }
        let mut race = Race::new(track, config)?.with_trainer(trainer)?;
        for n in 0..agents {
            race.add_car(format!("agent-{}", n + 1), Driver::Agent)?;
        }
        Ok(TrainingSession { race, max_steps })
    }

    pub fn race(&self) -> &Race {
        &self.race
    }

    pub fn trainer(&self) -> Option<&Trainer> {
        self.race.trainer()
    }

    /// Run one episode from a fresh spawn until the race is over or the step
    /// cap is hit. Capped episodes are closed without a terminal transition.
    pub fn run_episode(&mut self) -> EpisodeSummary {
        self.race.reset();
        let mut summary = EpisodeSummary {
            ticks: 0,
            winner: None,
            episodes: Vec::new(),
            training_steps: 0,
            truncated: false,
        };

        while summary.ticks < self.max_steps && !self.race.is_over() {
            let report = self.race.tick(ControlInput::NONE);
            summary.ticks = report.tick;
            for event in report.events {
                match event {
                    RaceEvent::EpisodeEnded { stats, .. } => summary.episodes.push(stats),
                    RaceEvent::TrainingStep { .. } => summary.training_steps += 1,
                    _ => {}
                }
            }
        }

        if !self.race.is_over() {
            summary.truncated = true;
            let running: Vec<CarId> = self
                .race
                .cars()
                .iter()
                .filter(|car| !car.is_terminal())
                .map(|car| car.id)
                .collect();
            if let Some(trainer) = self.race.trainer_mut() {
                for id in running {
                    if let Some(stats) = trainer.truncate_episode(id) {
                        summary.episodes.push(stats);
                    }
                }
            }
        }

        summary.winner = self.race.winner();
        summary
    }

    pub fn run(&mut self, episodes: usize) -> Vec<EpisodeSummary> {
        let mut summaries = Vec::with_capacity(episodes);
        for n in 0..episodes {
            let summary = self.run_episode();
            if (n + 1) % 100 == 0 {
                let epsilon = self.trainer().map(Trainer::epsilon).unwrap_or(0.0);
                let average = self
                    .trainer()
                    .and_then(|t| t.metrics().running_average())
                    .unwrap_or(0.0);
                info!(episode = n + 1, average, epsilon, "training progress");
            }
            summaries.push(summary);
        }
        summaries
    }
}
