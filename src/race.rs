//! # Race Orchestrator
//!
//! [`Race`] owns the track, the cars and (optionally) the [`Trainer`] that
//! drives and learns from the agent-controlled cars. Everything a tick needs
//! is passed in explicitly; a tick never reads shared state.
//!
//! Per tick, for every car that is neither crashed nor finished:
//!
//! 1. get a control input: the human input, or an agent action
//! 2. advance the physics to a tentative pose
//! 3. a pose overlapping a wall is not committed: the car crashes in place
//! 4. otherwise commit, then check checkpoints, laps and the finish
//!
//! Then car-car contacts are resolved, agent transitions are recorded, at
//! most one (throttled) gradient step runs and the ranking is recomputed.
//!
//! The race is over once a car finishes (or every car is out). Ticks are
//! no-ops from then on until [`Race::reset`]; the episodes of agent cars
//! still running when another car wins are closed without a terminal flag.
//!
//! ```rust
//! use gridrace::car::ControlInput;
//! use gridrace::config::SimConfig;
//! use gridrace::race::{Driver, Race};
//! use gridrace::track::{Track, DEFAULT_CELL_SIZE};
//!
//! let track = Track::from_ascii(&["S", "F"], DEFAULT_CELL_SIZE).unwrap();
//! let mut race = Race::new(track, SimConfig::default()).unwrap();
//! let id = race.add_car("player", Driver::Human).unwrap();
//!
//! let accelerate = ControlInput { accelerate: true, ..ControlInput::NONE };
//! race.tick(accelerate);
//! assert!(race.car(id).unwrap().finished);
//! assert_eq!(race.winner(), Some(id));
//! assert!(race.is_over());
//! ```

use serde::Serialize;
use std::f32::consts::FRAC_PI_2;
use tracing::{debug, info, warn};

use crate::car::{Car, CarId, ControlInput};
use crate::collision;
use crate::config::SimConfig;
use crate::encoder::StateEncoder;
use crate::error::{RaceError, Result};
use crate::geometry::Vec2;
use crate::metrics::{EpisodeStats, StatusReport, StatusTicker};
use crate::physics;
use crate::track::Track;
use crate::trainer::Trainer;

/// Rings of spawn slots tried around the start centre.
const MAX_SPAWN_RINGS: usize = 4;

/// Who controls a car. Resolved once when the car joins the race.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Driver {
    Human,
    Agent,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum RaceEvent {
    WallCrash { car: CarId },
    CarCollision { a: CarId, b: CarId },
    Checkpoint { car: CarId, index: usize },
    LapCompleted { car: CarId, lap: usize, time: f32 },
    Finished { car: CarId },
    /// First car to finish.
    Winner { car: CarId },
    TrainingStep { loss: f32, epsilon: f32 },
    EpisodeEnded { car: CarId, stats: EpisodeStats },
    Status(StatusReport),
}

/// Everything that happened during one tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<RaceEvent>,
}

#[derive(Clone, Debug)]
struct Entry {
    id: CarId,
    name: String,
    driver: Driver,
}

pub struct Race {
    track: Track,
    config: SimConfig,
    encoder: StateEncoder,
    entries: Vec<Entry>,
    /// Parallel to `entries` once spawned; empty while the track has no start.
    cars: Vec<Car>,
    trainer: Option<Trainer>,
    tick: u64,
    winner: Option<CarId>,
    next_id: CarId,
    ticker: StatusTicker,
}

impl Race {
    /// A race on `track`. Fails when `config` does not validate.
    pub fn new(track: Track, config: SimConfig) -> Result<Self> {
        config.validate()?;
        let encoder = StateEncoder::for_track(&track, &config.physics, &config.sensors);
        let ticker = StatusTicker::new(config.race.status_interval());
        Ok(Race {
            track,
            config,
            encoder,
            entries: Vec::new(),
            cars: Vec::new(),
            trainer: None,
            tick: 0,
            winner: None,
            next_id: 0,
            ticker,
        })
    }

    /// Attach the trainer that controls (and learns from) agent cars. Its
    /// network must take this race's encoded states.
    pub fn with_trainer(mut self, trainer: Trainer) -> Result<Self> {
        let expected = self.encoder.state_size();
        let actual = trainer.agent().state_size();
        if actual != expected {
            return Err(RaceError::dimension_mismatch(
                format!("trainer input size {}", expected),
                format!("trainer input size {}", actual),
            ));
        }
        self.trainer = Some(trainer);
        Ok(self)
    }

    /// Register a car and spawn it at its slot around the start cell. Cars
    /// already racing are left where they are.
    ///
    /// Without a start cell the car stays unspawned until a track with one
    /// is set. Agent cars require a trainer.
    pub fn add_car(&mut self, name: impl Into<String>, driver: Driver) -> Result<CarId> {
        if driver == Driver::Agent && self.trainer.is_none() {
            return Err(RaceError::invalid_parameter("driver", "agent cars need a trainer"));
        }
        let id = self.next_id;
        self.next_id += 1;
        let index = self.entries.len();
        self.entries.push(Entry {
            id,
            name: name.into(),
            driver,
        });

        match self.spawn_car(index) {
            Some(car) if self.cars.len() == index => {
                self.cars.push(car);
                self.update_ranking();
            }
            _ => warn!(car = id, "track has no start cell, car not spawned"),
        }
        Ok(id)
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn encoder(&self) -> &StateEncoder {
        &self.encoder
    }

    /// Read-only car states, in join order.
    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    pub fn car(&self, id: CarId) -> Option<&Car> {
        self.cars.iter().find(|car| car.id == id)
    }

    pub fn driver(&self, id: CarId) -> Option<Driver> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.driver)
    }

    pub fn trainer(&self) -> Option<&Trainer> {
        self.trainer.as_ref()
    }

    pub fn trainer_mut(&mut self) -> Option<&mut Trainer> {
        self.trainer.as_mut()
    }

    pub fn take_trainer(&mut self) -> Option<Trainer> {
        self.trainer.take()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn winner(&self) -> Option<CarId> {
        self.winner
    }

    /// True once every spawned car has crashed or finished.
    pub fn all_terminal(&self) -> bool {
        !self.cars.is_empty() && self.cars.iter().all(Car::is_terminal)
    }

    /// True once a car has won or no car can move any more. Ticks do nothing
    /// until the next reset.
    pub fn is_over(&self) -> bool {
        self.winner.is_some() || self.all_terminal()
    }

    pub fn set_training_enabled(&mut self, enabled: bool) {
        self.config.race.training_enabled = enabled;
    }

    /// Replace the track and start over. Never a partial update.
    pub fn set_track(&mut self, track: Track) {
        self.encoder = StateEncoder::for_track(&track, &self.config.physics, &self.config.sensors);
        self.track = track;
        self.reset();
    }

    /// Start a new episode: respawn every car, clear the winner and drop all
    /// prior states held by the trainer.
    pub fn reset(&mut self) {
        self.tick = 0;
        self.winner = None;
        if let Some(trainer) = self.trainer.as_mut() {
            trainer.reset_episodes();
        }
        self.respawn();
    }

    /// Advance every car by one tick. `human` drives the human cars.
    ///
    /// Once the race is over this returns an empty report for the current
    /// tick and changes nothing.
    pub fn tick(&mut self, human: ControlInput) -> TickReport {
        if self.is_over() {
            return TickReport {
                tick: self.tick,
                events: Vec::new(),
            };
        }
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            events: Vec::new(),
        };
        let training = self.config.race.training_enabled;

        let mut moved = vec![false; self.cars.len()];
        for i in 0..self.cars.len() {
            if self.cars[i].is_terminal() {
                continue;
            }
            let input = match self.entries[i].driver {
                Driver::Human => human,
                Driver::Agent => self.agent_input(i, training),
            };
            moved[i] = true;
            self.move_car(i, input, &mut report.events);
        }

        self.resolve_contacts(&mut report.events);

        if let Some(trainer) = self.trainer.as_mut().filter(|_| training) {
            for (i, car) in self.cars.iter().enumerate() {
                if self.entries[i].driver != Driver::Agent || !moved[i] {
                    continue;
                }
                let (state, observation) = self.encoder.encode_observed(car, &self.track, &self.cars);
                if let Some(transition) = trainer.observe(car.id, state, observation) {
                    if let Some(stats) = transition.episode {
                        report.events.push(RaceEvent::EpisodeEnded { car: car.id, stats });
                    }
                }
            }
            if let Some(loss) = trainer.replay() {
                report.events.push(RaceEvent::TrainingStep {
                    loss,
                    epsilon: trainer.epsilon(),
                });
            }
        }

        if self.winner.is_some() {
            self.close_running_episodes(&mut report.events);
        }

        self.update_ranking();

        if self.ticker.poll() {
            if let Some(trainer) = &self.trainer {
                report.events.push(RaceEvent::Status(trainer.status(self.ticker.elapsed())));
            }
        }

        report
    }

    fn agent_input(&mut self, index: usize, training: bool) -> ControlInput {
        let Some(trainer) = self.trainer.as_mut() else {
            return ControlInput::NONE;
        };
        let car = &self.cars[index];
        let (state, observation) = self.encoder.encode_observed(car, &self.track, &self.cars);
        if training {
            trainer.select_action(car.id, state, observation).to_input()
        } else {
            match trainer
                .agent()
                .greedy_action(state.view())
                .and_then(crate::car::Action::from_index)
            {
                Ok(action) => action.to_input(),
                Err(e) => {
                    warn!(car = car.id, error = %e, "greedy action failed, coasting");
                    ControlInput::NONE
                }
            }
        }
    }

    fn move_car(&mut self, index: usize, input: ControlInput, events: &mut Vec<RaceEvent>) {
        let tentative = physics::advance(&self.cars[index], input, &self.config.physics);
        let lap_restart = self.spawn_pose(index);
        let car = &mut self.cars[index];

        if collision::hits_wall(&tentative, tentative.position, &self.track) {
            car.mark_crashed();
            debug!(car = car.id, x = car.position.x, y = car.position.y, "wall crash");
            events.push(RaceEvent::WallCrash { car: car.id });
            return;
        }
        *car = tentative;

        if let Some(checkpoint) = collision::reached_checkpoint(car, &self.track) {
            car.checkpoints_passed.push(checkpoint);
            events.push(RaceEvent::Checkpoint {
                car: car.id,
                index: checkpoint,
            });
        }

        let lap_ready = car.checkpoints_passed.len() >= self.track.checkpoints().len();
        if !lap_ready || !collision::is_at_finish(car, &self.track) {
            return;
        }

        let time = self.tick.saturating_sub(car.lap_start_tick) as f32 * self.config.race.tick_seconds;
        car.lap_times.push(time);
        let lap = car.lap_times.len();
        events.push(RaceEvent::LapCompleted { car: car.id, lap, time });

        if lap >= self.track.laps_required() as usize {
            car.mark_finished();
            events.push(RaceEvent::Finished { car: car.id });
            if self.winner.is_none() {
                self.winner = Some(car.id);
                info!(car = car.id, name = %car.name, time, "race won");
                events.push(RaceEvent::Winner { car: car.id });
            }
        } else if let Some((position, angle)) = lap_restart {
            car.position = position;
            car.angle = angle;
            car.speed = 0.0;
            car.sync_velocity();
            car.checkpoints_passed.clear();
            car.lap_start_tick = self.tick;
        }
    }

    /// Separate and slow down touching cars, never pushing one into a wall.
    fn resolve_contacts(&mut self, events: &mut Vec<RaceEvent>) {
        for i in 0..self.cars.len() {
            for j in (i + 1)..self.cars.len() {
                let (head, tail) = self.cars.split_at_mut(j);
                let (a, b) = (&mut head[i], &mut tail[0]);
                if a.is_terminal() || b.is_terminal() {
                    continue;
                }
                if collision::resolve_car_collision(a, b, &self.config.physics, &self.track) {
                    events.push(RaceEvent::CarCollision { a: a.id, b: b.id });
                }
            }
        }
    }

    /// End the episodes of agent cars still running after the race was won.
    fn close_running_episodes(&mut self, events: &mut Vec<RaceEvent>) {
        let Some(trainer) = self.trainer.as_mut() else {
            return;
        };
        for (entry, car) in self.entries.iter().zip(self.cars.iter()) {
            if entry.driver != Driver::Agent || car.is_terminal() {
                continue;
            }
            if let Some(stats) = trainer.truncate_episode(car.id) {
                events.push(RaceEvent::EpisodeEnded { car: car.id, stats });
            }
        }
    }

    /// Finished cars first by first lap time, then the rest by progress.
    fn update_ranking(&mut self) {
        let mut order: Vec<(usize, bool, f32)> = self
            .cars
            .iter()
            .enumerate()
            .map(|(i, car)| {
                let key = if car.finished {
                    car.first_lap_time().unwrap_or(f32::INFINITY)
                } else {
                    -collision::track_progress(car, &self.track)
                };
                (i, car.finished, key)
            })
            .collect();
        order.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then(a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
        });
        for (rank, (i, _, _)) in order.into_iter().enumerate() {
            self.cars[i].rank = rank + 1;
        }
    }

    /// Start pose of the car at roster position `index`, facing the finish.
    ///
    /// The first car sits on the start centre. Every later car takes the
    /// first free slot around it (to the side, behind, then ahead, one
    /// spacing step further out each round) that is clear of walls and of
    /// the earlier slots. Falls back to the start centre when no slot fits.
    fn spawn_pose(&self, index: usize) -> Option<(Vec2, f32)> {
        let start = self.track.start_center()?;
        let angle = self
            .track
            .finish_center()
            .map(|finish| (finish - start).angle())
            .filter(|angle| angle.is_finite())
            .unwrap_or(0.0);

        let physics = &self.config.physics;
        let template = Car::new(0, "", start, angle, physics.car_half_extent);
        let spacing = physics
            .spawn_spacing
            .max(collision::contact_distance(&template, &template, physics.car_buffer));
        let forward = Vec2::from_angle(angle);
        let side = Vec2::from_angle(angle + FRAC_PI_2);

        let mut slots = vec![start];
        while slots.len() <= index {
            let free = (1..=MAX_SPAWN_RINGS)
                .flat_map(|ring| {
                    let step = ring as f32 * spacing;
                    [side * step, side * -step, forward * -step, forward * step]
                })
                .map(|offset| start + offset)
                .find(|&candidate| {
                    !collision::hits_wall(&template, candidate, &self.track)
                        && slots.iter().all(|&slot| slot.distance(candidate) >= spacing * 0.999)
                });
            slots.push(free.unwrap_or(start));
        }
        Some((slots[index], angle))
    }

    fn spawn_car(&self, index: usize) -> Option<Car> {
        let entry = self.entries.get(index)?;
        let (position, angle) = self.spawn_pose(index)?;
        let mut car = Car::new(entry.id, entry.name.clone(), position, angle, self.config.physics.car_half_extent);
        car.lap_start_tick = self.tick;
        Some(car)
    }

    fn respawn(&mut self) {
        if self.track.start().is_none() {
            if !self.entries.is_empty() {
                warn!(cars = self.entries.len(), "track has no start cell, cars not spawned");
            }
            self.cars.clear();
            return;
        }
        self.cars = (0..self.entries.len())
            .filter_map(|index| self.spawn_car(index))
            .collect();
        self.update_ranking();
    }
}
