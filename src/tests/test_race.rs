use std::f32::consts::FRAC_PI_2;

use crate::car::ControlInput;
use crate::collision;
use crate::config::SimConfig;
use crate::error::RaceError;
use crate::geometry::Vec2;
use crate::race::{Driver, Race, RaceEvent, TickReport};
use crate::track::{GridPos, Track, DEFAULT_CELL_SIZE};
use crate::trainer::Trainer;

const ACCELERATE: ControlInput = ControlInput {
    accelerate: true,
    ..ControlInput::NONE
};

fn track(rows: &[&str]) -> Track {
    Track::from_ascii(rows, DEFAULT_CELL_SIZE).unwrap()
}

fn open_track() -> Track {
    track(&["....", "S..F", "...."])
}

fn corridor() -> Track {
    track(&["#######", "#S...F#", "#######"])
}

fn race_on(track: Track) -> Race {
    Race::new(track, SimConfig::default()).unwrap()
}

fn training_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.trainer.hidden_layers = vec![8];
    config.trainer.batch_size = 2;
    config.trainer.replay_every = 1;
    config.trainer.seed = Some(1);
    config
}

fn training_race(agents: usize) -> Race {
    let config = training_config();
    let trainer = Trainer::for_sim(&config).unwrap();
    let mut race = Race::new(corridor(), config).unwrap().with_trainer(trainer).unwrap();
    for n in 0..agents {
        race.add_car(format!("agent-{}", n), Driver::Agent).unwrap();
    }
    race
}

/// Tick with `input` until the race is over, collecting the reports.
fn drive(race: &mut Race, input: ControlInput, max_ticks: usize) -> Vec<TickReport> {
    let mut reports = Vec::new();
    for _ in 0..max_ticks {
        reports.push(race.tick(input));
        if race.is_over() {
            break;
        }
    }
    reports
}

fn events(reports: &[TickReport]) -> impl Iterator<Item = &RaceEvent> {
    reports.iter().flat_map(|report| report.events.iter())
}

#[test]
fn test_cars_wait_for_start_cell() {
    let mut race = race_on(track(&["..F"]));
    let id = race.add_car("player", Driver::Human).unwrap();
    assert!(race.cars().is_empty());
    assert!(race.car(id).is_none());
    assert_eq!(race.driver(id), Some(Driver::Human));

    let report = race.tick(ACCELERATE);
    assert!(report.events.is_empty());
    assert!(!race.all_terminal());

    race.set_track(track(&["S.F"]));
    let car = race.car(id).unwrap();
    assert_eq!(car.position, race.track().start_center().unwrap());
}

#[test]
fn test_spawn_faces_finish() {
    let mut race = race_on(track(&["S", "F"]));
    let id = race.add_car("player", Driver::Human).unwrap();
    let car = race.car(id).unwrap();
    assert!((car.angle - FRAC_PI_2).abs() < 1e-6);
    assert_eq!(car.speed, 0.0);
    assert!(!car.crashed && !car.finished);
}

#[test]
fn test_spawn_offsets_and_progress_ranking() {
    let mut race = race_on(open_track());
    let first = race.add_car("a", Driver::Human).unwrap();
    let second = race.add_car("b", Driver::Human).unwrap();
    let third = race.add_car("c", Driver::Human).unwrap();

    let start = race.track().start_center().unwrap();
    let spacing = race.config().physics.spawn_spacing;
    assert_eq!(race.car(first).unwrap().position, start);
    assert!((race.car(second).unwrap().position.y - (start.y + spacing)).abs() < 1e-4);
    assert!((race.car(third).unwrap().position.y - (start.y - spacing)).abs() < 1e-4);

    // The car on the start centre has made no progress
    assert_eq!(race.car(first).unwrap().rank, 3);
}

#[test]
fn test_agent_car_requires_trainer() {
    let mut race = race_on(open_track());
    assert!(race.add_car("bot", Driver::Agent).is_err());
    assert!(race.cars().is_empty());
}

#[test]
fn test_wall_crash_keeps_last_legal_pose() {
    let mut race = race_on(track(&["###", "#S#", "###"]));
    let id = race.add_car("player", Driver::Human).unwrap();

    let reports = drive(&mut race, ACCELERATE, 50);
    assert!(events(&reports).any(|e| *e == RaceEvent::WallCrash { car: id }));

    let car = race.car(id).unwrap().clone();
    assert!(car.crashed);
    assert!(!car.finished);
    assert_eq!(car.speed, 0.0);
    assert!(!collision::hits_wall(&car, car.position, race.track()));
    assert!(race.winner().is_none());

    // Crashed cars no longer move
    let report = race.tick(ACCELERATE);
    assert!(report.events.is_empty());
    assert_eq!(race.car(id).unwrap().position, car.position);
}

#[test]
fn test_single_winner_and_ranking() {
    let mut race = race_on(open_track());
    let first = race.add_car("a", Driver::Human).unwrap();
    let second = race.add_car("b", Driver::Human).unwrap();

    let reports = drive(&mut race, ACCELERATE, 200);
    assert!(race.is_over());
    assert_eq!(events(&reports).filter(|e| matches!(e, RaceEvent::Winner { .. })).count(), 1);
    assert!(events(&reports).any(|e| *e == RaceEvent::Finished { car: first }));

    assert_eq!(race.winner(), Some(first));
    assert_eq!(race.car(first).unwrap().rank, 1);
    assert_eq!(race.car(second).unwrap().rank, 2);
}

#[test]
fn test_race_ends_with_first_finisher() {
    let mut race = race_on(corridor());
    let behind = race.add_car("a", Driver::Human).unwrap();
    let ahead = race.add_car("b", Driver::Human).unwrap();

    drive(&mut race, ACCELERATE, 200);
    assert_eq!(race.winner(), Some(ahead));
    assert!(race.is_over());
    assert!(!race.all_terminal());

    let trailing = race.car(behind).unwrap().clone();
    assert!(!trailing.finished && !trailing.crashed);
    let tick = race.tick_count();
    for _ in 0..50 {
        let report = race.tick(ACCELERATE);
        assert!(report.events.is_empty());
        assert_eq!(report.tick, tick);
    }
    assert_eq!(race.tick_count(), tick);
    assert_eq!(race.car(behind).unwrap().position, trailing.position);
    assert_eq!(race.car(behind).unwrap().rank, 2);

    race.reset();
    assert!(!race.is_over());
    assert_eq!(race.tick(ACCELERATE).tick, 1);
}

#[test]
fn test_win_closes_running_agent_episodes() {
    let config = training_config();
    let trainer = Trainer::for_sim(&config).unwrap();
    let mut race = Race::new(track(&["F", "S", "."]), config)
        .unwrap()
        .with_trainer(trainer)
        .unwrap();
    let player = race.add_car("player", Driver::Human).unwrap();
    let bot = race.add_car("bot", Driver::Agent).unwrap();
    // The only free slot is behind the start, away from the finish
    assert!((race.car(bot).unwrap().position.y - 76.0).abs() < 1e-4);

    let report = race.tick(ACCELERATE);
    assert_eq!(race.winner(), Some(player));
    assert!(race.is_over());

    let ended: Vec<_> = report
        .events
        .iter()
        .filter_map(|e| match e {
            RaceEvent::EpisodeEnded { car, stats } => Some((*car, stats.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(ended.len(), 1);
    assert_eq!(ended[0].0, bot);
    assert!(!ended[0].1.finished);
    assert_eq!(ended[0].1.length, 1);
    assert!(!race.car(bot).unwrap().is_terminal());
    assert!(!race.trainer().unwrap().has_pending(bot));
}

#[test]
fn test_corridor_cars_never_overlap() {
    let mut race = race_on(corridor());
    let first = race.add_car("a", Driver::Human).unwrap();
    let second = race.add_car("b", Driver::Human).unwrap();
    let contact = {
        let a = race.car(first).unwrap();
        collision::contact_distance(a, race.car(second).unwrap(), race.config().physics.car_buffer)
    };

    for _ in 0..200 {
        race.tick(ACCELERATE);
        let cars = race.cars();
        assert!(cars[0].position.distance(cars[1].position) >= contact - 1e-3);
        for car in cars {
            assert!(!collision::hits_wall(car, car.position, race.track()));
        }
        if race.is_over() {
            break;
        }
    }
    assert_eq!(race.winner(), Some(second));
}

#[test]
fn test_contact_separates_and_damps_in_corridor() {
    let mut race = race_on(corridor());
    let first = race.add_car("a", Driver::Human).unwrap();
    for _ in 0..3 {
        race.tick(ACCELERATE);
    }

    // Joining mid-race leaves the running car alone
    let before = race.car(first).unwrap().clone();
    let second = race.add_car("b", Driver::Human).unwrap();
    assert_eq!(race.car(first).unwrap().position, before.position);
    assert_eq!(race.car(first).unwrap().speed, before.speed);
    assert_eq!(race.tick_count(), 3);
    let spawned = race.car(second).unwrap();
    assert!(spawned.position.distance(Vec2::new(76.0, 60.0)) < 1e-4);
    assert_eq!(spawned.lap_start_tick, 3);

    // The running car closes in on the newcomer and both get pushed apart
    let report = race.tick(ACCELERATE);
    assert!(report.events.contains(&RaceEvent::CarCollision { a: first, b: second }));
    let (a, b) = (race.car(first).unwrap(), race.car(second).unwrap());
    assert!(a.position.distance(b.position) >= 15.0 - 1e-3);
    assert!((a.speed - 0.4).abs() < 1e-5);
    assert!((b.speed - 0.1).abs() < 1e-5);
    assert!(!collision::hits_wall(a, a.position, race.track()));
    assert!(!collision::hits_wall(b, b.position, race.track()));
}

#[test]
fn test_add_car_keeps_crashed_cars_down() {
    let mut race = race_on(track(&["####", "#S.#", "####"]));
    let first = race.add_car("a", Driver::Human).unwrap();
    drive(&mut race, ACCELERATE, 100);
    assert!(race.car(first).unwrap().crashed);

    race.add_car("b", Driver::Human).unwrap();
    assert!(race.car(first).unwrap().crashed);
    assert!(!race.all_terminal());
}

#[test]
fn test_invalid_setup_is_rejected() {
    let mut config = SimConfig::default();
    config.physics.max_speed = 0.0;
    assert!(matches!(
        Race::new(open_track(), config),
        Err(RaceError::InvalidParameter { .. })
    ));

    let trainer = Trainer::for_sim(&training_config()).unwrap();
    let mut wide = training_config();
    wide.sensors.ray_angles = vec![0.0, -0.5, 0.5, -1.0, 1.0];
    let race = Race::new(open_track(), wide).unwrap();
    assert!(matches!(
        race.with_trainer(trainer),
        Err(RaceError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_laps_restart_from_spawn() {
    let mut track = open_track();
    track.set_laps_required(2).unwrap();
    let mut race = race_on(track);
    let id = race.add_car("player", Driver::Human).unwrap();
    let start = race.track().start_center().unwrap();

    let mut first_lap = None;
    for _ in 0..400 {
        let report = race.tick(ACCELERATE);
        let lap_one = report
            .events
            .iter()
            .any(|e| matches!(e, RaceEvent::LapCompleted { lap: 1, .. }));
        if lap_one {
            first_lap = Some(report.tick);
            let car = race.car(id).unwrap();
            assert!(!car.finished);
            assert_eq!(car.position, start);
            assert_eq!(car.speed, 0.0);
            assert_eq!(car.lap_start_tick, report.tick);
        }
        if race.is_over() {
            break;
        }
    }

    assert!(first_lap.is_some());
    let car = race.car(id).unwrap();
    assert!(car.finished);
    assert_eq!(car.lap_times.len(), 2);
    assert!(car.lap_times.iter().all(|&t| t > 0.0));
    assert_eq!(race.winner(), Some(id));
}

#[test]
fn test_checkpoints_gate_the_finish() {
    let mut missed = track(&["......", "S....F", "......"]);
    missed.add_checkpoint(GridPos::new(2, 0)).unwrap();
    let mut race = race_on(missed);
    let id = race.add_car("player", Driver::Human).unwrap();

    let reports = drive(&mut race, ACCELERATE, 300);
    assert!(!events(&reports).any(|e| matches!(e, RaceEvent::LapCompleted { .. })));
    assert!(race.car(id).unwrap().crashed);

    let mut on_path = track(&["......", "S....F", "......"]);
    on_path.add_checkpoint(GridPos::new(2, 1)).unwrap();
    race.set_track(on_path);
    let reports = drive(&mut race, ACCELERATE, 300);
    assert!(events(&reports).any(|e| *e == RaceEvent::Checkpoint { car: id, index: 0 }));
    assert!(race.car(id).unwrap().finished);
}

#[test]
fn test_set_track_resets_race() {
    let mut race = race_on(track(&["S", "F"]));
    let id = race.add_car("player", Driver::Human).unwrap();
    race.tick(ACCELERATE);
    assert_eq!(race.winner(), Some(id));

    race.set_track(open_track());
    assert_eq!(race.tick_count(), 0);
    assert_eq!(race.winner(), None);
    let car = race.car(id).unwrap();
    assert!(!car.finished);
    assert_eq!(car.position, race.track().start_center().unwrap());
    assert_eq!(race.encoder().state_size(), 17);
}

#[test]
fn test_agent_transitions_feed_training() {
    let mut race = training_race(1);
    let mut training_steps = 0;
    for _ in 0..3 {
        let report = race.tick(ControlInput::NONE);
        training_steps += report
            .events
            .iter()
            .filter(|e| matches!(e, RaceEvent::TrainingStep { .. }))
            .count();
    }

    let trainer = race.trainer().unwrap();
    assert_eq!(trainer.buffer().len(), 3);
    assert_eq!(trainer.agent().train_steps, 2);
    assert_eq!(training_steps, 2);
}

#[test]
fn test_each_agent_car_records_transitions() {
    let mut race = training_race(2);
    assert_eq!(race.cars().len(), 2);
    race.tick(ControlInput::NONE);
    assert_eq!(race.trainer().unwrap().buffer().len(), 2);
}

#[test]
fn test_training_disabled_is_greedy_only() {
    let mut race = training_race(1);
    race.set_training_enabled(false);
    race.tick(ControlInput::NONE);
    race.tick(ControlInput::NONE);

    let trainer = race.trainer().unwrap();
    assert!(trainer.buffer().is_empty());
    assert_eq!(trainer.agent().train_steps, 0);
    assert_eq!(race.tick_count(), 2);
}

#[test]
fn test_reset_drops_episode_state() {
    let mut race = training_race(1);
    race.tick(ControlInput::NONE);
    race.tick(ControlInput::NONE);

    race.reset();
    let trainer = race.trainer().unwrap();
    assert_eq!(trainer.current_reward(), 0.0);
    assert!(!trainer.has_pending(0));
    assert_eq!(trainer.buffer().len(), 2);
    assert_eq!(race.tick_count(), 0);
    assert_eq!(race.car(0).unwrap().position, race.track().start_center().unwrap());
}

#[test]
fn test_status_reports_need_trainer() {
    let mut config = training_config();
    config.race.status_interval_ms = 0;

    let trainer = Trainer::for_sim(&config).unwrap();
    let mut race = Race::new(open_track(), config.clone())
        .unwrap()
        .with_trainer(trainer)
        .unwrap();
    race.add_car("bot", Driver::Agent).unwrap();
    let report = race.tick(ControlInput::NONE);
    assert!(report.events.iter().any(|e| matches!(e, RaceEvent::Status(_))));

    let mut human_only = Race::new(open_track(), config).unwrap();
    human_only.add_car("player", Driver::Human).unwrap();
    let report = human_only.tick(ControlInput::NONE);
    assert!(!report.events.iter().any(|e| matches!(e, RaceEvent::Status(_))));
}

#[test]
fn test_take_trainer() {
    let mut race = training_race(1);
    assert!(race.take_trainer().is_some());
    assert!(race.trainer().is_none());
}
