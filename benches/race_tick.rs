use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gridrace::car::ControlInput;
use gridrace::config::SimConfig;
use gridrace::race::{Driver, Race};
use gridrace::track::{Track, DEFAULT_CELL_SIZE};
use gridrace::trainer::Trainer;

const TRACK: [&str; 5] = [
    "##########",
    "#........#",
    "#S......F#",
    "#........#",
    "##########",
];

fn track() -> Track {
    Track::from_ascii(&TRACK, DEFAULT_CELL_SIZE).unwrap()
}

fn bench_human_tick(c: &mut Criterion) {
    let mut race = Race::new(track(), SimConfig::default()).unwrap();
    for n in 0..4 {
        race.add_car(format!("car-{}", n), Driver::Human).unwrap();
    }
    c.bench_function("human_tick_4_cars", |b| {
        b.iter(|| {
            if race.is_over() {
                race.reset();
            }
            black_box(race.tick(ControlInput::NONE))
        })
    });
}

fn bench_training_tick(c: &mut Criterion) {
    let mut config = SimConfig::default();
    config.trainer.seed = Some(0);
    config.race.status_interval_ms = 60_000;
    let trainer = Trainer::for_sim(&config).unwrap();
    let mut race = Race::new(track(), config).unwrap().with_trainer(trainer).unwrap();
    race.add_car("agent", Driver::Agent).unwrap();

    c.bench_function("training_tick_1_agent", |b| {
        b.iter(|| {
            if race.is_over() || race.tick_count() >= 300 {
                race.reset();
            }
            black_box(race.tick(ControlInput::NONE))
        })
    });
}

criterion_group!(benches, bench_human_tick, bench_training_tick);
criterion_main!(benches);
