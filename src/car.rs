use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RaceError, Result};
use crate::geometry::Vec2;

pub type CarId = u32;

/// Number of discrete actions, i.e. the Q-network's output width.
pub const NUM_ACTIONS: usize = 5;

/// Four independent control booleans.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlInput {
    pub accelerate: bool,
    pub brake: bool,
    pub steer_left: bool,
    pub steer_right: bool,
}

impl ControlInput {
    pub const NONE: ControlInput = ControlInput {
        accelerate: false,
        brake: false,
        steer_left: false,
        steer_right: false,
    };
}

/// Arrow-key state from a human input source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl From<KeyState> for ControlInput {
    fn from(keys: KeyState) -> Self {
        ControlInput {
            accelerate: keys.up,
            brake: keys.down,
            steer_left: keys.left,
            steer_right: keys.right,
        }
    }
}

/// Discrete agent action. The discriminant is the Q-network output index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Accelerate = 0,
    Brake = 1,
    TurnLeft = 2,
    TurnRight = 3,
    NoAction = 4,
}

impl Action {
    pub const ALL: [Action; NUM_ACTIONS] = [
        Action::Accelerate,
        Action::Brake,
        Action::TurnLeft,
        Action::TurnRight,
        Action::NoAction,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Result<Self> {
        Action::ALL
            .get(index)
            .copied()
            .ok_or(RaceError::InvalidAction {
                action: index,
                max_actions: NUM_ACTIONS,
            })
    }

    pub fn to_input(self) -> ControlInput {
        let mut input = ControlInput::NONE;
        match self {
            Action::Accelerate => input.accelerate = true,
            Action::Brake => input.brake = true,
            Action::TurnLeft => input.steer_left = true,
            Action::TurnRight => input.steer_right = true,
            Action::NoAction => {}
        }
        input
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::Accelerate => "ACCELERATE",
            Action::Brake => "BRAKE",
            Action::TurnLeft => "TURN_LEFT",
            Action::TurnRight => "TURN_RIGHT",
            Action::NoAction => "NO_ACTION",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kinematic and race state of one car.
///
/// `crashed` and `finished` are terminal and mutually exclusive; physics
/// leaves a terminal car alone until the race resets it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Car {
    pub id: CarId,
    pub name: String,
    pub position: Vec2,
    /// Heading in radians, 0 = +x, positive turns towards +y.
    pub angle: f32,
    pub speed: f32,
    pub velocity: Vec2,
    /// Half the side of the square bounding box.
    pub size: f32,
    pub crashed: bool,
    pub finished: bool,
    /// Race rank, 1-based. 0 until the first ranking.
    pub rank: usize,
    /// Completed lap times in seconds.
    pub lap_times: Vec<f32>,
    /// Tick at which the current lap started.
    pub lap_start_tick: u64,
    /// Checkpoint indices passed during the current lap, in passing order.
    pub checkpoints_passed: Vec<usize>,
}

impl Car {
    pub fn new(id: CarId, name: impl Into<String>, position: Vec2, angle: f32, size: f32) -> Self {
        Car {
            id,
            name: name.into(),
            position,
            angle,
            speed: 0.0,
            velocity: Vec2::ZERO,
            size,
            crashed: false,
            finished: false,
            rank: 0,
            lap_times: Vec::new(),
            lap_start_tick: 0,
            checkpoints_passed: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.crashed || self.finished
    }

    pub fn mark_crashed(&mut self) {
        self.crashed = true;
        self.finished = false;
        self.speed = 0.0;
        self.velocity = Vec2::ZERO;
    }

    pub fn mark_finished(&mut self) {
        self.finished = true;
        self.crashed = false;
    }

    /// Recompute the velocity vector from heading and speed.
    pub fn sync_velocity(&mut self) {
        self.velocity = Vec2::from_angle(self.angle) * self.speed;
    }

    /// The four corners of the axis-aligned bounding box at `center`.
    pub fn corners_at(&self, center: Vec2) -> [Vec2; 4] {
        let s = self.size;
        [
            Vec2::new(center.x - s, center.y - s),
            Vec2::new(center.x + s, center.y - s),
            Vec2::new(center.x - s, center.y + s),
            Vec2::new(center.x + s, center.y + s),
        ]
    }

    pub fn first_lap_time(&self) -> Option<f32> {
        self.lap_times.first().copied()
    }
}
