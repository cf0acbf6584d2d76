pub mod ball;
pub mod paddle;

pub use ball::{Ball, BallEvent};
pub use paddle::{Motion, Paddle};

use serde::{Deserialize, Serialize};

/// Which half of the board a player owns. The left side is always the
/// physics-authoritative endpoint for the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Board geometry shared by both endpoints and the relay handshake.
#[derive(Debug, Clone, Copy)]
pub struct Board {
    pub width: f32,
    pub height: f32,
}

/// Thickness of the top and bottom wall bands.
pub const WALL: f32 = 10.0;
pub const PADDLE_WIDTH: f32 = 10.0;
pub const PADDLE_HEIGHT: f32 = 50.0;
pub const PADDLE_SPEED: f32 = 5.0;
pub const BALL_SIZE: f32 = 5.0;
pub const BALL_SPEED: f32 = 5.0;
/// A score strictly greater than this wins the match ("first to 5").
pub const WIN_THRESHOLD: u32 = 4;

impl Board {
    pub const DEFAULT_WIDTH: f32 = 640.0;
    pub const DEFAULT_HEIGHT: f32 = 480.0;

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// X coordinate of a side's paddle (fixed for the whole match).
    pub fn paddle_x(&self, side: Side) -> f32 {
        match side {
            Side::Left => 10.0,
            Side::Right => self.width - 2.0 * PADDLE_WIDTH,
        }
    }

    /// Starting vertical offset for both paddles (vertically centered).
    pub fn paddle_start_y(&self) -> f32 {
        self.height / 2.0 - PADDLE_HEIGHT / 2.0
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WIDTH, Self::DEFAULT_HEIGHT)
    }
}

/// Axis-aligned bounding box used for ball/paddle/wall collision.
#[derive(Debug, Clone, Copy)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.h / 2.0
    }
}

/// Match score for both sides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scoreboard {
    pub left: u32,
    pub right: u32,
}

impl Scoreboard {
    pub fn award(&mut self, side: Side) {
        match side {
            Side::Left => self.left += 1,
            Side::Right => self.right += 1,
        }
    }

    /// The winner once either score exceeds the threshold, if any.
    pub fn winner(&self) -> Option<Side> {
        if self.left > WIN_THRESHOLD {
            Some(Side::Left)
        } else if self.right > WIN_THRESHOLD {
            Some(Side::Right)
        } else {
            None
        }
    }
}
