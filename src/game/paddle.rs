use super::{Board, Rect, PADDLE_HEIGHT, PADDLE_SPEED, PADDLE_WIDTH, WALL};

/// Three-state input signal driving a paddle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Motion {
    Up,
    Down,
    #[default]
    Idle,
}

/// A player's paddle: fixed x, bounded vertical position, fixed speed.
#[derive(Debug, Clone, Copy)]
pub struct Paddle {
    pub x: f32,
    pub y: f32,
    pub speed: f32,
}

impl Paddle {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            speed: PADDLE_SPEED,
        }
    }

    /// Apply one step of motion intent. Clamping is boundary-inclusive
    /// against the wall bands, no bounce.
    pub fn step(&mut self, motion: Motion, board: &Board) {
        match motion {
            Motion::Down => {
                if self.y + PADDLE_HEIGHT < board.height - WALL {
                    self.y += self.speed;
                }
            }
            Motion::Up => {
                if self.y > WALL {
                    self.y -= self.speed;
                }
            }
            Motion::Idle => {}
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, PADDLE_WIDTH, PADDLE_HEIGHT)
    }
}
