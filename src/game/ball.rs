use super::{Board, Rect, Side, BALL_SIZE, BALL_SPEED, WALL};

/// What happened to the ball during one physics step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallEvent {
    /// A point was scored by the given side; the ball has been re-centered.
    Scored(Side),
    PaddleBounce,
    WallBounce,
}

/// The ball: position of its top-left corner plus velocity.
#[derive(Debug, Clone, Copy)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

impl Ball {
    /// Ball at the board center serving toward the left player.
    pub fn new(board: &Board) -> Self {
        let (cx, cy) = board.center();
        Self {
            x: cx,
            y: cy,
            dx: -BALL_SPEED,
            dy: 0.0,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, BALL_SIZE, BALL_SIZE)
    }

    /// Advance one step: integrate, then check scoring, then paddle
    /// collision, then wall collision. Paddle wins over wall; at most one
    /// collision response per step.
    pub fn step(&mut self, left: &Rect, right: &Rect, board: &Board) -> Option<BallEvent> {
        self.x += self.dx;
        self.y += self.dy;

        if self.x > board.width {
            self.reset(board, Side::Left);
            return Some(BallEvent::Scored(Side::Left));
        }
        if self.x < 0.0 {
            self.reset(board, Side::Right);
            return Some(BallEvent::Scored(Side::Right));
        }

        let rect = self.rect();
        for paddle in [left, right] {
            if rect.intersects(paddle) {
                self.bounce_off(paddle);
                return Some(BallEvent::PaddleBounce);
            }
        }

        if self.y < WALL || self.y + BALL_SIZE > board.height - WALL {
            self.dy = -self.dy;
            return Some(BallEvent::WallBounce);
        }

        None
    }

    /// Reflect horizontally and angle the return by the vertical offset from
    /// the paddle center: a center hit returns flat, an edge hit returns at
    /// the steepest angle, signed with the offset direction.
    fn bounce_off(&mut self, paddle: &Rect) {
        self.dx = -self.dx;
        self.dy = (self.rect().center_y() - paddle.center_y()) / 3.0;
    }

    /// Re-center after a point, serving toward `now_going` with a flat angle.
    fn reset(&mut self, board: &Board, now_going: Side) {
        let (cx, cy) = board.center();
        self.x = cx;
        self.y = cy;
        self.dx = match now_going {
            Side::Left => -BALL_SPEED,
            Side::Right => BALL_SPEED,
        };
        self.dy = 0.0;
    }
}
