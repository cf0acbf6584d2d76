use crate::game::{Board, Motion, Side, BALL_SIZE, PADDLE_HEIGHT};
use std::io::Write;
use tracing::debug;

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView {
    pub board: Board,
    pub side: Side,
    pub left_paddle_y: f32,
    pub right_paddle_y: f32,
    pub ball_x: f32,
    pub ball_y: f32,
    pub score_left: u32,
    pub score_right: u32,
    pub winner: Option<Side>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEvent {
    Bounce,
    Point,
}

/// Seam to the host toolkit: rendering, input capture, and audio live on the
/// other side of this trait and contribute no protocol logic.
pub trait Frontend {
    /// The local paddle's motion intent for this step.
    fn intent(&mut self) -> Motion;
    fn render(&mut self, view: &FrameView);
    /// Fire-and-forget audio cue.
    fn play_sound(&mut self, event: SoundEvent);
}

/// Headless frontend for tests and unattended endpoints.
#[derive(Debug, Default)]
pub struct NullFrontend;

impl Frontend for NullFrontend {
    fn intent(&mut self) -> Motion {
        Motion::Idle
    }

    fn render(&mut self, _view: &FrameView) {}

    fn play_sound(&mut self, event: SoundEvent) {
        debug!("Sound: {:?}", event);
    }
}

const GRID_COLS: usize = 64;
const GRID_ROWS: usize = 20;
/// Redraw every Nth simulation step; a full-rate terminal redraw flickers.
const REDRAW_EVERY: u64 = 6;

/// Minimal ANSI terminal renderer. Stands in for a real graphics frontend;
/// input capture stays out of scope so the paddle idles unless a different
/// frontend supplies intent.
#[derive(Debug, Default)]
pub struct TermFrontend {
    frame: u64,
}

impl TermFrontend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Frontend for TermFrontend {
    fn intent(&mut self) -> Motion {
        Motion::Idle
    }

    fn render(&mut self, view: &FrameView) {
        self.frame += 1;
        if self.frame % REDRAW_EVERY != 0 && view.winner.is_none() {
            return;
        }

        let mut grid = vec![vec![' '; GRID_COLS]; GRID_ROWS];
        let sx = GRID_COLS as f32 / view.board.width;
        let sy = GRID_ROWS as f32 / view.board.height;

        let paddle_cells = ((PADDLE_HEIGHT * sy).round() as usize).max(1);
        for (col, top) in [(1, view.left_paddle_y), (GRID_COLS - 2, view.right_paddle_y)] {
            let row = (top * sy) as usize;
            for r in row..(row + paddle_cells).min(GRID_ROWS) {
                grid[r][col] = '#';
            }
        }

        let ball_row = (((view.ball_y + BALL_SIZE / 2.0) * sy) as usize).min(GRID_ROWS - 1);
        let ball_col = (((view.ball_x + BALL_SIZE / 2.0) * sx) as usize).min(GRID_COLS - 1);
        grid[ball_row][ball_col] = 'o';

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        // Clear screen and move the cursor to the top-left
        let _ = write!(out, "\x1b[2J\x1b[1;1H");
        let _ = writeln!(
            out,
            "netpong ({} paddle)   {:>2} : {:<2}",
            view.side, view.score_left, view.score_right
        );
        let _ = writeln!(out, "{}", "=".repeat(GRID_COLS));
        for row in &grid {
            let _ = writeln!(out, "{}", row.iter().collect::<String>());
        }
        let _ = writeln!(out, "{}", "=".repeat(GRID_COLS));
        if let Some(winner) = view.winner {
            let _ = writeln!(out, "*** {} player wins! ***", winner);
        }
        let _ = out.flush();
    }

    fn play_sound(&mut self, event: SoundEvent) {
        debug!("Sound: {:?}", event);
    }
}
