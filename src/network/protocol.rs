use crate::game::{Board, Side};
use serde::{Deserialize, Serialize};

/// Sent by the relay exactly once per connection, immediately after accept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handshake {
    pub board_width: u32,
    pub board_height: u32,
    pub side: Side,
}

impl Handshake {
    pub fn new(board: &Board, side: Side) -> Self {
        Self {
            board_width: board.width as u32,
            board_height: board.height as u32,
            side,
        }
    }

    pub fn board(&self) -> Board {
        Board::new(self.board_width as f32, self.board_height as f32)
    }
}

/// One snapshot of shared state on the wire, in either direction.
///
/// Every field is optional: a missing field means "keep your current value"
/// on the receiving side, so partially populated records degrade gracefully
/// instead of failing. Endpoints send `paddle_y` for their own paddle; the
/// relay echoes both paddles as `p1_y`/`p2_y`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paddle_y: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p1_y: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p2_y: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ball_x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ball_y: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ball_dx: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ball_dy: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_left: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_right: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<u64>,
}

impl StateRecord {
    /// The counter an inbound record claims; absent counters rank lowest.
    pub fn sync_or_zero(&self) -> u64 {
        self.sync.unwrap_or(0)
    }
}

/// The counter-guarded half of a snapshot: ball, scores, and the sync
/// counter that decides which of two concurrently-held copies is newer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncedFields {
    pub ball_x: f32,
    pub ball_y: f32,
    pub ball_dx: f32,
    pub ball_dy: f32,
    pub score_left: u32,
    pub score_right: u32,
    pub sync: u64,
}

impl SyncedFields {
    /// Match-start defaults: ball centered serving left, zero scores, sync 0.
    pub fn new(board: &Board) -> Self {
        let ball = crate::game::Ball::new(board);
        Self {
            ball_x: ball.x,
            ball_y: ball.y,
            ball_dx: ball.dx,
            ball_dy: ball.dy,
            score_left: 0,
            score_right: 0,
            sync: 0,
        }
    }

    /// Last-writer-wins merge keyed on the sync counter.
    ///
    /// Applies the inbound record's ball/score fields only if its counter is
    /// at least ours; a stale record leaves everything untouched. Returns
    /// whether the record was accepted. This one rule runs identically on
    /// the relay and on both endpoints.
    pub fn merge(&mut self, rec: &StateRecord) -> bool {
        let inbound = rec.sync_or_zero();
        if inbound < self.sync {
            return false;
        }

        if let Some(v) = rec.ball_x {
            self.ball_x = v;
        }
        if let Some(v) = rec.ball_y {
            self.ball_y = v;
        }
        if let Some(v) = rec.ball_dx {
            self.ball_dx = v;
        }
        if let Some(v) = rec.ball_dy {
            self.ball_dy = v;
        }
        if let Some(v) = rec.score_left {
            self.score_left = v;
        }
        if let Some(v) = rec.score_right {
            self.score_right = v;
        }
        self.sync = self.sync.max(inbound);
        true
    }
}

/// The relay's single shared snapshot: counter-guarded fields plus both
/// paddles. Mutated only inside the relay's per-message critical section.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedState {
    pub fields: SyncedFields,
    pub p1_y: f32,
    pub p2_y: f32,
}

impl SharedState {
    pub fn new(board: &Board) -> Self {
        Self {
            fields: SyncedFields::new(board),
            p1_y: board.paddle_start_y(),
            p2_y: board.paddle_start_y(),
        }
    }

    /// Apply one inbound record from the given side: the sender's own
    /// paddle is taken unconditionally (only they can produce it), the rest
    /// goes through the counter-guarded merge.
    pub fn apply(&mut self, from: Side, rec: &StateRecord) -> bool {
        if let Some(y) = rec.paddle_y {
            match from {
                Side::Left => self.p1_y = y,
                Side::Right => self.p2_y = y,
            }
        }
        self.fields.merge(rec)
    }

    /// Copy out the full shared snapshot for echoing back to a sender.
    pub fn to_record(&self) -> StateRecord {
        StateRecord {
            paddle_y: None,
            p1_y: Some(self.p1_y),
            p2_y: Some(self.p2_y),
            ball_x: Some(self.fields.ball_x),
            ball_y: Some(self.fields.ball_y),
            ball_dx: Some(self.fields.ball_dx),
            ball_dy: Some(self.fields.ball_dy),
            score_left: Some(self.fields.score_left),
            score_right: Some(self.fields.score_right),
            sync: Some(self.fields.sync),
        }
    }
}
