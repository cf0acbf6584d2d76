use super::codec::LineCodec;
use super::protocol::{Handshake, StateRecord, SyncedFields};
use crate::frontend::{FrameView, Frontend, SoundEvent};
use crate::game::{Ball, BallEvent, Board, Motion, Paddle, Rect, Scoreboard, Side};
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::{interval, timeout};
use tracing::{info, warn};

/// Bound on the initial connect and handshake; once the match is running no
/// per-message timeout applies.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fixed simulation tick, roughly 60 steps per second.
const TICK: Duration = Duration::from_millis(16);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Connection attempt timed out")]
    ConnectTimeout,
    #[error("Server never sent a handshake")]
    HandshakeTimeout,
    #[error("Malformed handshake: {0}")]
    BadHandshake(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// How a match session ended, surfaced to the user instead of a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Winner(Side),
    Disconnected,
}

/// One endpoint's view of the match and the per-step logic driving it.
///
/// The left side owns ball physics for the whole match; the right side only
/// ever mirrors the ball and scores it receives. Both sides run the same
/// counter-guarded merge, which on the authoritative side never actually
/// overwrites (its own counter is always ahead of any echo) and on the
/// mirroring side always accepts.
#[derive(Debug)]
pub struct EndpointSim {
    pub side: Side,
    pub board: Board,
    pub self_paddle: Paddle,
    /// Position only; written solely from inbound records.
    pub peer_paddle: Paddle,
    pub ball: Ball,
    pub scores: Scoreboard,
    pub sync: u64,
}

impl EndpointSim {
    pub fn new(side: Side, board: Board) -> Self {
        let start_y = board.paddle_start_y();
        Self {
            side,
            board,
            self_paddle: Paddle::new(board.paddle_x(side), start_y),
            peer_paddle: Paddle::new(board.paddle_x(side.opponent()), start_y),
            ball: Ball::new(&board),
            scores: Scoreboard::default(),
            sync: 0,
        }
    }

    /// Whether this endpoint's ball physics is ground truth for the match.
    pub fn is_authoritative(&self) -> bool {
        self.side == Side::Left
    }

    /// One simulation step: apply local input to the own paddle, then, on
    /// the authoritative side of a live match, advance ball physics and
    /// scoring and bump the sync counter by exactly one.
    pub fn step(&mut self, intent: Motion) -> Option<BallEvent> {
        self.self_paddle.step(intent, &self.board);

        if !self.is_authoritative() || self.winner().is_some() {
            return None;
        }

        let (left, right) = self.paddle_rects();
        let event = self.ball.step(&left, &right, &self.board);
        if let Some(BallEvent::Scored(side)) = event {
            self.scores.award(side);
        }
        self.sync += 1;
        event
    }

    /// Merge a freshly arrived remote snapshot: the peer's paddle is taken
    /// unconditionally, ball/scores only past the counter check. Returns
    /// whether the merge changed the scores (a point the mirroring side
    /// learns about second-hand).
    pub fn apply_remote(&mut self, rec: &StateRecord) -> bool {
        let peer_y = match self.side {
            Side::Left => rec.p2_y,
            Side::Right => rec.p1_y,
        };
        if let Some(y) = peer_y {
            self.peer_paddle.y = y;
        }

        let mut fields = SyncedFields {
            ball_x: self.ball.x,
            ball_y: self.ball.y,
            ball_dx: self.ball.dx,
            ball_dy: self.ball.dy,
            score_left: self.scores.left,
            score_right: self.scores.right,
            sync: self.sync,
        };
        if !fields.merge(rec) {
            return false;
        }

        let scored =
            fields.score_left != self.scores.left || fields.score_right != self.scores.right;
        self.ball.x = fields.ball_x;
        self.ball.y = fields.ball_y;
        self.ball.dx = fields.ball_dx;
        self.ball.dy = fields.ball_dy;
        self.scores.left = fields.score_left;
        self.scores.right = fields.score_right;
        self.sync = fields.sync;
        scored
    }

    /// The snapshot this endpoint sends each step. The mirroring side's
    /// counter is whatever it last accepted from the authoritative side.
    pub fn snapshot(&self) -> StateRecord {
        StateRecord {
            paddle_y: Some(self.self_paddle.y),
            ball_x: Some(self.ball.x),
            ball_y: Some(self.ball.y),
            ball_dx: Some(self.ball.dx),
            ball_dy: Some(self.ball.dy),
            score_left: Some(self.scores.left),
            score_right: Some(self.scores.right),
            sync: Some(self.sync),
            ..Default::default()
        }
    }

    pub fn winner(&self) -> Option<Side> {
        self.scores.winner()
    }

    pub fn view(&self) -> FrameView {
        let (left_y, right_y) = match self.side {
            Side::Left => (self.self_paddle.y, self.peer_paddle.y),
            Side::Right => (self.peer_paddle.y, self.self_paddle.y),
        };
        FrameView {
            board: self.board,
            side: self.side,
            left_paddle_y: left_y,
            right_paddle_y: right_y,
            ball_x: self.ball.x,
            ball_y: self.ball.y,
            score_left: self.scores.left,
            score_right: self.scores.right,
            winner: self.winner(),
        }
    }

    fn paddle_rects(&self) -> (Rect, Rect) {
        match self.side {
            Side::Left => (self.self_paddle.rect(), self.peer_paddle.rect()),
            Side::Right => (self.peer_paddle.rect(), self.self_paddle.rect()),
        }
    }
}

/// Most recent snapshot handed from the reader task to the sim loop.
/// Deliberately a single slot, not a queue: a superseded snapshot carries a
/// counter the merge rule would discard anyway.
#[derive(Debug, Default)]
struct Inbox {
    latest: Option<StateRecord>,
    disconnected: bool,
}

/// A connected match session: the sim plus the network plumbing around it.
pub struct Session {
    sim: EndpointSim,
    writer: OwnedWriteHalf,
    inbox: Arc<Mutex<Inbox>>,
}

impl Session {
    /// Connect to the relay and complete the handshake, both under a bounded
    /// timeout. Spawns the reader task that keeps the inbox current.
    pub async fn connect(addr: SocketAddr) -> Result<Self, SessionError> {
        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| SessionError::ConnectTimeout)??;
        let (mut reader, writer) = stream.into_split();

        let mut codec = LineCodec::new();
        let handshake =
            match timeout(CONNECT_TIMEOUT, read_handshake(&mut reader, &mut codec)).await {
                Ok(result) => result?,
                Err(_) => return Err(SessionError::HandshakeTimeout),
            };
        info!(
            "Joined match as {} paddle on a {}x{} board",
            handshake.side, handshake.board_width, handshake.board_height
        );

        let sim = EndpointSim::new(handshake.side, handshake.board());
        let inbox = Arc::new(Mutex::new(Inbox::default()));

        let reader_inbox = inbox.clone();
        tokio::spawn(async move {
            read_loop(reader, codec, reader_inbox).await;
        });

        Ok(Self { sim, writer, inbox })
    }

    /// Drive the match at the fixed tick until it is won or the connection
    /// drops. Per tick: local input, authoritative physics, merge of the
    /// newest remote snapshot, render, send.
    pub async fn run(mut self, frontend: &mut dyn Frontend) -> Result<SessionOutcome> {
        let mut ticker = interval(TICK);

        loop {
            ticker.tick().await;

            let intent = frontend.intent();
            let event = self.sim.step(intent);

            let (latest, disconnected) = {
                let mut inbox = self.inbox.lock().await;
                (inbox.latest.take(), inbox.disconnected)
            };
            let remote_scored = match latest {
                Some(rec) => self.sim.apply_remote(&rec),
                None => false,
            };

            match event {
                Some(BallEvent::Scored(_)) => frontend.play_sound(SoundEvent::Point),
                Some(_) => frontend.play_sound(SoundEvent::Bounce),
                None if remote_scored => frontend.play_sound(SoundEvent::Point),
                None => {}
            }
            frontend.render(&self.sim.view());

            let line = LineCodec::encode(&serde_json::to_string(&self.sim.snapshot())?);
            if let Err(e) = self.writer.write_all(line.as_bytes()).await {
                warn!("Failed to send snapshot: {}", e);
                return Ok(SessionOutcome::Disconnected);
            }

            if disconnected {
                info!("Relay connection closed");
                return Ok(SessionOutcome::Disconnected);
            }
            if let Some(winner) = self.sim.winner() {
                return Ok(SessionOutcome::Winner(winner));
            }
        }
    }
}

async fn read_handshake(
    reader: &mut OwnedReadHalf,
    codec: &mut LineCodec,
) -> Result<Handshake, SessionError> {
    let mut buf = [0u8; 1024];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Err(SessionError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed before handshake",
            )));
        }
        if let Some(record) = codec.feed(&buf[..n]).into_iter().next() {
            return Ok(serde_json::from_str(&record)?);
        }
    }
}

/// Blocking-read task: feeds the codec and overwrites the inbox with each
/// parsed record so the sim loop never waits on the network.
async fn read_loop(mut reader: OwnedReadHalf, mut codec: LineCodec, inbox: Arc<Mutex<Inbox>>) {
    let mut buf = [0u8; 1024];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                for record in codec.feed(&buf[..n]) {
                    match serde_json::from_str::<StateRecord>(&record) {
                        Ok(rec) => inbox.lock().await.latest = Some(rec),
                        Err(e) => {
                            warn!("Dropping malformed record from relay: {} - '{}'", e, record)
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Read error from relay: {}", e);
                break;
            }
        }
    }
    inbox.lock().await.disconnected = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(sync: u64, ball_x: f32) -> StateRecord {
        StateRecord {
            p1_y: Some(50.0),
            p2_y: Some(60.0),
            ball_x: Some(ball_x),
            ball_y: Some(240.0),
            ball_dx: Some(5.0),
            ball_dy: Some(0.0),
            score_left: Some(0),
            score_right: Some(0),
            sync: Some(sync),
            ..Default::default()
        }
    }

    #[test]
    fn test_authoritative_sync_increments_per_step() {
        let mut sim = EndpointSim::new(Side::Left, Board::default());
        for expected in 1..=5 {
            sim.step(Motion::Idle);
            assert_eq!(sim.sync, expected);
        }
        assert_eq!(sim.snapshot().sync, Some(5));
    }

    #[test]
    fn test_mirror_never_advances_ball_or_counter() {
        let mut sim = EndpointSim::new(Side::Right, Board::default());
        let ball_before = sim.ball.x;
        sim.step(Motion::Idle);
        sim.step(Motion::Idle);
        assert_eq!(sim.ball.x, ball_before);
        assert_eq!(sim.sync, 0);
    }

    #[test]
    fn test_mirror_accepts_and_echoes_server_counter() {
        let mut sim = EndpointSim::new(Side::Right, Board::default());
        assert!(!sim.apply_remote(&remote(7, 42.0)));
        assert_eq!(sim.ball.x, 42.0);
        assert_eq!(sim.sync, 7);
        // The mirroring side echoes the counter it last accepted
        assert_eq!(sim.snapshot().sync, Some(7));
    }

    #[test]
    fn test_authoritative_ignores_stale_echo_but_takes_peer_paddle() {
        let mut sim = EndpointSim::new(Side::Left, Board::default());
        sim.step(Motion::Idle);
        sim.step(Motion::Idle);
        sim.step(Motion::Idle);
        let ball_before = sim.ball;

        let mut stale = remote(2, 999.0);
        stale.p2_y = Some(333.0);
        sim.apply_remote(&stale);

        assert_eq!(sim.ball.x, ball_before.x);
        assert_eq!(sim.sync, 3);
        assert_eq!(sim.peer_paddle.y, 333.0);
    }

    #[test]
    fn test_peer_paddle_field_depends_on_side() {
        let mut left = EndpointSim::new(Side::Left, Board::default());
        left.apply_remote(&remote(1, 100.0));
        assert_eq!(left.peer_paddle.y, 60.0); // p2 is the left player's peer

        let mut right = EndpointSim::new(Side::Right, Board::default());
        right.apply_remote(&remote(1, 100.0));
        assert_eq!(right.peer_paddle.y, 50.0); // p1 is the right player's peer
    }

    #[test]
    fn test_snapshot_carries_own_paddle_only() {
        let sim = EndpointSim::new(Side::Left, Board::default());
        let snap = sim.snapshot();
        assert_eq!(snap.paddle_y, Some(215.0));
        assert_eq!(snap.p1_y, None);
        assert_eq!(snap.p2_y, None);
    }

    #[test]
    fn test_remote_score_change_is_reported() {
        let mut sim = EndpointSim::new(Side::Right, Board::default());
        let mut rec = remote(3, 320.0);
        rec.score_left = Some(1);
        assert!(sim.apply_remote(&rec));
        assert_eq!(sim.scores.left, 1);

        // Same scores again: accepted but no new point
        let rec = StateRecord {
            score_left: Some(1),
            sync: Some(4),
            ..Default::default()
        };
        assert!(!sim.apply_remote(&rec));
    }

    #[test]
    fn test_win_halts_ball_physics() {
        let mut sim = EndpointSim::new(Side::Left, Board::default());
        sim.scores.left = 5;
        assert_eq!(sim.winner(), Some(Side::Left));

        let ball_before = sim.ball.x;
        let sync_before = sim.sync;
        sim.step(Motion::Idle);
        assert_eq!(sim.ball.x, ball_before);
        assert_eq!(sim.sync, sync_before);
    }

    #[test]
    fn test_authoritative_scores_on_crossing() {
        let mut sim = EndpointSim::new(Side::Left, Board::default());
        sim.ball.x = sim.board.width - 1.0;
        sim.ball.dx = 5.0;
        sim.ball.dy = 0.0;

        let event = sim.step(Motion::Idle);
        assert_eq!(event, Some(BallEvent::Scored(Side::Left)));
        assert_eq!(sim.scores.left, 1);
        assert_eq!((sim.ball.x, sim.ball.y), sim.board.center());
    }

    /// Server that sends one handshake and hangs up straight away.
    async fn handshake_only_server() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let handshake = Handshake::new(&Board::default(), Side::Right);
            let line = LineCodec::encode(&serde_json::to_string(&handshake).unwrap());
            stream.write_all(line.as_bytes()).await.unwrap();
            // Dropping the stream closes the connection
        });
        addr
    }

    #[tokio::test]
    async fn test_closed_connection_surfaces_disconnect() {
        let addr = handshake_only_server().await;

        let session = Session::connect(addr).await.unwrap();
        let mut frontend = crate::frontend::NullFrontend;
        let outcome = session.run(&mut frontend).await.unwrap();
        assert_eq!(outcome, SessionOutcome::Disconnected);
    }
}
