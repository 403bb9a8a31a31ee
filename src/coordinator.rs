//! Game session management.
//!
//! A [`GameCoordinator`] owns the authoritative board, the annotation and the
//! two engines. Engines compute on their own threads and report moves through
//! [`MoveSink::enter_move`]; the coordinator queues those reports and applies
//! them on its own worker thread, in order, then asks the side to move for the
//! next move.
//!
//! Every report carries the game id it was requested under. Pausing,
//! restarting, rewinding or loading bumps the id, so anything computed for a
//! superseded position is dropped even if the engine ignores cancellation.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};

use log::{debug, error, info, warn};

use crate::annotation::{self, GameRecord, Replay};
use crate::board::{Board, MatchResult, Move, Player};
use crate::constants::MAX_GAME_LEN;
use crate::engine::{Engine, EngineLink, MoveSink};
use crate::error::{PersistenceError, ReversiError};
use crate::presenter::Presenter;
use crate::sync::lock;

/// Where the session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// No game started, or the last one has finished.
    NoGame,
    InProgress,
    Paused,
}

enum Command {
    Exit,
    Move { mv: Move, game_id: u64 },
}

enum Notice {
    Board(Board, Option<Move>),
    Result(MatchResult),
}

struct State {
    board: Board,
    annotation: Vec<Move>,
    prev_skip: bool,
    dirty: bool,
    game_id: u64,
    status: GameStatus,
    result: MatchResult,
    black: Option<EngineLink>,
    white: Option<EngineLink>,
    queue: VecDeque<Command>,
}

impl State {
    fn link(&self, side: Player) -> Option<&EngineLink> {
        match side {
            Player::Black => self.black.as_ref(),
            Player::White => self.white.as_ref(),
        }
    }

    fn links(&self) -> impl Iterator<Item = &EngineLink> {
        self.black.iter().chain(self.white.iter())
    }

    fn has_both_engines(&self) -> bool {
        self.black.is_some() && self.white.is_some()
    }

    /// Cancels both engines and invalidates every outstanding request.
    fn invalidate(&mut self) {
        for link in self.links() {
            link.request_cancel();
        }
        self.game_id += 1;
    }

    fn pause(&mut self) {
        if self.status == GameStatus::InProgress {
            self.invalidate();
            self.status = GameStatus::Paused;
        }
    }

    /// Asks the side to move for its next move under the current game id.
    fn dispatch(&self, sink: &Weak<dyn MoveSink>) {
        let side = self.board.next_player();
        match self.link(side) {
            Some(link) => link.request_compute(sink.clone(), self.game_id),
            None => warn!("no engine loaded for {side}"),
        }
    }

    fn sync_engines(&self) {
        for link in self.links() {
            link.change_position(self.board);
        }
    }

    /// Applies a move reported by an engine. Runs on the worker thread.
    fn apply_reported(&mut self, mv: Move, game_id: u64, sink: &Weak<dyn MoveSink>) -> Vec<Notice> {
        if game_id != self.game_id || self.status != GameStatus::InProgress {
            debug!("dropping stale move {mv} from game {game_id}");
            return Vec::new();
        }
        let side = self.board.next_player();
        if !self.board.is_legal(mv) {
            error!("{side} engine reported illegal move {mv}; pausing game");
            self.pause();
            return Vec::new();
        }

        self.annotation.push(mv);
        self.dirty = true;
        for link in self.links() {
            if let Err(e) = link.enter_move(mv) {
                warn!("{} rejected {mv}: {e}", link.name());
            }
        }
        if let Err(e) = self.board.play(mv) {
            error!("applying {mv} failed: {e}");
        }
        debug!("{side} plays {mv}");

        let mut notices = vec![Notice::Board(self.board, Some(mv))];
        if mv.is_skip() && self.prev_skip {
            self.status = GameStatus::NoGame;
            self.game_id += 1;
            self.result = self.board.count();
            info!("game over after {} plies: {}", self.annotation.len(), self.result);
            notices.push(Notice::Result(self.result));
            return notices;
        }
        self.prev_skip = mv.is_skip();
        self.dispatch(sink);
        notices
    }

    /// Installs a validated position. The game is left paused, or finished
    /// if the annotation ends the game.
    fn commit(&mut self, moves: Vec<Move>, replayed: Replay) -> Vec<Notice> {
        self.invalidate();
        self.queue.retain(|c| matches!(c, Command::Exit));
        self.board = replayed.board;
        self.prev_skip = replayed.prev_skip;
        self.result = replayed.result;
        self.dirty = false;
        self.status = if replayed.is_finished() {
            GameStatus::NoGame
        } else {
            GameStatus::Paused
        };
        let last = moves.last().copied();
        self.annotation = moves;
        self.sync_engines();

        let mut notices = vec![Notice::Board(self.board, last)];
        if replayed.is_finished() {
            notices.push(Notice::Result(self.result));
        }
        notices
    }
}

struct Shared {
    state: Mutex<State>,
    wakeup: Condvar,
    presenter: Arc<dyn Presenter>,
}

impl Shared {
    fn notify(&self, notices: Vec<Notice>) {
        for notice in notices {
            match notice {
                Notice::Board(board, last_move) => self.presenter.update_board(&board, last_move),
                Notice::Result(result) => self.presenter.announce_game_result(result),
            }
        }
    }
}

impl MoveSink for Shared {
    fn enter_move(&self, mv: Move, game_id: u64) {
        {
            let mut state = lock(&self.state);
            if game_id != state.game_id || state.status != GameStatus::InProgress {
                debug!("ignoring move {mv} reported for game {game_id}");
                return;
            }
            state.queue.push_back(Command::Move { mv, game_id });
        }
        self.wakeup.notify_one();
    }
}

fn sink_of(shared: &Arc<Shared>) -> Weak<dyn MoveSink> {
    let weak: Weak<Shared> = Arc::downgrade(shared);
    weak
}

fn mainloop(shared: Arc<Shared>) {
    let sink = sink_of(&shared);
    loop {
        let mut state = shared
            .wakeup
            .wait_while(lock(&shared.state), |s| s.queue.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        let notices = match state.queue.pop_front() {
            Some(Command::Exit) => break,
            Some(Command::Move { mv, game_id }) => state.apply_reported(mv, game_id, &sink),
            None => continue,
        };
        drop(state);
        shared.notify(notices);
    }
    debug!("coordinator worker exiting");
}

/// Runs games between two engines.
///
/// Dropping the coordinator stops its worker thread, then stops and joins
/// both engines.
pub struct GameCoordinator {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
    black: Option<Engine>,
    white: Option<Engine>,
}

impl GameCoordinator {
    pub fn new(presenter: Arc<dyn Presenter>) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                board: Board::new(),
                annotation: Vec::with_capacity(MAX_GAME_LEN),
                prev_skip: false,
                dirty: false,
                game_id: 0,
                status: GameStatus::NoGame,
                result: MatchResult::InProgress,
                black: None,
                white: None,
                queue: VecDeque::new(),
            }),
            wakeup: Condvar::new(),
            presenter,
        });
        let worker = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("coordinator".to_string())
            .spawn(move || mainloop(worker))
            .map_err(|e| error!("could not spawn coordinator thread: {e}"))
            .ok();
        Self {
            shared,
            thread,
            black: None,
            white: None,
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.shared.state)
    }

    fn sink(&self) -> Weak<dyn MoveSink> {
        sink_of(&self.shared)
    }

    /// Installs the engine playing Black, replacing any previous one.
    pub fn load_black_engine(&mut self, engine: Engine) -> Result<(), ReversiError> {
        self.load_engine(Player::Black, engine)
    }

    /// Installs the engine playing White, replacing any previous one.
    pub fn load_white_engine(&mut self, engine: Engine) -> Result<(), ReversiError> {
        self.load_engine(Player::White, engine)
    }

    fn load_engine(&mut self, side: Player, engine: Engine) -> Result<(), ReversiError> {
        {
            let mut state = self.state();
            if state.status == GameStatus::InProgress {
                return Err(ReversiError::rules(
                    "engines cannot be changed while a game is in progress",
                ));
            }
            engine.change_position(state.board);
            let slot = match side {
                Player::Black => &mut state.black,
                Player::White => &mut state.white,
            };
            *slot = Some(engine.link());
        }
        let previous = match side {
            Player::Black => self.black.replace(engine),
            Player::White => self.white.replace(engine),
        };
        // Joined here, outside the state lock.
        drop(previous);
        Ok(())
    }

    /// Starts a fresh game and asks Black for the first move.
    pub fn start_new(&self) -> Result<(), ReversiError> {
        let notices = {
            let mut state = self.state();
            let (Some(black), Some(white)) = (state.black.clone(), state.white.clone()) else {
                return Err(ReversiError::rules(
                    "both sides need an engine before a game can start",
                ));
            };
            if black.same_engine(&white) {
                return Err(ReversiError::rules("one engine cannot play both sides"));
            }
            state.invalidate();
            state.queue.retain(|c| matches!(c, Command::Exit));
            state.board = Board::new();
            state.annotation.clear();
            state.prev_skip = false;
            state.dirty = false;
            state.result = MatchResult::InProgress;
            state.status = GameStatus::InProgress;
            state.sync_engines();
            info!(
                "game {} started: {} (Black) vs {} (White)",
                state.game_id,
                black.name(),
                white.name()
            );
            state.dispatch(&self.sink());
            vec![Notice::Board(state.board, None)]
        };
        self.shared.notify(notices);
        Ok(())
    }

    /// Suspends a running game. Work already in flight is discarded.
    pub fn pause_game(&self) {
        let mut state = self.state();
        if state.status == GameStatus::InProgress {
            state.pause();
            info!("game paused at ply {}", state.annotation.len());
        }
    }

    /// Continues a paused game by asking the side to move for a move.
    pub fn resume_game(&self) {
        let mut state = self.state();
        if state.status != GameStatus::Paused {
            return;
        }
        if !state.has_both_engines() {
            warn!("cannot resume without both engines loaded");
            return;
        }
        state.status = GameStatus::InProgress;
        state.dispatch(&self.sink());
        info!("game resumed at ply {}", state.annotation.len());
    }

    /// Undoes the last move of each side (or everything, if fewer than two
    /// moves were played) and resumes play.
    pub fn take_back(&self) -> Result<(), ReversiError> {
        let notices = {
            let mut state = self.state();
            if !state.has_both_engines() {
                return Err(ReversiError::rules(
                    "both sides need an engine to take back moves",
                ));
            }
            if state.status == GameStatus::NoGame && state.annotation.is_empty() {
                return Err(ReversiError::rules("no game to take back"));
            }
            let keep = state.annotation.len().saturating_sub(2);
            let replayed = annotation::replay(&state.annotation[..keep])?;

            state.invalidate();
            state.queue.retain(|c| matches!(c, Command::Exit));
            state.annotation.truncate(keep);
            state.board = replayed.board;
            state.prev_skip = replayed.prev_skip;
            state.result = MatchResult::InProgress;
            state.dirty = true;
            state.sync_engines();
            state.status = GameStatus::InProgress;
            state.dispatch(&self.sink());
            info!("took back to ply {keep}");
            vec![Notice::Board(state.board, None)]
        };
        self.shared.notify(notices);
        Ok(())
    }

    /// Copy of the authoritative board.
    pub fn board(&self) -> Board {
        self.state().board
    }

    /// Moves played so far; skips are [`Move::SKIP`].
    pub fn annotation(&self) -> Vec<Move> {
        self.state().annotation.clone()
    }

    pub fn status(&self) -> GameStatus {
        self.state().status
    }

    /// Result of the last finished game, or `InProgress`.
    pub fn result(&self) -> MatchResult {
        self.state().result
    }

    pub fn game_id(&self) -> u64 {
        self.state().game_id
    }

    /// The annotation changed since the last save or load.
    pub fn is_dirty(&self) -> bool {
        self.state().dirty
    }

    /// Names of the loaded engines as (Black, White).
    pub fn engine_names(&self) -> (Option<&'static str>, Option<&'static str>) {
        (
            self.black.as_ref().map(Engine::name),
            self.white.as_ref().map(Engine::name),
        )
    }

    /// Snapshot of the game for saving.
    pub fn to_record(&self) -> Result<GameRecord, ReversiError> {
        let (Some(black), Some(white)) = self.engine_names() else {
            return Err(ReversiError::rules("both engines must be loaded to save"));
        };
        Ok(GameRecord {
            moves: self.annotation(),
            black_engine_name: black.to_string(),
            white_engine_name: white.to_string(),
        })
    }

    /// Serializes the game and clears the dirty flag.
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        let json = self.to_record()?.to_json()?;
        self.state().dirty = false;
        Ok(json)
    }

    /// Loads a JSON game record. See [`GameCoordinator::load_record`].
    pub fn from_json<F>(&mut self, json: &str, factory: F) -> Result<(), PersistenceError>
    where
        F: FnMut(Player, &str) -> Option<Engine>,
    {
        self.load_record(GameRecord::from_json(json)?, factory)
    }

    /// Replaces the current game with `record`.
    ///
    /// Every move is checked by replaying it. `factory` builds an engine for
    /// each side from its saved name. On any failure nothing changes. On
    /// success the game is paused (or finished, if the record ends the game).
    pub fn load_record<F>(&mut self, record: GameRecord, mut factory: F) -> Result<(), PersistenceError>
    where
        F: FnMut(Player, &str) -> Option<Engine>,
    {
        let replayed = annotation::replay(&record.moves)?;
        let black = factory(Player::Black, &record.black_engine_name)
            .ok_or_else(|| PersistenceError::UnknownEngine(record.black_engine_name.clone()))?;
        let white = factory(Player::White, &record.white_engine_name)
            .ok_or_else(|| PersistenceError::UnknownEngine(record.white_engine_name.clone()))?;

        let old_black = self.black.replace(black);
        let old_white = self.white.replace(white);
        let notices = {
            let mut state = self.state();
            // Cancel the outgoing engines before their links are replaced.
            state.invalidate();
            state.black = self.black.as_ref().map(Engine::link);
            state.white = self.white.as_ref().map(Engine::link);
            state.commit(record.moves, replayed)
        };
        drop(old_black);
        drop(old_white);
        info!("loaded game with {} plies", self.state().annotation.len());
        self.shared.notify(notices);
        Ok(())
    }

    /// The annotation in the legacy text format.
    pub fn to_legacy_text(&self) -> String {
        annotation::to_legacy_text(&self.state().annotation)
    }

    /// Loads moves in the legacy text format, keeping the current engines.
    /// On failure nothing changes.
    pub fn load_legacy_text(&self, text: &str) -> Result<(), PersistenceError> {
        let moves = annotation::parse_legacy_text(text)?;
        let replayed = annotation::replay(&moves)?;
        let notices = self.state().commit(moves, replayed);
        self.shared.notify(notices);
        Ok(())
    }
}

impl Drop for GameCoordinator {
    fn drop(&mut self) {
        {
            let mut state = self.state();
            state.status = GameStatus::NoGame;
            state.invalidate();
            state.queue.push_back(Command::Exit);
        }
        self.shared.wakeup.notify_one();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("coordinator thread panicked");
            }
        }
        // The engines are dropped (and joined) after this.
    }
}
