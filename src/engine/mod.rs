//! Asynchronous move engines.
//!
//! An [`Engine`] owns a worker thread and a private copy of the board. The
//! thread sleeps on a one-slot mailbox until asked to compute, snapshots the
//! board, runs its [`Strategy`] and reports the move to a [`MoveSink`] tagged
//! with the game id it was asked for.
//!
//! Cancellation is cooperative: [`Engine::request_cancel`] raises a flag that
//! strategies poll. A cancelled computation reports nothing. A new request
//! made while a computation is still running cancels that computation. The sink is held
//! through a [`Weak`] reference resolved only when reporting, so a sink that
//! has already been torn down simply swallows the result.

pub mod random;
pub mod user_input;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::thread::{self, JoinHandle};

use log::{debug, warn};

use crate::board::{Board, Move};
use crate::error::{ComputeError, ReversiError};
use crate::sync::lock;

pub use random::RandomChoice;
pub use user_input::{UserInput, UserInputHandle};

/// A move-selection algorithm run on an engine's worker thread.
pub trait Strategy: Send + 'static {
    /// Stable identifier used in saved games.
    fn name(&self) -> &'static str;

    /// Chooses a move for the side to move on `board`.
    ///
    /// Must check `cancel` regularly and return [`ComputeError::Cancelled`]
    /// once it is set instead of producing a move.
    fn compute_move(&mut self, board: &Board, cancel: &AtomicBool) -> Result<Move, ComputeError>;
}

/// Receiver of computed moves.
pub trait MoveSink: Send + Sync {
    fn enter_move(&self, mv: Move, game_id: u64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    None,
    Exit,
    Compute,
}

struct Mailbox {
    command: Command,
    game_id: u64,
    sink: Option<Weak<dyn MoveSink>>,
    /// Cancellation requested for a computation not yet picked up.
    cancel_pending: bool,
    /// The worker is inside `compute_move`.
    busy: bool,
}

struct Shared {
    mailbox: Mutex<Mailbox>,
    wakeup: Condvar,
    board: Mutex<Board>,
    cancel: AtomicBool,
    name: &'static str,
}

/// Cloneable access to an engine's mailbox and board, without ownership of
/// its thread.
#[derive(Clone)]
pub(crate) struct EngineLink {
    shared: Arc<Shared>,
}

impl EngineLink {
    pub(crate) fn name(&self) -> &'static str {
        self.shared.name
    }

    pub(crate) fn enter_move(&self, mv: Move) -> Result<(), ReversiError> {
        lock(&self.shared.board).play(mv)
    }

    pub(crate) fn change_position(&self, board: Board) {
        *lock(&self.shared.board) = board;
    }

    pub(crate) fn request_compute(&self, sink: Weak<dyn MoveSink>, game_id: u64) {
        {
            let mut mailbox = lock(&self.shared.mailbox);
            if mailbox.command == Command::Exit {
                return;
            }
            mailbox.command = Command::Compute;
            mailbox.game_id = game_id;
            mailbox.sink = Some(sink);
            mailbox.cancel_pending = false;
            if mailbox.busy {
                // Superseded. The worker resets the flag when it picks this up.
                self.shared.cancel.store(true, Ordering::Release);
            }
        }
        self.shared.wakeup.notify_one();
    }

    pub(crate) fn request_cancel(&self) {
        lock(&self.shared.mailbox).cancel_pending = true;
        self.shared.cancel.store(true, Ordering::Release);
    }

    pub(crate) fn same_engine(&self, other: &EngineLink) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

/// A strategy running on its own worker thread.
///
/// Dropping the engine cancels any computation, stops the thread and joins it.
pub struct Engine {
    link: EngineLink,
    thread: Option<JoinHandle<()>>,
}

impl Engine {
    /// Launches the worker thread for `strategy`.
    pub fn new(strategy: impl Strategy) -> Self {
        Self::from_boxed(Box::new(strategy))
    }

    pub fn from_boxed(strategy: Box<dyn Strategy>) -> Self {
        let shared = Arc::new(Shared {
            mailbox: Mutex::new(Mailbox {
                command: Command::None,
                game_id: 0,
                sink: None,
                cancel_pending: false,
                busy: false,
            }),
            wakeup: Condvar::new(),
            board: Mutex::new(Board::new()),
            cancel: AtomicBool::new(false),
            name: strategy.name(),
        });
        let worker = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name(format!("engine-{}", shared.name))
            .spawn(move || mainloop(worker, strategy))
            .ok();
        if thread.is_none() {
            warn!("could not spawn worker thread for {}", shared.name);
        }
        Engine {
            link: EngineLink { shared },
            thread,
        }
    }

    /// Identifier of the strategy, e.g. `"RandomChoice"`.
    pub fn name(&self) -> &'static str {
        self.link.name()
    }

    /// Applies a move (or skip) to the engine's private board.
    pub fn enter_move(&self, mv: Move) -> Result<(), ReversiError> {
        self.link.enter_move(mv)
    }

    /// Replaces the engine's private board.
    pub fn change_position(&self, board: Board) {
        self.link.change_position(board)
    }

    /// Copy of the engine's private board.
    pub fn board(&self) -> Board {
        *lock(&self.link.shared.board)
    }

    /// Asks for a move on the current private board, reported to `sink`
    /// tagged with `game_id`. Returns immediately. Clears any cancellation
    /// requested before this call and cancels a computation still running.
    pub fn request_compute(&self, sink: Weak<dyn MoveSink>, game_id: u64) {
        self.link.request_compute(sink, game_id)
    }

    /// Signals the current or next computation to give up. Never blocks.
    pub fn request_cancel(&self) {
        self.link.request_cancel()
    }

    pub(crate) fn link(&self) -> EngineLink {
        self.link.clone()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let shared = &self.link.shared;
        {
            let mut mailbox = lock(&shared.mailbox);
            mailbox.command = Command::Exit;
            shared.cancel.store(true, Ordering::Release);
        }
        shared.wakeup.notify_one();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("worker thread of {} panicked", shared.name);
            }
        }
    }
}

fn mainloop(shared: Arc<Shared>, mut strategy: Box<dyn Strategy>) {
    loop {
        let (game_id, sink) = {
            let mut mailbox = shared
                .wakeup
                .wait_while(lock(&shared.mailbox), |m| m.command == Command::None)
                .unwrap_or_else(PoisonError::into_inner);
            if mailbox.command == Command::Exit {
                break;
            }
            mailbox.command = Command::None;
            mailbox.busy = true;
            shared
                .cancel
                .store(mailbox.cancel_pending, Ordering::Release);
            (mailbox.game_id, mailbox.sink.take())
        };
        let board = *lock(&shared.board);
        match strategy.compute_move(&board, &shared.cancel) {
            Ok(mv) => match sink.and_then(|s| s.upgrade()) {
                Some(sink) => sink.enter_move(mv, game_id),
                None => debug!("{}: sink gone, dropping {mv}", shared.name),
            },
            Err(ComputeError::Cancelled) => debug!("{}: computation cancelled", shared.name),
            Err(e) => warn!("{}: computation failed: {e}", shared.name),
        }
        lock(&shared.mailbox).busy = false;
    }
    debug!("{}: worker exiting", shared.name);
}
