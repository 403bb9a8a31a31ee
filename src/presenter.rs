//! Callbacks from a game coordinator to whatever displays the game.
//!
//! Callbacks run on the coordinator's worker thread (or on the thread that
//! called a coordinator method), never while coordinator state is locked, so
//! implementations may query the coordinator.

use std::sync::Mutex;
use std::sync::mpsc::Sender;

use crate::board::{Board, MatchResult, Move};
use crate::sync::lock;

pub trait Presenter: Send + Sync {
    /// The position changed. `last_move` is `None` when the position was
    /// reset or rewound rather than advanced by a move.
    fn update_board(&self, board: &Board, last_move: Option<Move>);

    /// The game ended.
    fn announce_game_result(&self, result: MatchResult);
}

/// Ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn update_board(&self, _: &Board, _: Option<Move>) {}

    fn announce_game_result(&self, _: MatchResult) {}
}

/// A notification forwarded by [`ChannelPresenter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterEvent {
    Board { board: Board, last_move: Option<Move> },
    Result(MatchResult),
}

/// Forwards notifications into a channel.
pub struct ChannelPresenter {
    tx: Mutex<Sender<PresenterEvent>>,
}

impl ChannelPresenter {
    pub fn new(tx: Sender<PresenterEvent>) -> Self {
        Self { tx: Mutex::new(tx) }
    }

    fn send(&self, event: PresenterEvent) {
        // A closed receiver just means nobody is watching anymore.
        let _ = lock(&self.tx).send(event);
    }
}

impl Presenter for ChannelPresenter {
    fn update_board(&self, board: &Board, last_move: Option<Move>) {
        self.send(PresenterEvent::Board {
            board: *board,
            last_move,
        });
    }

    fn announce_game_result(&self, result: MatchResult) {
        self.send(PresenterEvent::Result(result));
    }
}
