//! An engine that relays moves entered by a person.
//!
//! The front end holds a [`UserInputHandle`] and submits clicked squares or
//! skips through it. The engine waits for input while polling its
//! cancellation flag, and ignores input that is not legal on its board.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};

use log::debug;

use super::Strategy;
use crate::board::{Board, Move};
use crate::constants::POLL_INTERVAL;
use crate::error::ComputeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Square(u8, u8),
    Skip,
}

/// Sending side for a [`UserInput`] engine.
#[derive(Debug, Clone)]
pub struct UserInputHandle {
    tx: Sender<Input>,
}

impl UserInputHandle {
    /// Submits a clicked square. Returns false if the engine is gone.
    pub fn submit_square(&self, x: u8, y: u8) -> bool {
        self.tx.send(Input::Square(x, y)).is_ok()
    }

    /// Presses the skip button. Returns false if the engine is gone.
    pub fn submit_skip(&self) -> bool {
        self.tx.send(Input::Skip).is_ok()
    }

    /// Submits either kind of move.
    pub fn submit(&self, mv: Move) -> bool {
        if mv.is_skip() {
            self.submit_skip()
        } else {
            self.submit_square(mv.x, mv.y)
        }
    }
}

pub struct UserInput {
    rx: Receiver<Input>,
    /// Input that arrived after cancellation, kept for the next request.
    held: Option<Input>,
    auto_skip: bool,
}

impl UserInput {
    /// Creates the engine and the handle used to feed it.
    ///
    /// With `auto_skip`, positions without a placement are skipped without
    /// waiting for the user.
    pub fn new(auto_skip: bool) -> (Self, UserInputHandle) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                rx,
                held: None,
                auto_skip,
            },
            UserInputHandle { tx },
        )
    }

    /// Blocks until input arrives, the flag is raised or the handle is dropped.
    fn next_input(&mut self, cancel: &AtomicBool) -> Result<Input, ComputeError> {
        loop {
            if cancel.load(Ordering::Acquire) {
                return Err(ComputeError::Cancelled);
            }
            if let Some(input) = self.held.take() {
                return Ok(input);
            }
            match self.rx.recv_timeout(POLL_INTERVAL) {
                Ok(input) if cancel.load(Ordering::Acquire) => {
                    self.held = Some(input);
                    return Err(ComputeError::Cancelled);
                }
                Ok(input) => return Ok(input),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(ComputeError::Disconnected),
            }
        }
    }
}

impl Strategy for UserInput {
    fn name(&self) -> &'static str {
        "UserInput"
    }

    fn compute_move(&mut self, board: &Board, cancel: &AtomicBool) -> Result<Move, ComputeError> {
        let must_skip = board.is_skip_legal();
        if must_skip && self.auto_skip {
            return Ok(Move::SKIP);
        }
        loop {
            match self.next_input(cancel)? {
                Input::Skip if must_skip => return Ok(Move::SKIP),
                Input::Square(x, y) if !must_skip && board.is_placable(x as i32, y as i32) => {
                    return Ok(Move::new(x, y));
                }
                input => debug!("ignoring {input:?}: not legal now"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_illegal_clicks_are_ignored() {
        let (mut engine, handle) = UserInput::new(true);
        let cancel = AtomicBool::new(false);
        let feeder = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            handle.submit_square(1, 1);
            handle.submit_skip();
            handle.submit_square(4, 6);
            handle
        });
        let mv = engine.compute_move(&Board::new(), &cancel).unwrap();
        assert_eq!(mv, Move::new(4, 6));
        drop(feeder.join().unwrap());
    }

    #[test]
    fn test_cancel_while_waiting() {
        let (mut engine, _handle) = UserInput::new(false);
        let cancel = AtomicBool::new(true);
        assert_eq!(
            engine.compute_move(&Board::new(), &cancel),
            Err(ComputeError::Cancelled)
        );
    }

    #[test]
    fn test_input_after_cancel_is_kept_for_next_request() {
        let (mut engine, handle) = UserInput::new(false);
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let feeder = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            flag.store(true, Ordering::Release);
            handle.submit_square(6, 4);
            handle
        });
        let board = Board::new();
        assert_eq!(engine.compute_move(&board, &cancel), Err(ComputeError::Cancelled));
        let _handle = feeder.join().unwrap();

        cancel.store(false, Ordering::Release);
        assert_eq!(engine.compute_move(&board, &cancel), Ok(Move::new(6, 4)));
    }

    #[test]
    fn test_dropped_handle_disconnects() {
        let (mut engine, handle) = UserInput::new(false);
        drop(handle);
        let cancel = AtomicBool::new(false);
        assert_eq!(
            engine.compute_move(&Board::new(), &cancel),
            Err(ComputeError::Disconnected)
        );
    }

    #[test]
    fn test_auto_skip() {
        let (mut engine, handle) = UserInput::new(true);
        drop(handle);
        let mut board = Board::new();
        // Black wipes out White in nine plies.
        for mv in ["f4", "d3", "c4", "f5", "e2", "f3", "g4", "e3", "e6"] {
            board.play(mv.parse().unwrap()).unwrap();
        }
        assert!(board.is_skip_legal());
        let cancel = AtomicBool::new(false);
        assert_eq!(engine.compute_move(&board, &cancel), Ok(Move::SKIP));
    }
}
