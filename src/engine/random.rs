//! An engine that picks uniformly among the legal moves. Mostly for testing.

use std::sync::atomic::{AtomicBool, Ordering};

use fastrand::Rng;

use super::Strategy;
use crate::board::{Board, Move};
use crate::error::ComputeError;

pub struct RandomChoice {
    rng: Rng,
}

impl Default for RandomChoice {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomChoice {
    /// Seeds the generator from entropy.
    pub fn new() -> Self {
        Self { rng: Rng::new() }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Rng::with_seed(seed),
        }
    }
}

impl Strategy for RandomChoice {
    fn name(&self) -> &'static str {
        "RandomChoice"
    }

    fn compute_move(&mut self, board: &Board, cancel: &AtomicBool) -> Result<Move, ComputeError> {
        if cancel.load(Ordering::Acquire) {
            return Err(ComputeError::Cancelled);
        }
        let moves = board.get_placable();
        if moves.is_empty() {
            return Ok(Move::SKIP);
        }
        Ok(moves[self.rng.usize(..moves.len())])
    }
}
