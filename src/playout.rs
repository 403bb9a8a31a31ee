//! Monte Carlo playouts (random game simulation).
//!
//! A playout plays uniformly random legal moves until both sides have to
//! skip in a row, then scores the final position.

use fastrand::Rng;

use crate::board::{Board, MatchResult};

/// Plays `board` out at random and returns the score from Black's side:
/// `1` for a Black win, `0` for a draw, `-1` for a White win.
pub fn rollout(mut board: Board, rng: &mut Rng) -> i64 {
    let mut prev_skip = false;
    loop {
        let moves = board.get_placable();
        if moves.is_empty() {
            if prev_skip {
                return score(board.count());
            }
            board.skip();
            prev_skip = true;
        } else {
            let mv = moves[rng.usize(..moves.len())];
            // Coordinates come from the board itself, so they are in range.
            let _ = board.place(mv.x as i32, mv.y as i32);
            prev_skip = false;
        }
    }
}

/// Black-favoring score of a finished game.
pub fn score(result: MatchResult) -> i64 {
    match result {
        MatchResult::Black => 1,
        MatchResult::White => -1,
        MatchResult::Draw | MatchResult::InProgress => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollout_scores_are_bounded() {
        let mut rng = Rng::with_seed(7);
        for _ in 0..20 {
            let s = rollout(Board::new(), &mut rng);
            assert!((-1..=1).contains(&s));
        }
    }

    #[test]
    fn test_rollout_is_reproducible_with_seed() {
        let a: Vec<i64> = {
            let mut rng = Rng::with_seed(42);
            (0..10).map(|_| rollout(Board::new(), &mut rng)).collect()
        };
        let b: Vec<i64> = {
            let mut rng = Rng::with_seed(42);
            (0..10).map(|_| rollout(Board::new(), &mut rng)).collect()
        };
        assert_eq!(a, b);
    }
}
