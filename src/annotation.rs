//! Move lists: replay, validation and the two persistence formats.
//!
//! An annotation is the ordered list of moves since the initial position.
//! The authoritative game state is whatever replaying it produces.
//!
//! Two formats are supported:
//! - [`GameRecord`], serialized as JSON: `{"moves": [[4,6],[0,0],...],
//!   "black_engine_name": "...", "white_engine_name": "..."}`.
//! - The legacy text format: space separated `d6` tokens, `pass` for a
//!   skip, terminated by a literal `#` token.

use serde::{Deserialize, Serialize};

use crate::board::{Board, MatchResult, Move};
use crate::error::{PersistenceError, ReversiError};

/// Logical content of a saved game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub moves: Vec<Move>,
    pub black_engine_name: String,
    pub white_engine_name: String,
}

impl GameRecord {
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// State reached by replaying an annotation from the initial position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replay {
    pub board: Board,
    /// The last move was a skip.
    pub prev_skip: bool,
    /// Final result if the annotation ends with two consecutive skips.
    pub result: MatchResult,
}

impl Replay {
    pub fn is_finished(&self) -> bool {
        self.result != MatchResult::InProgress
    }
}

/// Replays `moves` from the initial position, checking every move.
///
/// Fails on the first illegal placement or skip, and on any move after the
/// game has ended.
pub fn replay(moves: &[Move]) -> Result<Replay, ReversiError> {
    let mut state = Replay {
        board: Board::new(),
        prev_skip: false,
        result: MatchResult::InProgress,
    };
    for (ply, &mv) in moves.iter().enumerate() {
        if state.is_finished() {
            return Err(ReversiError::rules(format!(
                "move {mv} at ply {} comes after the end of the game",
                ply + 1
            )));
        }
        if !state.board.is_legal(mv) {
            let what = if mv.is_skip() { "skip" } else { "move" };
            return Err(ReversiError::rules(format!(
                "illegal {what} {mv} at ply {} for {}",
                ply + 1,
                state.board.next_player()
            )));
        }
        state.board.play(mv)?;
        if mv.is_skip() && state.prev_skip {
            state.result = state.board.count();
        }
        state.prev_skip = mv.is_skip();
    }
    Ok(state)
}

/// Encodes moves in the legacy text format.
pub fn to_legacy_text(moves: &[Move]) -> String {
    let mut out = String::with_capacity(moves.len() * 3 + 1);
    for mv in moves {
        out.push_str(&mv.to_string());
        out.push(' ');
    }
    out.push('#');
    out
}

/// Decodes the legacy text format. Tokens after `#` are ignored.
pub fn parse_legacy_text(text: &str) -> Result<Vec<Move>, PersistenceError> {
    let mut moves = Vec::new();
    for token in text.split_whitespace() {
        if token == "#" {
            return Ok(moves);
        }
        let mv = token
            .parse::<Move>()
            .map_err(|_| PersistenceError::Malformed(format!("bad move token {token:?}")))?;
        moves.push(mv);
    }
    Err(PersistenceError::Malformed(
        "missing '#' terminator".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moves(tokens: &[&str]) -> Vec<Move> {
        tokens.iter().map(|t| t.parse().unwrap()).collect()
    }

    #[test]
    fn test_replay_rejects_illegal_move() {
        let err = replay(&moves(&["d6", "a1"])).unwrap_err();
        assert!(matches!(err, ReversiError::Rules(msg) if msg.contains("ply 2")));
    }

    #[test]
    fn test_replay_rejects_illegal_skip() {
        assert!(replay(&[Move::SKIP]).is_err());
    }

    #[test]
    fn test_replay_rejects_out_of_range() {
        assert!(replay(&[Move::new(0, 9)]).is_err());
    }

    #[test]
    fn test_replay_tracks_prev_skip() {
        let state = replay(&moves(&["d6", "c6"])).unwrap();
        assert!(!state.prev_skip);
        assert!(!state.is_finished());
        assert_eq!(state.board.next_player(), crate::board::Player::Black);
    }

    #[test]
    fn test_legacy_text_encoding() {
        let mvs = vec![Move::new(4, 6), Move::new(3, 6), Move::SKIP];
        let text = to_legacy_text(&mvs);
        assert_eq!(text, "d6 c6 pass #");
        assert_eq!(parse_legacy_text(&text).unwrap(), mvs);
    }

    #[test]
    fn test_legacy_text_errors() {
        assert!(matches!(
            parse_legacy_text("d6 c6"),
            Err(PersistenceError::Malformed(_))
        ));
        assert!(matches!(
            parse_legacy_text("d6 z9 #"),
            Err(PersistenceError::Malformed(_))
        ));
        assert_eq!(parse_legacy_text("#").unwrap(), vec![]);
    }

    #[test]
    fn test_record_json_uses_pairs() {
        let record = GameRecord {
            moves: vec![Move::new(4, 6), Move::SKIP],
            black_engine_name: "UserInput".into(),
            white_engine_name: "MCTSe".into(),
        };
        let json = record.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["moves"], serde_json::json!([[4, 6], [0, 0]]));
        assert_eq!(GameRecord::from_json(&json).unwrap(), record);
        assert!(GameRecord::from_json("{\"moves\": 3}").is_err());
    }
}
