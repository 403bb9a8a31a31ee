//! Rules tests for the board and the annotation codecs.

use fastrand::Rng;
use pretty_assertions::assert_eq;

use reversi_rust::annotation::{self, GameRecord};
use reversi_rust::board::{Board, MatchResult, Move, Player, Square};
use reversi_rust::error::ReversiError;

// =============================================================================
// Helpers
// =============================================================================

fn play_all(tokens: &[&str]) -> Board {
    let mut board = Board::new();
    for token in tokens {
        board.play(token.parse().unwrap()).unwrap();
    }
    board
}

/// Plays a uniformly random game, returning every move including the final
/// double skip.
fn random_game(rng: &mut Rng) -> Vec<Move> {
    let mut board = Board::new();
    let mut moves = Vec::new();
    let mut prev_skip = false;
    loop {
        let placable = board.get_placable();
        let mv = if placable.is_empty() {
            Move::SKIP
        } else {
            placable[rng.usize(..placable.len())]
        };
        board.play(mv).unwrap();
        moves.push(mv);
        if mv.is_skip() && prev_skip {
            return moves;
        }
        prev_skip = mv.is_skip();
    }
}

/// Black removes every white piece in nine plies.
const WIPEOUT: [&str; 9] = ["f4", "d3", "c4", "f5", "e2", "f3", "g4", "e3", "e6"];

// =============================================================================
// Initial position
// =============================================================================

#[test]
fn test_initial_position() {
    let board = Board::new();
    assert_eq!(board.next_player(), Player::Black);
    assert_eq!(board.at(4, 4), Square::Black);
    assert_eq!(board.at(5, 5), Square::Black);
    assert_eq!(board.at(4, 5), Square::White);
    assert_eq!(board.at(5, 4), Square::White);
    assert_eq!(board.at(0, 3), Square::OutOfRange);
    assert_eq!(board.at(9, 9), Square::OutOfRange);
    assert_eq!(
        board.get_placable(),
        vec![Move::new(3, 5), Move::new(4, 6), Move::new(5, 3), Move::new(6, 4)]
    );
    assert!(!board.is_skip_legal());
}

#[test]
fn test_first_move_flips_one_piece() {
    let mut board = Board::new();
    board.place(4, 6).unwrap();
    assert_eq!(board.at(4, 6), Square::Black);
    assert_eq!(board.at(4, 5), Square::Black);
    assert_eq!(board.piece_count(Player::Black), 4);
    assert_eq!(board.piece_count(Player::White), 1);
    assert_eq!(board.next_player(), Player::White);
    assert_eq!(board.get_placable().len(), 3);
}

#[test]
fn test_four_ply_opening() {
    let mut board = Board::new();
    for (x, y) in [(4, 6), (3, 6), (3, 5), (5, 6)] {
        assert!(board.is_placable(x, y), "({x}, {y})");
        board.place(x, y).unwrap();
    }
    for (x, y) in [(3, 6), (4, 6), (5, 6), (5, 5), (5, 4)] {
        assert_eq!(board.at(x, y), Square::White, "({x}, {y})");
    }
    for (x, y) in [(3, 5), (4, 5), (4, 4)] {
        assert_eq!(board.at(x, y), Square::Black, "({x}, {y})");
    }
    assert_eq!(board.at(3, 4), Square::Empty);
    assert_eq!(board.piece_count(Player::White), 5);
    assert_eq!(board.piece_count(Player::Black), 3);
    assert_eq!(board.next_player(), Player::Black);
    assert_eq!(board.count(), MatchResult::White);
}

#[test]
fn test_count_is_idempotent() {
    let mut rng = Rng::with_seed(23);
    let mut board = Board::new();
    for mv in random_game(&mut rng) {
        let before = board;
        let first = board.count();
        assert_eq!(board.count(), first);
        assert_eq!(board, before);
        board.play(mv).unwrap();
    }
}

// =============================================================================
// Errors leave the board untouched
// =============================================================================

#[test]
fn test_out_of_range_placement() {
    let mut board = Board::new();
    let before = board;
    assert!(matches!(
        board.place(0, -1),
        Err(ReversiError::OutOfRange { x: 0, y: -1 })
    ));
    assert!(matches!(board.place(9, 4), Err(ReversiError::OutOfRange { .. })));
    assert_eq!(board, before);
}

#[test]
fn test_illegal_placement_and_skip() {
    let mut board = Board::new();
    let before = board;
    assert!(matches!(board.play(Move::new(1, 1)), Err(ReversiError::Rules(_))));
    // Occupied.
    assert!(matches!(board.play(Move::new(4, 4)), Err(ReversiError::Rules(_))));
    assert!(matches!(board.play(Move::SKIP), Err(ReversiError::Rules(_))));
    assert!(matches!(
        board.play(Move::new(0, 9)),
        Err(ReversiError::OutOfRange { x: 0, y: 9 })
    ));
    assert_eq!(board, before);
}

// =============================================================================
// Properties over random games
// =============================================================================

#[test]
fn test_get_placable_matches_is_placable() {
    let mut rng = Rng::with_seed(11);
    for _ in 0..20 {
        let mut board = Board::new();
        for mv in random_game(&mut rng) {
            let mut expected = Vec::new();
            for x in 1..=8 {
                for y in 1..=8 {
                    if board.is_placable(x, y) {
                        expected.push(Move::new(x as u8, y as u8));
                    }
                }
            }
            assert_eq!(board.get_placable(), expected);
            assert_eq!(board.is_skip_legal(), expected.is_empty());
            board.play(mv).unwrap();
        }
    }
}

#[test]
fn test_placement_grows_mover_and_shrinks_opponent() {
    let mut rng = Rng::with_seed(5);
    for _ in 0..20 {
        let mut board = Board::new();
        for mv in random_game(&mut rng) {
            let mover = board.next_player();
            let own = board.piece_count(mover);
            let other = board.piece_count(mover.opponent());
            board.play(mv).unwrap();
            if mv.is_skip() {
                assert_eq!(board.piece_count(mover), own);
                continue;
            }
            let flipped = other - board.piece_count(mover.opponent());
            assert!(flipped >= 1);
            assert_eq!(board.piece_count(mover), own + flipped + 1);
            assert_eq!(board.next_player(), mover.opponent());
        }
    }
}

#[test]
fn test_random_games_end_with_a_result() {
    let mut rng = Rng::with_seed(99);
    for _ in 0..20 {
        let moves = random_game(&mut rng);
        let replayed = annotation::replay(&moves).unwrap();
        assert!(replayed.is_finished());
        assert_ne!(replayed.result, MatchResult::InProgress);
        let board = replayed.board;
        let (black, white) = (board.piece_count(Player::Black), board.piece_count(Player::White));
        let expected = match black.cmp(&white) {
            std::cmp::Ordering::Greater => MatchResult::Black,
            std::cmp::Ordering::Less => MatchResult::White,
            std::cmp::Ordering::Equal => MatchResult::Draw,
        };
        assert_eq!(replayed.result, expected);
    }
}

#[test]
fn test_side_to_move_is_part_of_identity() {
    use std::collections::HashSet;
    let a = play_all(&["f4", "f5", "e6"]);
    let copy = a;
    let mut skipped = a;
    skipped.skip();
    assert_ne!(a, skipped);

    let mut set = HashSet::new();
    set.insert(a);
    assert!(set.contains(&copy));
    assert!(!set.contains(&skipped));
    set.insert(skipped);
    assert_eq!(set.len(), 2);
}

// =============================================================================
// Game end
// =============================================================================

#[test]
fn test_wipeout_ends_game() {
    let board = play_all(&WIPEOUT);
    assert_eq!(board.piece_count(Player::White), 0);
    assert!(board.is_skip_legal());
    let mut next = board;
    next.skip();
    assert!(next.is_skip_legal());
    assert_eq!(board.count(), MatchResult::Black);

    let mut moves: Vec<Move> = WIPEOUT.iter().map(|t| t.parse().unwrap()).collect();
    moves.extend([Move::SKIP, Move::SKIP]);
    let replayed = annotation::replay(&moves).unwrap();
    assert_eq!(replayed.result, MatchResult::Black);

    moves.push(Move::SKIP);
    assert!(annotation::replay(&moves).is_err());
}

// =============================================================================
// Saved games
// =============================================================================

#[test]
fn test_game_record_json() {
    let record = GameRecord {
        moves: vec![Move::new(4, 6), Move::new(3, 6), Move::SKIP],
        black_engine_name: "MCTSe".to_string(),
        white_engine_name: "UserInput".to_string(),
    };
    let json = record.to_json().unwrap();
    assert!(json.contains("\"black_engine_name\": \"MCTSe\""));
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["moves"][2], serde_json::json!([0, 0]));
    assert_eq!(GameRecord::from_json(&json).unwrap(), record);
}

#[test]
fn test_legacy_text() {
    let moves: Vec<Move> = WIPEOUT.iter().map(|t| t.parse().unwrap()).collect();
    let text = annotation::to_legacy_text(&moves);
    assert_eq!(text, "f4 d3 c4 f5 e2 f3 g4 e3 e6 #");
    assert_eq!(annotation::parse_legacy_text(&text).unwrap(), moves);
    assert!(annotation::parse_legacy_text("f4 d3").is_err());
    assert!(annotation::parse_legacy_text("f4 k9 #").is_err());
}
