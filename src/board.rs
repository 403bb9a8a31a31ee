//! Reversi board representation and rules.
//!
//! Cells are packed two bits each into a fixed array covering the 8x8 playing
//! area plus a one-cell border. The border is permanently [`Square::OutOfRange`],
//! so direction scans terminate on it without range checks.
//!
//! Coordinates are 1-based: `x` is the file (a..h) and `y` the rank (1..8).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DIRECTIONS, N, PACKED_LEN, W};
use crate::error::ReversiError;

/// Content of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Square {
    Empty = 0,
    Black = 1,
    White = 2,
    OutOfRange = 3,
}

impl Square {
    fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => Square::Empty,
            1 => Square::Black,
            2 => Square::White,
            _ => Square::OutOfRange,
        }
    }
}

/// One of the two sides. Black always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Player {
    #[default]
    Black,
    White,
}

impl Player {
    /// The other side.
    pub fn opponent(self) -> Self {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }

    /// The square a piece of this side occupies.
    pub fn square(self) -> Square {
        match self {
            Player::Black => Square::Black,
            Player::White => Square::White,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Black => write!(f, "Black"),
            Player::White => write!(f, "White"),
        }
    }
}

/// Outcome of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatchResult {
    Black,
    White,
    Draw,
    #[default]
    InProgress,
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchResult::Black => write!(f, "Black wins"),
            MatchResult::White => write!(f, "White wins"),
            MatchResult::Draw => write!(f, "Game ended in draw"),
            MatchResult::InProgress => write!(f, "Game in progress"),
        }
    }
}

/// A placement or a skip. Skips are encoded as `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(u8, u8)", into = "(u8, u8)")]
pub struct Move {
    pub x: u8,
    pub y: u8,
}

impl Move {
    /// The skip move.
    pub const SKIP: Move = Move { x: 0, y: 0 };

    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn is_skip(self) -> bool {
        self.x == 0 && self.y == 0
    }
}

impl From<(u8, u8)> for Move {
    fn from((x, y): (u8, u8)) -> Self {
        Move { x, y }
    }
}

impl From<Move> for (u8, u8) {
    fn from(mv: Move) -> Self {
        (mv.x, mv.y)
    }
}

/// Algebraic form: `d6` for a placement, `pass` for a skip.
impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_skip() {
            return write!(f, "pass");
        }
        match (self.x, self.y) {
            (1..=8, 1..=8) => write!(f, "{}{}", (b'a' + self.x - 1) as char, self.y),
            (x, y) => write!(f, "?{x},{y}"),
        }
    }
}

impl FromStr for Move {
    type Err = ReversiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "pass" || s == "skip" {
            return Ok(Move::SKIP);
        }
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(ReversiError::rules(format!("invalid vertex {s:?}")));
        }
        match (bytes[0], bytes[1]) {
            (file @ b'a'..=b'h', rank @ b'1'..=b'8') => Ok(Move::new(file - b'a' + 1, rank - b'0')),
            _ => Err(ReversiError::rules(format!("invalid vertex {s:?}"))),
        }
    }
}

/// A Reversi position: packed grid plus the side to move.
///
/// Equality and hashing cover every cell and the side to move, so a `Board`
/// can key a search table.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    squares: [u8; PACKED_LEN],
    next_player: Player,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// The initial position with Black to move.
    pub fn new() -> Self {
        let mut b = Board {
            squares: [0; PACKED_LEN],
            next_player: Player::Black,
        };
        for i in 0..W {
            b.set(0, i, Square::OutOfRange);
            b.set(W - 1, i, Square::OutOfRange);
            b.set(i, 0, Square::OutOfRange);
            b.set(i, W - 1, Square::OutOfRange);
        }
        b.set(4, 4, Square::Black);
        b.set(5, 5, Square::Black);
        b.set(4, 5, Square::White);
        b.set(5, 4, Square::White);
        b
    }

    #[inline]
    fn slot(x: i32, y: i32) -> (usize, u32) {
        let idx = (x * W + y) as usize;
        (idx >> 2, ((idx & 3) as u32) * 2)
    }

    /// Raw cell access; `(x, y)` must lie inside the padded grid.
    #[inline]
    fn get(&self, x: i32, y: i32) -> Square {
        let (byte, shift) = Self::slot(x, y);
        Square::from_bits(self.squares[byte] >> shift)
    }

    #[inline]
    fn set(&mut self, x: i32, y: i32, sq: Square) {
        let (byte, shift) = Self::slot(x, y);
        self.squares[byte] = (self.squares[byte] & !(3 << shift)) | ((sq as u8) << shift);
    }

    /// The cell at `(x, y)`, or [`Square::OutOfRange`] outside the playing area.
    pub fn at(&self, x: i32, y: i32) -> Square {
        if (1..=N).contains(&x) && (1..=N).contains(&y) {
            self.get(x, y)
        } else {
            Square::OutOfRange
        }
    }

    /// The side to move.
    #[inline]
    pub fn next_player(&self) -> Player {
        self.next_player
    }

    /// End cell of the run of opponent pieces starting next to `(x, y)` in
    /// direction `(dx, dy)`, if the run is non-empty and capped by `player`.
    fn capped_run(&self, x: i32, y: i32, (dx, dy): (i32, i32), player: Square) -> Option<(i32, i32)> {
        let opponent = self.next_player.opponent().square();
        let (mut cx, mut cy) = (x + dx, y + dy);
        if self.get(cx, cy) != opponent {
            return None;
        }
        while self.get(cx, cy) == opponent {
            cx += dx;
            cy += dy;
        }
        (self.get(cx, cy) == player).then_some((cx, cy))
    }

    /// Whether the side to move may place a piece at `(x, y)`.
    pub fn is_placable(&self, x: i32, y: i32) -> bool {
        // Out-of-range coordinates also fail this test.
        if self.at(x, y) != Square::Empty {
            return false;
        }
        let player = self.next_player.square();
        DIRECTIONS
            .iter()
            .any(|&dir| self.capped_run(x, y, dir, player).is_some())
    }

    /// All placable cells for the side to move, ordered by `x` then `y`.
    pub fn get_placable(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(32);
        for x in 1..=N {
            for y in 1..=N {
                if self.is_placable(x, y) {
                    moves.push(Move::new(x as u8, y as u8));
                }
            }
        }
        moves
    }

    /// True when the side to move has no placement.
    pub fn is_skip_legal(&self) -> bool {
        !(1..=N).any(|x| (1..=N).any(|y| self.is_placable(x, y)))
    }

    /// Whether `mv` (placement or skip) is legal for the side to move.
    pub fn is_legal(&self, mv: Move) -> bool {
        if mv.is_skip() {
            self.is_skip_legal()
        } else {
            self.is_placable(mv.x as i32, mv.y as i32)
        }
    }

    /// Places a piece for the side to move and flips captured runs.
    ///
    /// Legality is not checked; callers must test [`Board::is_placable`] first.
    pub fn place(&mut self, x: i32, y: i32) -> Result<(), ReversiError> {
        if !(1..=N).contains(&x) || !(1..=N).contains(&y) {
            return Err(ReversiError::OutOfRange { x, y });
        }
        let player = self.next_player.square();
        for dir @ (dx, dy) in DIRECTIONS {
            if let Some((ex, ey)) = self.capped_run(x, y, dir, player) {
                let (mut cx, mut cy) = (x + dx, y + dy);
                while (cx, cy) != (ex, ey) {
                    self.set(cx, cy, player);
                    cx += dx;
                    cy += dy;
                }
            }
        }
        self.set(x, y, player);
        self.skip();
        Ok(())
    }

    /// Passes the turn. Whether the skip is legal is the caller's concern.
    #[inline]
    pub fn skip(&mut self) {
        self.next_player = self.next_player.opponent();
    }

    /// Applies a placement or a skip after checking that it is legal.
    pub fn play(&mut self, mv: Move) -> Result<(), ReversiError> {
        if mv.is_skip() {
            if !self.is_skip_legal() {
                return Err(ReversiError::rules(format!(
                    "{} cannot skip with a placement available",
                    self.next_player
                )));
            }
            self.skip();
            return Ok(());
        }
        let (x, y) = (mv.x as i32, mv.y as i32);
        if self.at(x, y) != Square::OutOfRange && !self.is_placable(x, y) {
            return Err(ReversiError::rules(format!(
                "{mv} is not a legal move for {}",
                self.next_player
            )));
        }
        self.place(x, y)
    }

    /// Number of pieces `player` has on the board.
    pub fn piece_count(&self, player: Player) -> usize {
        let sq = player.square();
        (1..=N)
            .flat_map(|x| (1..=N).map(move |y| (x, y)))
            .filter(|&(x, y)| self.get(x, y) == sq)
            .count()
    }

    /// Majority count. Meaningful once neither side can move.
    pub fn count(&self) -> MatchResult {
        let black = self.piece_count(Player::Black);
        let white = self.piece_count(Player::White);
        match black.cmp(&white) {
            std::cmp::Ordering::Greater => MatchResult::Black,
            std::cmp::Ordering::Less => MatchResult::White,
            std::cmp::Ordering::Equal => MatchResult::Draw,
        }
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:?} to move)\n{self}", self.next_player)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (1..=N).rev() {
            write!(f, "{y} ")?;
            for x in 1..=N {
                let ch = match self.get(x, y) {
                    Square::Black => 'X',
                    Square::White => 'O',
                    _ => '.',
                };
                write!(f, "{ch} ")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "  a b c d e f g h")
    }
}
