//! Error types shared across the crate.

use thiserror::Error;

/// Failures of board and game operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReversiError {
    /// The request breaks the rules of the game or the coordinator's state machine.
    #[error("rules violation: {0}")]
    Rules(String),
    /// Coordinates outside the 8x8 playing area.
    #[error("coordinates ({x}, {y}) are out of range")]
    OutOfRange { x: i32, y: i32 },
}

impl ReversiError {
    pub(crate) fn rules(msg: impl Into<String>) -> Self {
        ReversiError::Rules(msg.into())
    }
}

/// Failures while loading or saving a game.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("invalid JSON game record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed game record: {0}")]
    Malformed(String),
    #[error("unknown engine name {0:?}")]
    UnknownEngine(String),
    #[error("game record rejected: {0}")]
    Illegal(#[from] ReversiError),
}

/// Reasons a computation ends without producing a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ComputeError {
    /// The owner asked the computation to stop.
    #[error("computation cancelled")]
    Cancelled,
    /// The input source feeding the computation went away.
    #[error("input source disconnected")]
    Disconnected,
}
