//! Reversi-Rust: a Reversi (Othello) rules engine with threaded players.
//!
//! Games are run by a [`coordinator::GameCoordinator`] between two
//! [`engine::Engine`]s, each computing on its own worker thread. Results are
//! tagged with a game id so work done for an abandoned position is dropped.
//!
//! ## Modules
//!
//! - [`board`] - Board representation and move rules
//! - [`annotation`] - Move lists, replay validation and saved-game formats
//! - [`engine`] - Threaded engine wrapper, random and human-input strategies
//! - [`mcts`] - Monte Carlo Tree Search strategy
//! - [`playout`] - Random game simulation for position evaluation
//! - [`coordinator`] - Game session state machine
//! - [`presenter`] - Callbacks to whatever displays the game
//! - [`console`] - Text front end
//!
//! ## Example
//!
//! ```
//! use reversi_rust::board::{Board, Move};
//!
//! let mut board = Board::new();
//! let mv: Move = "d6".parse().unwrap();
//! assert!(board.is_legal(mv));
//! board.play(mv).unwrap();
//! assert_eq!(board.get_placable().len(), 3);
//! ```

pub mod annotation;
pub mod board;
pub mod console;
pub mod constants;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod mcts;
pub mod playout;
pub mod presenter;
mod sync;
