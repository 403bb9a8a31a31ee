//! Board geometry and engine parameters.
//!
//! The board is stored as a 10x10 grid: the 8x8 playing area plus a one-cell
//! border on every side. Border cells always read as out of range, which lets
//! ray scans stop without explicit bounds checks.

use std::time::Duration;

// =============================================================================
// Board Geometry
// =============================================================================

/// Number of files (and ranks) on the playing area.
pub const N: i32 = 8;

/// Board width including the border on both sides.
pub const W: i32 = N + 2;

/// Number of cells in the padded grid.
pub const CELLS: usize = (W * W) as usize;

/// Bytes needed to store the padded grid at two bits per cell.
pub const PACKED_LEN: usize = (CELLS * 2).div_ceil(8);

/// Offsets of the eight scan directions as (dx, dy).
pub const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Upper bound on plies in one game, used to presize annotations.
pub const MAX_GAME_LEN: usize = 128;

// =============================================================================
// Engine Parameters
// =============================================================================

/// How often long-running computations look at their cancellation flag.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default MCTS thinking time per move.
pub const THINK_TIME: Duration = Duration::from_secs(1);

/// Longest search budget honored; larger budgets are clamped to this.
pub const MAX_THINK_TIME: Duration = Duration::from_secs(24 * 60 * 60);

/// UCB exploration constant.
pub const EXPLORATION: f64 = 0.5;

/// Random rollouts played from every expanded leaf.
pub const ROLLOUTS_PER_LEAF: u32 = 10;
