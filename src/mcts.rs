//! Monte Carlo Tree Search engine.
//!
//! The search keeps a table of nodes keyed by [`Board`] (position and side to
//! move), so transpositions share statistics. Each iteration:
//! - descends from the root by UCB until it reaches an unexpanded node or a
//!   position already on the current path,
//! - expands that node by adding every child position to the table,
//! - plays a batch of random rollouts from it,
//! - adds the outcome to every node on the path.
//!
//! Node values always favor Black. The final move is the root child with the
//! most visits.
//!
//! The table outlives a single search: statistics gathered for earlier moves
//! (and earlier games) seed later searches unless `reuse_table` is off.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use fastrand::Rng;
use log::{debug, info};

use crate::board::{Board, Move, Player};
use crate::constants::{EXPLORATION, MAX_THINK_TIME, ROLLOUTS_PER_LEAF, THINK_TIME};
use crate::engine::Strategy;
use crate::error::ComputeError;
use crate::playout::rollout;

/// Search parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MctsConfig {
    /// Wall-clock budget per move.
    pub think_time: Duration,
    /// UCB exploration constant.
    pub exploration: f64,
    /// Rollouts played from each expanded node per iteration.
    pub rollouts_per_leaf: u32,
    /// Keep the node table between searches.
    pub reuse_table: bool,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            think_time: THINK_TIME,
            exploration: EXPLORATION,
            rollouts_per_leaf: ROLLOUTS_PER_LEAF,
            reuse_table: true,
        }
    }
}

/// Statistics for one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    /// Number of rollouts through this node.
    pub visits: u64,
    /// Sum of rollout scores, +1 per Black win and -1 per White win.
    pub value: i64,
    /// Children have not been added to the table yet.
    pub is_leaf: bool,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            visits: 0,
            value: 0,
            is_leaf: true,
        }
    }
}

impl Node {
    /// Black's winrate in `[0, 1]`; 0.5 when unvisited.
    #[inline]
    pub fn winrate(&self) -> f64 {
        if self.visits == 0 {
            0.5
        } else {
            (self.value as f64 / self.visits as f64 + 1.0) / 2.0
        }
    }
}

/// When a search started now with budget `think_time` has to stop. Budgets
/// are capped at [`MAX_THINK_TIME`].
fn deadline_after(think_time: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(think_time.min(MAX_THINK_TIME)).unwrap_or(now)
}

/// Child positions of `board`: one per placement, or a single skip.
fn children(board: &Board) -> Vec<(Move, Board)> {
    let moves = board.get_placable();
    if moves.is_empty() {
        let mut next = *board;
        next.skip();
        return vec![(Move::SKIP, next)];
    }
    moves
        .into_iter()
        .map(|mv| {
            let mut next = *board;
            // Placable cells are always in range.
            let _ = next.play(mv);
            (mv, next)
        })
        .collect()
}

/// Neither side can move.
fn is_terminal(board: &Board) -> bool {
    if !board.is_skip_legal() {
        return false;
    }
    let mut next = *board;
    next.skip();
    next.is_skip_legal()
}

pub struct Mcts {
    nodes: HashMap<Board, Node>,
    rng: Rng,
    config: MctsConfig,
}

impl Default for Mcts {
    fn default() -> Self {
        Self::new()
    }
}

impl Mcts {
    /// Default configuration, generator seeded from entropy.
    pub fn new() -> Self {
        Self::with_config(MctsConfig::default(), Rng::new().u64(..))
    }

    pub fn with_config(config: MctsConfig, seed: u64) -> Self {
        Self {
            nodes: HashMap::new(),
            rng: Rng::with_seed(seed),
            config,
        }
    }

    /// Number of positions in the table.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Statistics stored for `board`, if any.
    pub fn node(&self, board: &Board) -> Option<Node> {
        self.nodes.get(board).copied()
    }

    /// Forgets every position searched so far.
    pub fn clear_table(&mut self) {
        self.nodes.clear();
    }

    /// Adds the children of `board` to the table and marks it expanded.
    /// Entries already present (transpositions) keep their statistics.
    fn expand(&mut self, board: &Board) {
        let node = self.nodes.entry(*board).or_default();
        if !node.is_leaf || is_terminal(board) {
            return;
        }
        node.is_leaf = false;
        for (_, child) in children(board) {
            self.nodes.entry(child).or_default();
        }
    }

    /// UCB score of `child` from the point of view of `mover`.
    fn urgency(&self, child: &Node, mover: Player, log_parent: f64) -> f64 {
        let winrate = match mover {
            Player::Black => child.winrate(),
            Player::White => 1.0 - child.winrate(),
        };
        winrate + self.config.exploration * (log_parent / child.visits as f64).sqrt()
    }

    /// Picks the child of an expanded node to descend into. Unvisited
    /// children come first.
    fn select_child(&self, board: &Board) -> Board {
        let parent_visits = self.nodes.get(board).map_or(0, |n| n.visits);
        let log_parent = (parent_visits.max(1) as f64).ln();
        let mover = board.next_player();

        let mut best = *board;
        let mut best_score = f64::NEG_INFINITY;
        for (_, child) in children(board) {
            let node = self.nodes.get(&child).copied().unwrap_or_default();
            if node.visits == 0 {
                return child;
            }
            let score = self.urgency(&node, mover, log_parent);
            if score > best_score {
                best_score = score;
                best = child;
            }
        }
        best
    }

    /// Walks down from `root`, returning the path of distinct positions.
    /// The last entry is where the rollouts start.
    fn tree_descend(&self, root: &Board) -> Vec<Board> {
        let mut path = Vec::with_capacity(64);
        let mut seen = HashSet::with_capacity(64);
        let mut curr = *root;
        loop {
            if !seen.insert(curr) {
                // The path came back to a position it already holds.
                break;
            }
            path.push(curr);
            if self.nodes.get(&curr).is_none_or(|n| n.is_leaf) {
                break;
            }
            curr = self.select_child(&curr);
        }
        path
    }

    fn tree_update(&mut self, path: &[Board], visits: u64, value: i64) {
        for board in path {
            let node = self.nodes.entry(*board).or_default();
            node.visits += visits;
            node.value += value;
        }
    }

    /// Runs one selection/expansion/rollout/backup cycle from `root`.
    fn iterate(&mut self, root: &Board) {
        let path = self.tree_descend(root);
        let Some(&leaf) = path.last() else {
            return;
        };
        self.expand(&leaf);
        let rollouts = self.config.rollouts_per_leaf.max(1);
        let value: i64 = (0..rollouts).map(|_| rollout(leaf, &mut self.rng)).sum();
        self.tree_update(&path, rollouts as u64, value);
    }

    /// Most visited child of `root` among `moves`.
    fn best_move(&self, root: &Board, moves: &[Move]) -> Move {
        let mut best = moves.first().copied().unwrap_or(Move::SKIP);
        let mut best_visits = 0;
        for &mv in moves {
            let mut child = *root;
            let _ = child.play(mv);
            let visits = self.nodes.get(&child).map_or(0, |n| n.visits);
            if visits > best_visits {
                best_visits = visits;
                best = mv;
            }
        }
        best
    }

    fn dump_children(&self, root: &Board, moves: &[Move]) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        for &mv in moves {
            let mut child = *root;
            let _ = child.play(mv);
            if let Some(node) = self.nodes.get(&child) {
                debug!(
                    "move {mv} visits={} black_winrate={:.3}",
                    node.visits,
                    node.winrate()
                );
            }
        }
    }
}

impl Strategy for Mcts {
    fn name(&self) -> &'static str {
        "MCTSe"
    }

    fn compute_move(&mut self, board: &Board, cancel: &AtomicBool) -> Result<Move, ComputeError> {
        if cancel.load(Ordering::Acquire) {
            return Err(ComputeError::Cancelled);
        }
        let moves = board.get_placable();
        if moves.is_empty() {
            return Ok(Move::SKIP);
        }
        if !self.config.reuse_table {
            self.clear_table();
        }
        self.nodes.entry(*board).or_default();

        let deadline = deadline_after(self.config.think_time);
        let mut iterations = 0u64;
        while Instant::now() < deadline && !cancel.load(Ordering::Acquire) {
            self.iterate(board);
            iterations += 1;
        }
        info!(
            "{iterations} cycles done, {} nodes in table",
            self.nodes.len()
        );
        if cancel.load(Ordering::Acquire) {
            return Err(ComputeError::Cancelled);
        }
        self.dump_children(board, &moves);
        Ok(self.best_move(board, &moves))
    }
}
