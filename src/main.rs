//! Reversi-Rust command line.
//!
//! ## Usage
//!
//! - `reversi-rust` - Start the text console
//! - `reversi-rust console --think-ms 500` - Console with a faster MCTS
//! - `reversi-rust selfplay --black mcts --white random --games 10` - Play
//!   engines against each other and print a tally

use std::io;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use reversi_rust::board::MatchResult;
use reversi_rust::console::{Console, PrintPresenter};
use reversi_rust::coordinator::GameCoordinator;
use reversi_rust::engine::{Engine, RandomChoice};
use reversi_rust::mcts::{Mcts, MctsConfig};
use reversi_rust::presenter::{ChannelPresenter, PresenterEvent};

/// Reversi-Rust: Reversi with threaded MCTS engines
#[derive(Parser)]
#[command(name = "reversi-rust")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play through a line-oriented text console on stdin/stdout
    Console {
        /// MCTS thinking time per move in milliseconds
        #[arg(long, default_value_t = 1000)]
        think_ms: u64,
        /// Skip automatically for human sides that have no move
        #[arg(long)]
        auto_skip: bool,
    },
    /// Play engines against each other
    Selfplay {
        #[arg(long, value_enum, default_value_t = Kind::Mcts)]
        black: Kind,
        #[arg(long, value_enum, default_value_t = Kind::Random)]
        white: Kind,
        /// Number of games to play
        #[arg(long, default_value_t = 1)]
        games: u32,
        /// Base seed; game `i` seeds its engines from `seed + i`
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// MCTS thinking time per move in milliseconds
        #[arg(long, default_value_t = 1000)]
        think_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Random,
    Mcts,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Selfplay {
            black,
            white,
            games,
            seed,
            think_ms,
        }) => run_selfplay(black, white, games, seed, think_ms),
        Some(Commands::Console {
            think_ms,
            auto_skip,
        }) => run_console(think_ms, auto_skip),
        None => run_console(1000, false),
    }
}

fn config(think_ms: u64) -> MctsConfig {
    MctsConfig {
        think_time: Duration::from_millis(think_ms),
        ..MctsConfig::default()
    }
}

fn run_console(think_ms: u64, auto_skip: bool) -> anyhow::Result<()> {
    let mut console = Console::new(Arc::new(PrintPresenter), config(think_ms), auto_skip);
    console
        .run(io::stdin().lock(), io::stdout())
        .context("console I/O failed")
}

fn build(kind: Kind, seed: u64, think_ms: u64) -> Engine {
    match kind {
        Kind::Random => Engine::new(RandomChoice::with_seed(seed)),
        Kind::Mcts => Engine::new(Mcts::with_config(config(think_ms), seed)),
    }
}

fn run_selfplay(black: Kind, white: Kind, games: u32, seed: u64, think_ms: u64) -> anyhow::Result<()> {
    if games == 0 {
        bail!("--games must be at least 1");
    }
    let (mut black_wins, mut white_wins, mut draws) = (0u32, 0u32, 0u32);
    for i in 0..games {
        let (tx, rx) = mpsc::channel();
        let mut coordinator = GameCoordinator::new(Arc::new(ChannelPresenter::new(tx)));
        let game_seed = seed.wrapping_add(u64::from(i));
        coordinator.load_black_engine(build(black, game_seed, think_ms))?;
        // Different streams for the two sides.
        coordinator.load_white_engine(build(white, game_seed ^ 0x9e37_79b9_7f4a_7c15, think_ms))?;
        coordinator.start_new()?;

        let result = loop {
            match rx.recv().context("coordinator stopped before the game ended")? {
                PresenterEvent::Result(result) => break result,
                PresenterEvent::Board { .. } => {}
            }
        };
        println!("game {}: {result}\n{}", i + 1, coordinator.board());
        info!("game {} finished after {} plies", i + 1, coordinator.annotation().len());
        match result {
            MatchResult::Black => black_wins += 1,
            MatchResult::White => white_wins += 1,
            MatchResult::Draw => draws += 1,
            MatchResult::InProgress => {}
        }
    }
    println!("Black ({black:?}) {black_wins}, White ({white:?}) {white_wins}, draws {draws}");
    Ok(())
}
