//! Line-oriented text front end.
//!
//! Reads one command per line, optionally prefixed by a numeric id, and
//! answers `=<id> <message>` on success or `?<id> <message>` on failure.
//! Human sides are fed through [`UserInputHandle`]s, so `play` returns as
//! soon as the move is handed over; the board is printed by the presenter
//! once the coordinator applies it.
//!
//! ## Commands
//!
//! - `new <black> <white>` - start a game; sides are `human`, `random` or `mcts`
//! - `play <vertex>` / `skip` - move for the human side to move
//! - `pause`, `resume`, `takeback`
//! - `show`, `moves`, `status`
//! - `save <path>`, `load <path>`
//! - `autoskip <on|off>` - skip for humans automatically (applies to new games)
//! - `name`, `version`, `list_commands`, `known_command <cmd>`, `quit`

use std::fs;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use log::debug;

use crate::board::{Board, MatchResult, Move, Player};
use crate::coordinator::{GameCoordinator, GameStatus};
use crate::engine::{Engine, RandomChoice, UserInput, UserInputHandle};
use crate::mcts::{Mcts, MctsConfig};
use crate::presenter::Presenter;

const KNOWN_COMMANDS: &[&str] = &[
    "autoskip",
    "known_command",
    "list_commands",
    "load",
    "moves",
    "name",
    "new",
    "pause",
    "play",
    "quit",
    "resume",
    "save",
    "show",
    "skip",
    "status",
    "takeback",
    "version",
];

/// Prints positions and results to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrintPresenter;

impl Presenter for PrintPresenter {
    fn update_board(&self, board: &Board, last_move: Option<Move>) {
        let mut out = io::stdout().lock();
        match last_move {
            Some(mv) => {
                let _ = writeln!(out, "{} played {mv}", board.next_player().opponent());
            }
            None => {
                let _ = writeln!(out, "position reset");
            }
        }
        let _ = writeln!(out, "{board}");
    }

    fn announce_game_result(&self, result: MatchResult) {
        let _ = writeln!(io::stdout().lock(), "game over: {result}");
    }
}

/// Builds an engine from a console kind (`human`, `random`, `mcts`) or a
/// saved engine name. Human engines come with their input handle.
pub fn make_engine(
    kind: &str,
    auto_skip: bool,
    config: MctsConfig,
) -> Option<(Engine, Option<UserInputHandle>)> {
    match kind.to_ascii_lowercase().as_str() {
        "human" | "userinput" => {
            let (strategy, handle) = UserInput::new(auto_skip);
            Some((Engine::new(strategy), Some(handle)))
        }
        "random" | "randomchoice" => Some((Engine::new(RandomChoice::new()), None)),
        "mcts" | "mctse" => {
            let strategy = Mcts::with_config(config, fastrand::u64(..));
            Some((Engine::new(strategy), None))
        }
        _ => None,
    }
}

fn slot(side: Player) -> usize {
    match side {
        Player::Black => 0,
        Player::White => 1,
    }
}

pub struct Console {
    coordinator: GameCoordinator,
    /// Input handles of human sides, indexed Black then White.
    humans: [Option<UserInputHandle>; 2],
    /// Game id and ply count when the last human move was handed over.
    pending: Option<(u64, usize)>,
    auto_skip: bool,
    config: MctsConfig,
}

impl Console {
    pub fn new(presenter: Arc<dyn Presenter>, config: MctsConfig, auto_skip: bool) -> Self {
        Self {
            coordinator: GameCoordinator::new(presenter),
            humans: [None, None],
            pending: None,
            auto_skip,
            config,
        }
    }

    pub fn coordinator(&self) -> &GameCoordinator {
        &self.coordinator
    }

    /// Runs the command loop until `quit` or end of input.
    pub fn run(&mut self, input: impl BufRead, mut output: impl Write) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, command_line) = Self::parse_id(line);
            let parts: Vec<&str> = command_line.split_whitespace().collect();
            let Some((command, args)) = parts.split_first() else {
                continue;
            };
            let command = command.to_lowercase();

            let (success, message) = self.execute(&command, args);
            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();
            writeln!(output, "{prefix}{id_str} {message}")?;
            output.flush()?;

            if command == "quit" {
                break;
            }
        }
        Ok(())
    }

    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        match trimmed[..end].parse::<u32>() {
            Ok(id) => (Some(id), trimmed[end..].trim()),
            Err(_) => (None, trimmed),
        }
    }

    fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        debug!("console: {command} {args:?}");
        match command {
            "name" => (true, env!("CARGO_PKG_NAME").to_string()),

            "version" => (true, env!("CARGO_PKG_VERSION").to_string()),

            "list_commands" => (true, KNOWN_COMMANDS.join("\n")),

            "known_command" => match args.first() {
                Some(cmd) => {
                    let known = KNOWN_COMMANDS.contains(&cmd.to_lowercase().as_str());
                    (true, known.to_string())
                }
                None => (false, "missing argument".to_string()),
            },

            "quit" => (true, String::new()),

            "new" => match args {
                [black, white, ..] => self.new_game(black, white),
                _ => (false, "usage: new <black> <white>".to_string()),
            },

            "play" => match args.first() {
                Some(vertex) => match vertex.parse::<Move>() {
                    Ok(mv) => self.submit(mv),
                    Err(e) => (false, e.to_string()),
                },
                None => (false, "missing argument".to_string()),
            },

            "skip" => self.submit(Move::SKIP),

            "pause" => {
                self.coordinator.pause_game();
                (true, String::new())
            }

            "resume" => {
                self.coordinator.resume_game();
                (true, String::new())
            }

            "takeback" => reply(self.coordinator.take_back().map(|()| String::new())),

            "show" => (true, format!("\n{}", self.coordinator.board())),

            "moves" => (true, self.coordinator.to_legacy_text()),

            "status" => (true, self.status_line()),

            "save" => match args.first() {
                Some(path) => reply(self.save(path)),
                None => (false, "missing argument".to_string()),
            },

            "load" => match args.first() {
                Some(path) => reply(self.load(path)),
                None => (false, "missing argument".to_string()),
            },

            "autoskip" => match args.first().map(|s| s.to_lowercase()).as_deref() {
                Some("on") => {
                    self.auto_skip = true;
                    (true, String::new())
                }
                Some("off") => {
                    self.auto_skip = false;
                    (true, String::new())
                }
                None => (true, if self.auto_skip { "on" } else { "off" }.to_string()),
                Some(other) => (false, format!("expected on or off, got {other}")),
            },

            _ => (false, format!("unknown command: {command}")),
        }
    }

    fn new_game(&mut self, black: &str, white: &str) -> (bool, String) {
        let Some((black, black_handle)) = make_engine(black, self.auto_skip, self.config) else {
            return (false, format!("unknown engine: {black}"));
        };
        let Some((white, white_handle)) = make_engine(white, self.auto_skip, self.config) else {
            return (false, format!("unknown engine: {white}"));
        };
        self.coordinator.pause_game();
        let started = self
            .coordinator
            .load_black_engine(black)
            .and_then(|()| self.coordinator.load_white_engine(white))
            .and_then(|()| self.coordinator.start_new());
        self.humans = [black_handle, white_handle];
        reply(started.map(|()| String::new()))
    }

    fn submit(&mut self, mv: Move) -> (bool, String) {
        if self.coordinator.status() != GameStatus::InProgress {
            return (false, "no game in progress".to_string());
        }
        let game_id = self.coordinator.game_id();
        let plies = self.coordinator.annotation().len();
        // The board is stale until the previous hand-over has been applied.
        if self.pending == Some((game_id, plies)) {
            return (false, "previous move not applied yet".to_string());
        }
        let board = self.coordinator.board();
        let side = board.next_player();
        let Some(handle) = &self.humans[slot(side)] else {
            return (false, format!("{side} is not played by a human"));
        };
        if !board.is_legal(mv) {
            return (false, format!("illegal move: {mv}"));
        }
        if handle.submit(mv) {
            self.pending = Some((game_id, plies));
            (true, String::new())
        } else {
            (false, "input engine is gone".to_string())
        }
    }

    fn status_line(&self) -> String {
        let board = self.coordinator.board();
        let status = match self.coordinator.status() {
            GameStatus::NoGame => match self.coordinator.result() {
                MatchResult::InProgress => "no game".to_string(),
                result => format!("finished: {result}"),
            },
            GameStatus::InProgress => format!("{} to move", board.next_player()),
            GameStatus::Paused => "paused".to_string(),
        };
        format!(
            "{status}, ply {}, X {} O {}{}",
            self.coordinator.annotation().len(),
            board.piece_count(Player::Black),
            board.piece_count(Player::White),
            if self.coordinator.is_dirty() { ", unsaved" } else { "" }
        )
    }

    fn save(&self, path: &str) -> anyhow::Result<String> {
        let json = self.coordinator.to_json()?;
        fs::write(path, json).with_context(|| format!("writing {path}"))?;
        Ok(format!("saved to {path}"))
    }

    fn load(&mut self, path: &str) -> anyhow::Result<String> {
        let json = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
        let (auto_skip, config) = (self.auto_skip, self.config);
        let mut handles: [Option<UserInputHandle>; 2] = [None, None];
        self.coordinator.from_json(&json, |side, name| {
            let (engine, handle) = make_engine(name, auto_skip, config)?;
            handles[slot(side)] = handle;
            Some(engine)
        })?;
        self.humans = handles;
        Ok(format!(
            "loaded {} plies from {path}",
            self.coordinator.annotation().len()
        ))
    }
}

fn reply<E: std::fmt::Display>(result: Result<String, E>) -> (bool, String) {
    match result {
        Ok(message) => (true, message),
        Err(e) => (false, format!("{e:#}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presenter::NullPresenter;
    use std::thread;
    use std::time::{Duration, Instant};

    fn quiet_console() -> Console {
        Console::new(Arc::new(NullPresenter), MctsConfig::default(), true)
    }

    fn wait_for_plies(console: &Console, plies: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while console.coordinator().annotation().len() < plies {
            assert!(Instant::now() < deadline, "timed out waiting for ply {plies}");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_parse_id_with_id() {
        let (id, cmd) = Console::parse_id("123 show");
        assert_eq!(id, Some(123));
        assert_eq!(cmd, "show");
    }

    #[test]
    fn test_parse_id_without_id() {
        let (id, cmd) = Console::parse_id("show");
        assert_eq!(id, None);
        assert_eq!(cmd, "show");
    }

    #[test]
    fn test_known_command() {
        let mut console = quiet_console();
        assert_eq!(
            console.execute("known_command", &["takeback"]),
            (true, "true".to_string())
        );
        assert_eq!(
            console.execute("known_command", &["genmove"]),
            (true, "false".to_string())
        );
        assert!(!console.execute("frobnicate", &[]).0);
    }

    #[test]
    fn test_play_requires_human_turn() {
        let mut console = quiet_console();
        assert!(!console.execute("play", &["d6"]).0);
        assert!(console.execute("new", &["human", "human"]).0);
        // Not a legal opening move for Black.
        assert!(!console.execute("play", &["a1"]).0);
        assert!(!console.execute("play", &["z9"]).0);
        assert!(console.execute("play", &["f4"]).0);
        wait_for_plies(&console, 1);
        assert_eq!(console.coordinator().annotation(), vec![Move::new(6, 4)]);
        assert_eq!(
            console.execute("moves", &[]),
            (true, "f4 #".to_string())
        );
    }

    #[test]
    fn test_second_play_waits_for_first_to_apply() {
        let mut console = quiet_console();
        assert!(console.execute("new", &["human", "human"]).0);
        assert!(console.execute("play", &["f4"]).0);
        // Refused whether or not f4 has been applied yet.
        assert!(!console.execute("play", &["e3"]).0);
        wait_for_plies(&console, 1);
        assert_eq!(console.coordinator().annotation(), vec![Move::new(6, 4)]);

        assert!(console.execute("play", &["d3"]).0);
        wait_for_plies(&console, 2);
        assert_eq!(
            console.execute("moves", &[]),
            (true, "f4 d3 #".to_string())
        );
    }

    #[test]
    fn test_unknown_engine_kind() {
        let mut console = quiet_console();
        let (success, message) = console.execute("new", &["human", "alphazero"]);
        assert!(!success);
        assert!(message.contains("alphazero"));
        assert_eq!(console.coordinator().status(), GameStatus::NoGame);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        let path = path.to_str().unwrap();

        let mut console = quiet_console();
        console.execute("new", &["human", "human"]);
        for (i, mv) in ["f4", "d3"].into_iter().enumerate() {
            assert!(console.execute("play", &[mv]).0);
            wait_for_plies(&console, i + 1);
        }
        assert!(console.coordinator().is_dirty());
        assert!(console.execute("save", &[path]).0);
        assert!(!console.coordinator().is_dirty());

        let mut other = quiet_console();
        let (success, message) = other.execute("load", &[path]);
        assert!(success, "{message}");
        assert_eq!(other.coordinator().status(), GameStatus::Paused);
        assert_eq!(other.coordinator().board(), console.coordinator().board());
        assert_eq!(
            other.coordinator().engine_names(),
            (Some("UserInput"), Some("UserInput"))
        );

        other.execute("resume", &[]);
        assert!(other.execute("play", &["c4"]).0);
        wait_for_plies(&other, 3);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let mut console = quiet_console();
        assert!(!console.execute("load", &[path.to_str().unwrap()]).0);
    }

    #[test]
    fn test_run_loop_answers_with_ids() {
        let mut console = quiet_console();
        let input = b"1 name\n\n# comment\n2 known_command show\nquit\nname\n";
        let mut output = Vec::new();
        console.run(&input[..], &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert_eq!(output, "=1 reversi-rust\n=2 true\n= \n");
    }
}
