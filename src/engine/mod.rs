//! The engine puts all pieces together: it keeps the position agreed upon
//! with the client and dispatches searches to the selected [`Strategy`].
//!
//! [`Engine::protocol_loop`] is the "main loop" of the engine which
//! communicates with the environment and executes commands from the input
//! stream. The protocol is a simplified take on the [Universal Chess
//! Interface] adapted to Ultimate Tic-Tac-Toe.
//!
//! [Universal Chess Interface]: https://www.chessprogramming.org/UCI

use std::io::{BufRead, Write};
use std::time::Duration;

use itertools::Itertools;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::engine::protocol::{Command, EngineOption, OptionValue};
use crate::game::core::Move;
use crate::game::position::Position;
use crate::search::minimax::{self, Limits};
use crate::search::{Config, Mcts, Strategy};

mod bench;
mod protocol;

pub use bench::bench;

/// Everything that can be configured before the engine starts.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    pub config: Config,
    pub limits: Limits,
    pub strategy: Strategy,
    /// Seed of the playout randomness. Taken from the OS when missing.
    pub seed: Option<u64>,
}

/// Creates the random number generator used by searches.
#[must_use]
pub fn make_rng(seed: Option<u64>) -> ChaCha8Rng {
    seed.map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64)
}

/// The Engine connects everything together and handles commands sent by the
/// client, including I/O.
pub struct Engine<'a, R: BufRead, W: Write> {
    position: Position,
    strategy: Strategy,
    mcts: Mcts<ChaCha8Rng>,
    limits: Limits,
    input: &'a mut R,
    output: &'a mut W,
}

impl<'a, R: BufRead, W: Write> Engine<'a, R, W> {
    /// Creates a new instance of the engine with starting position and
    /// provided I/O.
    #[must_use]
    pub fn new(settings: Settings, input: &'a mut R, output: &'a mut W) -> Self {
        Self {
            position: Position::starting(),
            strategy: settings.strategy,
            mcts: Mcts::new(settings.config, make_rng(settings.seed)),
            limits: settings.limits,
            input,
            output,
        }
    }

    /// Continuously reads the input stream and executes the commands until
    /// "quit" is sent or the stream is closed.
    ///
    /// Malformed commands and illegal moves are reported through
    /// `info string` lines and otherwise ignored. Only I/O errors end the
    /// loop early.
    pub fn protocol_loop(&mut self) -> anyhow::Result<()> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                break;
            }
            match Command::parse(&line) {
                Command::Hello => self.handle_hello()?,
                Command::IsReady => writeln!(self.output, "readyok")?,
                Command::SetOption { option, value } => self.handle_setoption(option, value)?,
                Command::NewGame => self.handle_newgame(),
                Command::SetPosition { moves } => self.handle_position(&moves)?,
                Command::Play(next_move) => self.handle_play(&next_move)?,
                Command::Go {
                    movetime,
                    iterations,
                    depth,
                } => self.handle_go(movetime, iterations, depth)?,
                Command::Moves => writeln!(
                    self.output,
                    "{}",
                    self.position.legal_moves().iter().join(" ")
                )?,
                Command::Display => writeln!(self.output, "{:?}", self.position)?,
                Command::Result => writeln!(self.output, "{}", self.position.result())?,
                Command::Quit => break,
                Command::Unknown(command) => {
                    writeln!(self.output, "info string Unsupported command: {command}")?;
                },
            }
            self.output.flush()?;
        }
        Ok(())
    }

    /// Responds to the `hello` handshake by identifying the engine and
    /// listing the options with their current values.
    fn handle_hello(&mut self) -> anyhow::Result<()> {
        writeln!(
            self.output,
            "id name {} {}",
            env!("CARGO_PKG_NAME"),
            crate::engine_version()
        )?;
        writeln!(self.output, "id author {}", env!("CARGO_PKG_AUTHORS"))?;
        let config = self.mcts.config();
        writeln!(
            self.output,
            "option name MoveTime type spin default {} min 0 max 3600000",
            config.move_time.map_or(0, |time| time.as_millis())
        )?;
        writeln!(
            self.output,
            "option name Iterations type spin default {} min 0 max {}",
            config.iterations.unwrap_or(0),
            u32::MAX
        )?;
        writeln!(
            self.output,
            "option name Exploration type string default {}",
            config.exploration
        )?;
        writeln!(
            self.output,
            "option name Reward type spin default {} min 1 max {}",
            config.reward,
            u32::MAX
        )?;
        writeln!(
            self.output,
            "option name RetainTree type check default {}",
            config.retain_tree
        )?;
        writeln!(
            self.output,
            "option name Strategy type combo default {} var mcts var negamax",
            self.strategy
        )?;
        writeln!(
            self.output,
            "option name Depth type spin default {} min 1 max {}",
            self.limits.depth,
            minimax::MAX_DEPTH
        )?;
        writeln!(self.output, "hellook")?;
        Ok(())
    }

    /// Applies the option if the resulting configuration is valid. Zero
    /// `MoveTime` or `Iterations` removes the corresponding limit.
    fn handle_setoption(&mut self, option: EngineOption, value: OptionValue) -> anyhow::Result<()> {
        let mut config = self.mcts.config().clone();
        let mut limits = self.limits.clone();
        match (option, value) {
            (EngineOption::MoveTime, OptionValue::Integer(millis)) => {
                let time = (millis > 0).then_some(Duration::from_millis(millis));
                config.move_time = time;
                limits.move_time = time;
            },
            (EngineOption::Iterations, OptionValue::Integer(iterations)) => {
                config.iterations = match iterations {
                    0 => None,
                    n => Some(u32::try_from(n).unwrap_or(u32::MAX)),
                };
            },
            (EngineOption::Exploration, OptionValue::Float(exploration)) => {
                config.exploration = exploration;
            },
            (EngineOption::Reward, OptionValue::Integer(reward)) => {
                config.reward = u32::try_from(reward).unwrap_or(u32::MAX);
            },
            (EngineOption::RetainTree, OptionValue::Boolean(retain)) => {
                config.retain_tree = retain;
            },
            (EngineOption::Strategy, OptionValue::Strategy(strategy)) => {
                self.strategy = strategy;
            },
            (EngineOption::Depth, OptionValue::Integer(depth)) => {
                limits.depth = u8::try_from(depth).unwrap_or(u8::MAX).min(minimax::MAX_DEPTH);
            },
            (option, value) => {
                writeln!(
                    self.output,
                    "info string Invalid value {value:?} for option {option:?}"
                )?;
                return Ok(());
            },
        }
        if let Err(e) = config.validate().and_then(|()| limits.validate()) {
            warn!("rejected option {option:?}: {e:#}");
            writeln!(self.output, "info string Invalid option: {e:#}")?;
            return Ok(());
        }
        debug!(?config, ?limits, strategy = %self.strategy, "options updated");
        self.mcts.set_config(config);
        self.limits = limits;
        Ok(())
    }

    fn handle_newgame(&mut self) {
        self.position = Position::starting();
        self.mcts.reset();
    }

    /// Replaces the position with the one reached by `moves` from the
    /// starting position. The position stays unchanged if any move is
    /// illegal.
    fn handle_position(&mut self, moves: &[String]) -> anyhow::Result<()> {
        let position = moves
            .iter()
            .map(|m| Move::from_notation(m))
            .collect::<anyhow::Result<Vec<_>>>()
            .and_then(Position::from_moves);
        match position {
            Ok(position) => self.position = position,
            Err(e) => {
                warn!("rejected position: {e:#}");
                writeln!(self.output, "info string Invalid position: {e:#}")?;
            },
        }
        Ok(())
    }

    /// Applies the opponent's move.
    fn handle_play(&mut self, next_move: &str) -> anyhow::Result<()> {
        if let Err(e) =
            Move::from_notation(next_move).and_then(|next_move| self.position.try_play(next_move))
        {
            warn!("rejected move {next_move}: {e:#}");
            writeln!(self.output, "info string Illegal move: {e:#}")?;
        }
        Ok(())
    }

    /// Searches for the engine move, reports it and applies it to the
    /// position. Limits given to `go` only apply to this search.
    fn handle_go(
        &mut self,
        movetime: Option<u64>,
        iterations: Option<u32>,
        depth: Option<u8>,
    ) -> anyhow::Result<()> {
        if self.position.is_game_over() {
            writeln!(
                self.output,
                "info string The game is over: {}",
                self.position.result()
            )?;
            writeln!(self.output, "bestmove none")?;
            return Ok(());
        }
        let move_time = movetime.map(Duration::from_millis);
        let best_move = match self.strategy {
            Strategy::Mcts => {
                let config = self.go_config(move_time, iterations);
                if let Err(e) = config.validate() {
                    return self.reject_go(&e);
                }
                self.go_mcts(config)?
            },
            Strategy::Negamax => {
                let limits = self.go_limits(move_time, depth);
                if let Err(e) = limits.validate() {
                    return self.reject_go(&e);
                }
                self.go_negamax(&limits)?
            },
        };
        writeln!(self.output, "bestmove {best_move}")?;
        Ok(())
    }

    fn reject_go(&mut self, e: &anyhow::Error) -> anyhow::Result<()> {
        warn!("rejected go limits: {e:#}");
        writeln!(self.output, "info string Invalid go limits: {e:#}")?;
        Ok(())
    }

    /// Limits given to `go` replace both budgets of the configured search for
    /// one move.
    fn go_config(&self, move_time: Option<Duration>, iterations: Option<u32>) -> Config {
        let config = self.mcts.config().clone();
        if move_time.is_none() && iterations.is_none() {
            return config;
        }
        config.with_move_time(move_time).with_iterations(iterations)
    }

    fn go_limits(&self, move_time: Option<Duration>, depth: Option<u8>) -> Limits {
        let mut limits = self.limits.clone();
        if move_time.is_some() {
            limits.move_time = move_time;
        }
        if let Some(depth) = depth {
            limits.depth = depth;
        }
        limits
    }

    fn go_mcts(&mut self, config: Config) -> anyhow::Result<Move> {
        let saved = self.mcts.config().clone();
        self.mcts.set_config(config);
        let searched = self.mcts.search(&self.position);
        self.mcts.set_config(saved);
        let result = searched?;
        writeln!(
            self.output,
            "info iterations {} nodes {} time {} visits {} winrate {:.0}%",
            result.iterations,
            result.tree_size,
            result.elapsed.as_millis(),
            result.visits,
            result.win_rate
        )?;
        for child in self.mcts.root_children() {
            debug!(
                action = %child.action,
                visits = child.visits,
                win_score = child.win_score,
                forced_loss = child.forced_loss,
                "root child"
            );
        }
        let (best_move, position) = self.mcts.commit()?;
        self.position = position;
        Ok(best_move)
    }

    fn go_negamax(&mut self, limits: &Limits) -> anyhow::Result<Move> {
        let outcome = minimax::find_best_move(&self.position, limits, &mut *self.output)?;
        self.position.play(outcome.best_move);
        Ok(outcome.best_move)
    }
}
