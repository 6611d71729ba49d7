//! Plays games between two engines and tallies the results.

use std::io;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use iridium::game::core::{Move, Player};
use iridium::game::position::Position;
use iridium::make_rng;
use iridium::search::minimax::{self, Limits, MAX_DEPTH};
use iridium::search::{Config, Mcts, Strategy};
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Plays Ultimate Tic-Tac-Toe games between two engines.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Number of games to play.
    #[arg(long, default_value_t = 10)]
    games: u32,
    /// Time budget per move in milliseconds.
    #[arg(long, default_value_t = 100)]
    move_time: u64,
    /// Strategy of the first player.
    #[arg(long, value_enum, default_value_t = Strategy::Mcts)]
    x: Strategy,
    /// Strategy of the second player.
    #[arg(long, value_enum, default_value_t = Strategy::Mcts)]
    o: Strategy,
    /// Maximum depth of the negamax search.
    #[arg(long, default_value_t = MAX_DEPTH)]
    depth: u8,
    /// Base seed of the playouts.
    #[arg(long)]
    seed: Option<u64>,
    /// Log verbosity. `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// One side of the match.
struct Contender {
    strategy: Strategy,
    mcts: Mcts<ChaCha8Rng>,
    limits: Limits,
}

impl Contender {
    fn new(strategy: Strategy, move_time: Duration, depth: u8, seed: Option<u64>) -> Self {
        Self {
            strategy,
            mcts: Mcts::new(
                Config::default().with_move_time(Some(move_time)),
                make_rng(seed),
            ),
            limits: Limits::default()
                .with_depth(depth.min(MAX_DEPTH))
                .with_move_time(Some(move_time)),
        }
    }

    fn pick(&mut self, position: &Position) -> anyhow::Result<Move> {
        match self.strategy {
            Strategy::Mcts => {
                let next = self.mcts.engine_move(position)?;
                next.last_move().context("search did not play a move")
            },
            Strategy::Negamax => {
                Ok(minimax::find_best_move(position, &self.limits, &mut io::sink())?.best_move)
            },
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    x: u32,
    o: u32,
    draws: u32,
}

fn play_game(x: &mut Contender, o: &mut Contender) -> anyhow::Result<Position> {
    x.mcts.reset();
    o.mcts.reset();
    let mut position = Position::starting();
    while !position.is_game_over() {
        let contender = match position.side_to_move() {
            Player::X => &mut *x,
            Player::O => &mut *o,
        };
        let next_move = contender.pick(&position)?;
        position
            .try_play(next_move)
            .with_context(|| format!("engine produced an illegal move {next_move}"))?;
    }
    Ok(position)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let move_time = Duration::from_millis(cli.move_time);
    let mut x = Contender::new(cli.x, move_time, cli.depth, cli.seed);
    let mut o = Contender::new(
        cli.o,
        move_time,
        cli.depth,
        cli.seed.map(|seed| seed.wrapping_add(1)),
    );
    info!(x = %cli.x, o = %cli.o, games = cli.games, "starting self-play");

    let mut tally = Tally::default();
    for game in 1..=cli.games {
        let position = play_game(&mut x, &mut o)?;
        match position.evaluate() {
            Some(Player::X) => tally.x += 1,
            Some(Player::O) => tally.o += 1,
            None => tally.draws += 1,
        }
        println!(
            "Game {game}: {} in {} moves",
            position.result(),
            position.history().len()
        );
        info!(?tally, "game {game} finished");
    }
    println!(
        "X ({}) {} - O ({}) {} - draws {}",
        cli.x, tally.x, cli.o, tally.o, tally.draws
    );
    Ok(())
}
