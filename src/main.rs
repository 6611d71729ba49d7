use std::io;
use std::time::Duration;

use clap::{Parser, Subcommand};
use iridium::search::minimax::{Limits, MAX_DEPTH};
use iridium::search::{Config, Strategy};
use iridium::{Engine, Settings};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Ultimate Tic-Tac-Toe engine. Reads commands from stdin and answers on
/// stdout.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Time budget per engine move in milliseconds.
    #[arg(long, default_value_t = 100)]
    move_time: u64,
    /// Exploration constant of the UCT formula.
    #[arg(long, default_value_t = 1.41)]
    exploration: f64,
    /// Score credited to a node for every won playout.
    #[arg(long, default_value_t = 10)]
    reward: u32,
    /// Discard the search tree after every move.
    #[arg(long)]
    no_retain: bool,
    /// Seed for the playouts. Searches are reproducible with a fixed seed and
    /// an iteration limit.
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, value_enum, default_value_t = Strategy::Mcts)]
    strategy: Strategy,
    /// Maximum depth of the negamax search.
    #[arg(long, default_value_t = MAX_DEPTH)]
    depth: u8,
    /// Log verbosity. `RUST_LOG` takes precedence.
    #[arg(long, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Runs fixed searches on a few positions and prints node count and speed.
    Bench,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Some(Command::Bench) = cli.command {
        return iridium::bench(&mut io::stdout().lock());
    }

    let move_time = Some(Duration::from_millis(cli.move_time));
    let config = Config::default()
        .with_move_time(move_time)
        .with_exploration(cli.exploration)
        .with_reward(cli.reward)
        .with_retain_tree(!cli.no_retain);
    config.validate()?;
    let limits = Limits::default()
        .with_depth(cli.depth.min(MAX_DEPTH))
        .with_move_time(move_time);
    limits.validate()?;
    tracing::debug!(?config, ?limits, strategy = %cli.strategy, "starting engine");

    iridium::print_engine_info();
    iridium::print_binary_info();

    let settings = Settings {
        config,
        limits,
        strategy: cli.strategy,
        seed: cli.seed,
    };
    let mut input = io::stdin().lock();
    let mut output = io::stdout().lock();
    let mut engine = Engine::new(settings, &mut input, &mut output);
    engine.protocol_loop()
}
