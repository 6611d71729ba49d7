//! The `bench` command runs a fixed amount of work on a few positions and
//! reports the total node count and speed. The node count only depends on
//! the seeded searches, so it identifies the exact engine behavior across
//! builds while the speed measures the machine.

use std::io::Write;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::game::core::Move;
use crate::game::position::Position;
use crate::search::{nps, Config, Mcts};

const ITERATIONS: u32 = 10_000;
const SEED: u64 = 0x1d1d;

/// Opening, early middlegame and late middlegame.
const POSITIONS: [&str; 3] = [
    "",
    "e5 e4 d2 a5 b5 e6 e8 d4",
    "h5 d6 a7 b2 f6 g9 c8 i6 i8 i5 h4 f3 h7 e2 e4 e3 e7 f2 g5 c6 i9 h9 d8 b5 d4 b1 f1 h3 d9 b7 \
     d2 a5 c4 g2 b6 f8 h6 f9 g8 a4 c3 h8 f4 g1 b3 e9 e8 f7 i3 g7 a3",
];

fn parse(moves: &str) -> anyhow::Result<Position> {
    let moves = moves
        .split_whitespace()
        .map(Move::from_notation)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Position::from_moves(moves)
}

/// Runs fixed-iteration searches on a small set of positions to provide an
/// estimate of engine's performance and prints `<nodes> nodes <nps> nps`.
///
/// NOTE: This function **has to run less than 60 seconds**.
pub fn bench(output: &mut impl Write) -> anyhow::Result<()> {
    let config = Config::default()
        .with_move_time(None)
        .with_iterations(Some(ITERATIONS))
        .with_retain_tree(false);
    let timer = Instant::now();
    let mut nodes = 0;
    for moves in POSITIONS {
        let position = parse(moves)?;
        let mut mcts = Mcts::new(config.clone(), ChaCha8Rng::seed_from_u64(SEED));
        let result = mcts.search(&position)?;
        nodes += u64::from(result.iterations);
    }
    writeln!(output, "{} nodes {} nps", nodes, nps(nodes, timer.elapsed()))?;
    Ok(())
}
