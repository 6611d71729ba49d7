//! Implementation of [Minimax] algorithm with [Negamax] and [Alpha-Beta
//! pruning] extensions, iteratively deepened while time remains.
//!
//! The search works on a single [`Position`] through
//! [`Position::play`]/[`Position::unplay`] and keeps no tree between moves.
//!
//! [Minimax]: https://en.wikipedia.org/wiki/Minimax
//! [Negamax]: https://en.wikipedia.org/wiki/Negamax
//! [Alpha-Beta pruning]: https://en.wikipedia.org/wiki/Alpha%E2%80%93beta_pruning

use std::io::Write;
use std::time::Duration;

use anyhow::bail;
use tracing::debug;

use crate::evaluation::{heuristic, Score};
use crate::game::core::{Move, BOARD_SIZE};
use crate::game::position::Position;
use crate::search::{nps, Depth, Limiter};

/// Maximum depth of the iterative deepening.
pub const MAX_DEPTH: Depth = 22;

/// The deadline is polled once per this many nodes.
const TIME_CHECK_INTERVAL: u64 = 1024;

/// Budget of the negamax search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Deepest iteration to run.
    pub depth: Depth,
    /// Wall-clock budget. Depth 1 always completes; deeper iterations are
    /// abandoned once it is spent.
    pub move_time: Option<Duration>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            depth: MAX_DEPTH,
            move_time: Some(Duration::from_millis(100)),
        }
    }
}

impl Limits {
    #[must_use]
    pub fn with_depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    #[must_use]
    pub fn with_move_time(mut self, move_time: Option<Duration>) -> Self {
        self.move_time = move_time;
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.depth == 0 {
            bail!("search depth has to be positive");
        }
        Ok(())
    }
}

/// Result of the deepest completed iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub best_move: Move,
    /// Score from the perspective of the side to move.
    pub score: Score,
    /// Depth of the iteration the move comes from.
    pub depth: Depth,
    pub nodes: u64,
}

struct Searcher {
    position: Position,
    limiter: Limiter,
    nodes: u64,
    /// Whether the current iteration may be abandoned at the deadline.
    can_abort: bool,
    aborted: bool,
}

impl Searcher {
    fn should_stop(&mut self) -> bool {
        if self.can_abort && self.nodes % TIME_CHECK_INTERVAL == 0 && self.limiter.out_of_time() {
            self.aborted = true;
        }
        self.aborted
    }

    /// Fail-soft negamax: the result may lie outside of the `[alpha, beta]`
    /// window.
    fn negamax(&mut self, depth: Depth, ply: u8, mut alpha: Score, beta: Score) -> Score {
        self.nodes += 1;
        // The only player who can have just won is the previous mover.
        if self.position.evaluate().is_some() {
            return Score::loss_in(ply);
        }
        let moves = self.position.legal_moves();
        if moves.is_empty() {
            return Score::DRAW;
        }
        if depth == 0 {
            return heuristic(&self.position);
        }
        if self.should_stop() {
            return Score::DRAW;
        }
        let mut best = -Score::INFINITY;
        for next_move in moves {
            self.position.play(next_move);
            let score = -self.negamax(depth - 1, ply + 1, -beta, -alpha);
            self.position.unplay();
            if self.aborted {
                return best;
            }
            if score > best {
                best = score;
                if score > alpha {
                    alpha = score;
                }
                if alpha >= beta {
                    break;
                }
            }
        }
        best
    }

    /// Searches all root moves to given depth. Returns `None` if the
    /// iteration was abandoned.
    fn search_root(&mut self, depth: Depth) -> Option<(Move, Score)> {
        let mut alpha = -Score::INFINITY;
        let beta = Score::INFINITY;
        let mut best: Option<(Move, Score)> = None;
        for next_move in self.position.legal_moves() {
            self.position.play(next_move);
            let score = -self.negamax(depth - 1, 1, -beta, -alpha);
            self.position.unplay();
            if self.aborted {
                return None;
            }
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((next_move, score));
                if score > alpha {
                    alpha = score;
                }
            }
        }
        best
    }
}

/// Runs iterative deepening from depth 1 and reports one `info` line per
/// completed depth to `output`.
pub fn find_best_move(
    position: &Position,
    limits: &Limits,
    output: &mut impl Write,
) -> anyhow::Result<Outcome> {
    limits.validate()?;
    if position.is_game_over() {
        bail!("can not search a finished game");
    }
    let mut searcher = Searcher {
        position: position.clone(),
        limiter: Limiter::new(limits.move_time, None),
        nodes: 0,
        can_abort: false,
        aborted: false,
    };
    // Searching deeper than the number of empty cells only repeats the work.
    let remaining = BOARD_SIZE - u8::try_from(position.ply())?;
    let max_depth = limits.depth.min(remaining);

    let mut outcome: Option<Outcome> = None;
    for depth in 1..=max_depth {
        searcher.can_abort = depth > 1;
        let Some((best_move, score)) = searcher.search_root(depth) else {
            debug!(depth, "iteration abandoned at the deadline");
            break;
        };
        outcome = Some(Outcome {
            best_move,
            score,
            depth,
            nodes: searcher.nodes,
        });
        writeln!(
            output,
            "info depth {} score {} pv {} nodes {} time {}",
            depth,
            score,
            best_move,
            searcher.nodes,
            searcher.limiter.elapsed().as_millis(),
        )?;
        if score.is_decisive() || searcher.limiter.out_of_time() {
            break;
        }
    }

    let Some(outcome) = outcome else {
        bail!("search did not complete a single iteration");
    };
    writeln!(
        output,
        "info nodes {} nps {}",
        searcher.nodes,
        nps(searcher.nodes, searcher.limiter.elapsed()),
    )?;
    Ok(Outcome {
        nodes: searcher.nodes,
        ..outcome
    })
}
