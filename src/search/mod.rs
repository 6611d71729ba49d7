//! [Search] looks ahead into possible continuations of the game to pick the
//! move to play.
//!
//! The main strategy is [Monte Carlo Tree Search] (MCTS) with UCT selection
//! and random playouts: [`Mcts`]. [`minimax`] implements an alternative
//! iterative-deepening negamax search over the same [`Position`] contract.
//!
//! [Search]: https://www.chessprogramming.org/Search
//! [Monte Carlo Tree Search]: https://en.wikipedia.org/wiki/Monte_Carlo_tree_search
//! [`Position`]: crate::game::position::Position

use std::fmt;
use std::time::{Duration, Instant};

use anyhow::bail;

mod mcts;
pub mod minimax;
mod policy;
mod tree;

pub use mcts::{ChildStats, Mcts, SearchResult};
pub use policy::uct;

/// Search depth in plies.
pub type Depth = u8;

/// Parameters of the MCTS search.
///
/// ```
/// use std::time::Duration;
///
/// use iridium::search::Config;
///
/// let config = Config::default()
///     .with_move_time(None)
///     .with_iterations(Some(1000))
///     .with_exploration(1.0);
/// assert!(config.validate().is_ok());
/// assert!(Config::default().with_move_time(None).validate().is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Wall-clock budget of a single search.
    pub move_time: Option<Duration>,
    /// Maximum number of iterations of a single search.
    pub iterations: Option<u32>,
    /// Exploration constant `C` of the UCT formula.
    pub exploration: f64,
    /// Score added to a node for every playout won by the player it is
    /// credited to.
    pub reward: u32,
    /// Keeps the subtree of the committed move for the next search.
    pub retain_tree: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            move_time: Some(Duration::from_millis(100)),
            iterations: None,
            exploration: 1.41,
            reward: 10,
            retain_tree: true,
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_move_time(mut self, move_time: Option<Duration>) -> Self {
        self.move_time = move_time;
        self
    }

    #[must_use]
    pub fn with_iterations(mut self, iterations: Option<u32>) -> Self {
        self.iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    #[must_use]
    pub fn with_reward(mut self, reward: u32) -> Self {
        self.reward = reward;
        self
    }

    #[must_use]
    pub fn with_retain_tree(mut self, retain_tree: bool) -> Self {
        self.retain_tree = retain_tree;
        self
    }

    /// Checks that the search is bounded and the UCT parameters make sense.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.move_time.is_none() && self.iterations.is_none() {
            bail!("either move time or iteration limit has to be set");
        }
        if self.move_time == Some(Duration::ZERO) {
            bail!("move time has to be positive");
        }
        if self.iterations == Some(0) {
            bail!("iteration limit has to be positive");
        }
        if !self.exploration.is_finite() || self.exploration < 0.0 {
            bail!(
                "exploration constant has to be a non-negative number, got {}",
                self.exploration
            );
        }
        if self.reward == 0 {
            bail!("reward has to be positive");
        }
        Ok(())
    }
}

/// The algorithm used to pick engine moves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Strategy {
    /// Monte Carlo Tree Search.
    #[default]
    Mcts,
    /// Iterative deepening negamax with alpha-beta pruning.
    Negamax,
}

impl TryFrom<&str> for Strategy {
    type Error = anyhow::Error;

    fn try_from(strategy: &str) -> anyhow::Result<Self> {
        match strategy.to_ascii_lowercase().as_str() {
            "mcts" => Ok(Self::Mcts),
            "negamax" => Ok(Self::Negamax),
            _ => bail!("strategy should be 'mcts' or 'negamax', got '{strategy}'"),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mcts => write!(f, "mcts"),
            Self::Negamax => write!(f, "negamax"),
        }
    }
}

/// Tracks the budget of a single search.
pub(crate) struct Limiter {
    pub(crate) timer: Instant,
    pub(crate) time: Option<Duration>,
    pub(crate) iterations: Option<u32>,
}

impl Limiter {
    pub(crate) fn new(time: Option<Duration>, iterations: Option<u32>) -> Self {
        Self {
            timer: Instant::now(),
            time,
            iterations,
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.timer.elapsed()
    }

    pub(crate) fn out_of_time(&self) -> bool {
        self.time
            .is_some_and(|time_limit| self.timer.elapsed() >= time_limit)
    }

    /// Returns true once either the time or the iteration budget is spent.
    pub(crate) fn is_exhausted(&self, iterations: u32) -> bool {
        self.iterations.is_some_and(|limit| iterations >= limit) || self.out_of_time()
    }
}

/// Search speed in nodes (or playouts) per second.
pub(crate) fn nps(nodes: u64, elapsed: Duration) -> u64 {
    let seconds = elapsed.as_secs_f64();
    if seconds > 0.0 {
        (nodes as f64 / seconds) as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validation() {
        assert!(Config::default().validate().is_ok());
        assert!(Config::default()
            .with_move_time(None)
            .with_iterations(Some(1))
            .validate()
            .is_ok());
        assert!(Config::default().with_move_time(None).validate().is_err());
        assert!(Config::default()
            .with_move_time(Some(Duration::ZERO))
            .validate()
            .is_err());
        assert!(Config::default().with_iterations(Some(0)).validate().is_err());
        assert!(Config::default().with_exploration(-1.0).validate().is_err());
        assert!(Config::default()
            .with_exploration(f64::NAN)
            .validate()
            .is_err());
        assert!(Config::default().with_reward(0).validate().is_err());
    }

    #[test]
    fn strategy() {
        assert_eq!(Strategy::try_from("mcts").unwrap(), Strategy::Mcts);
        assert_eq!(Strategy::try_from("Negamax").unwrap(), Strategy::Negamax);
        assert!(Strategy::try_from("alphazero").is_err());
        assert_eq!(Strategy::Negamax.to_string(), "negamax");
    }

    #[test]
    fn limiter() {
        let limiter = Limiter::new(None, Some(3));
        assert!(!limiter.is_exhausted(2));
        assert!(limiter.is_exhausted(3));
        assert!(!limiter.out_of_time());

        let limiter = Limiter::new(Some(Duration::ZERO), None);
        assert!(limiter.out_of_time());
        assert!(limiter.is_exhausted(0));
    }
}
