//! Tree policy: the [UCT] rule that picks which child the selection phase
//! descends into.
//!
//! [UCT]: https://www.chessprogramming.org/UCT

/// Returns the Upper Confidence bound applied to Trees value of a child:
///
/// ```text
/// win_score / visits + exploration * sqrt(ln(parent_visits) / visits)
/// ```
///
/// Unvisited children score `+inf` so each one is tried before any sibling is
/// revisited. Children flagged as a forced loss score `-inf` and are only
/// picked when all siblings are flagged too.
///
/// ```
/// use iridium::search::uct;
///
/// assert_eq!(uct(0, 0, 10, 1.41, false), f64::INFINITY);
/// assert_eq!(uct(20, 2, 10, 0.0, false), 10.0);
/// assert_eq!(uct(20, 2, 10, 1.41, true), f64::NEG_INFINITY);
/// ```
#[must_use]
pub fn uct(win_score: u64, visits: u32, parent_visits: u32, exploration: f64, forced_loss: bool) -> f64 {
    if visits == 0 {
        return f64::INFINITY;
    }
    if forced_loss {
        return f64::NEG_INFINITY;
    }
    let visits = f64::from(visits);
    let exploitation = win_score as f64 / visits;
    let exploration_term = exploration * (f64::from(parent_visits).ln() / visits).sqrt();
    exploitation + exploration_term
}
