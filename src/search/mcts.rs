use std::time::Duration;

use anyhow::bail;
use rand::Rng;
use tracing::{debug, trace};

use crate::game::core::{Move, Player};
use crate::game::position::Position;
use crate::search::tree::{NodeId, Tree};
use crate::search::{Config, Limiter};

/// Summary of a finished search.
#[derive(Clone, Debug)]
pub struct SearchResult {
    /// The move [`Mcts::commit`] would play.
    pub best_move: Move,
    /// Visits of the best child.
    pub visits: u32,
    /// Share of the best child's playouts won by the side to move, in
    /// percent.
    pub win_rate: f64,
    /// Iterations (playouts) performed by this search.
    pub iterations: u32,
    /// Visits of the root, including the ones retained from previous
    /// searches.
    pub root_visits: u32,
    /// Live nodes in the tree.
    pub tree_size: usize,
    pub elapsed: Duration,
}

/// Search statistics of a root child.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildStats {
    pub action: Move,
    pub visits: u32,
    pub win_score: u64,
    pub forced_loss: bool,
}

/// Implements Monte Carlo Tree Search with UCT selection and uniformly random
/// playouts.
///
/// 1. Selection: Start from root node and follow the children with the
///    highest UCT value until reaching a node without children.
/// 2. Expansion: A node is played out once as a leaf. On its next visit,
///    unless the game is over in it, one child per legal move is added.
/// 3. Simulation: Play random moves until the game ends, starting from the
///    node itself on its first visit and from a random new child of the
///    freshly expanded node otherwise.
/// 4. Backpropagation: Update the nodes on the path from the simulated node to
///    the root with the result.
///
/// The tree is kept between moves: after [`Mcts::commit`] the chosen child
/// becomes the root and the next [`Mcts::search`] continues from it if the
/// game goes on from one of its children.
///
/// ```
/// use iridium::game::position::Position;
/// use iridium::search::{Config, Mcts};
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
///
/// let config = Config::default().with_move_time(None).with_iterations(Some(200));
/// let mut mcts = Mcts::new(config, ChaCha8Rng::seed_from_u64(7));
/// let position = mcts.engine_move(&Position::starting()).unwrap();
/// assert_eq!(position.history().len(), 1);
/// ```
pub struct Mcts<R: Rng> {
    config: Config,
    rng: R,
    tree: Option<Tree>,
}

impl<R: Rng> Mcts<R> {
    /// Creates a driver without a tree. The randomness of playouts and child
    /// picks comes from `rng` exclusively.
    #[must_use]
    pub const fn new(config: Config, rng: R) -> Self {
        Self {
            config,
            rng,
            tree: None,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Replaces the search parameters. The retained tree survives unless
    /// retention is turned off.
    pub fn set_config(&mut self, config: Config) {
        if !config.retain_tree {
            self.tree = None;
        }
        self.config = config;
    }

    /// Drops the retained tree, e.g. when a new game starts.
    pub fn reset(&mut self) {
        self.tree = None;
    }

    /// Returns the retained tree if it can continue from `position` or builds
    /// a fresh one.
    fn take_tree(&mut self, position: &Position) -> Tree {
        if self.config.retain_tree {
            if let Some(mut tree) = self.tree.take() {
                // Equality ignores history: the root adopts the caller's
                // position so that committed moves extend the agreed game.
                let root = tree.root();
                if tree.get(root).position == *position {
                    tree.get_mut(root).position = position.clone();
                    debug!(nodes = tree.len(), "reusing retained root");
                    return tree;
                }
                if let Some(child) = tree.find_root_child(position) {
                    tree.promote(child);
                    tree.get_mut(child).position = position.clone();
                    debug!(nodes = tree.len(), visits = tree.get(child).visits, "promoted retained child");
                    return tree;
                }
                debug!("position is not in the retained tree, starting over");
            }
        }
        // The root is credited to the player who is not to move.
        Tree::new(position.clone(), !position.side_to_move())
    }

    /// Runs the search from `position` until the budget is exhausted. At least
    /// one iteration is always performed.
    ///
    /// The result is available through [`Mcts::commit`] and
    /// [`Mcts::root_children`].
    pub fn search(&mut self, position: &Position) -> anyhow::Result<SearchResult> {
        if position.is_game_over() {
            bail!("can not search a finished game");
        }
        let mut tree = self.take_tree(position);
        // Playouts won by this player right after the searching side moves
        // mark the searching side's move as a forced loss.
        let opponent = !position.side_to_move();
        let limiter = Limiter::new(self.config.move_time, self.config.iterations);

        let mut iterations = 0;
        loop {
            let leaf = tree.select(self.config.exploration);
            let target = rollout_target(&mut tree, leaf, &mut self.rng);
            let winner = simulate(&mut tree, target, opponent, &mut self.rng);
            tree.backpropagate(target, winner, self.config.reward);
            iterations += 1;
            trace!(iteration = iterations, ?winner, "playout finished");
            if limiter.is_exhausted(iterations) {
                break;
            }
        }

        let root = tree.get(tree.root());
        let Some(best) = tree.most_visited_child(tree.root()) else {
            bail!("root has no children after {iterations} iterations");
        };
        let best = tree.get(best);
        let Some(best_move) = best.action else {
            bail!("child of the root has no move");
        };
        let result = SearchResult {
            best_move,
            visits: best.visits,
            win_rate: win_rate(best.win_score, best.visits, self.config.reward),
            iterations,
            root_visits: root.visits,
            tree_size: tree.len(),
            elapsed: limiter.elapsed(),
        };
        debug!(
            iterations,
            best_move = %result.best_move,
            visits = result.visits,
            win_rate = result.win_rate,
            nodes = result.tree_size,
            "search finished"
        );
        self.tree = Some(tree);
        Ok(result)
    }

    /// Picks the most visited root child (the first one on ties) and returns
    /// its move and the resulting position. The child becomes the new root
    /// when tree retention is on; otherwise the tree is dropped.
    pub fn commit(&mut self) -> anyhow::Result<(Move, Position)> {
        let Some(mut tree) = self.tree.take() else {
            bail!("commit() requires a preceding search");
        };
        let Some(best) = tree.most_visited_child(tree.root()) else {
            bail!("the searched position has no legal moves");
        };
        let Some(best_move) = tree.get(best).action else {
            bail!("child of the root has no move");
        };
        let mut position = tree.get(tree.root()).position.clone();
        position.play(best_move);
        if self.config.retain_tree {
            tree.promote(best);
            self.tree = Some(tree);
        }
        debug!(%best_move, "committed move");
        Ok((best_move, position))
    }

    /// Searches `position` and plays the best move, returning the new
    /// position.
    pub fn engine_move(&mut self, position: &Position) -> anyhow::Result<Position> {
        let _ = self.search(position)?;
        let (_, position) = self.commit()?;
        Ok(position)
    }

    /// Statistics of the root children in move order. Empty before the first
    /// search.
    #[must_use]
    pub fn root_children(&self) -> Vec<ChildStats> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };
        tree.get(tree.root())
            .children
            .iter()
            .filter_map(|&child| {
                let node = tree.get(child);
                node.action.map(|action| ChildStats {
                    action,
                    visits: node.visits,
                    win_score: node.win_score,
                    forced_loss: node.forced_loss,
                })
            })
            .collect()
    }

    /// Position at the root of the retained tree.
    #[must_use]
    pub fn root_position(&self) -> Option<&Position> {
        self.tree.as_ref().map(|tree| &tree.get(tree.root()).position)
    }

    /// Visits of the retained root.
    #[must_use]
    pub fn root_visits(&self) -> u32 {
        self.tree
            .as_ref()
            .map_or(0, |tree| tree.get(tree.root()).visits)
    }
}

/// Decides where the playout of an iteration starts, given the selected
/// leaf.
///
/// A node is played out once before it is expanded. On its next visit it is
/// expanded and the playout starts from a uniformly random new child. The
/// root is the exception: it is expanded right away so that even a single
/// iteration leaves moves to pick from. Finished games are played out from
/// the leaf itself.
fn rollout_target<R: Rng>(tree: &mut Tree, leaf: NodeId, rng: &mut R) -> NodeId {
    let node = tree.get(leaf);
    if node.position.is_game_over() {
        return leaf;
    }
    let first_visit = node.visits == 0;
    if first_visit && leaf != tree.root() {
        return leaf;
    }
    tree.expand(leaf);
    if first_visit {
        return leaf;
    }
    let children = &tree.get(leaf).children;
    children[rng.gen_range(0..children.len())]
}

/// Plays the game out from the target node and returns the winner.
///
/// A target already won by `opponent` marks its parent as a forced loss
/// instead of running a playout.
fn simulate<R: Rng>(tree: &mut Tree, target: NodeId, opponent: Player, rng: &mut R) -> Option<Player> {
    let node = tree.get(target);
    if node.position.evaluate() == Some(opponent) {
        if let Some(parent) = node.parent {
            tree.get_mut(parent).forced_loss = true;
        }
        return Some(opponent);
    }
    let mut playout = node.position.clone();
    while !playout.is_game_over() {
        playout.random_play(rng);
    }
    playout.evaluate()
}

fn win_rate(win_score: u64, visits: u32, reward: u32) -> f64 {
    if visits == 0 {
        return 0.0;
    }
    100.0 * win_score as f64 / (f64::from(visits) * f64::from(reward))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::search::tree::Node;

    fn mcts(iterations: u32) -> Mcts<ChaCha8Rng> {
        let config = Config::default()
            .with_move_time(None)
            .with_iterations(Some(iterations));
        Mcts::new(config, ChaCha8Rng::seed_from_u64(42))
    }

    /// Checks that every node has more visits than its children together:
    /// the first playout through a node always starts from the node itself.
    fn check_visits(tree: &Tree, id: NodeId) {
        let node = tree.get(id);
        let children_visits: u32 = node.children.iter().map(|&child| tree.get(child).visits).sum();
        if !node.children.is_empty() {
            assert!(node.visits > children_visits, "{} <= {children_visits}", node.visits);
        }
        for &child in &node.children {
            check_visits(tree, child);
        }
    }

    #[test]
    fn minimal_budget() {
        let mut mcts = mcts(1);
        let position = Position::starting();
        let result = mcts.search(&position).unwrap();
        assert_eq!(result.iterations, 1);
        assert!(result.best_move.index() < 81);
        assert!(position.legal_moves().contains(&result.best_move));
        let (best_move, next) = mcts.commit().unwrap();
        assert_eq!(best_move, result.best_move);
        assert_eq!(next.history(), &[best_move]);
    }

    #[test]
    fn visit_accounting() {
        let mut mcts = mcts(500);
        let result = mcts.search(&Position::starting()).unwrap();
        assert_eq!(result.root_visits, 500);
        assert_eq!(mcts.root_visits(), 500);
        let children = mcts.root_children();
        assert_eq!(children.len(), 81);
        // The first iteration expands the root and plays out from it.
        assert_eq!(children.iter().map(|child| child.visits).sum::<u32>(), 499);
        let tree = mcts.tree.as_ref().unwrap();
        check_visits(tree, tree.root());
    }

    #[test]
    fn scores_are_monotonic() {
        let mut mcts = mcts(50);
        let _ = mcts.search(&Position::starting()).unwrap();
        let before = mcts.root_children();
        mcts.set_config(mcts.config().clone().with_iterations(Some(200)));
        let _ = mcts.search(&Position::starting()).unwrap();
        let after = mcts.root_children();
        assert_eq!(mcts.root_visits(), 250);
        for (before, after) in before.iter().zip(after.iter()) {
            assert_eq!(before.action, after.action);
            assert!(after.visits >= before.visits);
            assert!(after.win_score >= before.win_score);
            assert!(after.win_score <= u64::from(after.visits) * 10);
        }
    }

    #[test]
    fn retention_keeps_statistics() {
        let mut mcts = mcts(400);
        let start = Position::starting();
        let _ = mcts.search(&start).unwrap();
        let (_, after_engine) = mcts.commit().unwrap();
        // The engine's own move is the root now.
        assert_eq!(mcts.root_position(), Some(&after_engine));

        // The opponent replies with the most explored answer.
        let reply = mcts
            .root_children()
            .into_iter()
            .max_by_key(|child| child.visits)
            .unwrap();
        assert!(reply.visits > 0);
        let mut after_reply = after_engine.clone();
        after_reply.play(reply.action);

        let result = mcts.search(&after_reply).unwrap();
        assert_eq!(mcts.root_position(), Some(&after_reply));
        assert_eq!(result.root_visits, reply.visits + 400);
    }

    #[test]
    fn equal_root_is_reused() {
        let mut mcts = mcts(100);
        let position = Position::from_moves([Move::new(4, 4)]).unwrap();
        let _ = mcts.search(&position).unwrap();
        let _ = mcts.search(&position).unwrap();
        assert_eq!(mcts.root_visits(), 200);
    }

    #[test]
    fn unrelated_position_starts_over() {
        let mut mcts = mcts(100);
        let _ = mcts.search(&Position::starting()).unwrap();
        let unrelated = Position::from_moves([Move::new(4, 4), Move::new(4, 0)]).unwrap();
        let _ = mcts.search(&unrelated).unwrap();
        assert_eq!(mcts.root_visits(), 100);
        assert_eq!(mcts.root_position(), Some(&unrelated));
    }

    #[test]
    fn no_retention() {
        let mut mcts = mcts(100);
        mcts.set_config(mcts.config().clone().with_retain_tree(false));
        let _ = mcts.search(&Position::starting()).unwrap();
        let _ = mcts.commit().unwrap();
        assert!(mcts.root_children().is_empty());
        assert!(mcts.commit().is_err());
    }

    #[test]
    fn seeded_search_is_reproducible() {
        let play = || {
            let mut mcts = mcts(300);
            let mut position = Position::starting();
            for _ in 0..6 {
                position = mcts.engine_move(&position).unwrap();
            }
            position.history().to_vec()
        };
        assert_eq!(play(), play());
    }

    #[test]
    fn finished_game() {
        let mut mcts = mcts(10);
        assert!(mcts.commit().is_err());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut position = Position::starting();
        while !position.is_game_over() {
            position.random_play(&mut rng);
        }
        assert!(mcts.search(&position).is_err());
    }

    /// O to move with six legal moves: four of them let X win the game
    /// immediately, `c7` and `a9` do not.
    const FORCED_LOSS: &str = "h5 d6 a7 b2 f6 g9 c8 i6 i8 i5 h4 f3 h7 e2 e4 e3 e7 f2 g5 c6 \
                               i9 h9 d8 b5 d4 b1 f1 h3 d9 b7 d2 a5 c4 g2 b6 f8 h6 f9 g8 a4 \
                               c3 h8 f4 g1 b3 e9 e8 f7 i3 g7 a3";

    #[test]
    fn avoids_forced_loss() {
        let moves: Vec<Move> = FORCED_LOSS
            .split_whitespace()
            .map(|m| Move::from_notation(m).unwrap())
            .collect();
        let position = Position::from_moves(moves).unwrap();
        assert_eq!(position.side_to_move(), Player::O);
        assert_eq!(position.legal_moves().len(), 6);

        // A large exploration constant spreads visits evenly enough for every
        // losing move to reach the opponent's winning reply.
        let config = Config::default()
            .with_move_time(None)
            .with_iterations(Some(2000))
            .with_exploration(1000.0);
        let mut mcts = Mcts::new(config, ChaCha8Rng::seed_from_u64(42));
        let result = mcts.search(&position).unwrap();

        let safe = [
            Move::from_notation("c7").unwrap(),
            Move::from_notation("a9").unwrap(),
        ];
        for child in mcts.root_children() {
            assert_eq!(child.forced_loss, !safe.contains(&child.action), "{child:?}");
        }
        assert!(safe.contains(&result.best_move));
    }

    /// Visits a node the way a search iteration that selected it would.
    fn visit(tree: &mut Tree, leaf: NodeId, rng: &mut ChaCha8Rng) -> NodeId {
        let target = rollout_target(tree, leaf, rng);
        tree.backpropagate(target, None, 10);
        target
    }

    #[test]
    fn rollout_targets() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut tree = Tree::new(Position::starting(), Player::O);
        let root = tree.root();
        // The root is expanded on its first visit and played out itself.
        assert_eq!(visit(&mut tree, root, &mut rng), root);
        assert_eq!(tree.get(root).children.len(), 81);

        // b1 sends O to the empty sub-board 1.
        let child = tree.get(root).children[1];
        assert_eq!(visit(&mut tree, child, &mut rng), child);
        assert!(tree.get(child).children.is_empty());

        let target = visit(&mut tree, child, &mut rng);
        assert_eq!(tree.get(child).children.len(), 9);
        assert!(tree.get(child).children.contains(&target));
        assert_eq!(tree.get(target).visits, 1);
        assert_eq!(tree.get(child).visits, 2);
        assert_eq!(tree.get(root).visits, 3);
    }

    #[test]
    fn rollout_child_depends_on_seed() {
        let picks: HashSet<Option<Move>> = (0..16)
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let mut tree = Tree::new(Position::starting(), Player::O);
                let root = tree.root();
                let _ = visit(&mut tree, root, &mut rng);
                let child = tree.get(root).children[1];
                let _ = visit(&mut tree, child, &mut rng);
                let target = visit(&mut tree, child, &mut rng);
                tree.get(target).action
            })
            .collect();
        assert!(picks.len() > 1, "{picks:?}");
    }

    #[test]
    fn second_visit_expands() {
        // One iteration for the root, one per root child and one more that
        // revisits the most promising child.
        let mut mcts = mcts(1 + 81 + 1);
        let _ = mcts.search(&Position::starting()).unwrap();
        let tree = mcts.tree.as_ref().unwrap();
        let root = tree.get(tree.root());
        let expanded: Vec<&Node> = root
            .children
            .iter()
            .map(|&child| tree.get(child))
            .filter(|child| !child.children.is_empty())
            .collect();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].visits, 2);
        let visited: Vec<u32> = expanded[0]
            .children
            .iter()
            .map(|&grandchild| tree.get(grandchild).visits)
            .filter(|&visits| visits > 0)
            .collect();
        assert_eq!(visited, vec![1]);
        check_visits(tree, tree.root());
    }

    #[test]
    fn time_budget_only() {
        let config = Config::default().with_move_time(Some(Duration::from_millis(1)));
        assert_eq!(config.iterations, None);
        let mut mcts = Mcts::new(config, ChaCha8Rng::seed_from_u64(5));
        let mut position = Position::starting();
        for _ in 0..3 {
            let result = mcts.search(&position).unwrap();
            assert!(result.iterations >= 1);
            assert!(position.legal_moves().contains(&result.best_move));
            let (best_move, next) = mcts.commit().unwrap();
            assert_eq!(best_move, result.best_move);
            position = next;
        }
        assert_eq!(position.history().len(), 3);
    }

    #[test]
    fn commit_extends_callers_history() {
        let setup = |notation: &str| {
            Position::from_moves(
                notation
                    .split_whitespace()
                    .map(|m| Move::from_notation(m).unwrap()),
            )
            .unwrap()
        };
        let first = setup("a1 b1 d1 c1 g1");
        let transposed = setup("a1 c1 g1 b1 d1");
        assert_eq!(first, transposed);

        let mut mcts = mcts(100);
        let _ = mcts.search(&first).unwrap();
        let _ = mcts.search(&transposed).unwrap();
        assert_eq!(mcts.root_visits(), 200);
        let (best_move, next) = mcts.commit().unwrap();
        assert_eq!(&next.history()[..5], transposed.history());
        assert_eq!(next.last_move(), Some(best_move));
    }

    #[test]
    fn win_rate_percent() {
        assert!((win_rate(50, 10, 10) - 50.0).abs() < f64::EPSILON);
        assert!((win_rate(0, 0, 10)).abs() < f64::EPSILON);
    }
}
