//! Arena-allocated search tree.
//!
//! Nodes live in a contiguous [`Vec`] and reference each other through
//! [`NodeId`] indices: every node knows its parent and owns the list of its
//! children. Freed subtrees return their slots to a free list so the arena
//! does not grow across moves when the tree is retained.

use tracing::trace;

use crate::game::core::{Move, Player};
use crate::game::position::Position;
use crate::search::policy::uct;

/// Index of a node in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

impl NodeId {
    const fn index(self) -> usize {
        self.0
    }
}

pub(crate) struct Node {
    /// Snapshot of the game after [`Node::action`].
    pub(crate) position: Position,
    /// The player who made the move leading to this node. Playouts won by
    /// this player are credited to the node.
    pub(crate) player: Player,
    /// The move that produced this node from its parent, `None` for the
    /// root it was created as.
    pub(crate) action: Option<Move>,
    pub(crate) parent: Option<NodeId>,
    /// One child per legal move, in [`Position::legal_moves`] order.
    pub(crate) children: Vec<NodeId>,
    pub(crate) visits: u32,
    pub(crate) win_score: u64,
    /// Set when a playout found that the opponent of the searching player
    /// wins immediately after one of this node's children.
    pub(crate) forced_loss: bool,
    expanded: bool,
}

impl Node {
    fn new(position: Position, player: Player, action: Option<Move>, parent: Option<NodeId>) -> Self {
        Self {
            position,
            player,
            action,
            parent,
            children: Vec::new(),
            visits: 0,
            win_score: 0,
            forced_loss: false,
            expanded: false,
        }
    }
}

pub(crate) struct Tree {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    root: NodeId,
}

impl Tree {
    /// Creates a single-node tree. `player` is credited for the root, i.e. it
    /// is the player who is *not* to move in `position`.
    pub(crate) fn new(position: Position, player: Player) -> Self {
        Self {
            nodes: vec![Node::new(position, player, None, None)],
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    pub(crate) const fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    fn allocate(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = node;
                id
            },
            None => {
                let id = NodeId(self.nodes.len());
                self.nodes.push(node);
                id
            },
        }
    }

    /// Creates one child per legal move of the node. Expanding a node twice
    /// is a no-op.
    pub(crate) fn expand(&mut self, id: NodeId) {
        let node = self.get(id);
        if node.expanded {
            return;
        }
        let position = node.position.clone();
        let player = !node.player;
        let mut children = Vec::new();
        for next_move in position.legal_moves() {
            let mut child_position = position.clone();
            child_position.play(next_move);
            children.push(self.allocate(Node::new(child_position, player, Some(next_move), Some(id))));
        }
        let node = self.get_mut(id);
        node.children = children;
        node.expanded = true;
    }

    /// Returns the first child with the highest UCT value.
    fn best_uct_child(&self, id: NodeId, exploration: f64) -> Option<NodeId> {
        let node = self.get(id);
        let mut best: Option<(NodeId, f64)> = None;
        for &child_id in &node.children {
            let child = self.get(child_id);
            let value = uct(
                child.win_score,
                child.visits,
                node.visits,
                exploration,
                child.forced_loss,
            );
            if best.map_or(true, |(_, best_value)| value > best_value) {
                best = Some((child_id, value));
            }
        }
        best.map(|(child_id, _)| child_id)
    }

    /// Descends from the root following UCT-maximal children until reaching a
    /// node without children.
    pub(crate) fn select(&self, exploration: f64) -> NodeId {
        let mut id = self.root;
        while let Some(child) = self.best_uct_child(id, exploration) {
            id = child;
        }
        id
    }

    /// Records a playout result on the path from `id` up to the root.
    pub(crate) fn backpropagate(&mut self, id: NodeId, winner: Option<Player>, reward: u32) {
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.get_mut(id);
            node.visits += 1;
            if winner == Some(node.player) {
                node.win_score += u64::from(reward);
            }
            current = node.parent;
        }
    }

    /// Returns the first child with the highest visit count.
    pub(crate) fn most_visited_child(&self, id: NodeId) -> Option<NodeId> {
        let mut best: Option<NodeId> = None;
        for &child in &self.get(id).children {
            if best.map_or(true, |best| self.get(child).visits > self.get(best).visits) {
                best = Some(child);
            }
        }
        best
    }

    /// Returns the child of the root wrapping given position.
    pub(crate) fn find_root_child(&self, position: &Position) -> Option<NodeId> {
        self.get(self.root)
            .children
            .iter()
            .copied()
            .find(|&child| self.get(child).position == *position)
    }

    /// Makes a child of the root the new root. Its subtree keeps all
    /// statistics; the old root and every sibling subtree are freed.
    pub(crate) fn promote(&mut self, child: NodeId) {
        debug_assert_eq!(self.get(child).parent, Some(self.root));
        let old_root = self.root;
        let siblings = std::mem::take(&mut self.get_mut(old_root).children);
        for sibling in siblings {
            if sibling != child {
                self.free_subtree(sibling);
            }
        }
        self.free.push(old_root);
        self.get_mut(child).parent = None;
        self.root = child;
        trace!(nodes = self.len(), "promoted child to root");
    }

    /// Returns the slots of the node and all of its descendants to the free
    /// list.
    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            stack.extend(std::mem::take(&mut self.get_mut(id).children));
            self.free.push(id);
        }
    }
}
