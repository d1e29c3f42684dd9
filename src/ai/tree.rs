//! Arena-allocated game tree used by the minimax search.
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`]. The
//! tree is built once per decision, bounded by depth, and dropped when the
//! decision has been made.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::game::{GameBoard, Player};

/// Index of a node inside its [`SearchTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub struct SearchNode<B: GameBoard> {
    board: B,
    mv: Option<B::Move>,
    to_move: Player,
    parent: Option<NodeId>,
    depth: usize,
    children: Vec<(B::Move, NodeId)>,
    visits: AtomicU32,
    wins: AtomicU32,
}

impl<B: GameBoard> SearchNode<B> {
    pub fn board(&self) -> &B {
        &self.board
    }

    /// Move that produced this node; `None` for the root.
    pub fn mv(&self) -> Option<B::Move> {
        self.mv
    }

    pub fn to_move(&self) -> Player {
        self.to_move
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Children in move generation order.
    pub fn children(&self) -> &[(B::Move, NodeId)] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn visits(&self) -> u32 {
        self.visits.load(Ordering::Relaxed)
    }

    pub fn wins(&self) -> u32 {
        self.wins.load(Ordering::Relaxed)
    }
}

/// Shape summary of a built tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeStatistics {
    pub total_nodes: usize,
    pub leaf_nodes: usize,
    pub terminal_nodes: usize,
    pub max_depth: usize,
    /// Mean number of children over nodes that have any.
    pub branching_factor: f64,
}

#[derive(Debug)]
pub struct SearchTree<B: GameBoard> {
    nodes: Vec<SearchNode<B>>,
}

impl<B: GameBoard> SearchTree<B> {
    /// Expand every position reachable from `root` within `max_depth` plies.
    ///
    /// Movers alternate each ply. A node whose mover has no legal move is a
    /// leaf, so passes end a line of play.
    ///
    /// # Panics
    /// Panics if the board rejects a move it reported as legal.
    pub fn build(root: B, to_move: Player, max_depth: usize) -> Self {
        let mut tree = SearchTree {
            nodes: vec![SearchNode {
                board: root,
                mv: None,
                to_move,
                parent: None,
                depth: 0,
                children: Vec::new(),
                visits: AtomicU32::new(0),
                wins: AtomicU32::new(0),
            }],
        };

        let mut stack = vec![NodeId(0)];
        while let Some(id) = stack.pop() {
            let (depth, mover) = {
                let node = &tree.nodes[id.0];
                (node.depth, node.to_move)
            };
            if depth >= max_depth {
                continue;
            }

            let moves = tree.nodes[id.0].board.legal_moves(mover);
            for mv in moves {
                if tree.nodes[id.0].children.iter().any(|(m, _)| *m == mv) {
                    continue;
                }
                let mut board = tree.nodes[id.0].board.clone();
                board
                    .apply_move(mover, mv)
                    .unwrap_or_else(|err| panic!("legal move {mv:?} was rejected: {err}"));

                let child = NodeId(tree.nodes.len());
                tree.nodes.push(SearchNode {
                    board,
                    mv: Some(mv),
                    to_move: mover.other(),
                    parent: Some(id),
                    depth: depth + 1,
                    children: Vec::new(),
                    visits: AtomicU32::new(0),
                    wins: AtomicU32::new(0),
                });
                tree.nodes[id.0].children.push((mv, child));
                stack.push(child);
            }
        }

        tree
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &SearchNode<B> {
        &self.nodes[id.0]
    }

    /// Child reached from `id` by `mv`, if it was expanded.
    pub fn child(&self, id: NodeId, mv: B::Move) -> Option<NodeId> {
        self.nodes[id.0]
            .children
            .iter()
            .find(|(m, _)| *m == mv)
            .map(|&(_, child)| child)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn record_visit(&self, id: NodeId) {
        self.nodes[id.0].visits.fetch_add(1, Ordering::Relaxed);
    }

    /// Credit a favourable leaf and every ancestor up to the root.
    pub fn record_win(&self, leaf: NodeId) {
        let mut current = Some(leaf);
        while let Some(id) = current {
            let node = &self.nodes[id.0];
            node.wins.fetch_add(1, Ordering::Relaxed);
            current = node.parent;
        }
    }

    pub fn statistics(&self) -> TreeStatistics {
        let mut leaf_nodes = 0;
        let mut terminal_nodes = 0;
        let mut max_depth = 0;
        let mut internal = 0;
        let mut edges = 0;

        for node in &self.nodes {
            max_depth = max_depth.max(node.depth);
            if node.is_leaf() {
                leaf_nodes += 1;
                if node.board.is_terminal() {
                    terminal_nodes += 1;
                }
            } else {
                internal += 1;
                edges += node.children.len();
            }
        }

        TreeStatistics {
            total_nodes: self.nodes.len(),
            leaf_nodes,
            terminal_nodes,
            max_depth,
            branching_factor: if internal == 0 {
                0.0
            } else {
                edges as f64 / internal as f64
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Board, Cell, Move};

    #[test]
    fn depth_zero_is_root_only() {
        let tree = SearchTree::build(Board::new(), Player::Black, 0);
        assert_eq!(tree.len(), 1);
        assert!(tree.node(tree.root()).is_leaf());
    }

    #[test]
    fn children_follow_generation_order() {
        let board = Board::new();
        let tree = SearchTree::build(board, Player::Black, 1);
        let moves: Vec<Move> = tree
            .node(tree.root())
            .children()
            .iter()
            .map(|(m, _)| *m)
            .collect();
        assert_eq!(moves, board.legal_moves(Player::Black));
    }

    #[test]
    fn child_board_is_parent_plus_move() {
        let board = Board::new();
        let tree = SearchTree::build(board, Player::Black, 2);
        let root = tree.root();
        for &(mv, child) in tree.node(root).children() {
            let mut expected = board;
            expected.play(Player::Black, mv).unwrap();
            let node = tree.node(child);
            assert_eq!(node.board(), &expected);
            assert_eq!(node.mv(), Some(mv));
            assert_eq!(node.parent(), Some(root));
            assert_eq!(node.to_move(), Player::White);
            assert_eq!(tree.child(root, mv), Some(child));
        }
    }

    #[test]
    fn opening_tree_statistics() {
        let tree = SearchTree::build(Board::new(), Player::Black, 2);
        let stats = tree.statistics();
        // 4 opening moves, each answered by 3 replies
        assert_eq!(stats.total_nodes, 1 + 4 + 12);
        assert_eq!(stats.leaf_nodes, 12);
        assert_eq!(stats.terminal_nodes, 0);
        assert_eq!(stats.max_depth, 2);
        assert!((stats.branching_factor - 16.0 / 5.0).abs() < 1e-9);
    }

    #[test]
    fn mover_without_moves_is_leaf() {
        let mut board = Board::empty();
        board.put(0, 0, Cell::White);
        board.put(0, 1, Cell::Black);
        // Black cannot capture anything; White can play (0,2)
        let tree = SearchTree::build(board, Player::Black, 3);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn wins_propagate_to_ancestors() {
        let tree = SearchTree::build(Board::new(), Player::Black, 2);
        let root = tree.root();
        let (_, child) = tree.node(root).children()[1];
        let (_, leaf) = tree.node(child).children()[0];
        tree.record_win(leaf);
        tree.record_visit(leaf);

        assert_eq!(tree.node(leaf).wins(), 1);
        assert_eq!(tree.node(child).wins(), 1);
        assert_eq!(tree.node(root).wins(), 1);
        assert_eq!(tree.node(leaf).visits(), 1);
        let (_, sibling) = tree.node(root).children()[0];
        assert_eq!(tree.node(sibling).wins(), 0);
    }
}
