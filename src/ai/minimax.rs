use log::debug;

use crate::game::{Board, GameBoard, Move, Player};

use super::agent::Policy;
use super::heuristic::{EvaluationStrategy, Heuristic};
use super::tree::{NodeId, SearchTree};

/// Whether the search may skip subtrees that cannot change the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pruning {
    #[default]
    AlphaBeta,
    /// Exhaustive minimax over the same tree.
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<M> {
    /// First move (in generation order) achieving the best value.
    pub best_move: Option<M>,
    /// Backed-up value from the searching player's perspective.
    pub value: f64,
    /// Nodes reached by the minimax pass.
    pub nodes_expanded: usize,
    pub leaves_evaluated: usize,
}

#[derive(Default)]
struct SearchCounters {
    nodes_expanded: usize,
    leaves_evaluated: usize,
}

/// Depth-bounded minimax over a freshly built [`SearchTree`].
pub struct MinimaxSearch<H> {
    heuristic: H,
    pruning: Pruning,
}

impl<H> MinimaxSearch<H> {
    pub fn new(heuristic: H) -> Self {
        MinimaxSearch {
            heuristic,
            pruning: Pruning::AlphaBeta,
        }
    }

    pub fn with_pruning(mut self, pruning: Pruning) -> Self {
        self.pruning = pruning;
        self
    }

    pub fn heuristic(&self) -> &H {
        &self.heuristic
    }

    pub fn pruning(&self) -> Pruning {
        self.pruning
    }

    /// Search `depth` plies ahead for `player`.
    ///
    /// With no legal move, a terminal position or `depth == 0` the result
    /// carries no move and the static evaluation of `board`.
    pub fn search<B>(&self, board: &B, player: Player, depth: usize) -> SearchResult<B::Move>
    where
        B: GameBoard,
        H: Heuristic<B>,
    {
        if depth == 0 || board.is_terminal() || board.legal_moves(player).is_empty() {
            return SearchResult {
                best_move: None,
                value: self.heuristic.evaluate(board, board, player),
                nodes_expanded: 0,
                leaves_evaluated: 1,
            };
        }

        let tree = SearchTree::build(board.clone(), player, depth);
        debug!("search tree: {:?}", tree.statistics());

        let root = tree.root();
        tree.record_visit(root);
        let mut counters = SearchCounters {
            nodes_expanded: 1,
            leaves_evaluated: 0,
        };

        let mut alpha = f64::NEG_INFINITY;
        let mut best_value = f64::NEG_INFINITY;
        let mut best_move = None;
        for &(mv, child) in tree.node(root).children() {
            let value = self.value_of(&tree, child, player, alpha, f64::INFINITY, &mut counters);
            if value > best_value {
                best_value = value;
                best_move = Some(mv);
            }
            if self.pruning == Pruning::AlphaBeta {
                alpha = alpha.max(value);
            }
        }

        SearchResult {
            best_move,
            value: best_value,
            nodes_expanded: counters.nodes_expanded,
            leaves_evaluated: counters.leaves_evaluated,
        }
    }

    pub fn choose_move<B>(&self, board: &B, player: Player, depth: usize) -> Option<B::Move>
    where
        B: GameBoard,
        H: Heuristic<B>,
    {
        self.search(board, player, depth).best_move
    }

    fn value_of<B>(
        &self,
        tree: &SearchTree<B>,
        id: NodeId,
        player: Player,
        mut alpha: f64,
        mut beta: f64,
        counters: &mut SearchCounters,
    ) -> f64
    where
        B: GameBoard,
        H: Heuristic<B>,
    {
        tree.record_visit(id);
        counters.nodes_expanded += 1;
        let node = tree.node(id);

        if node.is_leaf() {
            counters.leaves_evaluated += 1;
            let before = node.parent().map_or(node.board(), |p| tree.node(p).board());
            let value = self.heuristic.evaluate(before, node.board(), player);
            if value > 0.0 {
                tree.record_win(id);
            }
            return value;
        }

        let maximizing = node.to_move() == player;
        let mut best = if maximizing {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };

        for &(_, child) in node.children() {
            let value = self.value_of(tree, child, player, alpha, beta, counters);
            if maximizing {
                best = best.max(value);
                alpha = alpha.max(value);
            } else {
                best = best.min(value);
                beta = beta.min(value);
            }
            if self.pruning == Pruning::AlphaBeta && beta <= alpha {
                break;
            }
        }

        best
    }
}

/// Minimax search at a fixed depth, playing as a match seat.
pub struct SearchPolicy {
    engine: MinimaxSearch<EvaluationStrategy>,
    depth: usize,
    name: String,
}

impl SearchPolicy {
    pub fn new(engine: MinimaxSearch<EvaluationStrategy>, depth: usize) -> Self {
        let name = format!("Minimax({:?}, depth {})", engine.heuristic().kind(), depth);
        SearchPolicy {
            engine,
            depth,
            name,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Policy for SearchPolicy {
    fn choose_move(&mut self, board: &Board, player: Player) -> Option<Move> {
        self.engine.choose_move(board, player, self.depth)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
