//! Decision making: the [`Policy`] seam, minimax search over an arena tree,
//! Othello heuristics, and the Q-network model used by the learning agent.

mod agent;
pub mod heuristic;
mod learned;
pub mod minimax;
pub mod model;
pub mod networks;
mod random;
pub mod state_encoding;
pub mod tree;

pub use agent::Policy;
pub use heuristic::{EvaluationStrategy, Heuristic, HeuristicKind};
pub use learned::LearnedPolicy;
pub use minimax::{MinimaxSearch, Pruning, SearchPolicy, SearchResult};
pub use model::{ModelConfig, QModel, QNetworkModel};
pub use random::RandomPolicy;
pub use tree::{NodeId, SearchNode, SearchTree, TreeStatistics};
