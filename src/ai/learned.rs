use std::sync::Arc;

use crate::game::{Board, Move, Player};
use crate::training::Learner;

use super::agent::Policy;
use super::state_encoding::{action_index, encode_board};

/// Plays whatever a shared [`Learner`] picks. Several policies (one per
/// concurrent match) may wrap the same learner.
pub struct LearnedPolicy {
    learner: Arc<dyn Learner>,
    explore: bool,
    name: String,
}

impl LearnedPolicy {
    /// Exploring policy, as used during self-play training.
    pub fn new(learner: Arc<dyn Learner>) -> Self {
        let name = format!("Learned({})", learner.name());
        LearnedPolicy {
            learner,
            explore: true,
            name,
        }
    }

    /// Always play the highest-valued legal move.
    pub fn greedy(learner: Arc<dyn Learner>) -> Self {
        LearnedPolicy {
            explore: false,
            ..Self::new(learner)
        }
    }

    pub fn learner(&self) -> &Arc<dyn Learner> {
        &self.learner
    }
}

impl Policy for LearnedPolicy {
    fn choose_move(&mut self, board: &Board, player: Player) -> Option<Move> {
        let legal: Vec<usize> = board
            .legal_moves(player)
            .into_iter()
            .map(action_index)
            .collect();
        let state = encode_board(board, player);
        self.learner
            .choose_action(&state, &legal, self.explore)
            .and_then(Move::from_index)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
