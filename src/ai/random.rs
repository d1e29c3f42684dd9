use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::game::{Board, Move, Player};

use super::agent::Policy;

/// A policy that selects uniformly at random from legal moves.
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new() -> Self {
        RandomPolicy {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        RandomPolicy {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for RandomPolicy {
    fn choose_move(&mut self, board: &Board, player: Player) -> Option<Move> {
        let moves = board.legal_moves(player);
        if moves.is_empty() {
            return None;
        }
        let idx = self.rng.random_range(0..moves.len());
        Some(moves[idx])
    }

    fn name(&self) -> &str {
        "Random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Cell;

    #[test]
    fn test_random_policy_selects_legal_move() {
        let mut policy = RandomPolicy::new();
        let board = Board::new();
        let legal = board.legal_moves(Player::Black);

        for _ in 0..100 {
            let mv = policy.choose_move(&board, Player::Black).unwrap();
            assert!(legal.contains(&mv), "Move {} is not legal", mv);
        }
    }

    #[test]
    fn test_random_policy_passes_without_moves() {
        let mut policy = RandomPolicy::seeded(1);
        let mut board = Board::empty();
        board.put(0, 0, Cell::White);
        assert_eq!(policy.choose_move(&board, Player::Black), None);
    }

    #[test]
    fn test_seeded_policies_agree() {
        let mut a = RandomPolicy::seeded(99);
        let mut b = RandomPolicy::seeded(99);
        let mut board = Board::new();
        let mut player = Player::Black;

        while !board.is_terminal() {
            let mv_a = a.choose_move(&board, player);
            let mv_b = b.choose_move(&board, player);
            assert_eq!(mv_a, mv_b);
            if let Some(mv) = mv_a {
                board.play(player, mv).unwrap();
            }
            player = player.other();
        }
        assert!(board.outcome().is_some());
    }

    #[test]
    fn test_random_policy_name() {
        assert_eq!(RandomPolicy::new().name(), "Random");
    }
}
