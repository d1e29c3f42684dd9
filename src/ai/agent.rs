use crate::game::{Board, Move, Player};

/// Anything that can pick a move for a seat in a match.
///
/// Policies are moved into move tasks on the worker pool, so they must be
/// `Send`; shared state (a trainer, a model) lives behind the policy's own
/// synchronization.
pub trait Policy: Send {
    /// Pick a move for `player`. `None` means the policy has nothing to play;
    /// that is a pass when `player` has no legal move and a forfeit otherwise.
    fn choose_move(&mut self, board: &Board, player: Player) -> Option<Move>;

    /// Return the policy's display name.
    fn name(&self) -> &str;
}
