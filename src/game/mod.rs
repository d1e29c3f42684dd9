//! Othello rules: board representation, player types, and the [`GameBoard`]
//! abstraction the search and self-play code is written against.

mod board;
mod outcome;
mod player;

use std::fmt::Debug;
use std::hash::Hash;

pub use board::{Board, Cell, Move, CELLS, SIZE};
pub use outcome::{GameOutcome, MoveError};
pub use player::Player;

/// Minimal two-player board interface.
///
/// Search operates on this trait rather than on [`Board`] directly so that
/// tests can drive it with hand-built game trees.
pub trait GameBoard: Clone + Send + Sync + 'static {
    type Move: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Legal moves for `player`, in a deterministic order.
    fn legal_moves(&self, player: Player) -> Vec<Self::Move>;

    fn apply_move(&mut self, player: Player, mv: Self::Move) -> Result<(), MoveError>;

    /// True once neither player can move.
    fn is_terminal(&self) -> bool;

    /// Final result; `None` while the game is running.
    fn outcome(&self) -> Option<GameOutcome>;
}
