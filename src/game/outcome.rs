use super::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Winner(Player),
    Draw,
}

impl GameOutcome {
    /// Score of the outcome from `player`'s point of view: 1 win, -1 loss, 0 draw.
    pub fn reward_for(self, player: Player) -> f32 {
        match self {
            GameOutcome::Winner(winner) if winner == player => 1.0,
            GameOutcome::Winner(_) => -1.0,
            GameOutcome::Draw => 0.0,
        }
    }
}

/// Rejected move on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("square ({row}, {col}) is already occupied")]
    Occupied { row: usize, col: usize },

    #[error("move ({row}, {col}) flips no discs")]
    NoFlips { row: usize, col: usize },

    #[error("game is already over")]
    GameOver,
}
