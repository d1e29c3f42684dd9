use burn::prelude::*;
use burn::tensor::TensorData;

use crate::game::{Board, Cell, Move, Player, CELLS, SIZE};

/// Length of an encoded state and of the model's action-value vector.
pub const STATE_SIZE: usize = CELLS;
pub const ACTION_SIZE: usize = CELLS;

/// Encode a board from `player`'s point of view as 64 floats, row-major:
/// `1.0` for the player's discs, `-1.0` for the opponent's, `0.0` when empty.
pub fn encode_board(board: &Board, player: Player) -> Vec<f32> {
    let own = player.to_cell();
    let mut data = Vec::with_capacity(STATE_SIZE);
    for row in 0..SIZE {
        for col in 0..SIZE {
            data.push(match board.get(row, col) {
                Cell::Empty => 0.0,
                cell if cell == own => 1.0,
                _ => -1.0,
            });
        }
    }
    data
}

/// Index of `mv` in the action-value vector.
pub fn action_index(mv: Move) -> usize {
    mv.index()
}

/// Wrap a single encoded vector as a `[1, len]` tensor.
pub fn to_tensor<B: Backend>(values: &[f32], device: &B::Device) -> Tensor<B, 2> {
    Tensor::<B, 1>::from_data(TensorData::from(values), device).reshape([1, values.len()])
}
