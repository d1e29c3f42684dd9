//! Position evaluation for the minimax search.
//!
//! A [`Heuristic`] scores the position reached by a move, given the board
//! before and after that move and the player whose perspective is being
//! scored. The provided [`Heuristic::evaluate`] wraps every variant so that
//! finished games always outrank any heuristic estimate.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::game::{Board, GameBoard, GameOutcome, Player, SIZE};

/// Score of a won terminal position. Lost positions score `-WIN_SCORE`.
pub const WIN_SCORE: f64 = 1_000_000.0;

/// Non-terminal scores are clamped to `[-HEURISTIC_BOUND, HEURISTIC_BOUND]`.
pub const HEURISTIC_BOUND: f64 = WIN_SCORE - 1.0;

/// Classic square weights: corners are prized, the squares next to them
/// (C- and X-squares) hand the corner to the opponent.
pub const POSITION_WEIGHTS: [[i32; SIZE]; SIZE] = [
    [100, -10, 10, 10, 10, 10, -10, 100],
    [-10, -20, 1, 1, 1, 1, -20, -10],
    [10, 1, 5, 5, 5, 5, 1, 10],
    [10, 1, 5, 5, 5, 5, 1, 10],
    [10, 1, 5, 5, 5, 5, 1, 10],
    [10, 1, 5, 5, 5, 5, 1, 10],
    [-10, -20, 1, 1, 1, 1, -20, -10],
    [100, -10, 10, 10, 10, 10, -10, 100],
];

/// Trait for scoring a position from a player's perspective.
pub trait Heuristic<B: GameBoard>: Send + Sync {
    /// Variant-specific estimate; higher is better for `player`.
    fn heuristic(&self, before: &B, after: &B, player: Player) -> f64;

    /// Score of `after` for `player`.
    ///
    /// Terminal positions return [`WIN_SCORE`], `-WIN_SCORE` or `0.0`;
    /// anything else is the clamped [`Heuristic::heuristic`] value.
    fn evaluate(&self, before: &B, after: &B, player: Player) -> f64 {
        match after.outcome() {
            Some(GameOutcome::Winner(winner)) if winner == player => WIN_SCORE,
            Some(GameOutcome::Winner(_)) => -WIN_SCORE,
            Some(GameOutcome::Draw) => 0.0,
            None => self
                .heuristic(before, after, player)
                .clamp(-HEURISTIC_BOUND, HEURISTIC_BOUND),
        }
    }
}

/// Sum of [`POSITION_WEIGHTS`] over `player`'s discs minus the opponent's.
pub fn positional_score(board: &Board, player: Player) -> f64 {
    let opponent = player.other();
    let mut score = 0;
    for (row, weights) in POSITION_WEIGHTS.iter().enumerate() {
        for (col, &weight) in weights.iter().enumerate() {
            if board.has_piece(row, col, player) {
                score += weight;
            } else if board.has_piece(row, col, opponent) {
                score -= weight;
            }
        }
    }
    score as f64
}

fn mobility_difference(board: &Board, player: Player) -> f64 {
    let own = board.legal_moves(player).len() as f64;
    let opp = board.legal_moves(player.other()).len() as f64;
    own - opp
}

fn disc_difference(board: &Board, player: Player) -> f64 {
    board.count(player) as f64 - board.count(player.other()) as f64
}

/// Discs that turned to `player` between the two boards, minus discs that
/// turned to the opponent.
fn flip_balance(before: &Board, after: &Board, player: Player) -> f64 {
    let opponent = player.other();
    let mut balance = 0;
    for row in 0..SIZE {
        for col in 0..SIZE {
            if after.has_piece(row, col, player) && !before.has_piece(row, col, player) {
                balance += 1;
            } else if after.has_piece(row, col, opponent) && !before.has_piece(row, col, opponent)
            {
                balance -= 1;
            }
        }
    }
    balance as f64
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalWeights;

impl Heuristic<Board> for PositionalWeights {
    fn heuristic(&self, _before: &Board, after: &Board, player: Player) -> f64 {
        positional_score(after, player)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MobilityDifference;

impl Heuristic<Board> for MobilityDifference {
    fn heuristic(&self, _before: &Board, after: &Board, player: Player) -> f64 {
        mobility_difference(after, player)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FlipCount;

impl Heuristic<Board> for FlipCount {
    fn heuristic(&self, before: &Board, after: &Board, player: Player) -> f64 {
        flip_balance(before, after, player)
    }
}

/// Weighted blend: positional + 10 x discs + 5 x mobility + 2 x flips.
#[derive(Debug, Clone, Copy, Default)]
pub struct Advanced;

impl Heuristic<Board> for Advanced {
    fn heuristic(&self, before: &Board, after: &Board, player: Player) -> f64 {
        positional_score(after, player)
            + 10.0 * disc_difference(after, player)
            + 5.0 * mobility_difference(after, player)
            + 2.0 * flip_balance(before, after, player)
    }
}

/// Uniform noise in `[-1, 1]`. Works for any board; used as a baseline.
#[derive(Debug)]
pub struct RandomNoise {
    rng: Mutex<StdRng>,
}

impl RandomNoise {
    pub fn new(seed: u64) -> Self {
        RandomNoise {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl<B: GameBoard> Heuristic<B> for RandomNoise {
    fn heuristic(&self, _before: &B, _after: &B, _player: Player) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random_range(-1.0..=1.0)
    }
}

/// Configuration-level name of a heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicKind {
    Positional,
    Mobility,
    FlipCount,
    #[default]
    Advanced,
    Random,
}

/// Closed set of Othello heuristics, chosen at construction time.
#[derive(Debug)]
pub enum EvaluationStrategy {
    Positional(PositionalWeights),
    Mobility(MobilityDifference),
    FlipCount(FlipCount),
    Advanced(Advanced),
    Random(RandomNoise),
}

impl EvaluationStrategy {
    /// `seed` only matters for [`HeuristicKind::Random`].
    pub fn from_kind(kind: HeuristicKind, seed: u64) -> Self {
        match kind {
            HeuristicKind::Positional => EvaluationStrategy::Positional(PositionalWeights),
            HeuristicKind::Mobility => EvaluationStrategy::Mobility(MobilityDifference),
            HeuristicKind::FlipCount => EvaluationStrategy::FlipCount(FlipCount),
            HeuristicKind::Advanced => EvaluationStrategy::Advanced(Advanced),
            HeuristicKind::Random => EvaluationStrategy::Random(RandomNoise::new(seed)),
        }
    }

    pub fn kind(&self) -> HeuristicKind {
        match self {
            EvaluationStrategy::Positional(_) => HeuristicKind::Positional,
            EvaluationStrategy::Mobility(_) => HeuristicKind::Mobility,
            EvaluationStrategy::FlipCount(_) => HeuristicKind::FlipCount,
            EvaluationStrategy::Advanced(_) => HeuristicKind::Advanced,
            EvaluationStrategy::Random(_) => HeuristicKind::Random,
        }
    }
}

impl Heuristic<Board> for EvaluationStrategy {
    fn heuristic(&self, before: &Board, after: &Board, player: Player) -> f64 {
        match self {
            EvaluationStrategy::Positional(h) => h.heuristic(before, after, player),
            EvaluationStrategy::Mobility(h) => h.heuristic(before, after, player),
            EvaluationStrategy::FlipCount(h) => h.heuristic(before, after, player),
            EvaluationStrategy::Advanced(h) => h.heuristic(before, after, player),
            EvaluationStrategy::Random(h) => h.heuristic(before, after, player),
        }
    }
}
