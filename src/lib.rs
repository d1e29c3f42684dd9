//! # Reversi Agent
//!
//! Decision making and online learning for an Othello player. Two strategies
//! coexist: depth-bounded minimax with alpha-beta pruning over pluggable
//! heuristics, and a deep Q-learning agent trained from self-play through a
//! prioritized replay buffer. Networks run on the Burn ML framework.
//!
//! ## Modules
//!
//! - [`game`]: Othello rules: board, moves, players, outcomes
//! - [`ai`]: Policies, heuristics, search tree and minimax, Q-network model
//! - [`training`]: Replay buffer, schedules, trainer, self-play orchestrator
//! - [`store`]: Experience, win-rate and batch-result persistence
//! - [`checkpoint`]: Model persistence and versioning
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Structured error types

#![recursion_limit = "256"]

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod game;
pub mod store;
pub mod training;
