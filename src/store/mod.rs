//! Persistence collaborators for the trainer and the self-play harness.
//!
//! [`ExperienceStore`] keeps every observed transition and the win-rate
//! history that drives the discount schedule. [`ResultsSink`] receives one
//! [`BatchRecord`] per self-play batch. Both are traits so the core never
//! depends on where data ends up:
//!
//! - [`InMemoryStore`] for tests and throwaway runs
//! - [`JsonlStore`] / [`JsonResultsFile`] for runs that should survive a restart

mod jsonl;
mod memory;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::training::Experience;

pub use jsonl::{JsonResultsFile, JsonlStore};
pub use memory::InMemoryStore;

/// Summary of one self-play batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    pub total_games: u32,
    pub first_bot_wins: u32,
    pub second_bot_wins: u32,
    pub draws: u32,
    pub duration_ms: u64,
}

/// A win rate recorded against a named opponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinRateRecord {
    pub win_rate: f64,
    pub opponent: String,
    pub timestamp: u64,
}

/// Where transitions and win rates are kept between runs.
pub trait ExperienceStore: Send + Sync {
    fn record_experience(&self, experience: &Experience) -> Result<(), StoreError>;

    /// Up to `limit` stored experiences, chosen at random when more exist.
    fn fetch_experience_sample(&self, limit: usize) -> Result<Vec<Experience>, StoreError>;

    fn record_win_rate(&self, win_rate: f64, opponent: &str) -> Result<(), StoreError>;

    /// Most recently recorded win rate, if any.
    fn latest_win_rate(&self) -> Result<Option<f64>, StoreError>;
}

/// Receives one record per finished batch.
pub trait ResultsSink: Send + Sync {
    fn append(&self, record: &BatchRecord) -> Result<(), StoreError>;
}

/// Seconds since the Unix epoch.
pub(crate) fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Pick `limit` items at random without replacement, or all of them.
pub(crate) fn random_subset<T: Clone>(items: &[T], limit: usize) -> Vec<T> {
    if items.len() <= limit {
        return items.to_vec();
    }
    let mut rng = rand::rng();
    rand::seq::index::sample(&mut rng, items.len(), limit)
        .iter()
        .map(|i| items[i].clone())
        .collect()
}
