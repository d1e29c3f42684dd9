use std::sync::{Arc, Mutex, PoisonError};

use crate::error::StoreError;
use crate::training::Experience;

use super::{
    random_subset, unix_timestamp, BatchRecord, ExperienceStore, ResultsSink, WinRateRecord,
};

#[derive(Default)]
struct Storage {
    experiences: Vec<Experience>,
    win_rates: Vec<WinRateRecord>,
    batches: Vec<BatchRecord>,
}

/// Store that keeps everything in memory.
///
/// Clones share the same storage, so a test can hand one clone to the
/// trainer and inspect another.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    storage: Arc<Mutex<Storage>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Storage> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn experience_count(&self) -> usize {
        self.lock().experiences.len()
    }

    pub fn win_rates(&self) -> Vec<WinRateRecord> {
        self.lock().win_rates.clone()
    }

    pub fn batches(&self) -> Vec<BatchRecord> {
        self.lock().batches.clone()
    }
}

impl ExperienceStore for InMemoryStore {
    fn record_experience(&self, experience: &Experience) -> Result<(), StoreError> {
        self.lock().experiences.push(experience.clone());
        Ok(())
    }

    fn fetch_experience_sample(&self, limit: usize) -> Result<Vec<Experience>, StoreError> {
        Ok(random_subset(&self.lock().experiences, limit))
    }

    fn record_win_rate(&self, win_rate: f64, opponent: &str) -> Result<(), StoreError> {
        self.lock().win_rates.push(WinRateRecord {
            win_rate,
            opponent: opponent.to_string(),
            timestamp: unix_timestamp(),
        });
        Ok(())
    }

    fn latest_win_rate(&self) -> Result<Option<f64>, StoreError> {
        Ok(self.lock().win_rates.last().map(|r| r.win_rate))
    }
}

impl ResultsSink for InMemoryStore {
    fn append(&self, record: &BatchRecord) -> Result<(), StoreError> {
        self.lock().batches.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn experience(action: usize) -> Experience {
        Experience::new(vec![0.0; 64], action, 1.0, vec![0.0; 64], true)
    }

    #[test]
    fn test_clones_share_storage() {
        let store = InMemoryStore::new();
        let other = store.clone();
        store.record_experience(&experience(1)).unwrap();
        assert_eq!(other.experience_count(), 1);
    }

    #[test]
    fn test_fetch_sample_respects_limit() {
        let store = InMemoryStore::new();
        for i in 0..10 {
            store.record_experience(&experience(i)).unwrap();
        }
        assert_eq!(store.fetch_experience_sample(4).unwrap().len(), 4);
        assert_eq!(store.fetch_experience_sample(100).unwrap().len(), 10);
    }

    #[test]
    fn test_latest_win_rate() {
        let store = InMemoryStore::new();
        assert_eq!(store.latest_win_rate().unwrap(), None);
        store.record_win_rate(0.25, "Random").unwrap();
        store.record_win_rate(0.75, "Minimax").unwrap();
        assert_eq!(store.latest_win_rate().unwrap(), Some(0.75));
        assert_eq!(store.win_rates()[1].opponent, "Minimax");
    }

    #[test]
    fn test_results_sink_appends() {
        let store = InMemoryStore::new();
        let record = BatchRecord {
            total_games: 2,
            first_bot_wins: 1,
            second_bot_wins: 1,
            draws: 0,
            duration_ms: 5,
        };
        store.append(&record).unwrap();
        store.append(&record).unwrap();
        assert_eq!(store.batches().len(), 2);
    }
}
