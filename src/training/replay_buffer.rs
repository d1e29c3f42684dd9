use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use super::experience::{Experience, ExperienceId};
use super::schedule::PriorityConfig;

/// Fixed-capacity FIFO of experiences with priority-proportional sampling.
///
/// New experiences enter with the highest priority seen so far, so every
/// transition is likely to be replayed at least once. Eviction is strictly
/// oldest-first and ignores priority. Sampling is a linear scan over the
/// cumulative priorities, O(n) per draw.
pub struct ReplayBuffer {
    buffer: VecDeque<Experience>,
    capacity: usize,
    max_priority: f64,
    next_id: u64,
    priority: PriorityConfig,
    rng: StdRng,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_os_rng())
    }

    pub fn seeded(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be positive");
        ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity.min(1 << 16)),
            capacity,
            max_priority: 1.0,
            next_id: 0,
            priority: PriorityConfig::default(),
            rng,
        }
    }

    pub fn with_priority_config(mut self, priority: PriorityConfig) -> Self {
        self.priority = priority;
        self
    }

    /// Add an experience, evicting the oldest one when full.
    pub fn add(&mut self, mut experience: Experience) -> ExperienceId {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        let id = ExperienceId(self.next_id);
        self.next_id += 1;
        experience.id = Some(id);
        experience.priority = self.max_priority;
        experience.importance_weight = 1.0;
        self.buffer.push_back(experience);
        id
    }

    /// Draw `k` experiences with replacement, proportionally to
    /// `priority ^ alpha`, and attach normalized importance weights.
    ///
    /// # Panics
    /// Panics if the buffer is empty.
    pub fn sample(&mut self, k: usize) -> Vec<Experience> {
        assert!(
            !self.buffer.is_empty(),
            "cannot sample from an empty replay buffer"
        );
        if k == 0 {
            return Vec::new();
        }

        let n = self.buffer.len();
        let alpha = self.priority.priority_exponent(n);
        let beta = self.priority.importance_exponent(n);

        let scaled: Vec<f64> = self.buffer.iter().map(|e| e.priority.powf(alpha)).collect();
        let total: f64 = scaled.iter().sum();

        let mut picks = Vec::with_capacity(k);
        for _ in 0..k {
            let draw = self.rng.random_range(0.0..total);
            let mut running = 0.0;
            // Float shortfall falls through to the last element
            let mut chosen = n - 1;
            for (i, p) in scaled.iter().enumerate() {
                running += p;
                if running >= draw {
                    chosen = i;
                    break;
                }
            }
            picks.push(chosen);
        }

        let weights: Vec<f64> = picks
            .iter()
            .map(|&i| (scaled[i] / total * n as f64).powf(-beta))
            .collect();
        let max_weight = weights.iter().copied().fold(f64::MIN_POSITIVE, f64::max);

        picks
            .into_iter()
            .zip(weights)
            .map(|(i, w)| {
                let entry = &mut self.buffer[i];
                entry.importance_weight = w / max_weight;
                entry.clone()
            })
            .collect()
    }

    /// Set the priority of a stored experience. Returns `false` when it has
    /// already been evicted.
    ///
    /// # Panics
    /// Panics if `priority` is not a positive finite number.
    pub fn update_priority(&mut self, id: ExperienceId, priority: f64) -> bool {
        assert!(
            priority.is_finite() && priority > 0.0,
            "priority must be positive and finite, got {priority}"
        );
        match self.position(id) {
            Some(index) => {
                self.buffer[index].priority = priority;
                self.max_priority = self.max_priority.max(priority);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: ExperienceId) -> Option<&Experience> {
        self.position(id).map(|index| &self.buffer[index])
    }

    /// Ids are contiguous in the deque, so the offset from the front id is
    /// the index.
    fn position(&self, id: ExperienceId) -> Option<usize> {
        let front = self.next_id - self.buffer.len() as u64;
        (id.0 >= front && id.0 < self.next_id).then(|| (id.0 - front) as usize)
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_priority(&self) -> f64 {
        self.max_priority
    }
}

impl Extend<Experience> for ReplayBuffer {
    fn extend<I: IntoIterator<Item = Experience>>(&mut self, iter: I) {
        for experience in iter {
            self.add(experience);
        }
    }
}
