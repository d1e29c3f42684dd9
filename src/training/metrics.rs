use std::collections::VecDeque;

/// Rolling training statistics for one trainer.
pub struct TrainingMetrics {
    game_rewards: VecDeque<f32>,
    update_losses: VecDeque<f32>,
    td_errors: VecDeque<f32>,
    capacity: usize,
    total_games: usize,   // lifetime count, never capped
    total_updates: usize, // lifetime count, never capped
}

impl TrainingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TrainingMetrics {
            game_rewards: VecDeque::with_capacity(capacity),
            update_losses: VecDeque::with_capacity(capacity),
            td_errors: VecDeque::with_capacity(capacity),
            capacity,
            total_games: 0,
            total_updates: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    fn push(window: &mut VecDeque<f32>, capacity: usize, value: f32) {
        window.push_back(value);
        if window.len() > capacity {
            window.pop_front();
        }
    }

    fn mean_of_last(window: &VecDeque<f32>, last_n: usize, map: impl Fn(f32) -> f32) -> f32 {
        let n = window.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let sum: f32 = window.iter().rev().take(n).map(|&v| map(v)).sum();
        sum / n as f32
    }

    /// Record the final reward of a finished game: > 0 win, < 0 loss, 0 draw.
    pub fn record_game(&mut self, final_reward: f32) {
        self.total_games += 1;
        Self::push(&mut self.game_rewards, self.capacity, final_reward);
    }

    pub fn record_update(&mut self, loss: f32, td_error: f32) {
        self.total_updates += 1;
        Self::push(&mut self.update_losses, self.capacity, loss);
        Self::push(&mut self.td_errors, self.capacity, td_error.abs());
    }

    /// Share of won games among the last N.
    pub fn win_rate(&self, last_n: usize) -> f32 {
        Self::mean_of_last(&self.game_rewards, last_n, |r| if r > 0.0 { 1.0 } else { 0.0 })
    }

    /// Draw rate in the last N games.
    pub fn draw_rate(&self, last_n: usize) -> f32 {
        Self::mean_of_last(&self.game_rewards, last_n, |r| if r == 0.0 { 1.0 } else { 0.0 })
    }

    /// Average loss over the last N updates.
    pub fn average_loss(&self, last_n: usize) -> f32 {
        Self::mean_of_last(&self.update_losses, last_n, |l| l)
    }

    /// Average absolute TD error over the last N updates.
    pub fn average_td_error(&self, last_n: usize) -> f32 {
        Self::mean_of_last(&self.td_errors, last_n, |e| e)
    }

    pub fn total_games(&self) -> usize {
        self.total_games
    }

    pub fn total_updates(&self) -> usize {
        self.total_updates
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new()
    }
}
