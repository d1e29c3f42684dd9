//! Learning infrastructure: experiences, the prioritized replay buffer,
//! annealed hyperparameters, the Q-learning trainer, and the concurrent
//! self-play harness that feeds it.

mod experience;
pub mod metrics;
pub mod replay_buffer;
pub mod schedule;
pub mod selfplay;
#[cfg(test)]
pub(crate) mod test_support;
pub mod trainer;

pub use experience::{Experience, ExperienceId};
pub use metrics::TrainingMetrics;
pub use replay_buffer::ReplayBuffer;
pub use schedule::{Hyperparameters, PriorityConfig, ScheduleConfig};
pub use selfplay::{
    episode_seed, BatchReport, Contestant, ForfeitReason, MatchOutcome, MatchResult, MatchTally,
    Seat, SelfPlayConfig, SelfPlayOrchestrator,
};
pub use trainer::{Learner, TrainStepReport, Trainer, TrainerConfig, TrainerHandle};
