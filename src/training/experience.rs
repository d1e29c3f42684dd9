use serde::{Deserialize, Serialize};

/// Identity of an experience inside a replay buffer. Assigned on insertion,
/// strictly increasing, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExperienceId(pub(crate) u64);

/// A single transition for Q-learning. States are encoded from the mover's
/// point of view (see [`crate::ai::state_encoding::encode_board`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub state: Vec<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Vec<f32>,
    pub done: bool,
    #[serde(skip)]
    pub(crate) id: Option<ExperienceId>,
    /// Sampling priority, always > 0. Managed by the replay buffer.
    #[serde(skip, default = "default_priority")]
    pub priority: f64,
    /// Bias correction from the latest sample that drew this experience.
    #[serde(skip, default = "default_weight")]
    pub importance_weight: f64,
}

fn default_priority() -> f64 {
    1.0
}

fn default_weight() -> f64 {
    1.0
}

impl Experience {
    pub fn new(state: Vec<f32>, action: usize, reward: f32, next_state: Vec<f32>, done: bool) -> Self {
        Experience {
            state,
            action,
            reward,
            next_state,
            done,
            id: None,
            priority: default_priority(),
            importance_weight: default_weight(),
        }
    }

    /// Buffer identity; `None` until the experience has been added.
    pub fn id(&self) -> Option<ExperienceId> {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_skips_buffer_fields() {
        let mut exp = Experience::new(vec![1.0, -1.0], 3, 0.5, vec![0.0, 1.0], true);
        exp.id = Some(ExperienceId(9));
        exp.priority = 4.0;
        exp.importance_weight = 0.25;

        let json = serde_json::to_string(&exp).unwrap();
        assert!(!json.contains("priority"));
        let back: Experience = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), None);
        assert_eq!(back.priority, 1.0);
        assert_eq!(back.importance_weight, 1.0);
        assert_eq!(back.state, exp.state);
        assert_eq!(back.action, 3);
        assert!(back.done);
    }
}
