use serde::{Deserialize, Serialize};

/// Queue lengths for one task type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub ready: usize,
    pub blocked: usize,
}
