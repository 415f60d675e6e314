//! Task record: what the store holds for one registered task.

use serde::{Deserialize, Serialize};

use super::{TaskId, TaskType};

/// Snapshot of a task record read back from the store.
///
/// Design:
/// - The store is the single source of truth; this is a read-only view.
/// - `prerequisites` holds the ids still outstanding. Empty means ready
///   (or already assigned).
/// - `waiting_on` is the single dependent this task unblocks, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub task_type: TaskType,
    pub data: String,
    pub prerequisites: Vec<TaskId>,
    pub waiting_on: Option<TaskId>,
}

impl TaskRecord {
    /// True once every prerequisite has completed.
    pub fn is_unblocked(&self) -> bool {
        self.prerequisites.is_empty()
    }
}
