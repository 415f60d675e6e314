//! Input specs: a task and the tree of prerequisites that must finish first.
//!
//! A spec is an owned tree, so a node can only ever be the prerequisite of
//! the one parent that holds it and the tree cannot loop back on itself.
//! The store keeps a single reverse pointer per task for the same reason.

use serde::{Deserialize, Serialize};

use super::TaskType;
use super::errors::{CoordError, Result};

/// A task to schedule, with the prerequisites that must complete before it
/// shows up in its type's ready queue. Prerequisites can have their own
/// prerequisites, to any depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    #[serde(rename = "type")]
    pub task_type: TaskType,

    /// Opaque payload. Put parameters or serialized JSON here.
    #[serde(default)]
    pub data: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<TaskSpec>,
}

impl TaskSpec {
    pub fn new(task_type: impl Into<TaskType>, data: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            data: data.into(),
            prerequisites: Vec::new(),
        }
    }

    /// Add a prerequisite (builder style).
    pub fn with_prerequisite(mut self, prerequisite: TaskSpec) -> Self {
        self.prerequisites.push(prerequisite);
        self
    }

    pub fn with_prerequisites(mut self, prerequisites: impl IntoIterator<Item = TaskSpec>) -> Self {
        self.prerequisites.extend(prerequisites);
        self
    }

    /// Number of nodes in the tree, this one included.
    pub fn node_count(&self) -> usize {
        1 + self
            .prerequisites
            .iter()
            .map(TaskSpec::node_count)
            .sum::<usize>()
    }

    /// Reject trees that cannot be registered. Checked before anything is
    /// written to the store.
    pub fn validate(&self) -> Result<()> {
        if self.task_type.is_empty() {
            return Err(CoordError::InvalidInput(format!(
                "task type must not be empty (data={:?})",
                self.data
            )));
        }
        self.prerequisites.iter().try_for_each(TaskSpec::validate)
    }
}
