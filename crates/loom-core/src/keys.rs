//! Key namespace: where each piece of graph state lives in the store.
//!
//! Every key is `<prefix>:<code>:<id>`. The prefix isolates one
//! coordinator's data inside a shared store; the code is one letter per
//! category. Changing a code orphans existing data.

use std::fmt;

use crate::domain::{TaskId, TaskType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Set of prerequisite ids still outstanding for a task.
    PrereqSet,
    /// The single dependent to notify when a task completes.
    WaitingOn,
    /// Blocked list, per task type.
    Blocked,
    /// Ready list, per task type.
    Ready,
    /// Type of a task.
    TypeOf,
    /// Payload of a task.
    Data,
    /// Assignment list, per consumer.
    Assigned,
}

impl KeyKind {
    pub fn code(self) -> &'static str {
        match self {
            KeyKind::PrereqSet => "P",
            KeyKind::WaitingOn => "W",
            KeyKind::Blocked => "B",
            KeyKind::Ready => "R",
            KeyKind::TypeOf => "T",
            KeyKind::Data => "D",
            KeyKind::Assigned => "A",
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Builds store keys under one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn build(&self, kind: KeyKind, id: &str) -> String {
        format!("{}:{}:{}", self.prefix, kind, id)
    }

    pub fn prereqs(&self, task: &TaskId) -> String {
        self.build(KeyKind::PrereqSet, task.as_str())
    }

    pub fn waiting_on(&self, task: &TaskId) -> String {
        self.build(KeyKind::WaitingOn, task.as_str())
    }

    pub fn blocked(&self, task_type: &TaskType) -> String {
        self.build(KeyKind::Blocked, task_type.as_str())
    }

    pub fn ready(&self, task_type: &TaskType) -> String {
        self.build(KeyKind::Ready, task_type.as_str())
    }

    pub fn type_of(&self, task: &TaskId) -> String {
        self.build(KeyKind::TypeOf, task.as_str())
    }

    pub fn data(&self, task: &TaskId) -> String {
        self.build(KeyKind::Data, task.as_str())
    }

    pub fn assigned(&self, consumer: &str) -> String {
        self.build(KeyKind::Assigned, consumer)
    }
}
