//! Task identifiers.
//!
//! Ids are minted from a ULID at registration time and rendered as
//! `task-<ulid>`. Once written to the store they travel as plain strings, so
//! `TaskId` keeps the rendered form and never has to re-parse it.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

const PREFIX: &str = "task-";

/// Identifier of one registered task (or sub-task).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Build an id from a freshly generated ULID.
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(format!("{PREFIX}{ulid}"))
    }

    /// Wrap an id that was read back from the store.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The ULID part, if this id was minted by this crate.
    pub fn as_ulid(&self) -> Option<Ulid> {
        self.0
            .strip_prefix(PREFIX)
            .and_then(|s| Ulid::from_string(s).ok())
    }
}

impl From<Ulid> for TaskId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
