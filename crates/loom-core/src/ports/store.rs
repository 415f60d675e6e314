//! SharedStore port - the networked data store every worker talks to.
//!
//! The coordinator never holds graph state itself. Everything lives in a
//! store shared by all processes, which must provide:
//! - scalars: get / set / delete (delete reports whether the key existed)
//! - sets: add / remove (remove reports membership) / exists / members
//! - lists: push to head, remove by value (with count), full range, length
//! - bounded blocking pop from the tail, and an atomic tail-to-head move
//! - all-or-nothing transactions returning one reply per operation
//!
//! Empty sets and lists stop existing, the way Redis treats them. The
//! unblock check in `set_completed` relies on this.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// One store operation. Transactions are built from a `Vec<Op>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Get { key: String },
    Set { key: String, value: String },
    Del { key: String },
    Exists { key: String },
    SAdd { key: String, member: String },
    SRem { key: String, member: String },
    SMembers { key: String },
    LPush { key: String, value: String },
    /// Removes every occurrence of `value`; replies with the count.
    LRem { key: String, value: String },
    LRange { key: String },
    LLen { key: String },
}

impl Op {
    pub fn get(key: impl Into<String>) -> Self {
        Op::Get { key: key.into() }
    }

    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Op::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn del(key: impl Into<String>) -> Self {
        Op::Del { key: key.into() }
    }

    pub fn exists(key: impl Into<String>) -> Self {
        Op::Exists { key: key.into() }
    }

    pub fn sadd(key: impl Into<String>, member: impl Into<String>) -> Self {
        Op::SAdd {
            key: key.into(),
            member: member.into(),
        }
    }

    pub fn srem(key: impl Into<String>, member: impl Into<String>) -> Self {
        Op::SRem {
            key: key.into(),
            member: member.into(),
        }
    }

    pub fn smembers(key: impl Into<String>) -> Self {
        Op::SMembers { key: key.into() }
    }

    pub fn lpush(key: impl Into<String>, value: impl Into<String>) -> Self {
        Op::LPush {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn lrem(key: impl Into<String>, value: impl Into<String>) -> Self {
        Op::LRem {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn lrange(key: impl Into<String>) -> Self {
        Op::LRange { key: key.into() }
    }

    pub fn llen(key: impl Into<String>) -> Self {
        Op::LLen { key: key.into() }
    }

    /// Command name, for errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Get { .. } => "GET",
            Op::Set { .. } => "SET",
            Op::Del { .. } => "DEL",
            Op::Exists { .. } => "EXISTS",
            Op::SAdd { .. } => "SADD",
            Op::SRem { .. } => "SREM",
            Op::SMembers { .. } => "SMEMBERS",
            Op::LPush { .. } => "LPUSH",
            Op::LRem { .. } => "LREM",
            Op::LRange { .. } => "LRANGE",
            Op::LLen { .. } => "LLEN",
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Op::Get { key }
            | Op::Set { key, .. }
            | Op::Del { key }
            | Op::Exists { key }
            | Op::SAdd { key, .. }
            | Op::SRem { key, .. }
            | Op::SMembers { key }
            | Op::LPush { key, .. }
            | Op::LRem { key, .. }
            | Op::LRange { key }
            | Op::LLen { key } => key,
        }
    }
}

/// Reply to one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Nil,
    Ok,
    Int(i64),
    Bulk(String),
    Array(Vec<String>),
}

impl Reply {
    pub fn into_int(self, op: &'static str) -> Result<i64, StoreError> {
        match self {
            Reply::Int(n) => Ok(n),
            reply => Err(StoreError::UnexpectedReply { op, reply }),
        }
    }

    pub fn into_bool(self, op: &'static str) -> Result<bool, StoreError> {
        self.into_int(op).map(|n| n > 0)
    }

    pub fn into_opt_string(self, op: &'static str) -> Result<Option<String>, StoreError> {
        match self {
            Reply::Nil => Ok(None),
            Reply::Bulk(s) => Ok(Some(s)),
            reply => Err(StoreError::UnexpectedReply { op, reply }),
        }
    }

    pub fn into_strings(self, op: &'static str) -> Result<Vec<String>, StoreError> {
        match self {
            Reply::Nil => Ok(Vec::new()),
            Reply::Array(v) => Ok(v),
            reply => Err(StoreError::UnexpectedReply { op, reply }),
        }
    }

    pub fn into_ok(self, op: &'static str) -> Result<(), StoreError> {
        match self {
            Reply::Ok => Ok(()),
            reply => Err(StoreError::UnexpectedReply { op, reply }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("transaction rejected: {0}")]
    TransactionRejected(String),

    #[error("{op} against key {key} holding the wrong kind of value")]
    WrongType { key: String, op: &'static str },

    #[error("unexpected reply to {op}: {reply:?}")]
    UnexpectedReply { op: &'static str, reply: Reply },
}

/// Adapter to the shared store.
///
/// Every coordinator (one per process) holds its own handle; the store is
/// the only state they share.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Run a single operation.
    async fn execute(&self, op: Op) -> Result<Reply, StoreError>;

    /// Run `ops` as one all-or-nothing unit. Either every operation applies
    /// and one reply per op is returned, or nothing applies.
    async fn transaction(&self, ops: Vec<Op>) -> Result<Vec<Reply>, StoreError>;

    /// Pop the tail of `key`, waiting up to `timeout` for an element.
    async fn pop_tail(&self, key: &str, timeout: Duration) -> Result<Option<String>, StoreError>;

    /// Pop the tail of `src` and push it to the head of `dst` as one step,
    /// waiting up to `timeout` for `src` to have an element.
    async fn pop_tail_push_head(
        &self,
        src: &str,
        dst: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError>;
}

/// Typed helpers over [`SharedStore::execute`].
#[async_trait]
pub trait StoreExt: SharedStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.execute(Op::get(key)).await?.into_opt_string("GET")
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.execute(Op::set(key, value)).await?.into_ok("SET")
    }

    /// True if the key existed.
    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        self.execute(Op::del(key)).await?.into_bool("DEL")
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.execute(Op::exists(key)).await?.into_bool("EXISTS")
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.execute(Op::smembers(key)).await?.into_strings("SMEMBERS")
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<i64, StoreError> {
        self.execute(Op::lpush(key, value)).await?.into_int("LPUSH")
    }

    async fn lrem(&self, key: &str, value: &str) -> Result<i64, StoreError> {
        self.execute(Op::lrem(key, value)).await?.into_int("LREM")
    }

    async fn lrange(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.execute(Op::lrange(key)).await?.into_strings("LRANGE")
    }

    async fn llen(&self, key: &str) -> Result<i64, StoreError> {
        self.execute(Op::llen(key)).await?.into_int("LLEN")
    }
}

impl<S: SharedStore + ?Sized> StoreExt for S {}
