//! In-memory SharedStore.
//!
//! Behaves like the subset of Redis the coordinator needs. Several
//! coordinators can share one `Arc<InMemoryStore>` to stand in for separate
//! processes talking to the same server.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::ports::{Op, Reply, SharedStore, StoreError};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Set(HashSet<String>),
    /// Front is the head.
    List(VecDeque<String>),
}

#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<String, Value>,
}

impl StoreState {
    fn apply(&mut self, op: Op) -> Result<Reply, StoreError> {
        let name = op.name();
        match op {
            Op::Get { key } => match self.entries.get(&key) {
                None => Ok(Reply::Nil),
                Some(Value::Str(s)) => Ok(Reply::Bulk(s.clone())),
                Some(_) => Err(StoreError::WrongType { key, op: name }),
            },
            Op::Set { key, value } => {
                self.entries.insert(key, Value::Str(value));
                Ok(Reply::Ok)
            }
            Op::Del { key } => Ok(Reply::Int(self.entries.remove(&key).is_some() as i64)),
            Op::Exists { key } => Ok(Reply::Int(self.entries.contains_key(&key) as i64)),
            Op::SAdd { key, member } => {
                let added = self.set_mut(&key, name)?.insert(member);
                Ok(Reply::Int(added as i64))
            }
            Op::SRem { key, member } => {
                let removed = match self.entries.get_mut(&key) {
                    None => false,
                    Some(Value::Set(set)) => set.remove(&member),
                    Some(_) => return Err(StoreError::WrongType { key, op: name }),
                };
                self.drop_if_empty(&key);
                Ok(Reply::Int(removed as i64))
            }
            Op::SMembers { key } => match self.entries.get(&key) {
                None => Ok(Reply::Array(Vec::new())),
                Some(Value::Set(set)) => {
                    let mut members: Vec<String> = set.iter().cloned().collect();
                    members.sort();
                    Ok(Reply::Array(members))
                }
                Some(_) => Err(StoreError::WrongType { key, op: name }),
            },
            Op::LPush { key, value } => {
                let list = self.list_mut(&key, name)?;
                list.push_front(value);
                Ok(Reply::Int(list.len() as i64))
            }
            Op::LRem { key, value } => {
                let removed = match self.entries.get_mut(&key) {
                    None => 0,
                    Some(Value::List(list)) => {
                        let before = list.len();
                        list.retain(|v| v != &value);
                        before - list.len()
                    }
                    Some(_) => return Err(StoreError::WrongType { key, op: name }),
                };
                self.drop_if_empty(&key);
                Ok(Reply::Int(removed as i64))
            }
            Op::LRange { key } => match self.entries.get(&key) {
                None => Ok(Reply::Array(Vec::new())),
                Some(Value::List(list)) => Ok(Reply::Array(list.iter().cloned().collect())),
                Some(_) => Err(StoreError::WrongType { key, op: name }),
            },
            Op::LLen { key } => match self.entries.get(&key) {
                None => Ok(Reply::Int(0)),
                Some(Value::List(list)) => Ok(Reply::Int(list.len() as i64)),
                Some(_) => Err(StoreError::WrongType { key, op: name }),
            },
        }
    }

    fn set_mut(&mut self, key: &str, op: &'static str) -> Result<&mut HashSet<String>, StoreError> {
        match self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Set(HashSet::new()))
        {
            Value::Set(set) => Ok(set),
            _ => Err(StoreError::WrongType {
                key: key.to_string(),
                op,
            }),
        }
    }

    fn list_mut(
        &mut self,
        key: &str,
        op: &'static str,
    ) -> Result<&mut VecDeque<String>, StoreError> {
        match self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::List(VecDeque::new()))
        {
            Value::List(list) => Ok(list),
            _ => Err(StoreError::WrongType {
                key: key.to_string(),
                op,
            }),
        }
    }

    /// Empty sets and lists do not exist.
    fn drop_if_empty(&mut self, key: &str) {
        let empty = match self.entries.get(key) {
            Some(Value::Set(set)) => set.is_empty(),
            Some(Value::List(list)) => list.is_empty(),
            _ => false,
        };
        if empty {
            self.entries.remove(key);
        }
    }

    fn pop_tail(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        let popped = match self.entries.get_mut(key) {
            None => None,
            Some(Value::List(list)) => list.pop_back(),
            Some(_) => {
                return Err(StoreError::WrongType {
                    key: key.to_string(),
                    op: "RPOP",
                });
            }
        };
        self.drop_if_empty(key);
        Ok(popped)
    }

    fn pop_tail_push_head(&mut self, src: &str, dst: &str) -> Result<Option<String>, StoreError> {
        if let Some(value) = self.entries.get(dst)
            && !matches!(value, Value::List(_))
        {
            return Err(StoreError::WrongType {
                key: dst.to_string(),
                op: "RPOPLPUSH",
            });
        }
        let Some(popped) = self.pop_tail(src)? else {
            return Ok(None);
        };
        self.list_mut(dst, "RPOPLPUSH")?.push_front(popped.clone());
        Ok(Some(popped))
    }
}

/// In-memory implementation of [`SharedStore`].
///
/// # Details
/// - one `Mutex` around the whole keyspace, so every call is atomic
/// - transactions snapshot the keys they touch and restore them on error
/// - `Notify` wakes blocked pops whenever a list grows
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    notify: Notify,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys. Handy for checking that nothing leaked.
    pub async fn key_count(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    /// Live keys starting with `prefix`, sorted.
    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let state = self.state.lock().await;
        let mut keys: Vec<String> = state
            .entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Poll `attempt` until it yields a value or `timeout` elapses.
    async fn blocking<F>(&self, timeout: Duration, mut attempt: F) -> Result<Option<String>, StoreError>
    where
        F: FnMut(&mut StoreState) -> Result<Option<String>, StoreError> + Send,
    {
        let deadline = Instant::now() + timeout;
        loop {
            // Register before checking so a push between the check and the
            // await is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if let Some(value) = attempt(&mut state)? {
                    return Ok(Some(value));
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }
}

#[async_trait]
impl SharedStore for InMemoryStore {
    async fn execute(&self, op: Op) -> Result<Reply, StoreError> {
        let grows_list = matches!(op, Op::LPush { .. });
        let reply = self.state.lock().await.apply(op)?;
        if grows_list {
            self.notify.notify_waiters();
        }
        Ok(reply)
    }

    async fn transaction(&self, ops: Vec<Op>) -> Result<Vec<Reply>, StoreError> {
        let grows_list = ops.iter().any(|op| matches!(op, Op::LPush { .. }));
        let replies = {
            let mut state = self.state.lock().await;
            let mut snapshot: HashMap<String, Option<Value>> = HashMap::new();
            for op in &ops {
                snapshot
                    .entry(op.key().to_string())
                    .or_insert_with(|| state.entries.get(op.key()).cloned());
            }

            let mut replies = Vec::with_capacity(ops.len());
            for op in ops {
                match state.apply(op) {
                    Ok(reply) => replies.push(reply),
                    Err(err) => {
                        for (key, previous) in snapshot {
                            match previous {
                                Some(value) => state.entries.insert(key, value),
                                None => state.entries.remove(&key),
                            };
                        }
                        return Err(StoreError::TransactionRejected(err.to_string()));
                    }
                }
            }
            replies
        };
        if grows_list {
            self.notify.notify_waiters();
        }
        Ok(replies)
    }

    async fn pop_tail(&self, key: &str, timeout: Duration) -> Result<Option<String>, StoreError> {
        self.blocking(timeout, |state| state.pop_tail(key)).await
    }

    async fn pop_tail_push_head(
        &self,
        src: &str,
        dst: &str,
        timeout: Duration,
    ) -> Result<Option<String>, StoreError> {
        self.blocking(timeout, |state| state.pop_tail_push_head(src, dst))
            .await
    }
}
