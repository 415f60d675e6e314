//! Coordinator: the task-graph protocol on top of a [`SharedStore`].
//!
//! # Pieces
//! - **scheduler**: registers a task tree in one transaction
//! - **protocol**: pop-and-assign, ownership-checked completion, unblocking
//! - **waiters**: outstanding-waiter count and the shutdown flag
//! - **query**: read-only accessors
//!
//! One `Coordinator` models one process. Any number of them may share a
//! store; the store is the only state they have in common.

mod protocol;
mod query;
mod scheduler;
mod waiters;

use std::sync::Arc;

use crate::config::CoordinatorConfig;
use crate::domain::{CoordError, Result};
use crate::keys::KeySpace;
use crate::ports::{IdGenerator, Reply, SharedStore, SystemClock, UlidGenerator};

use self::waiters::WaiterTracker;

pub struct Coordinator {
    store: Arc<dyn SharedStore>,
    keys: KeySpace,
    ids: Arc<dyn IdGenerator>,
    config: CoordinatorConfig,
    waiters: WaiterTracker,
}

impl Coordinator {
    /// Build a coordinator over `store`. Must be called inside a Tokio
    /// runtime, since it starts the waiter accumulator task.
    pub fn new(store: Arc<dyn SharedStore>, config: CoordinatorConfig) -> Result<Self> {
        Self::with_id_generator(store, config, Arc::new(UlidGenerator::new(SystemClock)))
    }

    pub fn with_id_generator(
        store: Arc<dyn SharedStore>,
        config: CoordinatorConfig,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            keys: KeySpace::new(config.namespace.clone()),
            ids,
            config,
            waiters: WaiterTracker::spawn(),
        })
    }

    /// Stop every current and future `wait_for_next` call, then wait until
    /// all of them have returned. Permanent for this coordinator.
    pub async fn shutdown(&self) {
        self.waiters
            .shutdown(self.config.shutdown_poll_interval)
            .await;
    }

    pub fn is_shut_down(&self) -> bool {
        self.waiters.is_shut_down()
    }

    /// Number of `wait_for_next` calls currently in progress.
    pub fn waiter_count(&self) -> usize {
        self.waiters.count()
    }
}

/// Destructure a transaction's replies, checking the count.
fn expect_replies<const N: usize>(replies: Vec<Reply>) -> Result<[Reply; N]> {
    replies.try_into().map_err(|got: Vec<Reply>| {
        CoordError::Consistency(format!(
            "transaction returned {} replies, expected {N}",
            got.len()
        ))
    })
}

fn require_consumer(consumer: &str) -> Result<()> {
    if consumer.trim().is_empty() {
        return Err(CoordError::InvalidInput("consumer must not be empty".into()));
    }
    Ok(())
}
