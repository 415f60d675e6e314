//! Assignment and completion.
//!
//! Lifecycle of one id:
//! - ready[type] -> assigned[consumer]  (`wait_for_next`, one atomic move)
//! - assigned[consumer] -> gone          (`set_completed`)
//!
//! Completing the last outstanding prerequisite of a dependent moves that
//! dependent from blocked[type] to ready[type]. Siblings may complete
//! concurrently from different processes; the prerequisite removal, the
//! emptiness check and the reverse-pointer deletion share one transaction,
//! so exactly one completion sees the set become empty and performs the
//! unblock.

use tracing::{debug, warn};

use super::{Coordinator, expect_replies, require_consumer};
use crate::domain::{CoordError, Result, TaskId, TaskType};
use crate::ports::{Op, StoreExt};

impl Coordinator {
    /// Wait for the next ready task of `task_type` and assign it to
    /// `consumer`.
    ///
    /// Blocks until a task is available or `shutdown` is called, in which
    /// case it returns [`CoordError::Shutdown`]. The store is polled in
    /// bounded slices of `poll_timeout` so the shutdown flag is re-checked
    /// between attempts.
    pub async fn wait_for_next(&self, task_type: &TaskType, consumer: &str) -> Result<TaskId> {
        require_consumer(consumer)?;
        let _waiter = self.waiters.enter().await;

        let ready = self.keys.ready(task_type);
        let assigned = self.keys.assigned(consumer);

        loop {
            if self.waiters.is_shut_down() {
                debug!(%task_type, consumer, "waiter exiting on shutdown");
                return Err(CoordError::Shutdown);
            }

            let popped = self
                .store
                .pop_tail_push_head(&ready, &assigned, self.config.poll_timeout)
                .await?;

            if let Some(raw) = popped {
                let task_id = TaskId::from_stored(raw);
                debug!(%task_id, %task_type, consumer, "task assigned");
                return Ok(task_id);
            }
        }
    }

    /// Mark `task_id` done. `consumer` must be the one it was assigned to.
    ///
    /// On success the task's record is deleted and, if it was the last
    /// prerequisite of its dependent, the dependent becomes ready.
    pub async fn set_completed(&self, task_id: &TaskId, consumer: &str) -> Result<()> {
        require_consumer(consumer)?;

        let removed = self
            .store
            .lrem(&self.keys.assigned(consumer), task_id.as_str())
            .await?;
        if removed != 1 {
            warn!(%task_id, consumer, removed, "completion rejected: not assigned");
            return Err(CoordError::OwnershipMismatch {
                task_id: task_id.clone(),
                consumer: consumer.to_string(),
            });
        }

        let waiting_on_key = self.keys.waiting_on(task_id);
        if let Some(dependent) = self.store.get(&waiting_on_key).await? {
            let dependent = TaskId::from_stored(dependent);
            self.release_dependent(task_id, &dependent, &waiting_on_key)
                .await?;
        }

        self.delete_record(task_id).await?;
        debug!(%task_id, consumer, "task completed");
        Ok(())
    }

    /// Remove `completed` from `dependent`'s prerequisites, unblocking the
    /// dependent if that was the last one, and drop the reverse pointer.
    async fn release_dependent(
        &self,
        completed: &TaskId,
        dependent: &TaskId,
        waiting_on_key: &str,
    ) -> Result<()> {
        let prereq_key = self.keys.prereqs(dependent);
        let replies = self
            .store
            .transaction(vec![
                Op::srem(prereq_key.clone(), completed.as_str()),
                Op::exists(prereq_key.clone()),
                Op::get(self.keys.type_of(dependent)),
                Op::del(waiting_on_key),
            ])
            .await?;
        let [removed, still_blocked, dependent_type, _] = expect_replies::<4>(replies)?;

        let removed = removed.into_int("SREM")?;
        if removed != 1 {
            return Err(self.consistency(format!(
                "removed {removed} of {completed} from {prereq_key}"
            )));
        }

        if still_blocked.into_bool("EXISTS")? {
            debug!(%completed, %dependent, "dependent still blocked");
            return Ok(());
        }

        let dependent_type = dependent_type
            .into_opt_string("GET")?
            .map(TaskType::new)
            .ok_or_else(|| self.consistency(format!("dependent {dependent} has no type")))?;

        let blocked_key = self.keys.blocked(&dependent_type);
        let replies = self
            .store
            .transaction(vec![
                Op::lpush(self.keys.ready(&dependent_type), dependent.as_str()),
                Op::lrem(blocked_key.clone(), dependent.as_str()),
            ])
            .await?;
        let [_, unblocked] = expect_replies::<2>(replies)?;

        let unblocked = unblocked.into_int("LREM")?;
        if unblocked != 1 {
            return Err(self.consistency(format!(
                "removed {unblocked} of {dependent} from {blocked_key}"
            )));
        }

        debug!(%completed, %dependent, task_type = %dependent_type, "dependent unblocked");
        Ok(())
    }

    /// Delete a completed task's type and payload. Both must exist.
    async fn delete_record(&self, task_id: &TaskId) -> Result<()> {
        let type_key = self.keys.type_of(task_id);
        let data_key = self.keys.data(task_id);
        let replies = self
            .store
            .transaction(vec![Op::del(type_key.clone()), Op::del(data_key.clone())])
            .await?;
        let [type_deleted, data_deleted] = expect_replies::<2>(replies)?;

        if !type_deleted.into_bool("DEL")? {
            return Err(self.consistency(format!("unable to delete {type_key}")));
        }
        if !data_deleted.into_bool("DEL")? {
            return Err(self.consistency(format!("unable to delete {data_key}")));
        }
        Ok(())
    }

    fn consistency(&self, message: String) -> CoordError {
        warn!(namespace = self.keys.prefix(), "{message}");
        CoordError::Consistency(message)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::config::CoordinatorConfig;
    use crate::domain::TaskSpec;
    use crate::impls::InMemoryStore;
    use crate::ports::store::SharedStore;

    fn setup() -> (Arc<InMemoryStore>, Coordinator) {
        let store = Arc::new(InMemoryStore::new());
        let config = CoordinatorConfig::new("t")
            .with_poll_timeout(Duration::from_millis(20))
            .with_shutdown_poll_interval(Duration::from_millis(5));
        let coord = Coordinator::new(store.clone(), config).unwrap();
        (store, coord)
    }

    #[tokio::test]
    async fn wait_moves_id_to_assigned_list() {
        let (store, coord) = setup();
        let id = coord.schedule(&TaskSpec::new("Cut", "carrots")).await.unwrap();

        let got = coord.wait_for_next(&TaskType::new("Cut"), "w1").await.unwrap();

        assert_eq!(got, id);
        assert!(!store.exists("t:R:Cut").await.unwrap());
        assert_eq!(store.lrange("t:A:w1").await.unwrap(), vec![id.to_string()]);
    }

    #[tokio::test]
    async fn assigned_list_is_most_recent_first() {
        let (_store, coord) = setup();
        let cut = TaskType::new("Cut");
        coord.schedule(&TaskSpec::new("Cut", "a")).await.unwrap();
        coord.schedule(&TaskSpec::new("Cut", "b")).await.unwrap();

        let first = coord.wait_for_next(&cut, "w1").await.unwrap();
        let second = coord.wait_for_next(&cut, "w1").await.unwrap();

        assert_eq!(coord.get_assigned_tasks("w1").await.unwrap(), vec![second, first]);
    }

    #[tokio::test]
    async fn completion_by_other_consumer_is_rejected_without_side_effects() {
        let (store, coord) = setup();
        let spec = TaskSpec::new("Mix", "stew").with_prerequisite(TaskSpec::new("Cut", "carrots"));
        coord.schedule(&spec).await.unwrap();
        let cut = coord.wait_for_next(&TaskType::new("Cut"), "w1").await.unwrap();
        let keys_before = store.keys_with_prefix("t:").await;

        let err = coord.set_completed(&cut, "w2").await.unwrap_err();

        assert!(matches!(err, CoordError::OwnershipMismatch { .. }));
        assert_eq!(store.keys_with_prefix("t:").await, keys_before);
        assert_eq!(coord.get_assigned_tasks("w1").await.unwrap(), vec![cut]);
    }

    #[tokio::test]
    async fn completing_last_prerequisite_unblocks_dependent() {
        let (store, coord) = setup();
        let spec = TaskSpec::new("Mix", "stew").with_prerequisites([
            TaskSpec::new("Cut", "carrots"),
            TaskSpec::new("Boil", "water"),
        ]);
        let mix = coord.schedule(&spec).await.unwrap();

        let cut = coord.wait_for_next(&TaskType::new("Cut"), "w1").await.unwrap();
        coord.set_completed(&cut, "w1").await.unwrap();
        assert_eq!(store.lrange("t:B:Mix").await.unwrap(), vec![mix.to_string()]);
        assert!(!store.exists("t:R:Mix").await.unwrap());

        let boil = coord.wait_for_next(&TaskType::new("Boil"), "w1").await.unwrap();
        coord.set_completed(&boil, "w1").await.unwrap();
        assert!(!store.exists("t:B:Mix").await.unwrap());
        assert_eq!(store.lrange("t:R:Mix").await.unwrap(), vec![mix.to_string()]);
        assert!(!store.exists(&format!("t:P:{mix}")).await.unwrap());
        assert!(!store.exists(&format!("t:W:{cut}")).await.unwrap());
        assert!(!store.exists(&format!("t:W:{boil}")).await.unwrap());
    }

    #[tokio::test]
    async fn completed_record_is_gone() {
        let (store, coord) = setup();
        let id = coord.schedule(&TaskSpec::new("Cut", "carrots")).await.unwrap();
        coord.wait_for_next(&TaskType::new("Cut"), "w1").await.unwrap();

        coord.set_completed(&id, "w1").await.unwrap();

        assert!(matches!(coord.get_data(&id).await, Err(CoordError::NotFound(_))));
        assert!(coord.get_assigned_tasks("w1").await.unwrap().is_empty());
        assert_eq!(store.key_count().await, 0);
    }

    #[tokio::test]
    async fn double_completion_is_an_ownership_error() {
        let (_store, coord) = setup();
        let id = coord.schedule(&TaskSpec::new("Cut", "carrots")).await.unwrap();
        coord.wait_for_next(&TaskType::new("Cut"), "w1").await.unwrap();
        coord.set_completed(&id, "w1").await.unwrap();

        let err = coord.set_completed(&id, "w1").await.unwrap_err();
        assert!(matches!(err, CoordError::OwnershipMismatch { .. }));
    }

    #[tokio::test]
    async fn missing_payload_is_a_consistency_error() {
        let (store, coord) = setup();
        let id = coord.schedule(&TaskSpec::new("Cut", "carrots")).await.unwrap();
        coord.wait_for_next(&TaskType::new("Cut"), "w1").await.unwrap();
        store.del(&format!("t:D:{id}")).await.unwrap();

        let err = coord.set_completed(&id, "w1").await.unwrap_err();
        assert!(matches!(err, CoordError::Consistency(msg) if msg.contains(":D:")));
    }

    #[tokio::test]
    async fn prerequisite_missing_from_set_is_a_consistency_error() {
        let (store, coord) = setup();
        let spec = TaskSpec::new("Mix", "stew").with_prerequisites([
            TaskSpec::new("Cut", "carrots"),
            TaskSpec::new("Boil", "water"),
        ]);
        let mix = coord.schedule(&spec).await.unwrap();
        let cut = coord.wait_for_next(&TaskType::new("Cut"), "w1").await.unwrap();
        store
            .execute(Op::srem(format!("t:P:{mix}"), cut.as_str()))
            .await
            .unwrap();

        let err = coord.set_completed(&cut, "w1").await.unwrap_err();

        assert!(matches!(err, CoordError::Consistency(msg) if msg.contains(":P:")));
        assert!(!store.exists(&format!("t:W:{cut}")).await.unwrap());
        assert_eq!(store.smembers(&format!("t:P:{mix}")).await.unwrap().len(), 1);
        assert_eq!(store.lrange("t:B:Mix").await.unwrap(), vec![mix.to_string()]);
    }

    #[tokio::test]
    async fn dependent_without_type_is_a_consistency_error() {
        let (store, coord) = setup();
        let spec = TaskSpec::new("Mix", "stew").with_prerequisite(TaskSpec::new("Cut", "carrots"));
        let mix = coord.schedule(&spec).await.unwrap();
        let cut = coord.wait_for_next(&TaskType::new("Cut"), "w1").await.unwrap();
        store.del(&format!("t:T:{mix}")).await.unwrap();

        let err = coord.set_completed(&cut, "w1").await.unwrap_err();

        assert!(matches!(err, CoordError::Consistency(msg) if msg.contains("has no type")));
        assert!(!store.exists(&format!("t:P:{mix}")).await.unwrap());
        assert!(!store.exists(&format!("t:W:{cut}")).await.unwrap());
        assert!(!store.exists("t:R:Mix").await.unwrap());
        assert_eq!(store.lrange("t:B:Mix").await.unwrap(), vec![mix.to_string()]);
    }

    #[tokio::test]
    async fn dependent_missing_from_blocked_list_is_a_consistency_error() {
        let (store, coord) = setup();
        let spec = TaskSpec::new("Mix", "stew").with_prerequisite(TaskSpec::new("Cut", "carrots"));
        let mix = coord.schedule(&spec).await.unwrap();
        let cut = coord.wait_for_next(&TaskType::new("Cut"), "w1").await.unwrap();
        store.lrem("t:B:Mix", mix.as_str()).await.unwrap();

        let err = coord.set_completed(&cut, "w1").await.unwrap_err();

        assert!(matches!(err, CoordError::Consistency(msg) if msg.contains("t:B:Mix")));
        // the push onto ready committed before the count was checked
        assert_eq!(store.lrange("t:R:Mix").await.unwrap(), vec![mix.to_string()]);
    }

    #[tokio::test]
    async fn missing_type_is_a_consistency_error() {
        let (store, coord) = setup();
        let id = coord.schedule(&TaskSpec::new("Cut", "carrots")).await.unwrap();
        coord.wait_for_next(&TaskType::new("Cut"), "w1").await.unwrap();
        store.del(&format!("t:T:{id}")).await.unwrap();

        let err = coord.set_completed(&id, "w1").await.unwrap_err();

        assert!(matches!(err, CoordError::Consistency(msg) if msg.contains(":T:")));
        assert!(!store.exists(&format!("t:D:{id}")).await.unwrap());
    }

    #[tokio::test]
    async fn wait_after_shutdown_returns_shutdown() {
        let (store, coord) = setup();
        coord.schedule(&TaskSpec::new("Cut", "carrots")).await.unwrap();
        coord.shutdown().await;

        let err = coord.wait_for_next(&TaskType::new("Cut"), "w1").await.unwrap_err();

        assert!(err.is_shutdown());
        assert_eq!(store.llen("t:R:Cut").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_consumer_is_invalid() {
        let (_store, coord) = setup();
        let err = coord.wait_for_next(&TaskType::new("Cut"), "").await.unwrap_err();
        assert!(matches!(err, CoordError::InvalidInput(_)));
    }
}
