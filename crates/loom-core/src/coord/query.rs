use super::{Coordinator, expect_replies};
use crate::domain::{CoordError, Result, TaskId, TaskRecord, TaskType};
use crate::observability::QueueCounts;
use crate::ports::{Op, StoreExt};

impl Coordinator {
    /// Payload of a task. `NotFound` once the task has completed.
    pub async fn get_data(&self, task_id: &TaskId) -> Result<String> {
        self.store
            .get(&self.keys.data(task_id))
            .await?
            .ok_or_else(|| CoordError::NotFound(task_id.clone()))
    }

    pub async fn get_type(&self, task_id: &TaskId) -> Result<TaskType> {
        self.store
            .get(&self.keys.type_of(task_id))
            .await?
            .map(TaskType::new)
            .ok_or_else(|| CoordError::NotFound(task_id.clone()))
    }

    /// Ids currently assigned to `consumer`, most recently assigned first.
    pub async fn get_assigned_tasks(&self, consumer: &str) -> Result<Vec<TaskId>> {
        let ids = self.store.lrange(&self.keys.assigned(consumer)).await?;
        Ok(ids.into_iter().map(TaskId::from_stored).collect())
    }

    /// Everything the store holds for one task, read in a single
    /// transaction.
    pub async fn inspect(&self, task_id: &TaskId) -> Result<TaskRecord> {
        let replies = self
            .store
            .transaction(vec![
                Op::get(self.keys.type_of(task_id)),
                Op::get(self.keys.data(task_id)),
                Op::smembers(self.keys.prereqs(task_id)),
                Op::get(self.keys.waiting_on(task_id)),
            ])
            .await?;
        let [task_type, data, prerequisites, waiting_on] = expect_replies::<4>(replies)?;

        let Some(task_type) = task_type.into_opt_string("GET")? else {
            return Err(CoordError::NotFound(task_id.clone()));
        };

        Ok(TaskRecord {
            id: task_id.clone(),
            task_type: TaskType::new(task_type),
            data: data.into_opt_string("GET")?.unwrap_or_default(),
            prerequisites: prerequisites
                .into_strings("SMEMBERS")?
                .into_iter()
                .map(TaskId::from_stored)
                .collect(),
            waiting_on: waiting_on.into_opt_string("GET")?.map(TaskId::from_stored),
        })
    }

    /// Ready and blocked queue lengths for one task type.
    pub async fn queue_counts(&self, task_type: &TaskType) -> Result<QueueCounts> {
        let replies = self
            .store
            .transaction(vec![
                Op::llen(self.keys.ready(task_type)),
                Op::llen(self.keys.blocked(task_type)),
            ])
            .await?;
        let [ready, blocked] = expect_replies::<2>(replies)?;

        Ok(QueueCounts {
            ready: ready.into_int("LLEN")?.max(0) as usize,
            blocked: blocked.into_int("LLEN")?.max(0) as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::CoordinatorConfig;
    use crate::domain::TaskSpec;
    use crate::impls::InMemoryStore;

    fn setup() -> Coordinator {
        Coordinator::new(Arc::new(InMemoryStore::new()), CoordinatorConfig::new("q")).unwrap()
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let coord = setup();
        let id = TaskId::from_stored("task-missing");

        assert!(matches!(coord.get_data(&id).await, Err(CoordError::NotFound(_))));
        assert!(matches!(coord.get_type(&id).await, Err(CoordError::NotFound(_))));
        assert!(matches!(coord.inspect(&id).await, Err(CoordError::NotFound(_))));
    }

    #[tokio::test]
    async fn nothing_assigned_is_an_empty_list() {
        let coord = setup();
        assert!(coord.get_assigned_tasks("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inspect_shows_edges() {
        let coord = setup();
        let mix = coord
            .schedule(
                &TaskSpec::new("Mix", "stew").with_prerequisite(TaskSpec::new("Cut", "carrots")),
            )
            .await
            .unwrap();

        let record = coord.inspect(&mix).await.unwrap();
        assert_eq!(record.task_type, TaskType::new("Mix"));
        assert_eq!(record.data, "stew");
        assert_eq!(record.waiting_on, None);
        assert_eq!(record.prerequisites.len(), 1);
        assert!(!record.is_unblocked());

        let cut = coord.inspect(&record.prerequisites[0]).await.unwrap();
        assert_eq!(cut.waiting_on, Some(mix));
        assert_eq!(coord.get_data(&cut.id).await.unwrap(), "carrots");
        assert!(cut.is_unblocked());
    }

    #[tokio::test]
    async fn queue_counts_track_ready_and_blocked() {
        let coord = setup();
        coord
            .schedule(
                &TaskSpec::new("Mix", "stew").with_prerequisites([
                    TaskSpec::new("Cut", "a"),
                    TaskSpec::new("Cut", "b"),
                ]),
            )
            .await
            .unwrap();

        let cut = coord.queue_counts(&TaskType::new("Cut")).await.unwrap();
        let mix = coord.queue_counts(&TaskType::new("Mix")).await.unwrap();
        assert_eq!(cut, QueueCounts { ready: 2, blocked: 0 });
        assert_eq!(mix, QueueCounts { ready: 0, blocked: 1 });
    }
}
