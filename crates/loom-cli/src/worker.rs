//! Worker group: one coordinator per worker, all sharing one store.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use loom_core::{CoordError, Coordinator, CoordinatorConfig, SharedStore, TaskType};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub struct WorkerGroup {
    coordinators: Vec<Arc<Coordinator>>,
    joins: Vec<JoinHandle<usize>>,
}

impl WorkerGroup {
    /// Spawn `per_type` workers for each task type.
    pub fn spawn(
        store: Arc<dyn SharedStore>,
        config: &CoordinatorConfig,
        task_types: &[TaskType],
        per_type: usize,
        work: Duration,
    ) -> loom_core::Result<Self> {
        let mut coordinators = Vec::new();
        let mut joins = Vec::new();

        for task_type in task_types {
            for n in 0..per_type {
                let coord = Arc::new(Coordinator::new(Arc::clone(&store), config.clone())?);
                let consumer = format!("{task_type}-worker-{n}");
                joins.push(tokio::spawn(worker_loop(
                    Arc::clone(&coord),
                    task_type.clone(),
                    consumer,
                    work,
                )));
                coordinators.push(coord);
            }
        }

        Ok(Self {
            coordinators,
            joins,
        })
    }

    /// Shut every worker's coordinator down and wait for the loops to end.
    /// All shutdown flags go up together. Returns how many tasks were
    /// completed in total.
    pub async fn shutdown_and_join(self) -> usize {
        join_all(self.coordinators.iter().map(|coord| coord.shutdown())).await;
        let mut completed = 0;
        for join in self.joins {
            completed += join.await.unwrap_or(0);
        }
        completed
    }
}

async fn worker_loop(
    coord: Arc<Coordinator>,
    task_type: TaskType,
    consumer: String,
    work: Duration,
) -> usize {
    let mut completed = 0;
    loop {
        let task_id = match coord.wait_for_next(&task_type, &consumer).await {
            Ok(id) => id,
            Err(CoordError::Shutdown) => break,
            Err(e) => {
                error!(%consumer, "wait failed: {e}");
                break;
            }
        };

        let data = match coord.get_data(&task_id).await {
            Ok(data) => data,
            Err(e) => {
                warn!(%consumer, %task_id, "payload unavailable, leaving task assigned: {e}");
                continue;
            }
        };
        info!(%consumer, %task_id, %data, "working");
        tokio::time::sleep(work).await;

        match coord.set_completed(&task_id, &consumer).await {
            Ok(()) => completed += 1,
            Err(e) => error!(%consumer, %task_id, "completion failed: {e}"),
        }
    }
    info!(%consumer, completed, "worker stopped");
    completed
}

#[cfg(test)]
mod tests {
    use loom_core::ports::StoreExt;
    use loom_core::{InMemoryStore, TaskSpec};

    use super::*;

    fn config(poll_timeout: Duration) -> CoordinatorConfig {
        CoordinatorConfig::new("w")
            .with_poll_timeout(poll_timeout)
            .with_shutdown_poll_interval(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn shutdown_stops_idle_workers_together() {
        let poll = Duration::from_millis(300);
        let types: Vec<TaskType> = ["A", "B", "C", "D", "E", "F"]
            .into_iter()
            .map(TaskType::new)
            .collect();
        let group = WorkerGroup::spawn(
            Arc::new(InMemoryStore::new()),
            &config(poll),
            &types,
            1,
            Duration::ZERO,
        )
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // one after another this would take about six poll timeouts
        let completed = tokio::time::timeout(Duration::from_secs(1), group.shutdown_and_join())
            .await
            .expect("workers were shut down one at a time");
        assert_eq!(completed, 0);
    }

    #[tokio::test]
    async fn task_without_payload_is_not_completed() {
        let store = Arc::new(InMemoryStore::new());
        let cfg = config(Duration::from_millis(20));
        let scheduler = Coordinator::new(store.clone(), cfg.clone()).unwrap();
        let id = scheduler.schedule(&TaskSpec::new("Cut", "carrots")).await.unwrap();
        store.del(&format!("w:D:{id}")).await.unwrap();

        let group =
            WorkerGroup::spawn(store.clone(), &cfg, &[TaskType::new("Cut")], 1, Duration::ZERO)
                .unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while scheduler.get_assigned_tasks("Cut-worker-0").await.unwrap().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("task never assigned");

        assert_eq!(group.shutdown_and_join().await, 0);
        assert_eq!(
            scheduler.get_assigned_tasks("Cut-worker-0").await.unwrap(),
            vec![id.clone()]
        );
        assert_eq!(scheduler.get_type(&id).await.unwrap(), TaskType::new("Cut"));
    }
}
