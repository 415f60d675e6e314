mod cli;
mod logging;
mod worker;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use loom_core::{
    CoordError, Coordinator, CoordinatorConfig, InMemoryStore, TaskId, TaskSpec, TaskType,
};
use tracing::info;

use crate::worker::WorkerGroup;

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("loom error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;

    let mut config = CoordinatorConfig::from_env().context("loading configuration")?;
    if let Some(namespace) = args.namespace {
        config.namespace = namespace;
    }

    let spec = match &args.spec {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<TaskSpec>(&raw)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => kitchen_recipe(),
    };

    let store = Arc::new(InMemoryStore::new());
    let scheduler = Coordinator::new(store.clone(), config.clone())?;

    let mut task_types = BTreeSet::new();
    collect_types(&spec, &mut task_types);
    let task_types: Vec<TaskType> = task_types.into_iter().collect();

    let workers = WorkerGroup::spawn(
        store.clone(),
        &config,
        &task_types,
        args.workers.max(1),
        Duration::from_millis(args.work_ms),
    )?;

    let root = scheduler.schedule(&spec).await?;
    info!(%root, nodes = spec.node_count(), "scheduled");

    tokio::select! {
        result = wait_until_completed(&scheduler, &root) => result?,
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    let completed = workers.shutdown_and_join().await;
    info!(completed, leftover_keys = store.key_count().await, "done");
    Ok(())
}

/// The root's record disappears once its worker completes it.
async fn wait_until_completed(scheduler: &Coordinator, root: &TaskId) -> anyhow::Result<()> {
    loop {
        match scheduler.get_data(root).await {
            Err(CoordError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
            Ok(_) => tokio::time::sleep(Duration::from_millis(50)).await,
        }
    }
}

fn collect_types(spec: &TaskSpec, out: &mut BTreeSet<TaskType>) {
    out.insert(spec.task_type.clone());
    for prerequisite in &spec.prerequisites {
        collect_types(prerequisite, out);
    }
}

fn kitchen_recipe() -> TaskSpec {
    TaskSpec::new("Mix", "stew").with_prerequisites([
        TaskSpec::new("Cut", "carrots"),
        TaskSpec::new("Cut", "onions"),
        TaskSpec::new("Boil", "water"),
    ])
}
