use tracing::debug;

use super::Coordinator;
use crate::domain::{Result, TaskId, TaskSpec};
use crate::ports::Op;

impl Coordinator {
    /// Register `spec` and its whole prerequisite tree.
    ///
    /// Prerequisites are registered before the task that depends on them.
    /// Every write for the tree goes into one transaction, so other callers
    /// see either the whole graph or nothing. Returns the root's id.
    pub async fn schedule(&self, spec: &TaskSpec) -> Result<TaskId> {
        spec.validate()?;

        let mut ops = Vec::with_capacity(spec.node_count() * 4);
        let root = self.register(spec, &mut ops);
        let op_count = ops.len();

        self.store.transaction(ops).await?;

        debug!(
            root = %root,
            task_type = %spec.task_type,
            nodes = spec.node_count(),
            ops = op_count,
            "scheduled task tree"
        );
        Ok(root)
    }

    /// Queue the writes for `spec` (depth first) and return its new id.
    fn register(&self, spec: &TaskSpec, ops: &mut Vec<Op>) -> TaskId {
        let id = self.ids.generate_task_id();

        if spec.prerequisites.is_empty() {
            ops.push(Op::lpush(self.keys.ready(&spec.task_type), id.as_str()));
        } else {
            let prereq_key = self.keys.prereqs(&id);
            for prerequisite in &spec.prerequisites {
                let prereq_id = self.register(prerequisite, ops);
                ops.push(Op::sadd(prereq_key.clone(), prereq_id.as_str()));
                ops.push(Op::set(self.keys.waiting_on(&prereq_id), id.as_str()));
            }
            ops.push(Op::lpush(self.keys.blocked(&spec.task_type), id.as_str()));
        }

        ops.push(Op::set(self.keys.type_of(&id), spec.task_type.as_str()));
        ops.push(Op::set(self.keys.data(&id), spec.data.as_str()));
        id
    }
}
