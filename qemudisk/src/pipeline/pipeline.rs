//! Pipeline executor.

use std::time::Instant;

use super::metrics::{PipelineMetrics, TaskMetrics};
use super::task::BoxedTask;
use crate::errors::QemuDiskResult;

pub struct ExecutionPlan<Ctx> {
    tasks: Vec<BoxedTask<Ctx>>,
}

impl<Ctx> ExecutionPlan<Ctx> {
    pub fn new(tasks: Vec<BoxedTask<Ctx>>) -> Self {
        Self { tasks }
    }

    pub fn tasks(self) -> Vec<BoxedTask<Ctx>> {
        self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Pipeline executor framework.
///
/// Runs the plan's tasks one after another. The first failing task halts the pipeline:
/// its error is returned as-is and the remaining tasks never run.
pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Execute a plan.
    ///
    /// Generic over:
    /// - `Ctx`: Shared pipeline context (use interior mutability for writes)
    pub async fn execute<Ctx>(plan: ExecutionPlan<Ctx>, ctx: Ctx) -> QemuDiskResult<PipelineMetrics>
    where
        Ctx: Clone,
    {
        let total_start = Instant::now();
        tracing::debug!(tasks = plan.len(), "Executing pipeline");
        let mut task_metrics = Vec::new();

        for task in plan.tasks() {
            let name = task.name().to_string();
            let task_start = Instant::now();

            if let Err(e) = task.run(ctx.clone()).await {
                tracing::error!(task = %name, error = %e, "Pipeline halted");
                return Err(e);
            }

            task_metrics.push(TaskMetrics {
                name,
                duration_ms: task_start.elapsed().as_millis(),
            });
        }

        Ok(PipelineMetrics {
            total_duration_ms: total_start.elapsed().as_millis(),
            tasks: task_metrics,
        })
    }
}
