//! Generic task trait for pipeline execution.

use async_trait::async_trait;

use crate::errors::QemuDiskResult;

/// Trait for tasks that can be executed in a pipeline.
///
/// Tasks run with a shared context, which is cloned per task.
#[async_trait]
pub trait PipelineTask<Ctx>: Send + Sync {
    /// Execute the task with the shared pipeline context.
    async fn run(self: Box<Self>, ctx: Ctx) -> QemuDiskResult<()>;

    /// Get human-readable task name for logging.
    fn name(&self) -> &str;
}

pub type BoxedTask<Ctx> = Box<dyn PipelineTask<Ctx>>;

/// Lifecycle of a step that works through a queue of disk operations.
///
/// `Pending → Running → Completed | Halted`. `Halted` is terminal: nothing after the
/// failing operation runs and nothing before it is undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Halted,
}
