//! Sequential, table-driven step execution.
//!
//! ## Architecture
//!
//! ```text
//! ExecutionPlan → Tasks (run in order over a shared context)
//!
//! - ExecutionPlan: ordered list of tasks for one build
//! - Task: atomic unit of work; the first error halts the plan
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use pipeline::{ExecutionPlan, PipelineExecutor};
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//!
//! struct Context;
//! struct TaskA;
//! struct TaskB;
//!
//! let plan = ExecutionPlan::new(vec![Box::new(TaskA), Box::new(TaskB)]);
//!
//! let ctx = Arc::new(Mutex::new(Context));
//! let metrics = PipelineExecutor::execute(plan, ctx).await?;
//! println!("pipeline took {}ms", metrics.total_duration_ms);
//! ```

mod metrics;
#[allow(clippy::module_inception)]
mod pipeline;
mod task;

pub use metrics::{PipelineMetrics, TaskMetrics};
pub use pipeline::{ExecutionPlan, PipelineExecutor};
pub use task::{BoxedTask, PipelineTask, StepStatus};
