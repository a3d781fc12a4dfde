//! Disk build tasks.

mod create_disk;
mod resize_disk;

pub use create_disk::CreateDiskTask;
pub use resize_disk::ResizeDiskTask;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::build::types::BuildPipelineContext;
use crate::errors::QemuDiskError;

pub type BuildCtx = Arc<Mutex<BuildPipelineContext>>;

/// Log task start and return the VM name for later log lines.
async fn task_start(ctx: &BuildCtx, task_name: &str) -> String {
    let vm_name = ctx.lock().await.config.vm_name.clone();
    tracing::debug!(vm_name = %vm_name, task = task_name, "Task started");
    vm_name
}

fn log_task_error(vm_name: &str, task_name: &str, err: &QemuDiskError) {
    tracing::error!(vm_name = %vm_name, task = task_name, error = %err, "Task failed");
}
