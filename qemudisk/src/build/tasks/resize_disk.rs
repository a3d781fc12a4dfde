//! Task: Disk resize.
//!
//! Grows the disks published by `create_disk` to the configured size. Does nothing for
//! builds that start from install media or when resizing is switched off.

use super::{BuildCtx, log_task_error, task_start};
use crate::build::types::{ResizeDiskInput, ResizeDiskOutput};
use crate::disk::{DiskResizer, ResizePolicy};
use crate::errors::{QemuDiskError, QemuDiskResult};
use crate::pipeline::PipelineTask;
use async_trait::async_trait;

pub struct ResizeDiskTask;

#[async_trait]
impl PipelineTask<BuildCtx> for ResizeDiskTask {
    async fn run(self: Box<Self>, ctx: BuildCtx) -> QemuDiskResult<()> {
        let task_name = self.name();
        let vm_name = task_start(&ctx, task_name).await;

        let (policy, disk_paths, driver) = {
            let ctx = ctx.lock().await;
            (
                ResizePolicy::from_config(&ctx.config),
                ctx.disk_output.as_ref().map(|output| output.disk_paths.clone()),
                ctx.driver.clone(),
            )
        };

        let result = match &disk_paths {
            Some(disk_paths) => {
                run_resize_disk(ResizeDiskInput {
                    policy,
                    disk_paths,
                    driver: driver.as_ref(),
                })
                .await
            }
            None => Err(QemuDiskError::Internal(
                "create_disk task must run first".into(),
            )),
        };

        let mut ctx = ctx.lock().await;
        match result {
            Ok(output) => {
                ctx.resize_output = Some(output);
                Ok(())
            }
            Err(e) => {
                log_task_error(&vm_name, task_name, &e);
                ctx.record_error(&e);
                Err(e)
            }
        }
    }

    fn name(&self) -> &str {
        "resize_disk"
    }
}

async fn run_resize_disk(input: ResizeDiskInput<'_>) -> QemuDiskResult<ResizeDiskOutput> {
    let mut resizer = DiskResizer::new(input.driver, input.policy);
    let resized = resizer.run(input.disk_paths).await?;
    Ok(ResizeDiskOutput { resized })
}
