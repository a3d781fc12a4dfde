//! Resize pass: grows every provisioned disk to the configured size.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{BuildConfig, DiskFormat, QemuImgArgs};
use crate::disk::Driver;
use crate::disk::command::resize_args;
use crate::errors::{QemuDiskError, QemuDiskResult};
use crate::pipeline::StepStatus;

#[derive(Debug, Clone)]
pub struct ResizePolicy {
    pub disk_image: bool,
    pub skip_resize: bool,
    pub format: DiskFormat,
    pub disk_size: String,
    pub args: Arc<QemuImgArgs>,
}

impl ResizePolicy {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            disk_image: config.disk_image,
            skip_resize: config.skip_resize_disk,
            format: config.format,
            disk_size: config.disk_size.clone(),
            args: Arc::new(config.qemu_img_args.clone()),
        }
    }

    /// Only disks cloned from an image need growing; fresh disks are created at size.
    pub fn is_enabled(&self) -> bool {
        self.disk_image && !self.skip_resize
    }
}

pub struct DiskResizer<'a> {
    driver: &'a dyn Driver,
    policy: ResizePolicy,
    status: StepStatus,
}

impl<'a> DiskResizer<'a> {
    pub fn new(driver: &'a dyn Driver, policy: ResizePolicy) -> Self {
        Self {
            driver,
            policy,
            status: StepStatus::Pending,
        }
    }

    /// Resize `paths` in order. Returns how many disks were resized.
    pub async fn run(&mut self, paths: &[PathBuf]) -> QemuDiskResult<usize> {
        if self.status != StepStatus::Pending {
            return Err(QemuDiskError::Internal(format!(
                "disk resizer already ran ({:?})",
                self.status
            )));
        }

        if !self.policy.is_enabled() {
            tracing::debug!(
                disk_image = self.policy.disk_image,
                skip_resize = self.policy.skip_resize,
                "Skipping disk resize"
            );
            self.status = StepStatus::Completed;
            return Ok(0);
        }

        self.status = StepStatus::Running;
        for path in paths {
            let command = resize_args(
                self.policy.format,
                &self.policy.args.resize,
                path,
                &self.policy.disk_size,
            );

            tracing::info!(path = %path.display(), size = %self.policy.disk_size, "Resizing hard drive");
            if let Err(e) = self.driver.qemu_img(&command).await {
                self.status = StepStatus::Halted;
                return Err(QemuDiskError::ResizeDisk {
                    path: path.clone(),
                    source: Box::new(e),
                });
            }
        }

        self.status = StepStatus::Completed;
        Ok(paths.len())
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }
}
