//! Create pass: executes a plan, one disk at a time.

use std::path::PathBuf;

use crate::disk::{Driver, PlannedAction};
use crate::errors::{QemuDiskError, QemuDiskResult};
use crate::pipeline::StepStatus;

/// Executes planned actions in order and remembers every target it attempted.
///
/// A target is recorded before its command runs, so after a halt [`paths`](Self::paths)
/// still ends with the disk that failed. Disks created before the failure are left
/// in place.
pub struct DiskProvisioner<'a> {
    driver: &'a dyn Driver,
    paths: Vec<PathBuf>,
    status: StepStatus,
}

impl<'a> DiskProvisioner<'a> {
    pub fn new(driver: &'a dyn Driver) -> Self {
        Self {
            driver,
            paths: Vec::new(),
            status: StepStatus::Pending,
        }
    }

    /// Run the plan, stopping at the first failure.
    pub async fn run(&mut self, plan: Vec<PlannedAction>) -> QemuDiskResult<()> {
        if self.status != StepStatus::Pending {
            return Err(QemuDiskError::Internal(format!(
                "disk provisioner already ran ({:?})",
                self.status
            )));
        }
        self.status = StepStatus::Running;

        for action in plan {
            let path = action.disk.target_path.clone();
            tracing::info!(
                path = %path.display(),
                action = action.kind.name(),
                size = action.kind.size().unwrap_or_default(),
                "Creating/copying disk"
            );
            self.paths.push(path.clone());

            if let Err(e) = self.driver.execute(&action.command()).await {
                self.status = StepStatus::Halted;
                return Err(QemuDiskError::CreateDisk {
                    path,
                    action: action.kind.name(),
                    source: Box::new(e),
                });
            }
        }

        self.status = StepStatus::Completed;
        Ok(())
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    /// Targets attempted so far, in plan order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }
}
