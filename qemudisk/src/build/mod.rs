//! Disk build orchestration.
//!
//! ## Architecture
//!
//! ```text
//! 1. CreateDisk   (plan + create/convert/copy every disk, publish paths)
//! 2. ResizeDisk   (grow published disks; no-op unless image based)
//! ```
//!
//! Tasks run strictly one after another; the first failure halts the build and is kept
//! in the context as well as returned.

mod tasks;
mod types;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::{BuildConfig, DiskSources};
use crate::disk::Driver;
use crate::errors::{QemuDiskError, QemuDiskResult};
use crate::pipeline::{BoxedTask, ExecutionPlan, PipelineExecutor, PipelineMetrics};

pub use types::{
    BuildPipelineContext, CreateDiskInput, CreateDiskOutput, ResizeDiskInput, ResizeDiskOutput,
};

use tasks::{BuildCtx, CreateDiskTask, ResizeDiskTask};

// ============================================================================
// EXECUTION PLAN
// ============================================================================

fn get_execution_plan() -> ExecutionPlan<BuildCtx> {
    let tasks: Vec<BoxedTask<BuildCtx>> = vec![Box::new(CreateDiskTask), Box::new(ResizeDiskTask)];
    ExecutionPlan::new(tasks)
}

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct DiskBuildOutput {
    /// Every produced disk, in plan order.
    pub disk_paths: Vec<PathBuf>,
    pub metrics: PipelineMetrics,
}

/// Provisions (and resizes) the disks of one VM build.
///
/// # Example
///
/// ```ignore
/// let config = BuildConfig::from_file(Path::new("build.json"))?;
/// let sources = config.disk_sources();
/// let output = DiskBuild::new(config, sources, Arc::new(QemuImgDriver::new()))?
///     .run()
///     .await?;
/// ```
pub struct DiskBuild {
    config: BuildConfig,
    sources: DiskSources,
    driver: Arc<dyn Driver>,
}

impl DiskBuild {
    /// Validate `config` and prepare a build.
    pub fn new(
        config: BuildConfig,
        sources: DiskSources,
        driver: Arc<dyn Driver>,
    ) -> QemuDiskResult<Self> {
        config.sanitize()?;

        Ok(Self {
            config,
            sources,
            driver,
        })
    }

    /// Run every disk task.
    pub async fn run(self) -> QemuDiskResult<DiskBuildOutput> {
        let DiskBuild {
            config,
            sources,
            driver,
        } = self;

        tracing::info!(vm_name = %config.vm_name, format = %config.format, "Starting disk build");

        let ctx = Arc::new(Mutex::new(BuildPipelineContext::new(config, sources, driver)));
        let metrics = PipelineExecutor::execute(get_execution_plan(), Arc::clone(&ctx)).await?;
        metrics.log_tasks();

        let mut ctx = ctx.lock().await;
        let disk_output = ctx
            .disk_output
            .take()
            .ok_or_else(|| QemuDiskError::Internal("create_disk task must run first".into()))?;

        Ok(DiskBuildOutput {
            disk_paths: disk_output.disk_paths,
            metrics,
        })
    }
}
