//! Type definitions for the disk build pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{BuildConfig, DiskSources};
use crate::disk::{Driver, PlanPolicy, ResizePolicy};
use crate::errors::QemuDiskError;

/// Shared build pipeline context.
///
/// Inputs are set at construction; each task fills in its own output slot.
pub struct BuildPipelineContext {
    pub config: BuildConfig,
    pub sources: DiskSources,
    pub driver: Arc<dyn Driver>,
    /// Set by `create_disk`, also when it halts (then holding the attempted paths).
    pub disk_output: Option<CreateDiskOutput>,
    /// Set by `resize_disk`.
    pub resize_output: Option<ResizeDiskOutput>,
    /// Message of the error that halted the pipeline, if any.
    pub error: Option<String>,
}

impl BuildPipelineContext {
    pub fn new(config: BuildConfig, sources: DiskSources, driver: Arc<dyn Driver>) -> Self {
        Self {
            config,
            sources,
            driver,
            disk_output: None,
            resize_output: None,
            error: None,
        }
    }

    pub fn record_error(&mut self, err: &QemuDiskError) {
        self.error = Some(err.to_string());
    }
}

// ============================================================================
// TASK INPUT/OUTPUT TYPES
// ============================================================================

/// Input for the create-disk task.
pub struct CreateDiskInput<'a> {
    pub policy: PlanPolicy,
    pub sources: &'a [PathBuf],
    pub additional_sizes: &'a [String],
    pub driver: &'a dyn Driver,
}

/// Output from the create-disk task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateDiskOutput {
    /// Target paths in plan order.
    pub disk_paths: Vec<PathBuf>,
}

/// Input for the resize-disk task.
pub struct ResizeDiskInput<'a> {
    pub policy: ResizePolicy,
    pub disk_paths: &'a [PathBuf],
    pub driver: &'a dyn Driver,
}

/// Output from the resize-disk task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeDiskOutput {
    pub resized: usize,
}
