//! Execution backend for disk commands.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::disk::DiskCommand;
use crate::errors::{QemuDiskError, QemuDiskResult};

/// Runs the commands the planner asks for.
///
/// Calls are awaited one at a time; implementations do not need to handle overlap.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Run `qemu-img` with `args` and wait for it to exit.
    async fn qemu_img(&self, args: &[String]) -> QemuDiskResult<()>;

    /// Copy `source` to `target` byte for byte.
    async fn copy(&self, source: &Path, target: &Path) -> QemuDiskResult<()>;

    /// Dispatch a rendered command to the matching call.
    async fn execute(&self, command: &DiskCommand) -> QemuDiskResult<()> {
        match command {
            DiskCommand::QemuImg(args) => self.qemu_img(args).await,
            DiskCommand::Copy { source, target } => self.copy(source, target).await,
        }
    }
}

/// Driver backed by the host's `qemu-img` binary.
#[derive(Debug, Clone)]
pub struct QemuImgDriver {
    program: PathBuf,
}

impl Default for QemuImgDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl QemuImgDriver {
    /// Use `qemu-img` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("qemu-img")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Check whether the configured binary runs at all.
    pub async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .is_ok_and(|o| o.status.success())
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

#[async_trait]
impl Driver for QemuImgDriver {
    async fn qemu_img(&self, args: &[String]) -> QemuDiskResult<()> {
        tracing::debug!(program = %self.program.display(), ?args, "Running qemu-img");

        let output = tokio::process::Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| QemuDiskError::Io {
                context: format!("running {}", self.program_name()),
                source: e,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match stderr.trim() {
                "" => output.status.to_string(),
                trimmed => trimmed.to_string(),
            };
            return Err(QemuDiskError::ExternalCommand {
                command: self.program_name(),
                message,
            });
        }

        Ok(())
    }

    async fn copy(&self, source: &Path, target: &Path) -> QemuDiskResult<()> {
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| QemuDiskError::Io {
                    context: format!("creating directory {}", parent.display()),
                    source: e,
                })?;
        }

        let bytes = tokio::fs::copy(source, target)
            .await
            .map_err(|e| QemuDiskError::Io {
                context: format!("copying {} to {}", source.display(), target.display()),
                source: e,
            })?;

        tracing::info!(
            source = %source.display(),
            target = %target.display(),
            bytes,
            "Copied disk image"
        );
        Ok(())
    }
}
