//! Disk planning, command rendering and execution.
//!
//! ```text
//! ActionPlanner ──→ PlannedAction ──→ command::build ──→ Driver
//!                                                          │
//!                   DiskProvisioner (create pass) ◄────────┤
//!                   DiskResizer     (resize pass) ◄────────┘
//! ```

pub mod command;
mod driver;
mod planner;
mod provision;
mod recording;
mod resize;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{DiskFormat, QemuImgArgs};

pub use command::DiskCommand;
pub use driver::{Driver, QemuImgDriver};
pub use planner::{ActionPlanner, PlanPolicy};
pub use provision::DiskProvisioner;
pub use recording::{RecordedCall, RecordingDriver};
pub use resize::{DiskResizer, ResizePolicy};

/// Identity of one disk produced by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskSpec {
    /// `{vm_name}-{index}`, optionally under the output directory. Unique per run.
    pub target_path: PathBuf,
    pub format: DiskFormat,
}

/// What to do to produce a disk.
///
/// Each variant carries only what its command needs: a fresh disk has a size and no
/// source, the others start from a source image and take their size from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// `qemu-img create` an empty disk.
    Create { size: String },
    /// `qemu-img convert` the source into the target format.
    Convert { source: PathBuf, compress: bool },
    /// `qemu-img create -b`: a new disk layered on top of the source.
    Backing { source: PathBuf },
    /// Byte-for-byte copy; the source is already in the target format.
    Copy { source: PathBuf },
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Create { .. } => "create",
            ActionKind::Convert { .. } => "convert",
            ActionKind::Backing { .. } => "backing",
            ActionKind::Copy { .. } => "copy",
        }
    }

    pub fn source(&self) -> Option<&Path> {
        match self {
            ActionKind::Create { .. } => None,
            ActionKind::Convert { source, .. }
            | ActionKind::Backing { source }
            | ActionKind::Copy { source } => Some(source),
        }
    }

    pub fn size(&self) -> Option<&str> {
        match self {
            ActionKind::Create { size } => Some(size),
            _ => None,
        }
    }
}

/// A disk paired with the action chosen for it. Consumed once by [`DiskProvisioner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    pub disk: DiskSpec,
    pub kind: ActionKind,
    pub args: Arc<QemuImgArgs>,
}

impl PlannedAction {
    /// Render the command this action runs.
    pub fn command(&self) -> DiskCommand {
        command::build(&self.kind, &self.disk, &self.args)
    }
}
