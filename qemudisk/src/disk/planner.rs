//! Per-disk action selection and target naming.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{BuildConfig, DiskFormat, QemuImgArgs};
use crate::disk::{ActionKind, DiskSpec, PlannedAction};

/// Inputs that decide which action each disk gets.
#[derive(Debug, Clone)]
pub struct PlanPolicy {
    /// Sources are disk images (as opposed to install media).
    pub from_image: bool,
    pub use_backing: bool,
    pub compress: bool,
    pub format: DiskFormat,
    /// Size of fresh source-derived disks.
    pub disk_size: String,
    pub vm_name: String,
    pub output_dir: Option<PathBuf>,
    pub args: Arc<QemuImgArgs>,
}

impl PlanPolicy {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            from_image: config.disk_image,
            use_backing: config.use_backing_file,
            compress: config.disk_compression,
            format: config.format,
            disk_size: config.disk_size.clone(),
            vm_name: config.vm_name.clone(),
            output_dir: config.output_directory.clone(),
            args: Arc::new(config.qemu_img_args.clone()),
        }
    }
}

pub struct ActionPlanner {
    policy: PlanPolicy,
}

impl ActionPlanner {
    pub fn new(policy: PlanPolicy) -> Self {
        Self { policy }
    }

    /// Plan every disk of a run: one action per source, in order, then one fresh
    /// disk per additional size.
    ///
    /// Target indices run across both groups, so the first additional disk is
    /// numbered right after the last source disk whatever action that disk got.
    pub fn plan(&self, sources: &[PathBuf], additional_sizes: &[String]) -> Vec<PlannedAction> {
        let mut actions = Vec::with_capacity(sources.len() + additional_sizes.len());

        for source in sources {
            let kind = self.source_action(source);
            actions.push(self.planned(actions.len(), kind));
        }

        for size in additional_sizes {
            let kind = ActionKind::Create { size: size.clone() };
            actions.push(self.planned(actions.len(), kind));
        }

        tracing::debug!(
            vm_name = %self.policy.vm_name,
            sources = sources.len(),
            additional = additional_sizes.len(),
            actions = actions.len(),
            "Planned disk actions"
        );

        actions
    }

    fn source_action(&self, source: &Path) -> ActionKind {
        let policy = &self.policy;

        if !policy.from_image {
            return ActionKind::Create {
                size: policy.disk_size.clone(),
            };
        }

        if policy.use_backing {
            return ActionKind::Backing {
                source: source.to_path_buf(),
            };
        }

        if file_extension(source) == Some(policy.format.as_str()) && policy.args.convert.is_empty()
        {
            tracing::info!(
                source = %source.display(),
                format = %policy.format,
                "File extension already matches desired output format, skipping qemu-img convert"
            );
            return ActionKind::Copy {
                source: source.to_path_buf(),
            };
        }

        ActionKind::Convert {
            source: source.to_path_buf(),
            compress: policy.compress,
        }
    }

    fn planned(&self, index: usize, kind: ActionKind) -> PlannedAction {
        PlannedAction {
            disk: DiskSpec {
                target_path: self.target_path(index),
                format: self.policy.format,
            },
            kind,
            args: Arc::clone(&self.policy.args),
        }
    }

    fn target_path(&self, index: usize) -> PathBuf {
        let name = format!("{}-{}", self.policy.vm_name, index);
        match &self.policy.output_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}

/// Text after the last `.` of the file name, case preserved.
///
/// Dotfiles count: `.qcow2` has extension `qcow2`.
fn file_extension(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    name.rsplit_once('.').map(|(_, ext)| ext)
}
