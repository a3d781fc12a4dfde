//! `qemu-img` argument assembly.
//!
//! Every template is `<subcommand> <format flag> <format>`, then the user's extra
//! arguments, then paths (and size). Extra arguments always sit between the format and
//! the positional arguments.

use std::path::{Path, PathBuf};

use crate::config::{DiskFormat, QemuImgArgs};
use crate::disk::{ActionKind, DiskSpec};

/// What the driver has to do for one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskCommand {
    /// Arguments for a single `qemu-img` invocation (program name excluded).
    QemuImg(Vec<String>),
    /// Raw file copy, no `qemu-img` involved.
    Copy { source: PathBuf, target: PathBuf },
}

pub fn build(kind: &ActionKind, disk: &DiskSpec, args: &QemuImgArgs) -> DiskCommand {
    match kind {
        ActionKind::Create { size } => DiskCommand::QemuImg(create_args(disk, &args.create, size)),
        ActionKind::Convert { source, compress } => DiskCommand::QemuImg(convert_args(
            disk,
            &args.convert,
            source,
            *compress,
        )),
        ActionKind::Backing { source } => {
            DiskCommand::QemuImg(backing_args(disk, &args.create, source))
        }
        ActionKind::Copy { source } => DiskCommand::Copy {
            source: source.clone(),
            target: disk.target_path.clone(),
        },
    }
}

/// `create -f <fmt> [extra..] <target> <size>`
pub fn create_args(disk: &DiskSpec, extra: &[String], size: &str) -> Vec<String> {
    let mut command = head("create", "-f", disk.format);
    command.extend(extra.iter().cloned());
    command.push(path_arg(&disk.target_path));
    command.push(size.to_string());
    command
}

/// `convert [-c] -O <fmt> [extra..] <source> <target>`
pub fn convert_args(disk: &DiskSpec, extra: &[String], source: &Path, compress: bool) -> Vec<String> {
    let mut command = vec!["convert".to_string()];
    if compress {
        command.push("-c".to_string());
    }
    command.extend(["-O".to_string(), disk.format.as_str().to_string()]);
    command.extend(extra.iter().cloned());
    command.push(path_arg(source));
    command.push(path_arg(&disk.target_path));
    command
}

/// `create -f <fmt> [extra..] -b <source> <target>`
///
/// No size: the new disk inherits the virtual size of its backing file.
pub fn backing_args(disk: &DiskSpec, extra: &[String], source: &Path) -> Vec<String> {
    let mut command = head("create", "-f", disk.format);
    command.extend(extra.iter().cloned());
    command.push("-b".to_string());
    command.push(path_arg(source));
    command.push(path_arg(&disk.target_path));
    command
}

/// `resize -f <fmt> [extra..] <path> <size>`
pub fn resize_args(format: DiskFormat, extra: &[String], path: &Path, size: &str) -> Vec<String> {
    let mut command = head("resize", "-f", format);
    command.extend(extra.iter().cloned());
    command.push(path_arg(path));
    command.push(size.to_string());
    command
}

fn head(subcommand: &str, flag: &str, format: DiskFormat) -> Vec<String> {
    vec![
        subcommand.to_string(),
        flag.to_string(),
        format.as_str().to_string(),
    ]
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
