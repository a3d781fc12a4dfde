//! Driver that records calls instead of touching the host.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::disk::Driver;
use crate::errors::{QemuDiskError, QemuDiskResult};

/// One driver invocation, as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    QemuImg(Vec<String>),
    Copy { source: PathBuf, target: PathBuf },
}

impl RecordedCall {
    /// Shell-like rendering, for dry runs.
    pub fn render(&self) -> String {
        match self {
            RecordedCall::QemuImg(args) => format!("qemu-img {}", args.join(" ")),
            RecordedCall::Copy { source, target } => {
                format!("cp {} {}", source.display(), target.display())
            }
        }
    }
}

/// Records every call verbatim and succeeds, unless told to fail at a given call.
///
/// Failing calls are still recorded: the log always holds every attempt.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    calls: Mutex<Vec<RecordedCall>>,
    fail_at: Option<usize>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `index`-th call (0-based, counting both kinds).
    pub fn failing_at(index: usize) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_at: Some(index),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn qemu_img_calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RecordedCall::QemuImg(args) => Some(args.clone()),
                RecordedCall::Copy { .. } => None,
            })
            .collect()
    }

    pub fn copy_calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Copy { source, target } => Some((source.clone(), target.clone())),
                RecordedCall::QemuImg(_) => None,
            })
            .collect()
    }

    fn record(&self, call: RecordedCall) -> QemuDiskResult<()> {
        let mut calls = self.calls.lock();
        let index = calls.len();
        calls.push(call);

        if self.fail_at == Some(index) {
            return Err(QemuDiskError::ExternalCommand {
                command: "qemu-img".into(),
                message: format!("injected failure at call {index}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    async fn qemu_img(&self, args: &[String]) -> QemuDiskResult<()> {
        self.record(RecordedCall::QemuImg(args.to_vec()))
    }

    async fn copy(&self, source: &Path, target: &Path) -> QemuDiskResult<()> {
        self.record(RecordedCall::Copy {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
        })
    }
}
