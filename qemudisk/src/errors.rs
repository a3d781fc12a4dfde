//! Error types shared by the planner, the drivers and the pipeline tasks.

use std::path::PathBuf;

use thiserror::Error;

pub type QemuDiskResult<T> = Result<T, QemuDiskError>;

#[derive(Debug, Error)]
pub enum QemuDiskError {
    /// Broken invariant inside the crate (e.g. tasks run out of order).
    #[error("internal error: {0}")]
    Internal(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed: {message}")]
    ExternalCommand { command: String, message: String },

    /// A disk action failed during the provisioning pass. Wording is fixed.
    #[error("error creating hard drive: {source}")]
    CreateDisk {
        path: PathBuf,
        action: &'static str,
        #[source]
        source: Box<QemuDiskError>,
    },

    /// A resize failed during the resize pass. Wording (including the capital `E`) is fixed.
    #[error("Error creating hard drive: {source}")]
    ResizeDisk {
        path: PathBuf,
        #[source]
        source: Box<QemuDiskError>,
    },
}
