//! Disk provisioning for QEMU image builds.
//!
//! Decides per disk whether to create, convert, copy or layer it on a backing file,
//! renders the matching `qemu-img` invocation, runs everything in order and finally
//! grows image-based disks to the requested size.

pub mod build;
pub mod config;
pub mod disk;
pub mod errors;
pub mod logging;
pub mod pipeline;

pub use build::{DiskBuild, DiskBuildOutput};
pub use config::{BuildConfig, DiskFormat, DiskSources, QemuImgArgs};
pub use disk::{Driver, QemuImgDriver, RecordingDriver};
pub use errors::{QemuDiskError, QemuDiskResult};
pub use logging::{LoggingOptions, init_logging};
