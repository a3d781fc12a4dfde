//! Build configuration for the disk steps.
//!
//! Loaded once from JSON and validated with [`BuildConfig::sanitize`] before any disk is
//! touched. Everything downstream treats it as read-only.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{QemuDiskError, QemuDiskResult};

/// Default primary disk size, in `qemu-img` notation.
pub const DEFAULT_DISK_SIZE: &str = "40960M";

/// Target image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskFormat {
    #[default]
    Qcow2,
    Raw,
}

impl DiskFormat {
    /// Name as understood by `qemu-img -f/-O`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiskFormat::Qcow2 => "qcow2",
            DiskFormat::Raw => "raw",
        }
    }
}

impl fmt::Display for DiskFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-supplied extra `qemu-img` arguments, one list per subcommand.
///
/// Backing-file creation goes through `qemu-img create` and therefore uses `create`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QemuImgArgs {
    pub create: Vec<String>,
    pub convert: Vec<String>,
    pub resize: Vec<String>,
}

/// Where the source-derived disks come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskSources {
    /// One image (or install medium) used as-is.
    Single(PathBuf),
    /// Several disks extracted into `dir`, in boot order.
    Many { dir: PathBuf, disks: Vec<String> },
}

impl DiskSources {
    /// Source paths in plan order.
    pub fn paths(&self) -> Vec<PathBuf> {
        match self {
            DiskSources::Single(path) => vec![path.clone()],
            DiskSources::Many { dir, disks } => disks.iter().map(|d| dir.join(d)).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub vm_name: String,
    pub output_directory: Option<PathBuf>,
    pub format: DiskFormat,
    pub disk_size: String,
    pub disk_additional_size: Vec<String>,
    /// Source is an existing disk image rather than an install medium.
    pub disk_image: bool,
    pub use_backing_file: bool,
    pub skip_resize_disk: bool,
    pub disk_compression: bool,
    pub source_path: Option<PathBuf>,
    pub many_disks: bool,
    pub disks_order: Vec<String>,
    pub qemu_img_args: QemuImgArgs,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            vm_name: String::new(),
            output_directory: None,
            format: DiskFormat::default(),
            disk_size: DEFAULT_DISK_SIZE.to_string(),
            disk_additional_size: Vec::new(),
            disk_image: false,
            use_backing_file: false,
            skip_resize_disk: false,
            disk_compression: false,
            source_path: None,
            many_disks: false,
            disks_order: Vec::new(),
            qemu_img_args: QemuImgArgs::default(),
        }
    }
}

impl BuildConfig {
    /// Read a JSON config file. Call [`sanitize`](Self::sanitize) once all overrides are applied.
    pub fn from_file(path: &Path) -> QemuDiskResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| QemuDiskError::Io {
            context: format!("reading config {}", path.display()),
            source: e,
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            QemuDiskError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Reject configurations the disk steps cannot act on.
    pub fn sanitize(&self) -> QemuDiskResult<()> {
        if self.vm_name.is_empty() {
            return Err(QemuDiskError::Config("vm_name must not be empty".into()));
        }
        if self.vm_name.contains(std::path::MAIN_SEPARATOR) || self.vm_name.contains('/') {
            return Err(QemuDiskError::Config(format!(
                "vm_name must not contain a path separator: {}",
                self.vm_name
            )));
        }

        parse_size(&self.disk_size)?;
        for size in &self.disk_additional_size {
            parse_size(size)?;
        }

        if self.use_backing_file && !(self.disk_image && self.format == DiskFormat::Qcow2) {
            return Err(QemuDiskError::Config(
                "use_backing_file can only be enabled for QCOW2 images and when disk_image is true"
                    .into(),
            ));
        }

        if self.disk_image && self.source_path.is_none() {
            return Err(QemuDiskError::Config(
                "disk_image requires source_path".into(),
            ));
        }

        Ok(())
    }

    /// Typed view of `source_path` / `many_disks` / `disks_order`.
    pub fn disk_sources(&self) -> DiskSources {
        let source = self.source_path.clone().unwrap_or_default();
        if self.many_disks {
            DiskSources::Many {
                dir: source,
                disks: self.disks_order.clone(),
            }
        } else {
            DiskSources::Single(source)
        }
    }
}

/// Parse a `qemu-img` style size (`"10G"`, `"1.5G"`, `"512M"`, `"1024"`) into bytes.
///
/// Binary units; one optional trailing `B` is accepted (`"10GB"`). Zero is rejected.
pub fn parse_size(s: &str) -> QemuDiskResult<u64> {
    let s = s.trim();
    if s.is_empty() {
        return Err(QemuDiskError::InvalidArgument(
            "size cannot be empty".into(),
        ));
    }

    let (num_str, suffix) = match s.find(|c: char| c.is_ascii_alphabetic()) {
        Some(i) => (&s[..i], s[i..].to_ascii_uppercase()),
        None => (s, String::new()),
    };

    let invalid_number =
        || QemuDiskError::InvalidArgument(format!("invalid size number: '{num_str}'"));
    let (int_part, frac_part) = num_str.split_once('.').unwrap_or((num_str, ""));
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty()
        || !all_digits(int_part)
        || !all_digits(frac_part)
        || (num_str.contains('.') && frac_part.is_empty())
        || frac_part.len() > 18
    {
        return Err(invalid_number());
    }
    let int: u128 = int_part.parse().map_err(|_| invalid_number())?;
    let frac: u128 = if frac_part.is_empty() {
        0
    } else {
        frac_part.parse().map_err(|_| invalid_number())?
    };

    let shift = match suffix.strip_suffix('B').unwrap_or(suffix.as_str()) {
        "" => 0,
        "K" => 10,
        "M" => 20,
        "G" => 30,
        "T" => 40,
        "P" => 50,
        "E" => 60,
        _ => {
            return Err(QemuDiskError::InvalidArgument(format!(
                "unknown size suffix: '{suffix}' (use K, M, G, T, P or E)"
            )));
        }
    };

    let overflow = || QemuDiskError::InvalidArgument(format!("size overflows: '{s}'"));
    let scale = 10u128.pow(frac_part.len() as u32);
    let bytes = int
        .checked_mul(scale)
        .and_then(|n| n.checked_add(frac))
        .and_then(|n| n.checked_mul(1u128 << shift))
        .map(|n| n / scale)
        .ok_or_else(overflow)?;
    let bytes = u64::try_from(bytes).map_err(|_| overflow())?;

    if bytes == 0 {
        return Err(QemuDiskError::InvalidArgument(format!(
            "size must be greater than zero: '{s}'"
        )));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> BuildConfig {
        BuildConfig {
            vm_name: "target".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config: BuildConfig = serde_json::from_str(r#"{"vm_name": "target"}"#).unwrap();
        assert_eq!(config.format, DiskFormat::Qcow2);
        assert_eq!(config.disk_size, DEFAULT_DISK_SIZE);
        assert!(!config.disk_image);
        assert!(config.qemu_img_args.convert.is_empty());
        assert!(config.sanitize().is_ok());
    }

    #[test]
    fn test_deserialize_full() {
        let config: BuildConfig = serde_json::from_str(
            r#"{
                "vm_name": "target",
                "output_directory": "output",
                "format": "raw",
                "disk_size": "4M",
                "disk_additional_size": ["3M", "8M"],
                "qemu_img_args": { "create": ["-o", "preallocation=full"] }
            }"#,
        )
        .unwrap();
        assert_eq!(config.format, DiskFormat::Raw);
        assert_eq!(config.output_directory, Some(PathBuf::from("output")));
        assert_eq!(config.disk_additional_size, vec!["3M", "8M"]);
        assert_eq!(config.qemu_img_args.create, vec!["-o", "preallocation=full"]);
        assert!(config.qemu_img_args.resize.is_empty());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.json");
        std::fs::write(&path, r#"{"vm_name": "target", "disk_image": true}"#).unwrap();

        let config = BuildConfig::from_file(&path).unwrap();
        assert!(config.disk_image);
        // source_path is still missing; that is sanitize's call, not the loader's
        assert!(config.sanitize().is_err());
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = BuildConfig::from_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(missing, QemuDiskError::Io { .. }));

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let broken = BuildConfig::from_file(&path).unwrap_err();
        assert!(matches!(broken, QemuDiskError::Config(_)));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result: Result<BuildConfig, _> =
            serde_json::from_str(r#"{"vm_name": "target", "format": "vmdk"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_sanitize_rejects_empty_name() {
        let config = BuildConfig::default();
        let err = config.sanitize().unwrap_err();
        assert!(err.to_string().contains("vm_name"));
    }

    #[test]
    fn test_sanitize_rejects_name_with_separator() {
        let config = BuildConfig {
            vm_name: "a/b".into(),
            ..Default::default()
        };
        assert!(config.sanitize().is_err());
    }

    #[test]
    fn test_sanitize_backing_requires_qcow2_disk_image() {
        let mut config = valid_config();
        config.use_backing_file = true;
        assert!(config.sanitize().is_err());

        config.disk_image = true;
        config.source_path = Some(PathBuf::from("source.qcow2"));
        assert!(config.sanitize().is_ok());

        config.format = DiskFormat::Raw;
        let err = config.sanitize().unwrap_err();
        assert!(err.to_string().contains("use_backing_file"));
    }

    #[test]
    fn test_sanitize_disk_image_requires_source() {
        let mut config = valid_config();
        config.disk_image = true;
        assert!(config.sanitize().is_err());
    }

    #[test]
    fn test_sanitize_rejects_bad_sizes() {
        let mut config = valid_config();
        config.disk_additional_size = vec!["3M".into(), "lots".into()];
        assert!(config.sanitize().is_err());

        config.disk_additional_size.clear();
        config.disk_size = "10X".into();
        assert!(config.sanitize().is_err());

        for size in ["10GBB", "0"] {
            config.disk_size = size.into();
            assert!(config.sanitize().is_err(), "{size} should be rejected");
        }
    }

    #[test]
    fn test_sanitize_accepts_decimal_sizes() {
        let config = BuildConfig {
            disk_size: "1.5G".into(),
            disk_additional_size: vec!["0.5G".into()],
            ..valid_config()
        };
        assert!(config.sanitize().is_ok());
    }

    #[test]
    fn test_disk_sources_single() {
        let mut config = valid_config();
        config.source_path = Some(PathBuf::from("source.qcow2"));
        let sources = config.disk_sources();
        assert_eq!(sources, DiskSources::Single(PathBuf::from("source.qcow2")));
        assert_eq!(sources.paths(), vec![PathBuf::from("source.qcow2")]);
    }

    #[test]
    fn test_disk_sources_many_joins_dir() {
        let mut config = valid_config();
        config.source_path = Some(PathBuf::from("output_archive"));
        config.many_disks = true;
        config.disks_order = vec!["source0.qcow2".into(), "source1.qcow2".into()];

        assert_eq!(
            config.disk_sources().paths(),
            vec![
                PathBuf::from("output_archive/source0.qcow2"),
                PathBuf::from("output_archive/source1.qcow2"),
            ]
        );
    }

    #[test]
    fn test_disk_sources_many_empty() {
        let mut config = valid_config();
        config.many_disks = true;
        assert!(config.disk_sources().paths().is_empty());
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("100K").unwrap(), 100 * 1024);
        assert_eq!(parse_size("512m").unwrap(), 512 * 1024 * 1024);
        assert_eq!(parse_size("20G").unwrap(), 20 * 1024 * 1024 * 1024);
        assert_eq!(parse_size("1GB").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_size("10B").unwrap(), 10);
    }

    #[test]
    fn test_parse_size_decimal() {
        assert_eq!(parse_size("1.5G").unwrap(), 1536 * 1024 * 1024);
        assert_eq!(parse_size("0.5K").unwrap(), 512);
        assert_eq!(parse_size("2.25M").unwrap(), 2304 * 1024);
        assert!(parse_size("1.G").is_err());
        assert!(parse_size(".5G").is_err());
        assert!(parse_size("1.2.3G").is_err());
    }

    #[test]
    fn test_parse_size_single_byte_suffix() {
        assert!(parse_size("10GB").is_ok());
        assert!(parse_size("10GBB").is_err());
        assert!(parse_size("10BB").is_err());
    }

    #[test]
    fn test_parse_size_rejects_zero() {
        assert!(parse_size("0").is_err());
        assert!(parse_size("0G").is_err());
        assert!(parse_size("0.0M").is_err());
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        assert!(parse_size("").is_err());
        assert!(parse_size("G").is_err());
        assert!(parse_size("10X").is_err());
        assert!(parse_size("99999999999E").is_err());
    }
}
