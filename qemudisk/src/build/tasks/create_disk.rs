//! Task: Disk creation.
//!
//! Plans one action per source disk plus one per additional disk, then runs them
//! through the driver. The attempted paths are published even when the task halts.

use super::{BuildCtx, log_task_error, task_start};
use crate::build::types::{CreateDiskInput, CreateDiskOutput};
use crate::disk::{ActionPlanner, DiskProvisioner, PlanPolicy};
use crate::errors::QemuDiskResult;
use crate::pipeline::PipelineTask;
use async_trait::async_trait;

pub struct CreateDiskTask;

#[async_trait]
impl PipelineTask<BuildCtx> for CreateDiskTask {
    async fn run(self: Box<Self>, ctx: BuildCtx) -> QemuDiskResult<()> {
        let task_name = self.name();
        let vm_name = task_start(&ctx, task_name).await;

        let (policy, sources, additional_sizes, driver) = {
            let ctx = ctx.lock().await;
            (
                PlanPolicy::from_config(&ctx.config),
                ctx.sources.paths(),
                ctx.config.disk_additional_size.clone(),
                ctx.driver.clone(),
            )
        };

        tracing::info!(vm_name = %vm_name, "Creating required virtual machine disks");
        let (output, result) = run_create_disk(CreateDiskInput {
            policy,
            sources: &sources,
            additional_sizes: &additional_sizes,
            driver: driver.as_ref(),
        })
        .await;

        let mut ctx = ctx.lock().await;
        ctx.disk_output = Some(output);
        if let Err(e) = &result {
            log_task_error(&vm_name, task_name, e);
            ctx.record_error(e);
        }

        result
    }

    fn name(&self) -> &str {
        "create_disk"
    }
}

/// Plan and provision every disk.
///
/// Returns the attempted paths alongside the outcome so a halted run still reports
/// which disks it got to.
async fn run_create_disk(input: CreateDiskInput<'_>) -> (CreateDiskOutput, QemuDiskResult<()>) {
    let plan = ActionPlanner::new(input.policy).plan(input.sources, input.additional_sizes);

    let mut provisioner = DiskProvisioner::new(input.driver);
    let result = provisioner.run(plan).await;

    let output = CreateDiskOutput {
        disk_paths: provisioner.into_paths(),
    };
    (output, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::types::BuildPipelineContext;
    use crate::config::{BuildConfig, DiskFormat, DiskSources};
    use crate::disk::{RecordedCall, RecordingDriver};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn config() -> BuildConfig {
        BuildConfig {
            vm_name: "target".into(),
            format: DiskFormat::Qcow2,
            disk_size: "4M".into(),
            ..Default::default()
        }
    }

    fn ctx(config: BuildConfig, sources: DiskSources, driver: Arc<RecordingDriver>) -> BuildCtx {
        Arc::new(Mutex::new(BuildPipelineContext::new(config, sources, driver)))
    }

    fn qemu(args: &[&str]) -> RecordedCall {
        RecordedCall::QemuImg(args.iter().map(|s| s.to_string()).collect())
    }

    async fn run(config: BuildConfig, sources: DiskSources) -> (Arc<RecordingDriver>, BuildCtx) {
        let driver = Arc::new(RecordingDriver::new());
        let ctx = ctx(config, sources, Arc::clone(&driver));
        Box::new(CreateDiskTask).run(Arc::clone(&ctx)).await.unwrap();
        (driver, ctx)
    }

    fn archive(disks: &[&str]) -> DiskSources {
        DiskSources::Many {
            dir: PathBuf::from("output_archive"),
            disks: disks.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_backing_with_output_dir() {
        let config = BuildConfig {
            disk_image: true,
            use_backing_file: true,
            output_directory: Some(PathBuf::from("output")),
            ..config()
        };
        let (driver, ctx) = run(config, DiskSources::Single("source.qcow2".into())).await;

        assert_eq!(
            driver.calls(),
            vec![qemu(&["create", "-f", "qcow2", "-b", "source.qcow2", "output/target-0"])]
        );
        let ctx = ctx.lock().await;
        assert_eq!(
            ctx.disk_output.as_ref().unwrap().disk_paths,
            vec![PathBuf::from("output/target-0")]
        );
        assert!(ctx.error.is_none());
    }

    #[tokio::test]
    async fn test_install_media_creates_raw_disk() {
        let config = BuildConfig {
            format: DiskFormat::Raw,
            ..config()
        };
        let (driver, _) = run(config, DiskSources::Single("install.iso".into())).await;

        assert_eq!(
            driver.calls(),
            vec![qemu(&["create", "-f", "raw", "target-0", "4M"])]
        );
    }

    #[tokio::test]
    async fn test_copy_then_additional_disks() {
        let config = BuildConfig {
            disk_image: true,
            disk_additional_size: vec!["3M".into(), "8M".into()],
            ..config()
        };
        let (driver, ctx) = run(config, DiskSources::Single("source.qcow2".into())).await;

        assert_eq!(
            driver.copy_calls(),
            vec![(PathBuf::from("source.qcow2"), PathBuf::from("target-0"))]
        );
        assert_eq!(
            driver.qemu_img_calls(),
            vec![
                vec!["create", "-f", "qcow2", "target-1", "3M"],
                vec!["create", "-f", "qcow2", "target-2", "8M"],
            ]
        );
        assert_eq!(ctx.lock().await.disk_output.as_ref().unwrap().disk_paths.len(), 3);
    }

    #[tokio::test]
    async fn test_many_disks_backing_and_additional() {
        let config = BuildConfig {
            disk_image: true,
            use_backing_file: true,
            disk_additional_size: vec!["3M".into(), "8M".into()],
            ..config()
        };
        let sources = archive(&[
            "source0.qcow2.extract",
            "source1.qcow2.extract",
            "source2.qcow2.extract",
        ]);
        let (driver, _) = run(config, sources).await;

        assert_eq!(
            driver.calls(),
            vec![
                qemu(&["create", "-f", "qcow2", "-b", "output_archive/source0.qcow2.extract", "target-0"]),
                qemu(&["create", "-f", "qcow2", "-b", "output_archive/source1.qcow2.extract", "target-1"]),
                qemu(&["create", "-f", "qcow2", "-b", "output_archive/source2.qcow2.extract", "target-2"]),
                qemu(&["create", "-f", "qcow2", "target-3", "3M"]),
                qemu(&["create", "-f", "qcow2", "target-4", "8M"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_many_disks_convert_with_output_dir() {
        let config = BuildConfig {
            disk_image: true,
            output_directory: Some(PathBuf::from("output")),
            disk_additional_size: vec!["3M".into(), "8M".into()],
            ..config()
        };
        let (driver, _) = run(config, archive(&["source0.qcow2.extract"])).await;

        assert_eq!(
            driver.calls(),
            vec![
                qemu(&["convert", "-O", "qcow2", "output_archive/source0.qcow2.extract", "output/target-0"]),
                qemu(&["create", "-f", "qcow2", "output/target-1", "3M"]),
                qemu(&["create", "-f", "qcow2", "output/target-2", "8M"]),
            ]
        );
    }

    #[tokio::test]
    async fn test_many_disks_all_copied() {
        let config = BuildConfig {
            disk_image: true,
            output_directory: Some(PathBuf::from("output")),
            ..config()
        };
        let (driver, _) = run(
            config,
            archive(&["source0.qcow2", "source1.qcow2", "source2.qcow2"]),
        )
        .await;

        assert!(driver.qemu_img_calls().is_empty());
        assert_eq!(
            driver.copy_calls(),
            vec![
                (PathBuf::from("output_archive/source0.qcow2"), PathBuf::from("output/target-0")),
                (PathBuf::from("output_archive/source1.qcow2"), PathBuf::from("output/target-1")),
                (PathBuf::from("output_archive/source2.qcow2"), PathBuf::from("output/target-2")),
            ]
        );
    }

    #[tokio::test]
    async fn test_many_disks_not_from_image() {
        let config = BuildConfig {
            format: DiskFormat::Raw,
            ..config()
        };
        let (driver, _) = run(config, archive(&["source.qcow2.extract"])).await;

        assert_eq!(
            driver.calls(),
            vec![qemu(&["create", "-f", "raw", "target-0", "4M"])]
        );
    }

    #[tokio::test]
    async fn test_no_disks_is_a_no_op() {
        let (driver, ctx) = run(config(), archive(&[])).await;
        assert!(driver.calls().is_empty());
        assert_eq!(
            ctx.lock().await.disk_output,
            Some(CreateDiskOutput::default())
        );
    }

    #[tokio::test]
    async fn test_halt_publishes_attempted_paths() {
        let config = BuildConfig {
            disk_additional_size: vec!["3M".into(), "8M".into(), "9M".into()],
            ..config()
        };
        let driver = Arc::new(RecordingDriver::failing_at(1));
        let ctx = ctx(config, DiskSources::Single("install.iso".into()), Arc::clone(&driver));

        let err = Box::new(CreateDiskTask)
            .run(Arc::clone(&ctx))
            .await
            .unwrap_err();

        assert_eq!(driver.calls().len(), 2);
        let ctx = ctx.lock().await;
        assert_eq!(
            ctx.disk_output.as_ref().unwrap().disk_paths,
            vec![PathBuf::from("target-0"), PathBuf::from("target-1")]
        );
        assert_eq!(ctx.error.as_deref(), Some(err.to_string().as_str()));
        assert!(err.to_string().starts_with("error creating hard drive: "));
    }
}
