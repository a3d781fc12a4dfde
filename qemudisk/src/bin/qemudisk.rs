//! Provision the disks for a QEMU build from a JSON config.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use qemudisk::{BuildConfig, DiskBuild, Driver, LoggingOptions, QemuImgDriver, RecordingDriver};

#[derive(Debug, Parser)]
#[command(name = "qemudisk", version, about = "Create and resize the disks of a QEMU image build")]
struct Args {
    /// Build configuration (JSON)
    #[arg(long, short)]
    config: PathBuf,

    /// Source image, or the directory holding extracted disks when `many_disks` is set
    #[arg(long)]
    source: Option<PathBuf>,

    /// Print the commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _guard = match qemudisk::init_logging(&LoggingOptions {
        level: args.log_level.clone(),
        log_dir: args.log_dir.clone(),
        ..Default::default()
    }) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = BuildConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(source) = args.source {
        config.source_path = Some(source);
    }
    let sources = config.disk_sources();

    if args.dry_run {
        let recorder = Arc::new(RecordingDriver::new());
        let driver: Arc<dyn Driver> = recorder.clone();
        let output = DiskBuild::new(config, sources, driver)?.run().await?;
        for call in recorder.calls() {
            println!("{}", call.render());
        }
        tracing::info!(disks = output.disk_paths.len(), "Dry run finished");
        return Ok(());
    }

    let qemu_img = QemuImgDriver::new();
    if !qemu_img.is_available().await {
        anyhow::bail!(
            "qemu-img is required but not found. Install it via: apt install qemu-utils \
             (Debian/Ubuntu), dnf install qemu-img (Fedora/RHEL), or brew install qemu (macOS)."
        );
    }

    let output = DiskBuild::new(config, sources, Arc::new(qemu_img))?
        .run()
        .await?;
    for path in &output.disk_paths {
        println!("{}", path.display());
    }
    Ok(())
}
