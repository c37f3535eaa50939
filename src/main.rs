//! zipfs mount binary.
//!
//! Usage:
//!   zipfs archive.zip /mnt/zip
//!   zipfs archive.zip /mnt/zip --read-only --allow-other
//!   RUST_LOG=zipfs=trace zipfs archive.zip /mnt/zip

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt};

use zipfs::fuse::{MountOptions, mount};
use zipfs::{Compression, ZipFs, ZipFsOptions};

/// Mount a ZIP archive as a read-write filesystem.
#[derive(Parser, Debug)]
#[command(name = "zipfs", version)]
#[command(about = "Mount a ZIP archive as a read-write filesystem")]
struct Args {
    /// ZIP archive to mount (created on first write if missing)
    archive: PathBuf,

    /// Directory to mount the archive on
    mountpoint: PathBuf,

    /// Reject every modification
    #[arg(short, long)]
    read_only: bool,

    /// Allow other users to access the mount
    #[arg(long)]
    allow_other: bool,

    /// Keep the mount after the process exits
    #[arg(long)]
    no_auto_unmount: bool,

    /// Filesystem name shown in mount output
    #[arg(long, default_value = "zipfs")]
    fsname: String,

    /// Compression for entries written through the mount
    #[arg(long, value_enum, default_value_t = CompressionArg::Deflated)]
    compression: CompressionArg,

    /// Attribute cache TTL in seconds
    #[arg(long, default_value_t = 1)]
    ttl: u64,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CompressionArg {
    Stored,
    Deflated,
}

impl From<CompressionArg> for Compression {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::Stored => Compression::Stored,
            CompressionArg::Deflated => Compression::Deflated,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = ZipFsOptions::default()
        .read_only(args.read_only)
        .compression(args.compression.into());
    let fs = match ZipFs::with_options(&args.archive, options) {
        Ok(fs) => fs,
        Err(e) => {
            tracing::error!(archive = %args.archive.display(), error = %e, "cannot open archive");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(archive = %fs.archive_path().display(), read_only = args.read_only, "archive opened");

    let mount_options = MountOptions {
        fsname: args.fsname,
        read_only: args.read_only,
        allow_other: args.allow_other,
        auto_unmount: !args.no_auto_unmount,
        ttl: Duration::from_secs(args.ttl),
    };
    match mount(fs, &args.mountpoint, &mount_options) {
        Ok(()) => {
            tracing::info!("zipfs shutting down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(mountpoint = %args.mountpoint.display(), error = %e, "mount failed");
            ExitCode::FAILURE
        }
    }
}
