use clap::Parser;
use std::path::PathBuf;

use crate::config;
use crate::error::Result;
use crate::injector::Mode;

#[derive(Parser, Debug)]
#[command(name = "checksum-injector")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inject ConfigMap and Secret checksums into Deployment pod templates")]
#[command(long_about = "Reads a stream of Kubernetes manifests on stdin, hashes every ConfigMap and Secret, and writes checksum/configmap-<name> and checksum/secret-<name> labels or annotations into the pod template of each Deployment that references them. The manifests are written back to stdout with their formatting and comments preserved.")]
pub struct Cli {
    /// Where to write checksums: pod template labels or annotations [default: label]
    #[arg(short, long, value_enum, env = "CHECKSUM_INJECTOR_MODE")]
    pub mode: Option<Mode>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .target(env_logger::Target::Stderr)
            .init();
    }

    /// Resolve the injection mode from the flag, the config file and the
    /// default, in that order.
    pub fn resolve_mode(&self) -> Result<Mode> {
        let file = self.config.as_deref().map(config::load_config).transpose()?;
        Ok(config::resolve_mode(self.mode, file.as_ref())?)
    }
}
