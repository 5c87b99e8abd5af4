use anyhow::Context;
use clap::Parser;
use checksum_injector::cli::Cli;
use checksum_injector::injector;
use std::io::{self, Read, Write};
use std::process;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    cli.init_logging();

    // Mode errors must surface before any input is consumed
    let mode = cli.resolve_mode()?;
    log::debug!("Injecting checksums as {}s", mode);

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read manifests from stdin")?;

    let result = injector::process(&input, mode)?;
    if result.summary.skipped > 0 {
        log::warn!(
            "{} Deployment(s) could not be updated",
            result.summary.skipped
        );
    }

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(result.output.as_bytes())
        .and_then(|_| stdout.flush())
        .context("Failed to write manifests to stdout")?;
    Ok(())
}
