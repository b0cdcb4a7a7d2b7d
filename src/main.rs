use pktgen::config::{self, FileConfig};
use pktgen::device;
use pktgen::lifecycle;
mod cmd;

use std::process;

use clap::Parser;

fn load_file(path: Option<String>) -> pktgen::Result<FileConfig> {
    match path {
        Some(path) => {
            log::debug!("Loading configuration from {path}");
            config::load_config(path)
        }
        None => Ok(FileConfig::default()),
    }
}

fn run(args: cmd::Args) -> pktgen::Result<()> {
    match args.command {
        cmd::Command::Send { options, config } => {
            let config = options.or(load_file(config)?.send).resolve()?;
            let summary = lifecycle::send(config)?;
            println!("\n{summary}");
        }
        cmd::Command::Monitor { options, config } => {
            let config = options.or(load_file(config)?.monitor).resolve()?;
            let summary = lifecycle::monitor(config)?;
            println!("\n{summary}");
        }
        cmd::Command::Devices => device::list_devices()?,
    }
    Ok(())
}

/// The entry point of the application.
///
/// Configuration and device errors are fatal: they are logged and the process exits with a
/// non-zero status. A run stopped by Ctrl+C or by its duration exits normally.
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = cmd::Args::parse();

    if let Err(e) = run(args) {
        log::error!("{e}");
        process::exit(1);
    }
}
