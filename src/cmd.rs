use clap::{Parser, Subcommand};
use pktgen::config::{MonitorOptions, SendOptions};

#[derive(Debug, Parser, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Send UDP frames on an interface at a fixed packet rate
    Send {
        #[command(flatten)]
        options: SendOptions,
        #[arg(short, long, help = "Path to a TOML configuration file with a [send] table")]
        config: Option<String>,
    },
    /// Count the UDP traffic received on an interface
    Monitor {
        #[command(flatten)]
        options: MonitorOptions,
        #[arg(short, long, help = "Path to a TOML configuration file with a [monitor] table")]
        config: Option<String>,
    },
    /// List the available capture devices
    Devices,
}
