use thiserror::Error;

/// Everything that can go wrong in pktgen.
///
/// Configuration and device errors are fatal and reported before any worker starts.
/// `Serialize` and `Transmit` happen inside the send loop and are only logged there.
#[derive(Debug, Error)]
pub enum Error {
    #[error("packet rate must be a positive integer, got {0}")]
    InvalidRate(u32),
    #[error("packet rate {0} pps is above the maximum of {max} pps", max = crate::config::MAX_PPS)]
    RateTooHigh(u32),
    #[error("reporting interval must be at least 1 second, got {0}")]
    InvalidInterval(u64),
    #[error("invalid MAC address \"{0}\"")]
    InvalidMac(String),
    #[error("payload of {size} bytes does not fit in a UDP datagram (max {max})")]
    PayloadTooLarge { size: usize, max: usize },
    #[error("interface \"{0}\" not found (use \"pktgen devices\" to list them)")]
    UnknownInterface(String),
    #[error("interface \"{0}\" has no link-layer address")]
    NoLinkAddress(String),
    #[error("ill-formed configuration file: {0}")]
    Config(#[from] toml::de::Error),
    #[error("cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("device error: {0}")]
    Device(#[from] pcap::Error),
    #[error("cannot install the interrupt handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("cannot serialize frame: {0}")]
    Serialize(&'static str),
    #[error("failed to send packet: {0}")]
    Transmit(#[source] pcap::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
