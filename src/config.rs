use crate::error::{Error, Result};
use crate::frame::MAX_PAYLOAD_SIZE;

use pnet::util::MacAddr;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::{Duration, Instant};

/// Above this rate the whole-microsecond delay between two packets would be zero.
pub const MAX_PPS: u32 = 1_000_000;

const DEFAULT_INTERFACE: &str = "eth0";
const DEFAULT_DST_IP: Ipv4Addr = Ipv4Addr::BROADCAST;
const DEFAULT_SRC_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 2);
const DEFAULT_DST_PORT: u16 = 8125;
const DEFAULT_SRC_PORT: u16 = 12345;
const DEFAULT_PPS: u32 = 1000;
const DEFAULT_PAYLOAD_SIZE: usize = 1400;
const DEFAULT_REPORT_SECS: u64 = 1;

/// Target packet rate and the pause it implies between two sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateConfig {
    pps: u32,
    delay: Duration,
}

impl RateConfig {
    pub fn new(pps: u32) -> Result<Self> {
        if pps == 0 {
            return Err(Error::InvalidRate(pps));
        }
        if pps > MAX_PPS {
            return Err(Error::RateTooHigh(pps));
        }
        Ok(RateConfig {
            pps,
            delay: Duration::from_micros(1_000_000 / pps as u64),
        })
    }

    pub fn pps(&self) -> u32 {
        self.pps
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// The optional time limit of a run. The end instant is fixed once computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunWindow {
    end: Option<Instant>,
}

impl RunWindow {
    /// A zero duration means the run is unbounded.
    pub fn new(start: Instant, duration: Duration) -> Self {
        RunWindow {
            end: (!duration.is_zero()).then(|| start + duration),
        }
    }

    pub fn unbounded() -> Self {
        RunWindow { end: None }
    }

    pub fn end(&self) -> Option<Instant> {
        self.end
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.end.is_some_and(|end| now > end)
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
        .transpose()
}

fn parse_report_interval(secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(Error::InvalidInterval(secs));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_mac(s: &str) -> Result<MacAddr> {
    s.parse().map_err(|_| Error::InvalidMac(s.to_string()))
}

// Options of the sender, from the command line or the `[send]` table.
// (not a doc comment: clap would use it as the subcommand about)
#[derive(Debug, Clone, Default, clap::Args, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendOptions {
    #[arg(short, long, help = "Network interface to use [default: eth0]")]
    pub interface: Option<String>,
    #[arg(long, help = "Destination MAC address [default: broadcast]")]
    pub dst_mac: Option<String>,
    #[arg(long, help = "Source MAC address [default: the address of the interface]")]
    pub src_mac: Option<String>,
    #[arg(long, help = "Destination IPv4 address [default: 255.255.255.255]")]
    pub dst_ip: Option<Ipv4Addr>,
    #[arg(long, help = "Source IPv4 address [default: 192.168.1.2]")]
    pub src_ip: Option<Ipv4Addr>,
    #[arg(long, help = "Destination UDP port [default: 8125]")]
    pub dst_port: Option<u16>,
    #[arg(long, help = "Source UDP port [default: 12345]")]
    pub src_port: Option<u16>,
    #[arg(short = 'r', long, help = "Packets per second to send [default: 1000]")]
    pub pps: Option<u32>,
    #[arg(short, long, help = "Payload size in bytes [default: 1400]")]
    pub size: Option<usize>,
    #[arg(short, long, value_parser = humantime::parse_duration, help = "Duration to send, such as \"30s\" or \"1h 5min\". 0 sends until interrupted [default: 0]")]
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub duration: Option<Duration>,
    #[arg(long, help = "Reporting interval in seconds [default: 1]")]
    pub report: Option<u64>,
    #[arg(long, help = "Seed for the payload filler")]
    pub seed: Option<u64>,
}

// Options of the monitor, from the command line or the `[monitor]` table.
#[derive(Debug, Clone, Default, clap::Args, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorOptions {
    #[arg(short, long, help = "Network interface to listen on [default: eth0]")]
    pub interface: Option<String>,
    #[arg(short, long, help = "UDP port to listen for [default: 8125]")]
    pub port: Option<u16>,
    #[arg(long, default_value_t = false, help = "Do not put the interface in promiscuous mode")]
    #[serde(default)]
    pub no_promisc: bool,
    #[arg(short, long, value_parser = humantime::parse_duration, help = "Duration to listen. 0 listens until interrupted [default: 0]")]
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub duration: Option<Duration>,
    #[arg(long, help = "Reporting interval in seconds [default: 1]")]
    pub report: Option<u64>,
}

/// Content of a configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub send: SendOptions,
    #[serde(default)]
    pub monitor: MonitorOptions,
}

pub fn import_config(config: &str) -> Result<FileConfig> {
    Ok(toml::from_str(config)?)
}

pub fn load_config(path: impl AsRef<Path>) -> Result<FileConfig> {
    import_config(&fs::read_to_string(path)?)
}

/// Fully validated sender configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SendConfig {
    pub interface: String,
    pub dst_mac: MacAddr,
    /// `None` means: use the address of the interface
    pub src_mac: Option<MacAddr>,
    pub dst_ip: Ipv4Addr,
    pub src_ip: Ipv4Addr,
    pub dst_port: u16,
    pub src_port: u16,
    pub rate: RateConfig,
    pub payload_size: usize,
    pub duration: Duration,
    pub report_interval: Duration,
    pub seed: Option<u64>,
}

impl SendOptions {
    /// Fill the options missing in `self` with the ones of `fallback`.
    pub fn or(self, fallback: SendOptions) -> SendOptions {
        SendOptions {
            interface: self.interface.or(fallback.interface),
            dst_mac: self.dst_mac.or(fallback.dst_mac),
            src_mac: self.src_mac.or(fallback.src_mac),
            dst_ip: self.dst_ip.or(fallback.dst_ip),
            src_ip: self.src_ip.or(fallback.src_ip),
            dst_port: self.dst_port.or(fallback.dst_port),
            src_port: self.src_port.or(fallback.src_port),
            pps: self.pps.or(fallback.pps),
            size: self.size.or(fallback.size),
            duration: self.duration.or(fallback.duration),
            report: self.report.or(fallback.report),
            seed: self.seed.or(fallback.seed),
        }
    }

    /// Apply the defaults and check every value.
    pub fn resolve(self) -> Result<SendConfig> {
        let payload_size = self.size.unwrap_or(DEFAULT_PAYLOAD_SIZE);
        if payload_size > MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: payload_size,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(SendConfig {
            interface: self
                .interface
                .unwrap_or_else(|| DEFAULT_INTERFACE.to_string()),
            dst_mac: self
                .dst_mac
                .as_deref()
                .map(parse_mac)
                .transpose()?
                .unwrap_or_else(MacAddr::broadcast),
            src_mac: self.src_mac.as_deref().map(parse_mac).transpose()?,
            dst_ip: self.dst_ip.unwrap_or(DEFAULT_DST_IP),
            src_ip: self.src_ip.unwrap_or(DEFAULT_SRC_IP),
            dst_port: self.dst_port.unwrap_or(DEFAULT_DST_PORT),
            src_port: self.src_port.unwrap_or(DEFAULT_SRC_PORT),
            rate: RateConfig::new(self.pps.unwrap_or(DEFAULT_PPS))?,
            payload_size,
            duration: self.duration.unwrap_or_default(),
            report_interval: parse_report_interval(self.report.unwrap_or(DEFAULT_REPORT_SECS))?,
            seed: self.seed,
        })
    }
}

/// Fully validated monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub interface: String,
    pub port: u16,
    pub promisc: bool,
    pub duration: Duration,
    pub report_interval: Duration,
}

impl MonitorOptions {
    pub fn or(self, fallback: MonitorOptions) -> MonitorOptions {
        MonitorOptions {
            interface: self.interface.or(fallback.interface),
            port: self.port.or(fallback.port),
            no_promisc: self.no_promisc || fallback.no_promisc,
            duration: self.duration.or(fallback.duration),
            report: self.report.or(fallback.report),
        }
    }

    pub fn resolve(self) -> Result<MonitorConfig> {
        Ok(MonitorConfig {
            interface: self
                .interface
                .unwrap_or_else(|| DEFAULT_INTERFACE.to_string()),
            port: self.port.unwrap_or(DEFAULT_DST_PORT),
            promisc: !self.no_promisc,
            duration: self.duration.unwrap_or_default(),
            report_interval: parse_report_interval(self.report.unwrap_or(DEFAULT_REPORT_SECS))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rate_delay() {
        assert_eq!(RateConfig::new(1000).unwrap().delay(), Duration::from_micros(1000));
        assert_eq!(RateConfig::new(1).unwrap().delay(), Duration::from_secs(1));
        assert_eq!(RateConfig::new(3).unwrap().delay(), Duration::from_micros(333_333));
        assert_eq!(
            RateConfig::new(MAX_PPS).unwrap().delay(),
            Duration::from_micros(1)
        );
    }

    #[test]
    fn invalid_rates() {
        assert!(matches!(RateConfig::new(0), Err(Error::InvalidRate(0))));
        assert!(matches!(
            RateConfig::new(MAX_PPS + 1),
            Err(Error::RateTooHigh(_))
        ));
    }

    proptest! {
        #[test]
        fn delay_is_the_reciprocal_of_the_rate(pps in 1..=MAX_PPS) {
            let rate = RateConfig::new(pps).unwrap();
            prop_assert_eq!(rate.delay().as_micros(), 1_000_000 / pps as u128);
            prop_assert!(!rate.delay().is_zero());
        }
    }

    #[test]
    fn zero_window_is_unbounded() {
        let start = Instant::now();
        let window = RunWindow::new(start, Duration::ZERO);
        assert_eq!(window, RunWindow::unbounded());
        assert!(!window.is_expired(start + Duration::from_secs(3600 * 24 * 365)));
    }

    #[test]
    fn window_expiry() {
        let start = Instant::now();
        let window = RunWindow::new(start, Duration::from_secs(2));
        assert_eq!(window.end(), Some(start + Duration::from_secs(2)));
        assert!(!window.is_expired(start + Duration::from_secs(1)));
        assert!(!window.is_expired(start + Duration::from_secs(2)));
        assert!(window.is_expired(start + Duration::from_millis(2001)));
    }

    #[test]
    fn send_defaults() {
        let config = SendOptions::default().resolve().unwrap();
        assert_eq!(config.interface, "eth0");
        assert_eq!(config.dst_mac, MacAddr::broadcast());
        assert_eq!(config.src_mac, None);
        assert_eq!(config.dst_ip, Ipv4Addr::new(255, 255, 255, 255));
        assert_eq!(config.src_ip, Ipv4Addr::new(192, 168, 1, 2));
        assert_eq!(config.dst_port, 8125);
        assert_eq!(config.src_port, 12345);
        assert_eq!(config.rate.pps(), 1000);
        assert_eq!(config.payload_size, 1400);
        assert_eq!(config.duration, Duration::ZERO);
        assert_eq!(config.report_interval, Duration::from_secs(1));
    }

    #[test]
    fn invalid_send_options() {
        let options = SendOptions {
            pps: Some(0),
            ..Default::default()
        };
        assert!(matches!(options.resolve(), Err(Error::InvalidRate(0))));

        let options = SendOptions {
            dst_mac: Some("not-a-mac".into()),
            ..Default::default()
        };
        assert!(matches!(options.resolve(), Err(Error::InvalidMac(_))));

        let options = SendOptions {
            report: Some(0),
            ..Default::default()
        };
        assert!(matches!(options.resolve(), Err(Error::InvalidInterval(0))));

        let options = SendOptions {
            size: Some(70_000),
            ..Default::default()
        };
        assert!(matches!(
            options.resolve(),
            Err(Error::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn command_line_overrides_file() {
        let file = import_config(
            r#"
[send]
interface = "veth0"
dst_mac = "02:00:00:00:00:02"
dst_ip = "10.0.0.2"
pps = 50
duration = "2s"
seed = 3

[monitor]
port = 9000
no_promisc = true
"#,
        )
        .unwrap();
        let cli = SendOptions {
            pps: Some(200),
            ..Default::default()
        };
        let config = cli.or(file.send).resolve().unwrap();
        assert_eq!(config.interface, "veth0");
        assert_eq!(config.dst_mac, MacAddr::new(2, 0, 0, 0, 0, 2));
        assert_eq!(config.dst_ip, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(config.rate.pps(), 200);
        assert_eq!(config.duration, Duration::from_secs(2));
        assert_eq!(config.seed, Some(3));

        let monitor = MonitorOptions::default().or(file.monitor).resolve().unwrap();
        assert_eq!(monitor.port, 9000);
        assert!(!monitor.promisc);
        assert_eq!(monitor.interface, "eth0");
    }

    #[test]
    fn ill_formed_files() {
        assert!(matches!(
            import_config("[send]\nspeed = 3\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            import_config("[send]\nduration = \"forever\"\n"),
            Err(Error::Config(_))
        ));
        assert!(import_config("").is_ok());
    }
}
