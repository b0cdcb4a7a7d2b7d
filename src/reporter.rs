use crate::signal::StopSignal;
use crate::stats::{mbps, megabytes, Counters, Stats};

use crossbeam_channel::{select, tick};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Which way the counted traffic goes. Only changes the wording of the reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

impl Direction {
    fn verb(&self) -> &'static str {
        match self {
            Direction::Outgoing => "sent",
            Direction::Incoming => "received",
        }
    }
}

/// Throughput over one reporting interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalReport {
    pub direction: Direction,
    pub interval_packets: u64,
    pub interval_bytes: u64,
    pub bitrate_mbps: f64,
    pub avg_pps: f64,
    pub total_bytes: u64,
}

impl fmt::Display for IntervalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} bitrate: {:.2} Mbps | Packets: {} ({:.2} pps avg) | Total {}: {:.2} MB",
            self.direction,
            self.bitrate_mbps,
            self.interval_packets,
            self.avg_pps,
            self.direction.verb(),
            megabytes(self.total_bytes)
        )
    }
}

pub struct Reporter {
    direction: Direction,
    interval: Duration,
    stats: Arc<Stats>,
    stop: Arc<StopSignal>,
    last: Counters,
}

impl Reporter {
    pub fn new(
        direction: Direction,
        interval: Duration,
        stats: Arc<Stats>,
        stop: Arc<StopSignal>,
    ) -> Self {
        Reporter {
            direction,
            interval,
            stats,
            stop,
            last: Counters::default(),
        }
    }

    /// Compute the report of the interval ending with `current`, `elapsed` after the start.
    pub fn report(&mut self, current: Counters, elapsed: Duration) -> IntervalReport {
        let interval_packets = current.packets - self.last.packets;
        let interval_bytes = current.bytes - self.last.bytes;
        self.last = current;
        let elapsed = elapsed.as_secs_f64();
        IntervalReport {
            direction: self.direction,
            interval_packets,
            interval_bytes,
            bitrate_mbps: mbps(interval_bytes, self.interval.as_secs_f64()),
            avg_pps: if elapsed > 0. {
                current.packets as f64 / elapsed
            } else {
                0.
            },
            total_bytes: current.bytes,
        }
    }

    /// Log one line per interval until the stop signal fires.
    pub fn run(mut self) {
        let ticker = tick(self.interval);
        let stop = self.stop.receiver();
        loop {
            select! {
                recv(ticker) -> _ => {
                    let current = self.stats.snapshot();
                    let report = self.report(current, self.stats.elapsed());
                    log::info!("{report}");
                }
                recv(stop) -> _ => break,
            }
        }
        log::debug!("Reporter stopped");
    }
}
