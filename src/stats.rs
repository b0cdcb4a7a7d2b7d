use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Cumulative packet and byte counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub packets: u64,
    pub bytes: u64,
}

/// Counters shared between the worker that produces traffic and the threads that report on it.
///
/// Both counters live behind a single lock so a reader never sees one updated without the other.
pub struct Stats {
    start_time: Instant,
    counters: Mutex<Counters>,
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            start_time: Instant::now(),
            counters: Mutex::default(),
        }
    }
}

impl Stats {
    fn lock(&self) -> MutexGuard<'_, Counters> {
        // a poisoned lock still holds a consistent pair: updates never panic halfway
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Account for one packet of `bytes` bytes.
    pub fn add(&self, bytes: u64) {
        let mut c = self.lock();
        c.packets += 1;
        c.bytes += bytes;
    }

    pub fn snapshot(&self) -> Counters {
        *self.lock()
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Bits per second to megabits per second.
pub(crate) fn mbps(bytes: u64, secs: f64) -> f64 {
    if secs > 0. {
        (bytes as f64) * 8. / secs / 1_000_000.
    } else {
        0.
    }
}

pub(crate) fn megabytes(bytes: u64) -> f64 {
    (bytes as f64) / 1_000_000.
}

/// Final figures of a run, computed once every worker has stopped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub counters: Counters,
    pub elapsed: Duration,
}

impl Summary {
    pub fn avg_bitrate_mbps(&self) -> f64 {
        mbps(self.counters.bytes, self.elapsed.as_secs_f64())
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total packets: {} | Total bytes: {:.2} MB | Avg bitrate: {:.2} Mbps | Duration: {:.2} sec",
            self.counters.packets,
            megabytes(self.counters.bytes),
            self.avg_bitrate_mbps(),
            self.elapsed.as_secs_f64()
        )
    }
}
