use crate::config::RunWindow;
use crate::signal::StopSignal;
use crate::stats::Stats;

use std::sync::Arc;
use std::time::Instant;

/// Something captured frames can be read from.
pub trait Receive {
    /// Wait for the next frame and return its length on the wire. `Ok(None)` means the
    /// read timed out without a frame.
    fn receive(&mut self) -> Result<Option<u64>, pcap::Error>;
}

impl<T: pcap::Activated + ?Sized> Receive for pcap::Capture<T> {
    fn receive(&mut self) -> Result<Option<u64>, pcap::Error> {
        match self.next_packet() {
            Ok(packet) => Ok(Some(packet.header.len as u64)),
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Counts the captured traffic until the stop signal fires or the run window expires.
///
/// Reads time out regularly, so the signal is observed even on a silent link.
pub fn run(
    mut capture: impl Receive,
    window: RunWindow,
    stats: Arc<Stats>,
    stop: Arc<StopSignal>,
) {
    log::debug!("Monitor started");
    while !stop.is_fired() {
        if window.is_expired(Instant::now()) {
            log::info!("Run duration elapsed");
            stop.fire();
            break;
        }
        match capture.receive() {
            Ok(Some(len)) => stats.add(len),
            Ok(None) => (),
            Err(e) => log::warn!("Capture error: {e}"),
        }
    }
    log::debug!("Monitor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    struct FakeCapture(VecDeque<Result<Option<u64>, pcap::Error>>);

    impl Receive for FakeCapture {
        fn receive(&mut self) -> Result<Option<u64>, pcap::Error> {
            self.0.pop_front().unwrap_or(Ok(None))
        }
    }

    #[test]
    fn counts_captured_frames() {
        let capture = FakeCapture(VecDeque::from(vec![
            Ok(Some(100)),
            Ok(None),
            Err(pcap::Error::PcapError("truncated".into())),
            Ok(Some(60)),
        ]));
        let stats = Arc::new(Stats::default());
        let stop = Arc::new(StopSignal::default());
        let window = RunWindow::new(Instant::now(), Duration::from_millis(50));
        run(capture, window, Arc::clone(&stats), Arc::clone(&stop));
        let c = stats.snapshot();
        assert_eq!(c.packets, 2);
        assert_eq!(c.bytes, 160);
        assert!(stop.is_fired());
    }

    #[test]
    fn stops_on_signal() {
        let stats = Arc::new(Stats::default());
        let stop = Arc::new(StopSignal::default());
        stop.fire();
        let capture = FakeCapture(VecDeque::from(vec![Ok(Some(100))]));
        run(capture, RunWindow::unbounded(), Arc::clone(&stats), stop);
        assert_eq!(stats.snapshot().packets, 0);
    }
}
