use crate::config::{RateConfig, RunWindow};
use crate::error::Result;
use crate::frame::FrameBuilder;
use crate::signal::StopSignal;
use crate::stats::Stats;

use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Something able to put a serialized frame on the wire.
pub trait Transmit {
    fn transmit(&mut self, frame: &[u8]) -> Result<()>;
}

/// Life cycle of the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    Running,
    /// The stop signal was observed or the run window expired
    Stopping,
    Stopped,
}

/// Sends the same frame over and over at a target rate.
///
/// Pacing is open-loop: the sender sleeps the configured delay after each iteration
/// without accounting for the time spent building and transmitting the frame. The
/// achieved rate is therefore always at most the configured one, and lower under load.
pub struct Sender<T: Transmit> {
    builder: FrameBuilder,
    link: T,
    rate: RateConfig,
    window: RunWindow,
    stats: Arc<Stats>,
    stop: Arc<StopSignal>,
    state: SenderState,
}

impl<T: Transmit> Sender<T> {
    pub fn new(
        builder: FrameBuilder,
        link: T,
        rate: RateConfig,
        window: RunWindow,
        stats: Arc<Stats>,
        stop: Arc<StopSignal>,
    ) -> Self {
        Sender {
            builder,
            link,
            rate,
            window,
            stats,
            stop,
            state: SenderState::Running,
        }
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    /// Check whether the sender should keep running. When the run window has expired,
    /// the sender is the one firing the stop signal.
    fn check(&mut self, now: Instant) -> SenderState {
        if self.state == SenderState::Running {
            if self.stop.is_fired() {
                self.state = SenderState::Stopping;
            } else if self.window.is_expired(now) {
                log::info!("Run duration elapsed");
                self.stop.fire();
                self.state = SenderState::Stopping;
            }
        }
        self.state
    }

    /// One iteration: build a frame, send it and account for it. Returns whether the
    /// frame was sent. Failures are logged and never stop the sender.
    pub fn step(&mut self) -> bool {
        let frame = match self.builder.build() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("{e}");
                return false;
            }
        };
        match self.link.transmit(&frame) {
            Ok(()) => {
                self.stats.add(frame.len() as u64);
                log::trace!("{} bytes sent", frame.len());
                true
            }
            Err(e) => {
                log::warn!("{e}");
                false
            }
        }
    }

    /// Send until the stop signal fires or the run window expires.
    pub fn run(mut self) -> SenderState {
        log::debug!(
            "Sender started: {} pps, {:?} between packets",
            self.rate.pps(),
            self.rate.delay()
        );
        while self.check(Instant::now()) == SenderState::Running {
            self.step();
            thread::sleep(self.rate.delay());
        }
        self.state = SenderState::Stopped;
        log::debug!("Sender stopped");
        self.state
    }
}
