use crate::config::{MonitorConfig, RunWindow, SendConfig};
use crate::device;
use crate::error::Result;
use crate::frame::{random_payload, FrameBuilder, FrameTemplate};
use crate::monitor;
use crate::reporter::{Direction, Reporter};
use crate::sender::Sender;
use crate::signal::StopSignal;
use crate::stats::{Stats, Summary};

use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Time given to the workers to observe the stop signal before the final summary.
pub const GRACE_PERIOD: Duration = Duration::from_millis(200);

/// Owns the stop signal and the statistics of a run, starts the workers and
/// computes the final summary once they are told to stop.
pub struct Lifecycle {
    stats: Arc<Stats>,
    stop: Arc<StopSignal>,
    grace: Duration,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Lifecycle {
            stats: Arc::new(Stats::default()),
            stop: Arc::new(StopSignal::default()),
            grace: GRACE_PERIOD,
        }
    }
}

impl Lifecycle {
    pub fn stats(&self) -> Arc<Stats> {
        Arc::clone(&self.stats)
    }

    pub fn stop_signal(&self) -> Arc<StopSignal> {
        Arc::clone(&self.stop)
    }

    /// Fire the stop signal on Ctrl+C. Can only be installed once per process.
    pub fn handle_interrupts(&self) -> Result<()> {
        let stop = Arc::clone(&self.stop);
        ctrlc::set_handler(move || {
            if stop.fire() {
                log::warn!("Shutting down...");
            } else {
                log::warn!("Already shutting down, please wait");
            }
        })?;
        Ok(())
    }

    /// Run `worker` and a reporter side by side until the stop signal fires, then
    /// return the summary of the run.
    pub fn run<W>(
        &self,
        direction: Direction,
        report_interval: Duration,
        worker: W,
    ) -> Result<Summary>
    where
        W: FnOnce() + Send + 'static,
    {
        let reporter = Reporter::new(
            direction,
            report_interval,
            Arc::clone(&self.stats),
            Arc::clone(&self.stop),
        );
        let worker_name = match direction {
            Direction::Outgoing => "Sender",
            Direction::Incoming => "Monitor",
        };
        let threads = vec![
            thread::Builder::new()
                .name(worker_name.into())
                .spawn(worker)?,
            thread::Builder::new()
                .name("Reporter".into())
                .spawn(move || reporter.run())?,
        ];

        // either the interrupt handler or the worker itself fires the signal
        self.stop.wait();
        self.stop.fire();
        thread::sleep(self.grace);

        let summary = Summary {
            counters: self.stats.snapshot(),
            elapsed: self.stats.elapsed(),
        };

        for thread in threads {
            let name = thread.thread().name().unwrap_or_default().to_string();
            if thread.join().is_err() {
                log::error!("{name} thread panicked");
            }
        }
        Ok(summary)
    }
}

/// Validate the configuration, open the interface and send until interrupted or until
/// the configured duration has elapsed.
pub fn send(config: SendConfig) -> Result<Summary> {
    let src_mac = match config.src_mac {
        Some(mac) => mac,
        None => device::interface_mac(&config.interface)?,
    };
    let builder = FrameBuilder::new(FrameTemplate {
        src_mac,
        dst_mac: config.dst_mac,
        src_ip: config.src_ip,
        dst_ip: config.dst_ip,
        src_port: config.src_port,
        dst_port: config.dst_port,
        payload: random_payload(config.payload_size, config.seed),
    });
    // a frame that cannot be built now will never be
    let frame_len = builder.build()?.len();
    let link = device::open_injection(&config.interface)?;

    log::info!("Interface: {} ({src_mac})", config.interface);
    log::info!(
        "Destination: {}:{} ({})",
        config.dst_ip,
        config.dst_port,
        config.dst_mac
    );
    log::info!("Source: {}:{}", config.src_ip, config.src_port);
    log::info!(
        "Rate: {} pps, {frame_len} bytes per frame",
        config.rate.pps()
    );
    if config.duration.is_zero() {
        log::info!("Duration: until interrupted");
    } else {
        log::info!("Duration: {}", humantime::format_duration(config.duration));
    }

    let lifecycle = Lifecycle::default();
    lifecycle.handle_interrupts()?;
    let stats = lifecycle.stats();
    let window = RunWindow::new(stats.start_time(), config.duration);
    let sender = Sender::new(
        builder,
        link,
        config.rate,
        window,
        stats,
        lifecycle.stop_signal(),
    );
    lifecycle.run(Direction::Outgoing, config.report_interval, move || {
        sender.run();
    })
}

/// Open the interface and count the matching traffic until interrupted or until the
/// configured duration has elapsed.
pub fn monitor(config: MonitorConfig) -> Result<Summary> {
    let capture = device::open_capture(&config.interface, config.port, config.promisc)?;
    log::info!(
        "Listening on {} for UDP port {}",
        config.interface,
        config.port
    );

    let lifecycle = Lifecycle::default();
    lifecycle.handle_interrupts()?;
    let stats = lifecycle.stats();
    let stop = lifecycle.stop_signal();
    let window = RunWindow::new(stats.start_time(), config.duration);
    lifecycle.run(Direction::Incoming, config.report_interval, move || {
        monitor::run(capture, window, stats, stop)
    })
}
