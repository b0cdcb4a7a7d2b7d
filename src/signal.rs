use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::sync::{Mutex, PoisonError};

/// A single-fire, broadcast-once stop event.
///
/// Nothing is ever sent on the inner channel: firing drops the only sender, and every
/// receiver sees the disconnection. Once fired, the signal stays fired.
pub struct StopSignal {
    trigger: Mutex<Option<Sender<()>>>,
    observer: Receiver<()>,
}

impl Default for StopSignal {
    fn default() -> Self {
        let (tx, rx) = bounded(0);
        StopSignal {
            trigger: Mutex::new(Some(tx)),
            observer: rx,
        }
    }
}

impl StopSignal {
    /// Fire the signal. Returns `false` if it had already been fired, in which case
    /// nothing happens.
    pub fn fire(&self) -> bool {
        self.trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// Non-blocking check.
    pub fn is_fired(&self) -> bool {
        matches!(self.observer.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Block until the signal is fired.
    pub fn wait(&self) {
        // recv only returns once the sender is dropped
        let _ = self.observer.recv();
    }

    /// A receiver that becomes ready (disconnected) when the signal fires, for use in
    /// `crossbeam_channel::select!`.
    pub fn receiver(&self) -> Receiver<()> {
        self.observer.clone()
    }
}
