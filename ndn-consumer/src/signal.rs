//! Delivery of interrupt and termination signals to the lifecycle controller.

use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Notice {
    /// SIGINT or SIGTERM arrived.
    Terminate,
    /// The main path finished; the watcher should stop waiting.
    Finished,
}

/// Fires a termination notice at a [`SignalListener`].
#[derive(Debug, Clone)]
pub struct SignalTrigger {
    tx: Sender<Notice>,
}

impl SignalTrigger {
    /// Deliver a termination notice. Ignored once the listener is gone.
    pub fn fire(&self) {
        let _ = self.tx.send(Notice::Terminate);
    }
}

/// Receiving end consumed by [`Controller`](crate::Controller).
#[derive(Debug)]
pub struct SignalListener {
    tx: Sender<Notice>,
    rx: Receiver<Notice>,
}

impl SignalListener {
    /// Route SIGINT and SIGTERM to a new listener.
    ///
    /// Only one handler may be installed per process.
    pub fn install() -> Result<Self, ctrlc::Error> {
        let (trigger, listener) = Self::pair();
        ctrlc::set_handler(move || trigger.fire())?;
        Ok(listener)
    }

    /// A listener fired manually through the returned trigger.
    pub fn pair() -> (SignalTrigger, SignalListener) {
        let (tx, rx) = mpsc::channel();
        (SignalTrigger { tx: tx.clone() }, SignalListener { tx, rx })
    }

    pub(crate) fn into_parts(self) -> (Sender<Notice>, SignalWatch) {
        (self.tx, SignalWatch { rx: self.rx })
    }
}

/// The blocking half moved onto the signal watcher thread.
#[derive(Debug)]
pub(crate) struct SignalWatch {
    rx: Receiver<Notice>,
}

impl SignalWatch {
    /// Block until a termination notice (`true`) or until the main path is
    /// done or every trigger is gone (`false`).
    pub(crate) fn wait(&self) -> bool {
        matches!(self.rx.recv(), Ok(Notice::Terminate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_wakes_watch() {
        let (trigger, listener) = SignalListener::pair();
        let (_finish, watch) = listener.into_parts();
        trigger.fire();
        assert!(watch.wait());
    }

    #[test]
    fn test_finished_releases_watch() {
        let (_trigger, listener) = SignalListener::pair();
        let (finish, watch) = listener.into_parts();
        finish.send(Notice::Finished).unwrap();
        assert!(!watch.wait());
    }

    #[test]
    fn test_fire_after_listener_dropped() {
        let (trigger, listener) = SignalListener::pair();
        drop(listener);
        trigger.fire();
    }
}
