//! Single-fire gate guarding the close sequence.

use std::fmt;
use std::sync::{Arc, OnceLock};

/// Which path entered the close sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Construction failed and returned a partial handle.
    InitFailed,
    /// The run operation returned on the main path.
    RunCompleted,
    /// An interrupt or termination signal arrived first.
    Signal,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::InitFailed => write!(f, "init-failed"),
            Trigger::RunCompleted => write!(f, "run-completed"),
            Trigger::Signal => write!(f, "signal"),
        }
    }
}

/// Outcome of the one close that ran.
#[derive(Debug, Clone)]
pub struct CloseRecord {
    pub trigger: Trigger,
    pub result: Result<(), Arc<dyn std::error::Error + Send + Sync>>,
}

/// Serializes entry into the close sequence.
///
/// The first caller of [`close_once`](Self::close_once) runs its closure;
/// concurrent callers block until it finishes and then observe the same
/// [`CloseRecord`]. Later callers never run their closure.
#[derive(Debug, Default)]
pub struct ShutdownGate {
    record: OnceLock<CloseRecord>,
}

impl ShutdownGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `close` unless another path already did.
    ///
    /// Returns the record of the close that ran and whether this call ran it.
    pub fn close_once<F>(&self, trigger: Trigger, close: F) -> (&CloseRecord, bool)
    where
        F: FnOnce() -> crate::Result<()>,
    {
        let mut fired = false;
        let record = self.record.get_or_init(|| {
            fired = true;
            CloseRecord {
                trigger,
                result: close().map_err(Arc::from),
            }
        });
        (record, fired)
    }

    pub fn is_closed(&self) -> bool {
        self.record.get().is_some()
    }

    pub fn record(&self) -> Option<&CloseRecord> {
        self.record.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[test]
    fn test_second_caller_does_not_close() {
        let gate = ShutdownGate::new();
        let calls = AtomicU32::new(0);

        let (record, fired) = gate.close_once(Trigger::RunCompleted, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(fired);
        assert_eq!(record.trigger, Trigger::RunCompleted);

        let (record, fired) = gate.close_once(Trigger::Signal, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(!fired);
        assert_eq!(record.trigger, Trigger::RunCompleted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_is_shared() {
        let gate = ShutdownGate::new();
        let (record, _) = gate.close_once(Trigger::Signal, || Err("face busy".into()));
        assert_eq!(record.result.as_ref().unwrap_err().to_string(), "face busy");

        let (record, fired) = gate.close_once(Trigger::RunCompleted, || Ok(()));
        assert!(!fired);
        assert!(record.result.is_err());
    }

    #[test]
    fn test_concurrent_callers_close_once() {
        for _ in 0..100 {
            let gate = Arc::new(ShutdownGate::new());
            let calls = Arc::new(AtomicU32::new(0));
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = [Trigger::RunCompleted, Trigger::Signal]
                .into_iter()
                .map(|trigger| {
                    let gate = gate.clone();
                    let calls = calls.clone();
                    let barrier = barrier.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        let (record, fired) = gate.close_once(trigger, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(Duration::from_micros(50));
                            Ok(())
                        });
                        // The loser must see a completed close, never an in-flight one.
                        assert!(record.result.is_ok());
                        fired
                    })
                })
                .collect();

            let fired: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            assert_eq!(fired.iter().filter(|f| **f).count(), 1);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert!(gate.is_closed());
        }
    }
}
