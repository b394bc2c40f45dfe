//! Process signal delivery. Installs the process-wide handler, so everything
//! lives in one test.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use nix::sys::signal::{Signal, raise};
use tokio_util::sync::CancellationToken;

use ndn_consumer::{AppConfig, Application, Controller, SignalListener};

struct BlockUntilCancelled {
    started: mpsc::Sender<()>,
    closes: Arc<AtomicU32>,
}

impl Application for BlockUntilCancelled {
    fn run(&self, cancel: &CancellationToken) -> ndn_consumer::Result<()> {
        let _ = self.started.send(());
        while !cancel.is_cancelled() {
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    fn close(&self) -> ndn_consumer::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_sigterm_closes_running_application() {
    let signals = SignalListener::install().unwrap();
    assert!(SignalListener::install().is_err());

    let closes = Arc::new(AtomicU32::new(0));
    let (started_tx, started_rx) = mpsc::channel();
    let sender = std::thread::spawn(move || {
        started_rx.recv().unwrap();
        raise(Signal::SIGTERM).unwrap();
    });

    let config = AppConfig::builder("names.txt").build().unwrap();
    let report = Controller::new(tracing::Span::none(), signals)
        .launch(config, |_| {
            Ok(BlockUntilCancelled {
                started: started_tx,
                closes: closes.clone(),
            })
        })
        .unwrap();
    sender.join().unwrap();

    assert!(report.signalled);
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    // The handler outlives the controller; late signals are swallowed.
    raise(Signal::SIGINT).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}
