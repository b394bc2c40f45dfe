//! Lifecycle controller: construct, run, and close an [`Application`].

use std::sync::{Arc, Mutex};
use std::thread;

use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, error, info, warn};

use crate::app::{Application, InitFailure};
use crate::config::AppConfig;
use crate::error::LifecycleError;
use crate::gate::{CloseRecord, ShutdownGate, Trigger};
use crate::signal::{Notice, SignalListener};

/// Lifecycle states of the owned application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Uninitialized,
    Initialized,
    Running,
    /// Terminal.
    Closed,
}

/// Summary of a lifecycle that ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    /// The path that performed the close.
    pub closed_by: Trigger,
    /// A termination signal was received before the main path finished.
    pub signalled: bool,
}

/// Drives one application through `Uninitialized → Initialized → Running →
/// Closed`.
///
/// After construction a signal watcher thread is started; the calling
/// thread then blocks in [`Application::run`]. Whichever of run-completion
/// or signal arrival comes first enters the close sequence through a
/// [`ShutdownGate`], so the application is closed exactly once. On a signal
/// the watcher cancels the token handed to `run` before closing.
///
/// All log records are emitted inside the span passed to [`Controller::new`],
/// on both threads.
///
/// A run error counts as caused by a signal only when the watcher accepted
/// the signal before the main path recorded that `run` returned. Signals
/// accepted later are logged and ignored; the main path closes as usual.
///
/// # Example
///
/// ```ignore
/// let (trigger, signals) = SignalListener::pair();
/// let report = Controller::new(tracing::info_span!("consumer"), signals)
///     .launch(config, |config| MyApp::open(&config).map_err(InitFailure::bare))?;
/// ```
pub struct Controller {
    span: Span,
    signals: SignalListener,
}

impl Controller {
    pub fn new(span: Span, signals: SignalListener) -> Self {
        Self { span, signals }
    }

    /// Construct the application from `config`, run it, and close it.
    ///
    /// Never terminates the process; the caller maps the result to an exit
    /// code. A cleanup failure is always returned as
    /// [`LifecycleError::Cleanup`], taking precedence over a run failure.
    pub fn launch<A, F>(self, config: AppConfig, construct: F) -> Result<Report, LifecycleError>
    where
        A: Application,
        F: FnOnce(AppConfig) -> Result<A, InitFailure<A>>,
    {
        let Controller { span, signals } = self;
        let _enter = span.enter();
        let mut state = State::Uninitialized;

        info!(input = %config.input().display(), "Starting consumer application");

        let app = match construct(config) {
            Ok(app) => app,
            Err(InitFailure { partial, error }) => {
                error!(error = %error, "init error");
                if let Some(app) = partial {
                    let record = close_app(&ShutdownGate::new(), Trigger::InitFailed, &app);
                    transition(&mut state, State::Closed);
                    if let Err(e) = record.result {
                        return Err(LifecycleError::Cleanup(e));
                    }
                } else {
                    transition(&mut state, State::Closed);
                }
                return Err(LifecycleError::Init(error));
            }
        };
        transition(&mut state, State::Initialized);

        let app = Arc::new(app);
        let gate = Arc::new(ShutdownGate::new());
        let phase = Arc::new(RunPhase::default());
        let cancel = CancellationToken::new();
        let (finish, watch) = signals.into_parts();

        let watcher = {
            let app = app.clone();
            let gate = gate.clone();
            let phase = phase.clone();
            let cancel = cancel.clone();
            let span = span.clone();
            thread::Builder::new()
                .name("signal-watcher".to_string())
                .spawn(move || {
                    let _enter = span.enter();
                    if !watch.wait() {
                        debug!("Signal watcher released");
                        return;
                    }
                    if !phase.interrupt() {
                        debug!("Termination signal after run returned");
                        return;
                    }
                    warn!("Received termination signal, shutting down");
                    cancel.cancel();
                    close_app(&gate, Trigger::Signal, app.as_ref());
                })
        };
        let watcher = match watcher {
            Ok(watcher) => watcher,
            Err(e) => {
                error!(error = %e, "failed to start signal watcher");
                let record = close_app(&gate, Trigger::InitFailed, app.as_ref());
                transition(&mut state, State::Closed);
                if let Err(close_err) = record.result {
                    return Err(LifecycleError::Cleanup(close_err));
                }
                return Err(LifecycleError::Init(e.into()));
            }
        };

        transition(&mut state, State::Running);
        let run_result = app.run(&cancel);
        let signalled = phase.finish();
        if let Err(e) = &run_result {
            if signalled {
                debug!(error = %e, "run returned after termination signal");
            } else {
                error!(error = %e, "run error");
            }
        }

        let record = close_app(&gate, Trigger::RunCompleted, app.as_ref());
        let _ = finish.send(Notice::Finished);
        if watcher.join().is_err() {
            warn!("signal watcher panicked");
        }
        transition(&mut state, State::Closed);

        if let Err(e) = record.result {
            return Err(LifecycleError::Cleanup(e));
        }
        match run_result {
            Err(e) if !signalled => Err(LifecycleError::Run(e)),
            _ => {
                info!(closed_by = %record.trigger, signalled, "Consumer application closed");
                Ok(Report {
                    closed_by: record.trigger,
                    signalled,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Interrupted,
    Returned,
}

/// Orders signal acceptance against `run` returning.
#[derive(Debug)]
struct RunPhase {
    phase: Mutex<Phase>,
}

impl Default for RunPhase {
    fn default() -> Self {
        Self {
            phase: Mutex::new(Phase::Running),
        }
    }
}

impl RunPhase {
    /// Accept a signal. False once `run` has returned.
    fn interrupt(&self) -> bool {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        if *phase == Phase::Running {
            *phase = Phase::Interrupted;
        }
        *phase == Phase::Interrupted
    }

    /// Record that `run` returned. True if a signal was accepted first.
    fn finish(&self) -> bool {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        if *phase == Phase::Running {
            *phase = Phase::Returned;
        }
        *phase == Phase::Interrupted
    }
}

fn transition(state: &mut State, next: State) {
    debug!(from = ?*state, to = ?next, "lifecycle transition");
    *state = next;
}

/// Enter the close sequence through `gate`, logging the outcome once.
fn close_app<A: Application>(gate: &ShutdownGate, trigger: Trigger, app: &A) -> CloseRecord {
    let (record, fired) = gate.close_once(trigger, || {
        info!(%trigger, "Closing consumer application...");
        app.close()
    });
    if !fired {
        debug!(%trigger, closed_by = %record.trigger, "close already performed");
    } else if let Err(e) = &record.result {
        error!(%trigger, error = %e, "fatal: close error");
    }
    record.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Noop {
        closes: Arc<AtomicU32>,
    }

    impl Application for Noop {
        fn run(&self, _cancel: &CancellationToken) -> crate::Result<()> {
            Ok(())
        }

        fn close(&self) -> crate::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_run_to_completion() {
        let closes = Arc::new(AtomicU32::new(0));
        let (_trigger, signals) = SignalListener::pair();
        let config = AppConfig::builder("names.txt").build().unwrap();

        let report = Controller::new(Span::none(), signals)
            .launch(config, |_| {
                Ok(Noop {
                    closes: closes.clone(),
                })
            })
            .unwrap();

        assert_eq!(report.closed_by, Trigger::RunCompleted);
        assert!(!report.signalled);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_signal_after_run_returned_is_not_counted() {
        let phase = RunPhase::default();
        assert!(!phase.finish());
        assert!(!phase.interrupt());
        assert!(!phase.finish());
    }

    #[test]
    fn test_signal_before_run_returned_is_counted() {
        let phase = RunPhase::default();
        assert!(phase.interrupt());
        assert!(phase.interrupt());
        assert!(phase.finish());
    }

    #[test]
    fn test_init_failure_without_partial() {
        let (_trigger, signals) = SignalListener::pair();
        let config = AppConfig::builder("names.txt").build().unwrap();

        let err = Controller::new(Span::none(), signals)
            .launch::<Noop, _>(config, |_| Err(InitFailure::bare("forwarder unreachable")))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Init(_)));
    }
}
