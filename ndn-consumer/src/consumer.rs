//! The consumer application: request every input name, write what comes back.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::{Application, InitFailure};
use crate::config::AppConfig;
use crate::face::ForwarderFace;
use crate::names::{Name, RequestList};
use crate::sink::ContentSink;

/// Retrieves named content. This is where Interest/Data exchange plugs in.
pub trait Fetcher: Send + Sync + 'static {
    /// Retrieve the content published under `name`.
    ///
    /// Should give up promptly once `cancel` fires.
    fn fetch(&self, name: &Name, cancel: &CancellationToken) -> crate::Result<Bytes>;

    /// Release the fetcher. May be called while `fetch` is in progress.
    fn close(&self) -> crate::Result<()>;
}

#[derive(Debug, Default)]
struct Counters {
    requested: AtomicU64,
    retrieved: AtomicU64,
    failed: AtomicU64,
    bytes: AtomicU64,
}

/// Point-in-time consumer statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub requested: u64,
    pub retrieved: u64,
    pub failed: u64,
    pub bytes: u64,
}

/// Requests every name of the input list through a [`Fetcher`] and writes
/// retrieved content to a [`ContentSink`].
///
/// A fetch failure for one name is logged and counted, then the next name is
/// requested. A write failure aborts the run.
pub struct ConsumerApp<F> {
    requests: RequestList,
    sink: ContentSink,
    fetcher: Option<F>,
    counters: Counters,
    closed: AtomicBool,
}

impl<F: Fetcher> ConsumerApp<F> {
    /// Load the request list, open the output, then open the fetcher.
    ///
    /// If the fetcher fails to open, the returned [`InitFailure`] carries the
    /// partially built app so its output can be closed.
    pub fn construct_with<O>(config: AppConfig, open: O) -> Result<Self, InitFailure<Self>>
    where
        O: FnOnce(&AppConfig) -> crate::Result<F>,
    {
        let requests = RequestList::load(config.input()).map_err(InitFailure::<Self>::bare)?;
        let sink = ContentSink::open(config.output()).map_err(InitFailure::<Self>::bare)?;
        info!(
            names = requests.len(),
            output = ?config.output(),
            "Request list loaded"
        );

        let mut app = Self {
            requests,
            sink,
            fetcher: None,
            counters: Counters::default(),
            closed: AtomicBool::new(false),
        };
        match open(&config) {
            Ok(fetcher) => {
                app.fetcher = Some(fetcher);
                Ok(app)
            }
            Err(e) => Err(InitFailure::with_partial(app, e)),
        }
    }

    pub fn requests(&self) -> &RequestList {
        &self.requests
    }

    pub fn stats(&self) -> Stats {
        Stats {
            requested: self.counters.requested.load(Ordering::Relaxed),
            retrieved: self.counters.retrieved.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            bytes: self.counters.bytes.load(Ordering::Relaxed),
        }
    }

    fn stopped(&self, cancel: &CancellationToken) -> bool {
        cancel.is_cancelled() || self.closed.load(Ordering::Acquire)
    }
}

impl ConsumerApp<ForwarderFace> {
    /// Construct a consumer whose face is registered with the forwarder.
    pub fn construct(config: AppConfig) -> Result<Self, InitFailure<Self>> {
        Self::construct_with(config, |config| Ok(ForwarderFace::open(config)?))
    }
}

impl<F: Fetcher> Application for ConsumerApp<F> {
    fn run(&self, cancel: &CancellationToken) -> crate::Result<()> {
        let fetcher = self.fetcher.as_ref().ok_or("consumer has no fetcher")?;

        for name in self.requests.names() {
            if self.stopped(cancel) {
                info!("Consumer stopped before completing the request list");
                break;
            }
            self.counters.requested.fetch_add(1, Ordering::Relaxed);

            let content = match fetcher.fetch(name, cancel) {
                Ok(content) => content,
                Err(_) if self.stopped(cancel) => break,
                Err(e) => {
                    warn!(%name, error = %e, "fetch failed");
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };

            if let Err(e) = self.sink.write(&content) {
                if self.stopped(cancel) {
                    break;
                }
                return Err(e.into());
            }
            debug!(%name, bytes = content.len(), "content retrieved");
            self.counters.retrieved.fetch_add(1, Ordering::Relaxed);
            self.counters
                .bytes
                .fetch_add(content.len() as u64, Ordering::Relaxed);
        }

        let stats = self.stats();
        info!(
            requested = stats.requested,
            retrieved = stats.retrieved,
            failed = stats.failed,
            bytes = stats.bytes,
            "Consumer run finished"
        );
        Ok(())
    }

    fn close(&self) -> crate::Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let fetcher_result = match &self.fetcher {
            Some(fetcher) => fetcher.close(),
            None => Ok(()),
        };
        let sink_result = self.sink.close();

        let stats = self.stats();
        info!(
            retrieved = stats.retrieved,
            failed = stats.failed,
            "Consumer closed"
        );
        fetcher_result?;
        sink_result?;
        Ok(())
    }
}
