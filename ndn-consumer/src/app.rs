//! The application contract driven by the lifecycle [`Controller`](crate::Controller).

use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::BoxError;

/// An application owned by the lifecycle controller.
///
/// The controller shares the handle between the main path, which blocks in
/// [`run`](Application::run), and the signal watcher, which may call
/// [`close`](Application::close) while `run` is still in progress. The
/// controller guarantees `close` is entered at most once.
pub trait Application: Send + Sync + 'static {
    /// Blocking run operation.
    ///
    /// Implementations should return promptly once `cancel` fires or once
    /// `close` has been called from another thread.
    fn run(&self, cancel: &CancellationToken) -> crate::Result<()>;

    /// Release every resource held by the application.
    fn close(&self) -> crate::Result<()>;
}

/// A failed construction.
///
/// `partial` carries a handle that acquired some resources before the
/// failure. Constructors only return a partial handle when it is safe to
/// close; the controller always closes it before reporting the error.
pub struct InitFailure<A> {
    pub partial: Option<A>,
    pub error: BoxError,
}

impl<A> InitFailure<A> {
    /// Construction failed before anything needed releasing.
    pub fn bare(error: impl Into<BoxError>) -> Self {
        Self {
            partial: None,
            error: error.into(),
        }
    }

    /// Construction failed after `partial` acquired resources.
    pub fn with_partial(partial: A, error: impl Into<BoxError>) -> Self {
        Self {
            partial: Some(partial),
            error: error.into(),
        }
    }
}

impl<A> fmt::Debug for InitFailure<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitFailure")
            .field("partial", &self.partial.is_some())
            .field("error", &self.error)
            .finish()
    }
}
