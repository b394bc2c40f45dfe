//! NDN content consumer.
//!
//! Collects startup configuration, hands it to an application object, runs
//! that application until it completes or the process is interrupted, and
//! guarantees the application is closed exactly once.
//!
//! The application lifecycle is driven by [`Controller`]:
//!
//! ```ignore
//! use ndn_consumer::{Controller, ConsumerArgs, SignalListener};
//! use ndn_consumer::consumer::ConsumerApp;
//! use ndn_consumer::face::ForwarderFace;
//! use clap::Parser;
//!
//! let config = ConsumerArgs::parse().into_config()?;
//! let signals = SignalListener::install()?;
//! let report = Controller::new(tracing::info_span!("consumer"), signals)
//!     .launch(config, ConsumerApp::<ForwarderFace>::construct)?;
//! ```
//!
//! The Interest/Data exchange is reached through the [`consumer::Fetcher`]
//! trait and is not part of this crate.

pub mod app;
pub mod config;
pub mod consumer;
pub mod error;
pub mod face;
pub mod gate;
pub mod lifecycle;
pub mod macaddr;
pub mod names;
pub mod netif;
pub mod signal;
pub mod sink;

pub use app::{Application, InitFailure};
pub use config::{AppConfig, ConsumerArgs};
pub use error::{ConfigError, EXIT_FAILURE, LifecycleError};
pub use gate::{CloseRecord, ShutdownGate, Trigger};
pub use lifecycle::{Controller, Report};
pub use macaddr::MacAddr;
pub use names::Name;
pub use signal::{SignalListener, SignalTrigger};

/// A boxed error type for collaborator failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A Result type using BoxError.
pub type Result<T> = std::result::Result<T, BoxError>;
