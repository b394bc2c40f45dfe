//! NDN content consumer
//!
//! Registers an Ethernet face with the local forwarder, requests every name
//! listed in the input file, and writes the retrieved content to the output
//! file. Runs until the list is done or SIGINT/SIGTERM arrives.
//!
//! # Usage
//!
//! ```bash
//! # Auto-select the interface, default forwarder endpoint
//! ndn-consumer -input names.txt -output content.bin
//!
//! # Explicit interface and forwarder
//! ndn-consumer -i eth1 -gqlserver http://127.0.0.1:3030/ -input names.txt
//! ```
//!
//! Exit status is 0 on success, 1 on any configuration, init, run, or close
//! failure, and 2 when the command line cannot be parsed.

use std::process::ExitCode;

use clap::CommandFactory;
use ndn_consumer::consumer::ConsumerApp;
use ndn_consumer::face::ForwarderFace;
use ndn_consumer::{ConsumerArgs, Controller, EXIT_FAILURE, SignalListener};
use tracing::{error, info, info_span};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Respects RUST_LOG, defaults to info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match ConsumerArgs::parse_single_dash().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("{}", ConsumerArgs::command().render_help());
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let signals = match SignalListener::install() {
        Ok(signals) => signals,
        Err(e) => {
            error!(error = %e, "failed to install signal handler");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    match Controller::new(info_span!("consumer"), signals)
        .launch(config, ConsumerApp::<ForwarderFace>::construct)
    {
        Ok(report) => {
            info!(closed_by = %report.closed_by, "Consumer exited");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Consumer failed");
            ExitCode::from(e.exit_code())
        }
    }
}
