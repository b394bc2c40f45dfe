//! Command line flags and the validated application configuration.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::error::ConfigError;
use crate::macaddr::MacAddr;

/// Default GraphQL endpoint of the local forwarder.
pub const DEFAULT_FORWARDER_URI: &str = "http://localhost:3030/";

/// Default transport RX queue capacity.
pub const DEFAULT_RX_QUEUE_SIZE: u32 = 64;

/// Default transport TX queue capacity.
pub const DEFAULT_TX_QUEUE_SIZE: u32 = 64;

/// Flags that may be written with a single dash (`-input=x`).
const LONG_FLAGS: &[&str] = &[
    "gqlserver",
    "rxq",
    "txq",
    "local",
    "remote",
    "input",
    "output",
    "help",
    "version",
];

#[derive(Parser, Debug, Clone)]
#[command(name = "ndn-consumer")]
#[command(version, about = "NDN content consumer")]
pub struct ConsumerArgs {
    /// GraphQL API of local forwarder
    #[arg(long, default_value = DEFAULT_FORWARDER_URI)]
    pub gqlserver: String,

    /// Network interface name (empty selects the first active interface)
    #[arg(short = 'i', value_name = "IFNAME", default_value = "")]
    pub ifname: String,

    /// RX queue size
    #[arg(long, default_value_t = DEFAULT_RX_QUEUE_SIZE, value_parser = clap::value_parser!(u32).range(1..))]
    pub rxq: u32,

    /// TX queue size
    #[arg(long, default_value_t = DEFAULT_TX_QUEUE_SIZE, value_parser = clap::value_parser!(u32).range(1..))]
    pub txq: u32,

    /// Local MAC address
    #[arg(long)]
    pub local: Option<MacAddr>,

    /// Remote MAC address
    #[arg(long)]
    pub remote: Option<MacAddr>,

    /// Input filepath: the names to request, one per line
    #[arg(long, default_value = "")]
    pub input: String,

    /// Output filepath for retrieved content
    #[arg(long, default_value = "")]
    pub output: String,
}

impl ConsumerArgs {
    /// Parse `std::env::args_os()`, accepting single-dash long flags.
    pub fn parse_single_dash() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// Validate the flags and build the immutable configuration.
    pub fn into_config(self) -> Result<AppConfig, ConfigError> {
        let mut builder = AppConfig::builder(self.input)
            .output(self.output)
            .forwarder_uri(self.gqlserver)
            .ifname(self.ifname)
            .queue_sizes(self.rxq, self.txq);
        if let Some(local) = self.local {
            builder = builder.local(local);
        }
        if let Some(remote) = self.remote {
            builder = builder.remote(remote);
        }
        builder.build()
    }
}

/// Rewrite `-name` / `-name=value` into `--name` for the known long flags.
///
/// Arguments after a bare `--` are left untouched.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut out = Vec::new();
    let mut passthrough = false;
    for (idx, arg) in args.into_iter().enumerate() {
        let arg: OsString = arg.into();
        if idx == 0 || passthrough {
            out.push(arg);
            continue;
        }
        if arg == "--" {
            passthrough = true;
            out.push(arg);
            continue;
        }
        let rewritten = arg.to_str().and_then(|s| {
            let rest = s.strip_prefix('-')?;
            if rest.starts_with('-') {
                return None;
            }
            let name = rest.split('=').next().unwrap_or(rest);
            LONG_FLAGS.contains(&name).then(|| OsString::from(format!("-{s}")))
        });
        out.push(rewritten.unwrap_or(arg));
    }
    out
}

/// Validated consumer configuration. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    local: Option<MacAddr>,
    remote: Option<MacAddr>,
    rx_queue_size: u32,
    tx_queue_size: u32,
    ifname: String,
    forwarder_uri: String,
    input: PathBuf,
    output: Option<PathBuf>,
}

impl AppConfig {
    /// Start building a configuration around the required input path.
    pub fn builder(input: impl Into<PathBuf>) -> AppConfigBuilder {
        AppConfigBuilder {
            config: AppConfig {
                local: None,
                remote: None,
                rx_queue_size: DEFAULT_RX_QUEUE_SIZE,
                tx_queue_size: DEFAULT_TX_QUEUE_SIZE,
                ifname: String::new(),
                forwarder_uri: DEFAULT_FORWARDER_URI.to_string(),
                input: input.into(),
                output: None,
            },
        }
    }

    pub fn local(&self) -> Option<MacAddr> {
        self.local
    }

    pub fn remote(&self) -> Option<MacAddr> {
        self.remote
    }

    pub fn rx_queue_size(&self) -> u32 {
        self.rx_queue_size
    }

    pub fn tx_queue_size(&self) -> u32 {
        self.tx_queue_size
    }

    /// Interface name; empty means auto-select.
    pub fn ifname(&self) -> &str {
        &self.ifname
    }

    pub fn forwarder_uri(&self) -> &str {
        &self.forwarder_uri
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Output file, or `None` when retrieved content is discarded.
    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

/// Builder for [`AppConfig`]; validation happens in [`AppConfigBuilder::build`].
#[derive(Debug, Clone)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn local(mut self, addr: MacAddr) -> Self {
        self.config.local = Some(addr);
        self
    }

    pub fn remote(mut self, addr: MacAddr) -> Self {
        self.config.remote = Some(addr);
        self
    }

    /// Set RX/TX queue capacities (default: 64 each).
    pub fn queue_sizes(mut self, rx: u32, tx: u32) -> Self {
        self.config.rx_queue_size = rx;
        self.config.tx_queue_size = tx;
        self
    }

    pub fn ifname(mut self, ifname: impl Into<String>) -> Self {
        self.config.ifname = ifname.into();
        self
    }

    pub fn forwarder_uri(mut self, uri: impl Into<String>) -> Self {
        self.config.forwarder_uri = uri.into();
        self
    }

    /// Set the output file. An empty path discards retrieved content.
    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        self.config.output = (!output.as_os_str().is_empty()).then_some(output);
        self
    }

    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let config = self.config;
        if config.input.as_os_str().is_empty() {
            return Err(ConfigError::MissingInput);
        }
        if config.forwarder_uri.is_empty() {
            return Err(ConfigError::EmptyForwarderUri);
        }
        let invalid = || ConfigError::InvalidForwarderUri(config.forwarder_uri.clone());
        let uri: http::Uri = config.forwarder_uri.parse().map_err(|_| invalid())?;
        if uri.scheme_str() != Some("http") || uri.authority().is_none() {
            return Err(invalid());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ConsumerArgs, clap::Error> {
        ConsumerArgs::try_parse_from(normalize_args(
            std::iter::once("ndn-consumer").chain(args.iter().copied()),
        ))
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["-input", "names.txt"])
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config.forwarder_uri(), DEFAULT_FORWARDER_URI);
        assert_eq!(config.rx_queue_size(), DEFAULT_RX_QUEUE_SIZE);
        assert_eq!(config.tx_queue_size(), DEFAULT_TX_QUEUE_SIZE);
        assert_eq!(config.ifname(), "");
        assert_eq!(config.local(), None);
        assert_eq!(config.remote(), None);
        assert_eq!(config.input(), Path::new("names.txt"));
        assert_eq!(config.output(), None);
    }

    #[test]
    fn test_single_dash_flags() {
        let config = parse(&[
            "-gqlserver=http://127.0.0.1:3030/",
            "-i",
            "eth1",
            "-rxq=256",
            "-txq",
            "512",
            "-local=02:00:00:00:00:01",
            "-remote",
            "02-00-00-00-00-02",
            "-input=names.txt",
            "--output",
            "out.bin",
        ])
        .unwrap()
        .into_config()
        .unwrap();
        assert_eq!(config.forwarder_uri(), "http://127.0.0.1:3030/");
        assert_eq!(config.ifname(), "eth1");
        assert_eq!(config.rx_queue_size(), 256);
        assert_eq!(config.tx_queue_size(), 512);
        assert_eq!(config.local(), Some(MacAddr::new([2, 0, 0, 0, 0, 1])));
        assert_eq!(config.remote(), Some(MacAddr::new([2, 0, 0, 0, 0, 2])));
        assert_eq!(config.output(), Some(Path::new("out.bin")));
    }

    #[test]
    fn test_missing_input() {
        let err = parse(&[]).unwrap().into_config().unwrap_err();
        assert_eq!(err, ConfigError::MissingInput);

        let err = parse(&["-input="]).unwrap().into_config().unwrap_err();
        assert_eq!(err, ConfigError::MissingInput);
    }

    #[test]
    fn test_forwarder_uri_validation() {
        let err = parse(&["-input=a", "-gqlserver="])
            .unwrap()
            .into_config()
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyForwarderUri);

        for bad in ["localhost:3030", "ftp://localhost/", "/graphql"] {
            let err = parse(&["-input=a", "-gqlserver", bad])
                .unwrap()
                .into_config()
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidForwarderUri(_)),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn test_zero_queue_rejected() {
        assert!(parse(&["-input=a", "-rxq=0"]).is_err());
        assert!(parse(&["-input=a", "-txq", "0"]).is_err());
    }

    #[test]
    fn test_bad_mac_rejected() {
        assert!(parse(&["-input=a", "-local=not-a-mac"]).is_err());
    }

    #[test]
    fn test_normalize_args_leaves_short_and_values() {
        let args = normalize_args(["prog", "-i", "-input", "-x", "--", "-output"]);
        assert_eq!(args, ["prog", "-i", "--input", "-x", "--", "-output"]);
    }
}
