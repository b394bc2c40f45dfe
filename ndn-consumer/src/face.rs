//! Forwarder control client and the Ethernet face it manages.
//!
//! The forwarder exposes a GraphQL API over HTTP. [`ForwarderClient`] posts
//! GraphQL documents to it; [`ForwarderFace`] uses the client to create an
//! Ethernet face when the consumer starts and to delete it on close.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST};
use http::{Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1 as client_http1;
use hyper_util::rt::TokioIo;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::consumer::Fetcher;
use crate::macaddr::MacAddr;
use crate::names::Name;
use crate::netif;

/// NDN Ethernet multicast group, used when no remote address is given.
pub const NDN_ETHER_MULTICAST: MacAddr = MacAddr::new([0x01, 0x00, 0x5e, 0x00, 0x17, 0xaa]);

/// Upper bound for one GraphQL round trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const CREATE_FACE: &str = "mutation createFace($locator: JSON!) { createFace(locator: $locator) { id } }";
const DELETE: &str = "mutation delete($id: ID!) { delete(id: $id) }";

/// Error type for forwarder control operations.
#[derive(Debug)]
pub enum FaceError {
    /// Could not reach the forwarder.
    Connect(std::io::Error),
    /// HTTP exchange failed.
    Http(hyper::Error),
    /// The forwarder answered with a non-success status.
    Status(StatusCode),
    /// The response body is not JSON.
    Json(serde_json::Error),
    /// The forwarder reported GraphQL errors.
    GraphQl(String),
    /// The response lacks an expected field.
    Protocol(String),
    /// The request did not complete within the timeout.
    Timeout,
    /// No interface matched, or it has no hardware address.
    Interface(String),
    /// The face carries no packet-level data plane in this process.
    NoDataPlane,
}

impl fmt::Display for FaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaceError::Connect(e) => write!(f, "forwarder connect error: {e}"),
            FaceError::Http(e) => write!(f, "forwarder HTTP error: {e}"),
            FaceError::Status(s) => write!(f, "forwarder returned HTTP {s}"),
            FaceError::Json(e) => write!(f, "invalid forwarder response: {e}"),
            FaceError::GraphQl(msg) => write!(f, "forwarder error: {msg}"),
            FaceError::Protocol(msg) => write!(f, "unexpected forwarder response: {msg}"),
            FaceError::Timeout => write!(f, "forwarder request timed out"),
            FaceError::Interface(msg) => write!(f, "interface error: {msg}"),
            FaceError::NoDataPlane => write!(f, "face has no data plane attached"),
        }
    }
}

impl std::error::Error for FaceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FaceError::Connect(e) => Some(e),
            FaceError::Http(e) => Some(e),
            FaceError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<hyper::Error> for FaceError {
    fn from(e: hyper::Error) -> Self {
        FaceError::Http(e)
    }
}

impl From<serde_json::Error> for FaceError {
    fn from(e: serde_json::Error) -> Self {
        FaceError::Json(e)
    }
}

/// Blocking GraphQL client for the forwarder control endpoint.
///
/// Each request opens a fresh HTTP/1.1 connection on a private
/// current-thread runtime.
pub struct ForwarderClient {
    uri: Uri,
    runtime: Runtime,
}

impl ForwarderClient {
    pub fn new(uri: &str) -> Result<Self, FaceError> {
        let uri: Uri = uri
            .parse()
            .map_err(|_| FaceError::Protocol(format!("bad endpoint {uri:?}")))?;
        if uri.host().is_none() {
            return Err(FaceError::Protocol(format!("endpoint {uri} has no host")));
        }
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(FaceError::Connect)?;
        Ok(Self { uri, runtime })
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Execute one GraphQL document and return its `data` member.
    pub fn request(&self, query: &str, variables: Value) -> Result<Value, FaceError> {
        let body = serde_json::to_vec(&json!({ "query": query, "variables": variables }))?;
        self.runtime.block_on(async {
            tokio::time::timeout(REQUEST_TIMEOUT, self.post(body))
                .await
                .map_err(|_| FaceError::Timeout)?
        })
    }

    async fn post(&self, body: Vec<u8>) -> Result<Value, FaceError> {
        let host = self.uri.host().unwrap_or("localhost");
        // IPv6 literals keep their brackets in the URI.
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        let port = self.uri.port_u16().unwrap_or(80);
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(FaceError::Connect)?;

        let (mut sender, conn) = client_http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "forwarder connection closed with error");
            }
        });

        let path = self
            .uri
            .path_and_query()
            .map(|p| p.as_str())
            .unwrap_or("/");
        let authority = self
            .uri
            .authority()
            .map(|a| a.as_str())
            .unwrap_or(host);
        let request = Request::post(path)
            .header(HOST, authority)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| FaceError::Protocol(e.to_string()))?;

        let response = sender.send_request(request).await?;
        let status = response.status();
        let body = response.into_body().collect().await?.to_bytes();
        if !status.is_success() {
            return Err(FaceError::Status(status));
        }
        parse_response(&body)
    }
}

/// Extract `data` from a GraphQL response body, surfacing `errors`.
pub fn parse_response(body: &[u8]) -> Result<Value, FaceError> {
    let mut value: Value = serde_json::from_slice(body)?;
    if let Some(errors) = value.get("errors").and_then(Value::as_array)
        && !errors.is_empty()
    {
        let messages: Vec<&str> = errors
            .iter()
            .map(|e| e.get("message").and_then(Value::as_str).unwrap_or("unknown error"))
            .collect();
        return Err(FaceError::GraphQl(messages.join("; ")));
    }
    match value.get_mut("data") {
        Some(data) if !data.is_null() => Ok(data.take()),
        _ => Err(FaceError::Protocol("missing data".to_string())),
    }
}

/// Build the Ethernet face locator for `config` on `ifname`.
pub fn ether_locator(config: &AppConfig, ifname: &str, local: MacAddr) -> Value {
    let remote = config.remote().unwrap_or(NDN_ETHER_MULTICAST);
    json!({
        "scheme": "ether",
        "port": ifname,
        "local": local.to_string(),
        "remote": remote.to_string(),
        "rxQueueSize": config.rx_queue_size(),
        "txQueueSize": config.tx_queue_size(),
    })
}

/// An Ethernet face registered with the forwarder.
///
/// Deleted on [`close`](Fetcher::close); closing twice deletes once.
pub struct ForwarderFace {
    client: ForwarderClient,
    id: Mutex<Option<String>>,
}

impl ForwarderFace {
    /// Resolve the interface and create the face on the forwarder.
    pub fn open(config: &AppConfig) -> Result<Self, FaceError> {
        let interfaces = netif::scan().map_err(|e| FaceError::Interface(e.to_string()))?;
        let iface = netif::pick(&interfaces, config.ifname()).ok_or_else(|| {
            FaceError::Interface(if config.ifname().is_empty() {
                "no active interface found".to_string()
            } else {
                format!("interface {} not found", config.ifname())
            })
        })?;
        let local = config.local().or(iface.hwaddr).ok_or_else(|| {
            FaceError::Interface(format!("{} has no hardware address", iface.name))
        })?;

        let client = ForwarderClient::new(config.forwarder_uri())?;
        Self::create(client, ether_locator(config, &iface.name, local))
    }

    /// Create a face described by `locator` through `client`.
    pub fn create(client: ForwarderClient, locator: Value) -> Result<Self, FaceError> {
        let data = client.request(CREATE_FACE, json!({ "locator": locator }))?;
        let id = data
            .pointer("/createFace/id")
            .and_then(Value::as_str)
            .ok_or_else(|| FaceError::Protocol("createFace returned no id".to_string()))?
            .to_string();
        info!(face = %id, uri = %client.uri(), "Face created");
        Ok(Self {
            client,
            id: Mutex::new(Some(id)),
        })
    }

    /// Face ID, or `None` once deleted.
    pub fn id(&self) -> Option<String> {
        self.id.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Fetcher for ForwarderFace {
    fn fetch(&self, name: &Name, _cancel: &CancellationToken) -> crate::Result<Bytes> {
        debug!(%name, "no data plane for request");
        Err(FaceError::NoDataPlane.into())
    }

    fn close(&self) -> crate::Result<()> {
        let Some(id) = self.id.lock().unwrap_or_else(|e| e.into_inner()).take() else {
            return Ok(());
        };
        let data = self.client.request(DELETE, json!({ "id": id }))?;
        if data.get("delete").and_then(Value::as_bool) != Some(true) {
            warn!(face = %id, "forwarder did not confirm face deletion");
        }
        info!(face = %id, "Face deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_data() {
        let data = parse_response(br#"{"data":{"createFace":{"id":"F1"}}}"#).unwrap();
        assert_eq!(data.pointer("/createFace/id").unwrap(), "F1");
    }

    #[test]
    fn test_parse_response_errors() {
        let err = parse_response(
            br#"{"data":null,"errors":[{"message":"port busy"},{"message":"no memory"}]}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "forwarder error: port busy; no memory");

        assert!(matches!(
            parse_response(b"not json").unwrap_err(),
            FaceError::Json(_)
        ));
        assert!(matches!(
            parse_response(br#"{"data":null}"#).unwrap_err(),
            FaceError::Protocol(_)
        ));
    }

    #[test]
    fn test_ether_locator_defaults_to_multicast() {
        let config = AppConfig::builder("names.txt")
            .queue_sizes(128, 256)
            .build()
            .unwrap();
        let locator = ether_locator(&config, "eth1", MacAddr::new([2, 0, 0, 0, 0, 1]));
        assert_eq!(locator["scheme"], "ether");
        assert_eq!(locator["port"], "eth1");
        assert_eq!(locator["local"], "02:00:00:00:00:01");
        assert_eq!(locator["remote"], "01:00:5e:00:17:aa");
        assert_eq!(locator["rxQueueSize"], 128);
        assert_eq!(locator["txQueueSize"], 256);
    }

    #[test]
    fn test_client_rejects_hostless_endpoint() {
        assert!(ForwarderClient::new("/graphql").is_err());
    }

    #[test]
    fn test_unreachable_forwarder() {
        // Port 1 on loopback is closed on any sane host.
        let client = ForwarderClient::new("http://127.0.0.1:1/").unwrap();
        let err = client.request("{ version }", Value::Null).unwrap_err();
        assert!(matches!(err, FaceError::Connect(_)), "{err}");
    }
}
