//! Transports: how frames reach the forwarding daemon.
//!
//! A [`Link`] is a boxed frame sink plus a boxed frame stream. Each
//! transport turns its connection into a link; [`Face`](crate::Face) only
//! ever sees links.

use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Sink, Stream};
use url::Url;

use crate::discovery;
use crate::error::{MgmtError, Result};
use crate::face::Face;

pub mod memory;
#[cfg(unix)]
pub mod unix;
pub mod websocket;

/// Outgoing half of a link.
pub type FrameSink = Pin<Box<dyn Sink<Bytes, Error = MgmtError> + Send>>;

/// Incoming half of a link. Ends when the remote side closes.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Default socket of a same-host daemon.
pub const DEFAULT_SOCKET_PATH: &str = "/run/nfd/nfd.sock";

/// Default time allowed for opening a transport.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A bidirectional frame pipe.
pub struct Link {
    sink: FrameSink,
    stream: FrameStream,
    remote: String,
}

impl Link {
    pub fn new<S, R>(sink: S, stream: R, remote: impl Into<String>) -> Self
    where
        S: Sink<Bytes, Error = MgmtError> + Send + 'static,
        R: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
            remote: remote.into(),
        }
    }

    /// Human-readable remote endpoint.
    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub(crate) fn into_parts(self) -> (FrameSink, FrameStream, String) {
        (self.sink, self.stream, self.remote)
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link").field("remote", &self.remote).finish()
    }
}

/// How to reach the forwarding daemon. Resolved once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportPolicy {
    /// Same-host daemon over a Unix socket.
    Local { socket_path: PathBuf },
    /// Remote router over secure WebSocket; discovered via FCH when no
    /// endpoint is given.
    Remote { endpoint: Option<Url> },
}

impl TransportPolicy {
    pub fn is_local(&self) -> bool {
        matches!(self, TransportPolicy::Local { .. })
    }
}

impl Default for TransportPolicy {
    fn default() -> Self {
        TransportPolicy::Local {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
        }
    }
}

/// Opens faces.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a face according to `policy`.
    async fn connect(&self, policy: &TransportPolicy) -> Result<Face>;
}

/// Connects over real Unix sockets and WebSockets.
#[derive(Debug, Clone)]
pub struct DefaultConnector {
    http: reqwest::Client,
    fch_service: String,
    connect_timeout: Duration,
}

impl DefaultConnector {
    /// Use `fch_service` for router discovery.
    pub fn new(fch_service: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            fch_service: fch_service.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    async fn open_link(&self, policy: &TransportPolicy) -> Result<Link> {
        match policy {
            #[cfg(unix)]
            TransportPolicy::Local { socket_path } => unix::connect(socket_path).await,
            #[cfg(not(unix))]
            TransportPolicy::Local { socket_path } => Err(MgmtError::ConnectFailure {
                endpoint: socket_path.display().to_string(),
                cause: "unix sockets are not supported on this platform".into(),
            }),
            TransportPolicy::Remote { endpoint: Some(url) } => websocket::connect(url).await,
            TransportPolicy::Remote { endpoint: None } => {
                let url = discovery::discover(&self.http, &self.fch_service).await?;
                websocket::connect(&url).await
            }
        }
    }
}

impl Default for DefaultConnector {
    fn default() -> Self {
        Self::new(discovery::FCH_SERVICE)
    }
}

#[async_trait]
impl Connector for DefaultConnector {
    async fn connect(&self, policy: &TransportPolicy) -> Result<Face> {
        let link = tokio::time::timeout(self.connect_timeout, self.open_link(policy))
            .await
            .map_err(|_| MgmtError::ConnectFailure {
                endpoint: describe(policy),
                cause: format!("timed out after {:?}", self.connect_timeout),
            })??;
        tracing::info!(remote = %link.remote(), "transport connected");
        Ok(Face::new(link))
    }
}

/// Best-effort endpoint description for error messages.
pub fn describe(policy: &TransportPolicy) -> String {
    match policy {
        TransportPolicy::Local { socket_path } => format!("unix://{}", socket_path.display()),
        TransportPolicy::Remote { endpoint: Some(url) } => url.to_string(),
        TransportPolicy::Remote { endpoint: None } => "<fch>".to_string(),
    }
}
