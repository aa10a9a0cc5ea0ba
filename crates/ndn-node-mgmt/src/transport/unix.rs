//! Unix-socket transport for a same-host daemon.
//!
//! Frames are length-delimited on the stream socket.

use std::path::Path;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use super::Link;
use crate::error::{MgmtError, Result};

/// Connect to the daemon socket at `path`.
pub async fn connect(path: &Path) -> Result<Link> {
    let endpoint = format!("unix://{}", path.display());
    let stream = UnixStream::connect(path)
        .await
        .map_err(|e| MgmtError::ConnectFailure {
            endpoint: endpoint.clone(),
            cause: e.to_string(),
        })?;
    Ok(framed(stream, endpoint))
}

/// Wrap any byte stream in length-delimited framing.
pub fn framed<T>(io: T, remote: impl Into<String>) -> Link
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sink, stream) = Framed::new(io, LengthDelimitedCodec::new()).split::<Bytes>();
    Link::new(
        sink.sink_map_err(|e| MgmtError::Transport(e.to_string())),
        stream.map(|frame| {
            frame
                .map(BytesMut::freeze)
                .map_err(|e| MgmtError::Transport(e.to_string()))
        }),
        remote,
    )
}
