//! Secure WebSocket transport for remote routers.
//!
//! One packet per binary message; text and control messages are ignored.

use bytes::Bytes;
use futures::{future, SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::Link;
use crate::error::{MgmtError, Result};

/// Open a WebSocket to `url` (normally `wss://<router>/ws/`).
pub async fn connect(url: &Url) -> Result<Link> {
    let (ws, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| MgmtError::ConnectFailure {
            endpoint: url.to_string(),
            cause: e.to_string(),
        })?;

    let (sink, stream) = ws.split();
    let sink = sink
        .sink_map_err(|e| MgmtError::Transport(e.to_string()))
        .with(|frame: Bytes| future::ready(Ok::<_, MgmtError>(Message::Binary(frame.to_vec()))));
    let stream = stream.filter_map(|message| {
        future::ready(match message {
            Ok(Message::Binary(payload)) => Some(Ok(Bytes::from(payload))),
            Ok(_) => None,
            Err(e) => Some(Err(MgmtError::Transport(e.to_string()))),
        })
    });
    Ok(Link::new(sink, stream, url.to_string()))
}
