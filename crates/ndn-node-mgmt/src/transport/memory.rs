//! In-memory links for tests and in-process daemons.

use bytes::Bytes;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};

use super::Link;
use crate::error::MgmtError;

/// Frames buffered per direction.
pub const DEFAULT_CAPACITY: usize = 64;

/// Two links wired to each other: what one sends, the other receives.
pub fn pair() -> (Link, Link) {
    let (to_b, from_a) = mpsc::channel::<Bytes>(DEFAULT_CAPACITY);
    let (to_a, from_b) = mpsc::channel::<Bytes>(DEFAULT_CAPACITY);

    let a = Link::new(
        to_b.sink_map_err(|e| MgmtError::Transport(e.to_string())),
        from_b.map(Ok),
        "memory://b",
    );
    let b = Link::new(
        to_a.sink_map_err(|e| MgmtError::Transport(e.to_string())),
        from_a.map(Ok),
        "memory://a",
    );
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_is_crossed() {
        let (a, b) = pair();
        let (mut a_tx, mut a_rx, _) = a.into_parts();
        let (mut b_tx, mut b_rx, _) = b.into_parts();

        a_tx.send(Bytes::from_static(b"ping")).await.unwrap();
        assert_eq!(b_rx.next().await.unwrap().unwrap(), Bytes::from_static(b"ping"));

        b_tx.send(Bytes::from_static(b"pong")).await.unwrap();
        assert_eq!(a_rx.next().await.unwrap().unwrap(), Bytes::from_static(b"pong"));
    }

    #[tokio::test]
    async fn test_stream_ends_when_peer_dropped() {
        let (a, b) = pair();
        let (_, mut a_rx, _) = a.into_parts();
        drop(b);
        assert!(a_rx.next().await.is_none());
    }
}
