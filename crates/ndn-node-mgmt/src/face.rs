//! Faces: packet exchange over a link.
//!
//! A face owns two background tasks. The writer drains an outgoing queue
//! into the link; the reader decodes incoming frames, hands Data to pending
//! Interests and Interests to registered producers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ndn_node_core::{Data, Interest, Name, Packet};

use crate::error::{MgmtError, Result};
use crate::transport::{FrameSink, FrameStream, Link};

/// Frames queued for the writer before senders wait.
const OUTGOING_QUEUE: usize = 256;

/// Answers Interests under a registered prefix.
#[async_trait]
pub trait InterestHandler: Send + Sync {
    /// Produce a Data packet for `interest`, or `None` to stay silent.
    async fn on_interest(&self, interest: Interest) -> Option<Data>;
}

struct PendingInterest {
    id: u64,
    interest: Interest,
    reply: oneshot::Sender<Data>,
}

struct Producer {
    id: u64,
    prefix: Name,
    handler: Arc<dyn InterestHandler>,
}

struct FaceInner {
    remote: String,
    outgoing: mpsc::Sender<Bytes>,
    pending: Mutex<Vec<PendingInterest>>,
    producers: RwLock<Vec<Producer>>,
    next_id: AtomicU64,
    shutdown: CancellationToken,
    closed: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FaceInner {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn dispatch(&self, frame: &[u8]) {
        match Packet::from_wire(frame) {
            Ok(Packet::Data(data)) => self.satisfy(data),
            Ok(Packet::Interest(interest)) => self.handle_interest(interest),
            Err(e) => tracing::warn!(remote = %self.remote, error = %e, "dropping undecodable frame"),
        }
    }

    fn satisfy(&self, data: Data) {
        let mut pending = lock(&self.pending);
        let mut matched = false;
        let mut i = 0;
        while i < pending.len() {
            if data.can_satisfy(&pending[i].interest) {
                let entry = pending.swap_remove(i);
                let _ = entry.reply.send(data.clone());
                matched = true;
            } else {
                i += 1;
            }
        }
        if !matched {
            tracing::trace!(name = %data.name, "unsolicited Data");
        }
    }

    fn handle_interest(&self, interest: Interest) {
        let handler = {
            let producers = self.producers.read().unwrap_or_else(|p| p.into_inner());
            producers
                .iter()
                .filter(|p| p.prefix.is_prefix_of(&interest.name))
                .max_by_key(|p| p.prefix.len())
                .map(|p| p.handler.clone())
        };
        let Some(handler) = handler else {
            tracing::trace!(name = %interest.name, "no producer for Interest");
            return;
        };
        let outgoing = self.outgoing.clone();
        tokio::spawn(async move {
            if let Some(data) = handler.on_interest(interest).await {
                let _ = outgoing.send(Bytes::from(data.to_wire())).await;
            }
        });
    }

    fn remove_pending(&self, id: u64) {
        lock(&self.pending).retain(|p| p.id != id);
    }

    /// Dropping the reply senders wakes every waiter with `FaceClosed`.
    fn fail_pending(&self) {
        lock(&self.pending).clear();
    }
}

impl Drop for FaceInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// A connection to a forwarder. Cheap to clone; all clones share one link.
#[derive(Clone)]
pub struct Face {
    inner: Arc<FaceInner>,
}

impl Face {
    /// Start the reader and writer tasks over `link`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(link: Link) -> Self {
        let (sink, stream, remote) = link.into_parts();
        let (outgoing, queue) = mpsc::channel(OUTGOING_QUEUE);
        let shutdown = CancellationToken::new();

        let inner = Arc::new(FaceInner {
            remote,
            outgoing,
            pending: Mutex::new(Vec::new()),
            producers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            shutdown: shutdown.clone(),
            closed: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        });

        let writer = tokio::spawn(write_loop(sink, queue, shutdown.clone()));
        let reader = tokio::spawn(read_loop(stream, Arc::downgrade(&inner), shutdown));
        lock(&inner.tasks).extend([writer, reader]);

        tracing::debug!(remote = %inner.remote, "face up");
        Self { inner }
    }

    /// Human-readable remote endpoint.
    pub fn remote(&self) -> &str {
        &self.inner.remote
    }

    /// Whether the face was closed locally or by the remote end.
    pub fn is_closed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Send an Interest and wait for matching Data.
    ///
    /// Fails with `Timeout` when nothing arrives within the Interest
    /// lifetime, and with `FaceClosed` if the face goes down first.
    pub async fn express(&self, interest: Interest) -> Result<Data> {
        if self.is_closed() {
            return Err(MgmtError::FaceClosed);
        }
        let id = self.inner.next_id();
        let name = interest.name.clone();
        let lifetime = interest.lifetime();
        let wire = Bytes::from(interest.to_wire());
        let (reply, response) = oneshot::channel();
        lock(&self.inner.pending).push(PendingInterest {
            id,
            interest,
            reply,
        });

        if self.inner.outgoing.send(wire).await.is_err() {
            self.inner.remove_pending(id);
            return Err(MgmtError::FaceClosed);
        }
        tracing::trace!(%name, "Interest sent");

        match tokio::time::timeout(lifetime, response).await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(_)) => Err(MgmtError::FaceClosed),
            Err(_) => {
                self.inner.remove_pending(id);
                Err(MgmtError::Timeout(name))
            }
        }
    }

    /// Send a Data packet, typically an unsolicited reply.
    pub async fn put_data(&self, data: &Data) -> Result<()> {
        if self.is_closed() {
            return Err(MgmtError::FaceClosed);
        }
        self.inner
            .outgoing
            .send(Bytes::from(data.to_wire()))
            .await
            .map_err(|_| MgmtError::FaceClosed)
    }

    /// Route Interests under `prefix` to `handler`. The longest matching
    /// prefix wins.
    pub fn produce(&self, prefix: Name, handler: Arc<dyn InterestHandler>) -> ProducerHandle {
        let id = self.inner.next_id();
        tracing::debug!(%prefix, "producer attached");
        self.inner
            .producers
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .push(Producer {
                id,
                prefix: prefix.clone(),
                handler,
            });
        ProducerHandle {
            face: Arc::downgrade(&self.inner),
            id,
            prefix,
        }
    }

    /// Stop both tasks and fail in-flight Interests. Idempotent; frames
    /// already queued are flushed first.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.shutdown.cancel();
        self.inner.fail_pending();
        let tasks = std::mem::take(&mut *lock(&self.inner.tasks));
        for task in tasks {
            let _ = task.await;
        }
        tracing::info!(remote = %self.inner.remote, "face closed");
    }
}

impl std::fmt::Debug for Face {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Face")
            .field("remote", &self.inner.remote)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Keeps a producer attached to a face.
#[derive(Debug)]
pub struct ProducerHandle {
    face: Weak<FaceInner>,
    id: u64,
    prefix: Name,
}

impl ProducerHandle {
    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    /// Detach the producer. Idempotent.
    pub fn close(&self) {
        if let Some(face) = self.face.upgrade() {
            let mut producers = face.producers.write().unwrap_or_else(|p| p.into_inner());
            let before = producers.len();
            producers.retain(|p| p.id != self.id);
            if producers.len() != before {
                tracing::debug!(prefix = %self.prefix, "producer detached");
            }
        }
    }
}

async fn write_loop(mut sink: FrameSink, mut queue: mpsc::Receiver<Bytes>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            frame = queue.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = sink.send(frame).await {
                        tracing::warn!(error = %e, "write failed");
                        shutdown.cancel();
                        break;
                    }
                }
                None => break,
            },
            _ = shutdown.cancelled() => {
                while let Ok(frame) = queue.try_recv() {
                    if sink.feed(frame).await.is_err() {
                        break;
                    }
                }
                break;
            }
        }
    }
    let _ = sink.close().await;
}

async fn read_loop(mut stream: FrameStream, face: Weak<FaceInner>, shutdown: CancellationToken) {
    loop {
        let frame = tokio::select! {
            frame = stream.next() => frame,
            _ = shutdown.cancelled() => break,
        };
        let Some(inner) = face.upgrade() else { break };
        match frame {
            Some(Ok(frame)) => inner.dispatch(&frame),
            Some(Err(e)) => {
                tracing::warn!(remote = %inner.remote, error = %e, "read failed");
                break;
            }
            None => {
                tracing::debug!(remote = %inner.remote, "remote closed the link");
                break;
            }
        }
    }
    shutdown.cancel();
    if let Some(inner) = face.upgrade() {
        inner.fail_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory;
    use ndn_node_core::DigestSigner;
    use std::time::Duration;

    struct Echo;

    #[async_trait]
    impl InterestHandler for Echo {
        async fn on_interest(&self, interest: Interest) -> Option<Data> {
            Some(Data::new(interest.name.clone(), Bytes::from_static(b"echo")).sign(&DigestSigner))
        }
    }

    struct Fixed(&'static [u8]);

    #[async_trait]
    impl InterestHandler for Fixed {
        async fn on_interest(&self, interest: Interest) -> Option<Data> {
            Some(Data::new(interest.name, Bytes::from_static(self.0)))
        }
    }

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_express_reaches_producer() {
        let (a, b) = memory::pair();
        let client = Face::new(a);
        let server = Face::new(b);
        let _producer = server.produce(name("/echo"), Arc::new(Echo));

        let data = client.express(Interest::new(name("/echo/1"))).await.unwrap();
        assert_eq!(data.name, name("/echo/1"));
        assert_eq!(&data.content[..], b"echo");

        client.close().await;
        server.close().await;
    }

    #[tokio::test]
    async fn test_longest_prefix_wins() {
        let (a, b) = memory::pair();
        let client = Face::new(a);
        let server = Face::new(b);
        let _short = server.produce(name("/a"), Arc::new(Fixed(b"short")));
        let _long = server.produce(name("/a/b"), Arc::new(Fixed(b"long")));

        let data = client.express(Interest::new(name("/a/b/c"))).await.unwrap();
        assert_eq!(&data.content[..], b"long");
        let data = client.express(Interest::new(name("/a/x"))).await.unwrap();
        assert_eq!(&data.content[..], b"short");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_when_nobody_answers() {
        let (a, _b) = memory::pair();
        let client = Face::new(a);
        let interest = Interest::new(name("/nobody")).with_lifetime(Duration::from_millis(100));
        let err = client.express(interest).await.unwrap_err();
        assert!(matches!(err, MgmtError::Timeout(n) if n == name("/nobody")));
    }

    #[tokio::test]
    async fn test_detached_producer_is_silent() {
        let (a, b) = memory::pair();
        let client = Face::new(a);
        let server = Face::new(b);
        let producer = server.produce(name("/echo"), Arc::new(Echo));
        producer.close();
        producer.close();

        let interest = Interest::new(name("/echo/1")).with_lifetime(Duration::from_millis(50));
        assert!(matches!(client.express(interest).await, Err(MgmtError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_fails_pending() {
        let (a, _b) = memory::pair();
        let client = Face::new(a);
        let waiter = {
            let client = client.clone();
            tokio::spawn(async move { client.express(Interest::new(name("/slow"))).await })
        };
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        client.close().await;
        client.close().await;
        assert!(client.is_closed());
        assert!(matches!(waiter.await.unwrap(), Err(MgmtError::FaceClosed)));
        assert!(matches!(
            client.express(Interest::new(name("/after"))).await,
            Err(MgmtError::FaceClosed)
        ));
    }

    #[tokio::test]
    async fn test_remote_close_marks_face_closed() {
        let (a, b) = memory::pair();
        let client = Face::new(a);
        let server = Face::new(b);
        server.close().await;

        for _ in 0..50 {
            if client.is_closed() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(client.is_closed());
        client.close().await;
    }

    #[tokio::test]
    async fn test_garbage_frame_is_ignored() {
        let (a, b) = memory::pair();
        let client = Face::new(a);
        let (mut raw_tx, _raw_rx, _) = b.into_parts();
        raw_tx.send(Bytes::from_static(b"\xff\xfe")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!client.is_closed());
    }
}
