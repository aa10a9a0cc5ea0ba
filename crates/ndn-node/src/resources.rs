//! The Resource Stack: everything a session acquired, released in reverse
//! order exactly once.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use ndn_node_mgmt::{CertificateProducer, Face};
use ndn_node_store::Storage;

use crate::error::Result;

/// Something a session must release before it ends.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Short name for logs.
    fn label(&self) -> &str;

    /// Release the resource. Called at most once by the stack.
    async fn release(&self) -> Result<()>;
}

#[async_trait]
impl Resource for Face {
    fn label(&self) -> &str {
        "face"
    }

    async fn release(&self) -> Result<()> {
        self.close().await;
        Ok(())
    }
}

#[async_trait]
impl Resource for Arc<dyn Storage> {
    fn label(&self) -> &str {
        "storage"
    }

    async fn release(&self) -> Result<()> {
        Ok(self.close().await?)
    }
}

#[async_trait]
impl Resource for CertificateProducer {
    fn label(&self) -> &str {
        "certificate producer"
    }

    async fn release(&self) -> Result<()> {
        self.close();
        Ok(())
    }
}

type CleanupFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type Cleanup = Box<dyn FnOnce() -> CleanupFuture + Send>;

/// A cleanup closure, for workloads that hold their own state.
pub struct Deferred {
    label: String,
    cleanup: std::sync::Mutex<Option<Cleanup>>,
}

impl Deferred {
    pub fn new<F, Fut>(label: impl Into<String>, cleanup: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cleanup: Cleanup = Box::new(move || Box::pin(cleanup()) as CleanupFuture);
        Self {
            label: label.into(),
            cleanup: std::sync::Mutex::new(Some(cleanup)),
        }
    }
}

#[async_trait]
impl Resource for Deferred {
    fn label(&self) -> &str {
        &self.label
    }

    async fn release(&self) -> Result<()> {
        let cleanup = self
            .cleanup
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(cleanup) = cleanup {
            cleanup().await;
        }
        Ok(())
    }
}

/// Ordered list of acquired resources.
///
/// `None` once drained; the drain is one-shot.
pub struct ResourceStack {
    entries: Mutex<Option<Vec<Box<dyn Resource>>>>,
}

impl ResourceStack {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Some(Vec::new())),
        }
    }

    /// Take ownership of `resource`. After the drain, the resource is
    /// released immediately instead.
    pub async fn push<R: Resource + 'static>(&self, resource: R) {
        let mut guard = self.entries.lock().await;
        if let Some(entries) = guard.as_mut() {
            tracing::debug!(resource = resource.label(), "resource acquired");
            entries.push(Box::new(resource));
            return;
        }
        drop(guard);
        tracing::warn!(resource = resource.label(), "resource acquired after drain");
        release(&resource).await;
    }

    /// Number of resources held.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.as_ref().map_or(0, Vec::len)
    }

    pub async fn is_drained(&self) -> bool {
        self.entries.lock().await.is_none()
    }

    /// Release everything, last acquired first. Returns the labels in
    /// release order; every call after the first returns nothing.
    ///
    /// A failed release is logged and does not stop the others.
    pub async fn drain(&self) -> Vec<String> {
        let Some(entries) = self.entries.lock().await.take() else {
            return Vec::new();
        };
        let mut released = Vec::with_capacity(entries.len());
        for resource in entries.into_iter().rev() {
            release(resource.as_ref()).await;
            released.push(resource.label().to_string());
        }
        released
    }
}

impl Default for ResourceStack {
    fn default() -> Self {
        Self::new()
    }
}

async fn release(resource: &dyn Resource) {
    match resource.release().await {
        Ok(()) => tracing::debug!(resource = resource.label(), "resource released"),
        Err(e) => tracing::warn!(resource = resource.label(), error = %e, "release failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Probe {
        label: &'static str,
        log: Arc<std::sync::Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl Resource for Probe {
        fn label(&self) -> &str {
            self.label
        }

        async fn release(&self) -> Result<()> {
            self.log.lock().unwrap().push(self.label);
            if self.fail {
                return Err(SessionError::Config("boom".into()));
            }
            Ok(())
        }
    }

    fn probe(label: &'static str, log: &Arc<std::sync::Mutex<Vec<&'static str>>>) -> Probe {
        Probe {
            label,
            log: log.clone(),
            fail: false,
        }
    }

    #[tokio::test]
    async fn test_drain_reverse_order_once() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let stack = ResourceStack::new();
        stack.push(probe("face", &log)).await;
        stack.push(probe("storage", &log)).await;
        stack.push(probe("producer", &log)).await;
        assert_eq!(stack.len().await, 3);

        assert_eq!(stack.drain().await, vec!["producer", "storage", "face"]);
        assert!(stack.drain().await.is_empty());
        assert!(stack.is_drained().await);
        assert_eq!(*log.lock().unwrap(), vec!["producer", "storage", "face"]);
    }

    #[tokio::test]
    async fn test_failed_release_does_not_stop_drain() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let stack = ResourceStack::new();
        stack.push(probe("a", &log)).await;
        stack
            .push(Probe {
                label: "b",
                log: log.clone(),
                fail: true,
            })
            .await;
        stack.push(probe("c", &log)).await;

        assert_eq!(stack.drain().await, vec!["c", "b", "a"]);
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_push_after_drain_releases_immediately() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let stack = ResourceStack::new();
        stack.drain().await;
        stack.push(probe("late", &log)).await;
        assert_eq!(*log.lock().unwrap(), vec!["late"]);
        assert_eq!(stack.len().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_drains_release_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let stack = Arc::new(ResourceStack::new());
        for _ in 0..4 {
            let count = count.clone();
            stack
                .push(Deferred::new("counter", move || async move {
                    count.fetch_add(1, Ordering::SeqCst);
                }))
                .await;
        }

        let (a, b) = tokio::join!(stack.drain(), stack.drain());
        assert_eq!(a.len() + b.len(), 4);
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_storage_and_face_adapters() {
        let storage: Arc<dyn Storage> = Arc::new(ndn_node_store::MemoryStorage::new());
        let (a, _b) = ndn_node_mgmt::transport::memory::pair();
        let face = Face::new(a);

        let stack = ResourceStack::new();
        stack.push(face.clone()).await;
        stack.push(storage.clone()).await;
        assert_eq!(stack.drain().await, vec!["storage", "face"]);

        assert!(face.is_closed());
        assert!(storage.get("k").await.is_err());
    }
}
