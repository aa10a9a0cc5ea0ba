//! The workload boundary: what runs once the node is registered.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use ndn_node_core::{Certificate, Data, Interest, Name, NamedSigner};
use ndn_node_keychain::{trust, ChainVerifier, TrustStore};
use ndn_node_mgmt::Face;
use ndn_node_store::{Storage, StorageExt};

use crate::error::Result;
use crate::resources::{Resource, ResourceStack};

/// Handles a workload receives. All of them stay valid until the session
/// drains.
#[derive(Clone)]
pub struct WorkloadContext {
    pub face: Face,
    pub storage: Arc<dyn Storage>,
    pub trust: TrustStore,
    resources: Arc<ResourceStack>,
}

impl WorkloadContext {
    pub(crate) fn new(
        face: Face,
        storage: Arc<dyn Storage>,
        trust: TrustStore,
        resources: Arc<ResourceStack>,
    ) -> Self {
        Self {
            face,
            storage,
            trust,
            resources,
        }
    }

    /// Identity of the node.
    pub fn node_name(&self) -> Name {
        self.trust.certificate().identity()
    }

    pub fn certificate(&self) -> &Certificate {
        self.trust.certificate()
    }

    pub fn signer(&self) -> Arc<NamedSigner> {
        self.trust.signer()
    }

    pub fn verifier(&self) -> Arc<ChainVerifier> {
        self.trust.verifier()
    }

    /// Validate a peer's packet against the trust anchor and return the
    /// signer certificate.
    ///
    /// The certificate named by the key locator is taken from session
    /// storage. If it is missing it is fetched over the face, checked, and
    /// stored under `certs/` for later packets.
    pub async fn verify_data(&self, data: &Data) -> Result<Certificate> {
        if let Some(locator) = &data.sig_info.key_locator {
            if trust::stored_certificate(self.storage.as_ref(), locator)
                .await?
                .is_none()
            {
                self.fetch_certificate(locator).await?;
            }
        }
        Ok(self
            .trust
            .verifier()
            .verify_stored_data(data, self.storage.as_ref())
            .await?)
    }

    async fn fetch_certificate(&self, locator: &Name) -> Result<()> {
        let interest = Interest::new(locator.clone()).with_can_be_prefix(true);
        let cert = Certificate::from_data(self.face.express(interest).await?)?;
        self.trust.verifier().verify_certificate(&cert)?;
        self.storage
            .put_data(&trust::certificate_key(&cert), cert.data())
            .await?;
        tracing::debug!(cert = %cert.name(), "fetched peer certificate");
        Ok(())
    }

    /// Have the session release `resource` during the drain, before the
    /// session's own resources.
    pub async fn defer<R: Resource + 'static>(&self, resource: R) {
        self.resources.push(resource).await;
    }
}

impl std::fmt::Debug for WorkloadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkloadContext")
            .field("face", &self.face)
            .field("certificate", self.trust.certificate().name())
            .finish()
    }
}

/// The application a session hosts.
///
/// Returning ends the session as completed; an error aborts it. Either way
/// the session drains afterwards.
#[async_trait]
pub trait Workload: Send + Sync {
    async fn run(&self, ctx: WorkloadContext) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> Workload for F
where
    F: Fn(WorkloadContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn run(&self, ctx: WorkloadContext) -> anyhow::Result<()> {
        (self)(ctx).await
    }
}

/// Holds the session open until it is interrupted or times out.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleWorkload;

#[async_trait]
impl Workload for IdleWorkload {
    async fn run(&self, ctx: WorkloadContext) -> anyhow::Result<()> {
        tracing::info!(node = %ctx.node_name(), "node running");
        std::future::pending::<()>().await;
        Ok(())
    }
}
