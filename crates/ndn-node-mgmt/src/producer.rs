//! Certificate Producer: answers Interests for certificates on a face so
//! peers can fetch them.

use std::sync::Arc;

use async_trait::async_trait;
use ndn_node_core::{Certificate, Data, Interest, Name};

use crate::face::{Face, InterestHandler, ProducerHandle};

struct CertificateHandler {
    certificate: Certificate,
}

#[async_trait]
impl InterestHandler for CertificateHandler {
    async fn on_interest(&self, interest: Interest) -> Option<Data> {
        let data = self.certificate.data();
        data.can_satisfy(&interest).then(|| data.clone())
    }
}

/// Serves a fixed set of certificates, each under its key name.
#[derive(Debug)]
pub struct CertificateProducer {
    handles: Vec<ProducerHandle>,
}

impl CertificateProducer {
    pub fn serve(face: &Face, certificates: impl IntoIterator<Item = Certificate>) -> Self {
        let handles = certificates
            .into_iter()
            .map(|certificate| {
                tracing::debug!(cert = %certificate.name(), "serving certificate");
                face.produce(
                    certificate.key_name(),
                    Arc::new(CertificateHandler { certificate }),
                )
            })
            .collect();
        Self { handles }
    }

    /// Key names being served.
    pub fn prefixes(&self) -> Vec<Name> {
        self.handles.iter().map(|h| h.prefix().clone()).collect()
    }

    /// Stop serving. Idempotent.
    pub fn close(&self) {
        for handle in &self.handles {
            handle.close();
        }
    }
}
