//! Trust Store: the anchor, the node's own certificate, and the signer and
//! verifier derived from them.

use std::sync::Arc;

use ndn_node_core::certificate::naming;
use ndn_node_core::{now_millis, Certificate, Data, Name, NamedSigner};
use ndn_node_store::{Storage, StorageExt};

use crate::error::{KeychainError, Result};
use crate::safebag::PrivateKeyMaterial;

/// Storage key prefix for published certificates.
pub const CERT_STORAGE_PREFIX: &str = "certs/";

/// Storage key of a published certificate.
pub fn certificate_key(cert: &Certificate) -> String {
    format!("{CERT_STORAGE_PREFIX}{}", cert.name())
}

/// Look up a certificate for the key named by `locator` (a key or
/// certificate name) among those stored under [`CERT_STORAGE_PREFIX`].
pub async fn stored_certificate(storage: &dyn Storage, locator: &Name) -> Result<Option<Certificate>> {
    let Some(key_name) = naming::to_key_name(locator) else {
        return Ok(None);
    };
    let prefix = format!("{CERT_STORAGE_PREFIX}{key_name}");
    for key in storage.list(&prefix).await? {
        let Some(data) = storage.get_data(&key).await? else {
            continue;
        };
        let cert = Certificate::from_data(data)?;
        if cert.key_name() == key_name && (cert.name() == locator || key_name == *locator) {
            return Ok(Some(cert));
        }
    }
    Ok(None)
}

/// Checks certificates and packets against a single trust anchor.
///
/// Accepts exactly one delegation hop: a certificate must be signed
/// directly by the anchor's key, and the anchor must itself be valid.
#[derive(Debug, Clone)]
pub struct ChainVerifier {
    anchor: Certificate,
}

impl ChainVerifier {
    pub fn new(anchor: Certificate) -> Self {
        Self { anchor }
    }

    pub fn anchor(&self) -> &Certificate {
        &self.anchor
    }

    /// [`verify_certificate_at`](Self::verify_certificate_at) at the current time.
    pub fn verify_certificate(&self, cert: &Certificate) -> Result<()> {
        self.verify_certificate_at(cert, now_millis())
    }

    /// Check that `cert` is one hop from the anchor and valid at `now`.
    pub fn verify_certificate_at(&self, cert: &Certificate, now: u64) -> Result<()> {
        let untrusted = |reason: &str| KeychainError::Untrusted {
            name: cert.name().clone(),
            reason: reason.to_string(),
        };

        if cert.key_name() == self.anchor.key_name() {
            return Err(untrusted("the trust anchor is not a delegated certificate"));
        }
        let issuer_key = cert
            .key_locator()
            .and_then(naming::to_key_name)
            .ok_or_else(|| untrusted("missing or malformed key locator"))?;
        if issuer_key != self.anchor.key_name() {
            return Err(untrusted("key locator does not name the trust anchor"));
        }
        if !cert.data().verify(&self.anchor.verifier()) {
            return Err(untrusted("signature does not verify under the anchor key"));
        }
        if !self.anchor.validity().includes(now) {
            return Err(KeychainError::Expired {
                name: self.anchor.name().clone(),
                validity: *self.anchor.validity(),
            });
        }
        if !cert.validity().includes(now) {
            return Err(KeychainError::Expired {
                name: cert.name().clone(),
                validity: *cert.validity(),
            });
        }
        Ok(())
    }

    /// [`verify_data_at`](Self::verify_data_at) at the current time.
    pub fn verify_data(&self, data: &Data, signer_cert: &Certificate) -> Result<()> {
        self.verify_data_at(data, signer_cert, now_millis())
    }

    /// Validate a peer's packet: first its certificate, then the packet
    /// signature under that certificate's key.
    pub fn verify_data_at(&self, data: &Data, signer_cert: &Certificate, now: u64) -> Result<()> {
        self.verify_certificate_at(signer_cert, now)?;

        let untrusted = |reason: &str| KeychainError::Untrusted {
            name: data.name.clone(),
            reason: reason.to_string(),
        };
        let locator = data
            .sig_info
            .key_locator
            .as_ref()
            .and_then(naming::to_key_name)
            .ok_or_else(|| untrusted("missing or malformed key locator"))?;
        if locator != signer_cert.key_name() {
            return Err(untrusted("key locator does not match the signer certificate"));
        }
        if !data.verify(&signer_cert.verifier()) {
            return Err(untrusted("bad signature"));
        }
        Ok(())
    }

    /// Validate a packet whose signer certificate is in `storage`.
    ///
    /// Returns the signer certificate. An unknown key locator is
    /// `Untrusted`.
    pub async fn verify_stored_data(&self, data: &Data, storage: &dyn Storage) -> Result<Certificate> {
        let untrusted = |reason: &str| KeychainError::Untrusted {
            name: data.name.clone(),
            reason: reason.to_string(),
        };
        let locator = data
            .sig_info
            .key_locator
            .as_ref()
            .ok_or_else(|| untrusted("missing key locator"))?;
        let signer_cert = stored_certificate(storage, locator)
            .await?
            .ok_or_else(|| untrusted("no stored certificate for the key locator"))?;
        self.verify_data(data, &signer_cert)?;
        Ok(signer_cert)
    }
}

/// The session's trust material. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct TrustStore {
    certificate: Certificate,
    signer: Arc<NamedSigner>,
    verifier: Arc<ChainVerifier>,
}

impl TrustStore {
    /// Bind `anchor`, the node's `certificate` and its `signer`.
    pub fn build(anchor: Certificate, certificate: Certificate, signer: NamedSigner) -> Result<Self> {
        Self::build_at(anchor, certificate, signer, now_millis())
    }

    /// [`build`](Self::build) evaluated at `now`.
    pub fn build_at(
        anchor: Certificate,
        certificate: Certificate,
        signer: NamedSigner,
        now: u64,
    ) -> Result<Self> {
        let verifier = ChainVerifier::new(anchor);
        verifier.verify_certificate_at(&certificate, now)?;

        if signer.public_key() != *certificate.public_key() {
            return Err(KeychainError::Untrusted {
                name: certificate.name().clone(),
                reason: "signer key does not match the certificate".into(),
            });
        }
        let signer = signer.with_key_locator(certificate.name().clone());

        tracing::info!(
            anchor = %verifier.anchor().name(),
            cert = %certificate.name(),
            "trust store ready"
        );
        Ok(Self {
            certificate,
            signer: Arc::new(signer),
            verifier: Arc::new(verifier),
        })
    }

    /// Build from an unwrapped private key rather than a signer.
    pub fn import(anchor: Certificate, certificate: Certificate, key: &PrivateKeyMaterial) -> Result<Self> {
        let signer = key.to_signer(certificate.name().clone())?;
        Self::build(anchor, certificate, signer)
    }

    pub fn anchor(&self) -> &Certificate {
        self.verifier.anchor()
    }

    /// The node's own certificate.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Signs with the node key; the key locator is the certificate name.
    pub fn signer(&self) -> Arc<NamedSigner> {
        self.signer.clone()
    }

    pub fn verifier(&self) -> Arc<ChainVerifier> {
        self.verifier.clone()
    }

    /// Write the anchor and own certificate to `storage` under
    /// `certs/<certificate name>`.
    pub async fn publish(&self, storage: &dyn Storage) -> Result<()> {
        for cert in [self.anchor(), &self.certificate] {
            let key = certificate_key(cert);
            storage.put_data(&key, cert.data()).await?;
            tracing::debug!(%key, "published certificate");
        }
        Ok(())
    }
}
