//! Signing and verification capabilities.
//!
//! A [`Signer`] exposes signature metadata and `sign(bytes)`; it never hands
//! out key material. A [`Verifier`] is its dual.

use bytes::Bytes;
use std::fmt;

use crate::crypto::{Blake3Hash, Ed25519PublicKey, Keypair};
use crate::name::Name;
use crate::packet::{SignatureInfo, SignatureValue};

/// Something that can sign packets.
pub trait Signer: Send + Sync {
    /// Metadata describing signatures produced by this signer.
    fn signature_info(&self) -> SignatureInfo;

    /// Sign `message`.
    fn sign(&self, message: &[u8]) -> SignatureValue;
}

/// Something that can check signatures.
pub trait Verifier: Send + Sync {
    /// Whether `signature` is valid over `message`.
    fn verify(&self, message: &[u8], signature: &SignatureValue) -> bool;
}

/// Ed25519 signer that advertises a key locator name.
#[derive(Clone)]
pub struct NamedSigner {
    keypair: Keypair,
    key_locator: Name,
}

impl NamedSigner {
    pub fn new(keypair: Keypair, key_locator: Name) -> Self {
        Self {
            keypair,
            key_locator,
        }
    }

    /// The same key advertised under a different locator (e.g. the
    /// certificate name instead of the key name).
    pub fn with_key_locator(&self, key_locator: Name) -> Self {
        Self::new(self.keypair.clone(), key_locator)
    }

    pub fn key_locator(&self) -> &Name {
        &self.key_locator
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair.public_key()
    }
}

impl Signer for NamedSigner {
    fn signature_info(&self) -> SignatureInfo {
        SignatureInfo::ed25519(self.key_locator.clone())
    }

    fn sign(&self, message: &[u8]) -> SignatureValue {
        SignatureValue(Bytes::copy_from_slice(&self.keypair.sign(message)))
    }
}

impl fmt::Debug for NamedSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedSigner")
            .field("key_locator", &self.key_locator)
            .field("public_key", &self.keypair.public_key())
            .finish()
    }
}

/// Null signer: the "signature" is a Blake3 digest of the signed portion.
///
/// Used for management commands to a same-host daemon, which trusts local
/// clients without checking identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestSigner;

impl Signer for DigestSigner {
    fn signature_info(&self) -> SignatureInfo {
        SignatureInfo::digest()
    }

    fn sign(&self, message: &[u8]) -> SignatureValue {
        SignatureValue(Bytes::copy_from_slice(Blake3Hash::hash(message).as_bytes()))
    }
}

/// Checks digest-only signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestVerifier;

impl Verifier for DigestVerifier {
    fn verify(&self, message: &[u8], signature: &SignatureValue) -> bool {
        signature.as_bytes() == Blake3Hash::hash(message).as_bytes()
    }
}

/// Ed25519 verifier bound to a named public key.
#[derive(Debug, Clone)]
pub struct NamedVerifier {
    public_key: Ed25519PublicKey,
    name: Name,
}

impl NamedVerifier {
    pub fn new(public_key: Ed25519PublicKey, name: Name) -> Self {
        Self { public_key, name }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn public_key(&self) -> &Ed25519PublicKey {
        &self.public_key
    }
}

impl Verifier for NamedVerifier {
    fn verify(&self, message: &[u8], signature: &SignatureValue) -> bool {
        self.public_key.verify(message, signature.as_bytes()).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_signer_is_keyless() {
        let info = DigestSigner.signature_info();
        assert!(info.key_locator.is_none());
        let sig = DigestSigner.sign(b"cmd");
        assert!(DigestVerifier.verify(b"cmd", &sig));
        assert!(!DigestVerifier.verify(b"cmd2", &sig));
    }

    #[test]
    fn test_named_verifier_rejects_digest() {
        let keypair = Keypair::from_seed(&[3; 32]);
        let verifier = NamedVerifier::new(keypair.public_key(), "/k".parse().unwrap());
        let digest = DigestSigner.sign(b"cmd");
        assert!(!verifier.verify(b"cmd", &digest));
    }

    #[test]
    fn test_with_key_locator_keeps_key() {
        let signer = NamedSigner::new(Keypair::from_seed(&[4; 32]), "/a/KEY/k".parse().unwrap());
        let rebound = signer.with_key_locator("/a/KEY/k/CA/v=1".parse().unwrap());
        assert_eq!(signer.public_key(), rebound.public_key());
        assert_eq!(rebound.key_locator().len(), 5);
    }
}
