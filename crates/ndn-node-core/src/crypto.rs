//! Key material behind the signers in [`crate::security`].
//!
//! Certificates carry raw 32-byte Ed25519 public keys, and private keys
//! travel inside safebags as PKCS#8 DER.

use ed25519_dalek::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

fn short_hex(bytes: &[u8; 32]) -> String {
    hex::encode(&bytes[..8])
}

/// Blake3 digest, used for digest signatures on local management commands.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Blake3Hash(pub [u8; 32]);

impl Blake3Hash {
    pub fn hash(data: &[u8]) -> Self {
        Self(blake3::hash(data).into())
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Blake3Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({}..)", short_hex(&self.0))
    }
}

/// Public half of a node or anchor key, as stored in certificate content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    /// Certificate content must be exactly one raw key.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        <[u8; 32]>::try_from(bytes)
            .map(Self)
            .map_err(|_| CoreError::InvalidPublicKey)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CoreError> {
        let key = VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;
        let signature =
            Signature::from_slice(signature).map_err(|_| CoreError::InvalidSignature)?;
        key.verify(message, &signature)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}..)", short_hex(&self.0))
    }
}

/// A private signing key. The inner `SigningKey` zeroizes on drop.
#[derive(Clone)]
pub struct Keypair(SigningKey);

impl Keypair {
    /// Fresh key from OS entropy.
    pub fn generate() -> Result<Self, CoreError> {
        let mut seed = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| CoreError::Entropy(e.to_string()))?;
        let keypair = Self::from_seed(&seed);
        seed.fill(0);
        Ok(keypair)
    }

    /// Deterministic key, for fixtures.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self(SigningKey::from_bytes(seed))
    }

    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, CoreError> {
        SigningKey::from_pkcs8_der(der)
            .map(Self)
            .map_err(|e| CoreError::KeyEncoding(e.to_string()))
    }

    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>, CoreError> {
        self.0
            .to_pkcs8_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| CoreError::KeyEncoding(e.to_string()))
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.0.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.0.sign(message).to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Keypair").field(&self.public_key()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_binds_message() {
        let keypair = Keypair::generate().unwrap();
        let signature = keypair.sign(b"/ndn/workspace/node");

        assert!(keypair.public_key().verify(b"/ndn/workspace/node", &signature).is_ok());
        assert!(keypair.public_key().verify(b"/ndn/workspace/nodE", &signature).is_err());
    }

    #[test]
    fn test_pkcs8_reload_keeps_public_key() {
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let reloaded = Keypair::from_pkcs8_der(&keypair.to_pkcs8_der().unwrap()).unwrap();
        assert_eq!(keypair.public_key(), reloaded.public_key());
    }

    #[test]
    fn test_pkcs8_garbage_rejected() {
        assert!(matches!(
            Keypair::from_pkcs8_der(&[0x30, 0x03, 0x02, 0x01]),
            Err(CoreError::KeyEncoding(_))
        ));
    }

    #[test]
    fn test_public_key_length() {
        assert!(Ed25519PublicKey::from_slice(&[0u8; 31]).is_err());
        assert!(Ed25519PublicKey::from_slice(&[0u8; 32]).is_ok());
    }

    #[test]
    fn test_short_signature_rejected() {
        let keypair = Keypair::from_seed(&[1; 32]);
        assert!(keypair.public_key().verify(b"m", &[0u8; 10]).is_err());
    }
}
