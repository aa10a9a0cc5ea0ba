//! Symmetric cryptography for key bundles.
//!
//! Provides Argon2id passphrase derivation and ChaCha20-Poly1305
//! authenticated encryption.

use argon2::{Algorithm, Argon2, Params, Version};
use bytes::Bytes;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;

use ndn_node_core::bundle::KDF_ARGON2ID;
use ndn_node_core::KdfParams;

use crate::error::{KeychainError, Result};

/// Argon2id cost parameters used when sealing a new bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfCost {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl KdfCost {
    /// Fresh parameters with a random 16-byte salt.
    pub fn params(&self) -> KdfParams {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        KdfParams {
            algorithm: KDF_ARGON2ID.to_string(),
            salt: Bytes::copy_from_slice(&salt),
            memory_kib: self.memory_kib,
            iterations: self.iterations,
            parallelism: self.parallelism,
        }
    }
}

/// A 256-bit symmetric key for ChaCha20-Poly1305. Zeroed on drop.
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Derive a key from a passphrase.
    ///
    /// Invalid parameters mean the bundle itself is unusable, so they are
    /// reported as `CorruptBundle`.
    pub fn derive(passphrase: &str, kdf: &KdfParams) -> Result<Self> {
        if kdf.algorithm != KDF_ARGON2ID {
            return Err(KeychainError::CorruptBundle(format!(
                "unsupported kdf {}",
                kdf.algorithm
            )));
        }
        if let Some(reason) = kdf.excessive_cost() {
            return Err(KeychainError::CorruptBundle(reason));
        }
        let params = Params::new(kdf.memory_kib, kdf.iterations, kdf.parallelism, Some(32))
            .map_err(|e| KeychainError::CorruptBundle(format!("invalid kdf parameters: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = [0u8; 32];
        argon2
            .hash_password_into(passphrase.as_bytes(), &kdf.salt, &mut key)
            .map_err(|e| KeychainError::CorruptBundle(format!("key derivation failed: {e}")))?;
        Ok(Self(key))
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Encrypt data with this key.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| KeychainError::EncryptionError(e.to_string()))?;
        cipher
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| KeychainError::EncryptionError(e.to_string()))
    }

    /// Decrypt data with this key. Authentication failure is `WrongPassphrase`.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| KeychainError::EncryptionError(e.to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|_| KeychainError::WrongPassphrase)
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        self.0.fill(0);
    }
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptionNonce(pub [u8; 12]);

impl EncryptionNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parse from a slice; fails unless it is exactly 12 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 12] = bytes
            .try_into()
            .map_err(|_| KeychainError::CorruptBundle(format!("nonce must be 12 bytes, got {}", bytes.len())))?;
        Ok(Self(arr))
    }

    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}
