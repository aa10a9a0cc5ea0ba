//! Encrypted key bundles ("safe bags").
//!
//! A bundle carries a certificate and the matching private key, encrypted
//! under a passphrase. This module only defines the container; decryption
//! lives in the keychain crate.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::certificate::Certificate;
use crate::codec::{from_cbor, to_cbor};
use crate::error::CodecError;
use crate::packet::Data;

/// Current bundle format version.
pub const BUNDLE_VERSION: u8 = 1;

/// The only supported key derivation function.
pub const KDF_ARGON2ID: &str = "argon2id";

/// The only supported cipher.
pub const CIPHER_CHACHA20_POLY1305: &str = "chacha20-poly1305";

/// Largest Argon2 memory cost a bundle may ask for (1 GiB).
pub const MAX_KDF_MEMORY_KIB: u32 = 1024 * 1024;

/// Largest Argon2 pass count a bundle may ask for.
pub const MAX_KDF_ITERATIONS: u32 = 16;

/// Largest Argon2 lane count a bundle may ask for.
pub const MAX_KDF_PARALLELISM: u32 = 16;

/// Passphrase key-derivation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub algorithm: String,
    pub salt: Bytes,
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl KdfParams {
    /// Describes the first cost parameter above its maximum, if any.
    ///
    /// The parameters travel inside the bundle, so they are checked before
    /// any derivation allocates memory for them.
    pub fn excessive_cost(&self) -> Option<String> {
        if self.memory_kib > MAX_KDF_MEMORY_KIB {
            Some(format!(
                "kdf memory {} KiB exceeds {MAX_KDF_MEMORY_KIB} KiB",
                self.memory_kib
            ))
        } else if self.iterations > MAX_KDF_ITERATIONS {
            Some(format!(
                "kdf iterations {} exceed {MAX_KDF_ITERATIONS}",
                self.iterations
            ))
        } else if self.parallelism > MAX_KDF_PARALLELISM {
            Some(format!(
                "kdf parallelism {} exceeds {MAX_KDF_PARALLELISM}",
                self.parallelism
            ))
        } else {
            None
        }
    }
}

/// Encrypted PKCS#8 private key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKey {
    pub kdf: KdfParams,
    pub cipher: String,
    pub nonce: Bytes,
    pub ciphertext: Bytes,
}

/// A certificate plus its password-protected private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedKeyBundle {
    certificate: Certificate,
    encrypted_key: EncryptedKey,
}

#[derive(Serialize, Deserialize)]
struct BundleWire {
    version: u8,
    certificate: Data,
    encrypted_key: EncryptedKey,
}

impl EncryptedKeyBundle {
    pub fn new(certificate: Certificate, encrypted_key: EncryptedKey) -> Self {
        Self {
            certificate,
            encrypted_key,
        }
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn encrypted_key(&self) -> &EncryptedKey {
        &self.encrypted_key
    }

    /// Encode to wire bytes.
    pub fn to_wire(&self) -> Vec<u8> {
        to_cbor(&BundleWire {
            version: BUNDLE_VERSION,
            certificate: self.certificate.data().clone(),
            encrypted_key: self.encrypted_key.clone(),
        })
    }

    /// Decode from wire bytes.
    pub fn from_wire(wire: &[u8]) -> Result<Self, CodecError> {
        let raw: BundleWire = from_cbor(wire)?;
        if raw.version != BUNDLE_VERSION {
            return Err(CodecError::SchemaMismatch(format!(
                "unsupported bundle version {}",
                raw.version
            )));
        }
        if raw.encrypted_key.kdf.algorithm != KDF_ARGON2ID {
            return Err(CodecError::SchemaMismatch(format!(
                "unsupported kdf {}",
                raw.encrypted_key.kdf.algorithm
            )));
        }
        if let Some(reason) = raw.encrypted_key.kdf.excessive_cost() {
            return Err(CodecError::SchemaMismatch(reason));
        }
        if raw.encrypted_key.cipher != CIPHER_CHACHA20_POLY1305 {
            return Err(CodecError::SchemaMismatch(format!(
                "unsupported cipher {}",
                raw.encrypted_key.cipher
            )));
        }
        if raw.encrypted_key.nonce.len() != 12 {
            return Err(CodecError::SchemaMismatch(format!(
                "nonce must be 12 bytes, got {}",
                raw.encrypted_key.nonce.len()
            )));
        }
        let certificate = Certificate::from_data(raw.certificate)?;
        Ok(Self::new(certificate, raw.encrypted_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(memory_kib: u32, iterations: u32, parallelism: u32) -> KdfParams {
        KdfParams {
            algorithm: KDF_ARGON2ID.to_string(),
            salt: Bytes::from_static(&[0; 16]),
            memory_kib,
            iterations,
            parallelism,
        }
    }

    #[test]
    fn test_kdf_cost_limits() {
        assert!(params(19 * 1024, 2, 1).excessive_cost().is_none());
        assert!(params(MAX_KDF_MEMORY_KIB, MAX_KDF_ITERATIONS, MAX_KDF_PARALLELISM)
            .excessive_cost()
            .is_none());

        assert!(params(u32::MAX, 2, 1).excessive_cost().is_some());
        assert!(params(64, MAX_KDF_ITERATIONS + 1, 1).excessive_cost().is_some());
        assert!(params(64, 1, MAX_KDF_PARALLELISM + 1).excessive_cost().is_some());
    }
}
