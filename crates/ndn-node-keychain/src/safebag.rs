//! Key Unwrapper: opening and sealing encrypted key bundles.

use bytes::Bytes;
use std::fmt;

use ndn_node_core::bundle::CIPHER_CHACHA20_POLY1305;
use ndn_node_core::{Certificate, EncryptedKey, EncryptedKeyBundle, Keypair, Name, NamedSigner};

use crate::crypto::{EncryptionKey, EncryptionNonce, KdfCost};
use crate::error::{KeychainError, Result};

/// Decrypted PKCS#8 private key. Zeroed on drop, redacted in debug output.
pub struct PrivateKeyMaterial(Vec<u8>);

impl PrivateKeyMaterial {
    /// Wrap PKCS#8 DER bytes.
    pub fn from_pkcs8_der(der: Vec<u8>) -> Self {
        Self(der)
    }

    /// Export a keypair.
    pub fn from_keypair(keypair: &Keypair) -> Result<Self> {
        let der = keypair
            .to_pkcs8_der()
            .map_err(|e| KeychainError::KeyGenerationFailure(e.to_string()))?;
        Ok(Self(der))
    }

    pub fn as_pkcs8_der(&self) -> &[u8] {
        &self.0
    }

    /// Parse the key.
    pub fn keypair(&self) -> Result<Keypair> {
        Keypair::from_pkcs8_der(&self.0).map_err(|e| KeychainError::CorruptBundle(e.to_string()))
    }

    /// A signer for this key advertising `key_locator`.
    pub fn to_signer(&self, key_locator: Name) -> Result<NamedSigner> {
        Ok(NamedSigner::new(self.keypair()?, key_locator))
    }
}

impl Drop for PrivateKeyMaterial {
    fn drop(&mut self) {
        self.0.fill(0);
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKeyMaterial([REDACTED; {}])", self.0.len())
    }
}

/// Decrypt the private key of `bundle`.
///
/// Returns the bundle's certificate together with the key. The key must
/// match the certificate's public key.
pub fn unwrap(
    bundle: &EncryptedKeyBundle,
    passphrase: &str,
) -> Result<(Certificate, PrivateKeyMaterial)> {
    let sealed = bundle.encrypted_key();
    if sealed.cipher != CIPHER_CHACHA20_POLY1305 {
        return Err(KeychainError::CorruptBundle(format!(
            "unsupported cipher {}",
            sealed.cipher
        )));
    }
    let nonce = EncryptionNonce::from_slice(&sealed.nonce)?;
    let key = EncryptionKey::derive(passphrase, &sealed.kdf)?;
    let material = PrivateKeyMaterial(key.decrypt(&sealed.ciphertext, &nonce)?);

    let keypair = material.keypair()?;
    let certificate = bundle.certificate();
    if keypair.public_key() != *certificate.public_key() {
        return Err(KeychainError::CorruptBundle(format!(
            "private key does not match {}",
            certificate.name()
        )));
    }
    tracing::debug!(cert = %certificate.name(), "unwrapped key bundle");
    Ok((certificate.clone(), material))
}

/// [`unwrap`] on the blocking pool; key derivation is deliberately slow.
pub async fn unwrap_async(
    bundle: EncryptedKeyBundle,
    passphrase: String,
) -> Result<(Certificate, PrivateKeyMaterial)> {
    tokio::task::spawn_blocking(move || unwrap(&bundle, &passphrase))
        .await
        .map_err(|e| KeychainError::EncryptionError(format!("unwrap task failed: {e}")))?
}

/// Encrypt `key` under `passphrase` and pair it with `certificate`.
pub fn seal(
    certificate: Certificate,
    key: &PrivateKeyMaterial,
    passphrase: &str,
    cost: KdfCost,
) -> Result<EncryptedKeyBundle> {
    let kdf = cost.params();
    let nonce = EncryptionNonce::generate();
    let ciphertext = EncryptionKey::derive(passphrase, &kdf)?.encrypt(key.as_pkcs8_der(), &nonce)?;
    Ok(EncryptedKeyBundle::new(
        certificate,
        EncryptedKey {
            kdf,
            cipher: CIPHER_CHACHA20_POLY1305.to_string(),
            nonce: Bytes::copy_from_slice(nonce.as_bytes()),
            ciphertext: Bytes::from(ciphertext),
        },
    ))
}
