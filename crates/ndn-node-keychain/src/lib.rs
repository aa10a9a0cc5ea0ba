//! # NDN Node Keychain
//!
//! Everything between raw trust material and a usable signer/verifier pair.
//!
//! ## Overview
//!
//! - **Key Unwrapper** ([`safebag`]): decrypts the private key inside an
//!   [`EncryptedKeyBundle`](ndn_node_core::EncryptedKeyBundle) with a passphrase
//! - **Certificate Issuer** ([`issuer`]): mints a fresh keypair and a
//!   short-lived certificate signed by a delegating CA
//! - **Trust Store** ([`trust`]): binds a trust anchor and the node's own
//!   certificate, and exposes the session's signer and verifier
//!
//! ## Encryption Model
//!
//! Bundle keys are PKCS#8 DER encrypted with ChaCha20-Poly1305. The symmetric
//! key is derived from the passphrase with Argon2id, salted per bundle. A
//! wrong passphrase fails AEAD authentication and is reported as
//! [`KeychainError::WrongPassphrase`]; it never yields corrupt key bytes.
//!
//! ## Trust Model
//!
//! Single-hop delegation only: a certificate is trusted iff the trust anchor's
//! key signed it directly and the current time is inside its validity window.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ndn_node_core::decode_key_bundle;
//! use ndn_node_keychain::{issuer, safebag, TrustStore};
//!
//! # fn example(ca_b64: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let bundle = decode_key_bundle(ca_b64)?;
//! let (ca_cert, ca_key) = safebag::unwrap(&bundle, "123456")?;
//! let ca_signer = ca_key.to_signer(ca_cert.name().clone())?;
//!
//! let node = issuer::node_identity_name(&ca_cert.identity(), 7);
//! let issued = issuer::issue(&node, &ca_signer, issuer::default_validity())?;
//! let trust = TrustStore::build(ca_cert, issued.certificate, issued.signer)?;
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod error;
pub mod issuer;
pub mod safebag;
pub mod trust;

pub use crypto::{EncryptionKey, EncryptionNonce, KdfCost};
pub use error::{KeychainError, Result};
pub use issuer::{IssuedIdentity, DEFAULT_VALIDITY};
pub use safebag::PrivateKeyMaterial;
pub use trust::{ChainVerifier, TrustStore};
