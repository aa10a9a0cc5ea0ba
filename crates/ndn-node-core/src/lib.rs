//! # NDN Node Core
//!
//! Pure primitives for bootstrapping a node into an NDN trust domain: names,
//! packets, certificates, signers and the base64/CBOR codec.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Name`] / [`Component`] - Hierarchical, immutable NDN names
//! - [`Data`] / [`Interest`] - Signed packets
//! - [`Certificate`] - A Data packet binding `<identity>/KEY/<key-id>/<issuer>/<version>`
//!   to a public key and a validity window
//! - [`EncryptedKeyBundle`] - A certificate with its password-protected private key
//! - [`Signer`] / [`Verifier`] - Signing and verification capabilities
//!
//! ## Wire Format
//!
//! Packets are CBOR; trust material is exchanged as base64. Signatures cover a
//! canonical CBOR encoding of the signed portion, see [`canonical`].

pub mod bundle;
pub mod canonical;
pub mod certificate;
pub mod codec;
pub mod crypto;
pub mod error;
pub mod name;
pub mod packet;
pub mod security;

pub use bundle::{EncryptedKey, EncryptedKeyBundle, KdfParams};
pub use certificate::{naming, Certificate};
pub use codec::{
    decode_base64, decode_certificate, decode_key_bundle, encode_base64, encode_certificate,
    encode_key_bundle,
};
pub use crypto::{Blake3Hash, Ed25519PublicKey, Keypair};
pub use error::{CodecError, CoreError};
pub use name::{Component, Name};
pub use packet::{
    ContentType, Data, Interest, Packet, SignatureInfo, SignatureType, SignatureValue,
    ValidityPeriod,
};
pub use security::{DigestSigner, DigestVerifier, NamedSigner, NamedVerifier, Signer, Verifier};

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
