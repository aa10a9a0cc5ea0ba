//! Certificates: Data packets that bind a key name to a public key.
//!
//! A certificate name always has the form
//! `<identity>/KEY/<key-id>/<issuer-id>/<version>`; the content is the raw
//! Ed25519 public key and the signature info carries the validity window.

use bytes::Bytes;
use std::fmt;
use std::time::Duration;

use crate::crypto::Ed25519PublicKey;
use crate::error::CodecError;
use crate::name::{Component, Name};
use crate::packet::{ContentType, Data, ValidityPeriod};
use crate::security::{NamedVerifier, Signer};

/// Freshness advertised on certificate packets.
pub const CERT_FRESHNESS: Duration = Duration::from_secs(3600);

/// Certificate and key naming conventions.
pub mod naming {
    use rand::RngCore;

    use crate::name::{Component, Name};

    /// Marker component between identity and key id.
    pub const KEY: &str = "KEY";

    /// Issuer id of self-signed certificates.
    pub const SELF_ISSUER: &str = "self";

    /// Issuer id used by the delegating CA.
    pub const CA_ISSUER: &str = "CA";

    /// A fresh 8-byte random key id.
    pub fn random_key_id() -> Component {
        let mut id = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut id);
        Component::generic(id)
    }

    /// `<identity>/KEY/<key-id>`
    pub fn make_key_name(identity: &Name, key_id: Component) -> Name {
        identity.append(KEY).append(key_id)
    }

    /// `<key-name>/<issuer-id>/<version>`
    pub fn make_cert_name(key_name: &Name, issuer_id: Component, version: u64) -> Name {
        key_name.append(issuer_id).append(Component::version(version))
    }

    /// Whether `name` has the shape of a key name.
    pub fn is_key_name(name: &Name) -> bool {
        name.len() >= 2 && name.get(-2).is_some_and(|c| c.is_generic_str(KEY))
    }

    /// Whether `name` has the shape of a certificate name.
    pub fn is_cert_name(name: &Name) -> bool {
        name.len() >= 4
            && name.get(-4).is_some_and(|c| c.is_generic_str(KEY))
            && name.get(-1).is_some_and(|c| c.as_version().is_some())
    }

    /// The key name of a key or certificate name.
    pub fn to_key_name(name: &Name) -> Option<Name> {
        if is_cert_name(name) {
            Some(name.get_prefix(-2))
        } else if is_key_name(name) {
            Some(name.clone())
        } else {
            None
        }
    }

    /// The identity of a key or certificate name.
    pub fn to_identity_name(name: &Name) -> Option<Name> {
        to_key_name(name).map(|key| key.get_prefix(-2))
    }
}

/// A decoded, structurally valid certificate. Never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    data: Data,
    public_key: Ed25519PublicKey,
    validity: ValidityPeriod,
}

impl Certificate {
    /// Interpret a Data packet as a certificate.
    ///
    /// Fails with `SchemaMismatch` if the packet is not a certificate.
    pub fn from_data(data: Data) -> Result<Self, CodecError> {
        if !naming::is_cert_name(&data.name) {
            return Err(CodecError::SchemaMismatch(format!(
                "{} is not a certificate name",
                data.name
            )));
        }
        if data.content_type != ContentType::Key {
            return Err(CodecError::SchemaMismatch(format!(
                "content type {:?} is not Key",
                data.content_type
            )));
        }
        let public_key = Ed25519PublicKey::from_slice(&data.content).map_err(|_| {
            CodecError::SchemaMismatch(format!(
                "public key must be 32 bytes, got {}",
                data.content.len()
            ))
        })?;
        let validity = data
            .sig_info
            .validity
            .ok_or_else(|| CodecError::SchemaMismatch("missing validity period".into()))?;
        if data.sig_value.is_empty() {
            return Err(CodecError::SchemaMismatch("certificate is unsigned".into()));
        }
        Ok(Self {
            data,
            public_key,
            validity,
        })
    }

    /// Build and sign a certificate for `public_key` named `name`.
    pub fn build(
        name: Name,
        public_key: Ed25519PublicKey,
        validity: ValidityPeriod,
        issuer: &dyn Signer,
    ) -> Result<Self, CodecError> {
        let data = Data::new(name, Bytes::copy_from_slice(public_key.as_bytes()))
            .with_content_type(ContentType::Key)
            .with_freshness(CERT_FRESHNESS)
            .with_validity(validity)
            .sign(issuer);
        Self::from_data(data)
    }

    /// Decode from wire bytes.
    pub fn from_wire(wire: &[u8]) -> Result<Self, CodecError> {
        Self::from_data(Data::from_wire(wire)?)
    }

    /// Encode to wire bytes.
    pub fn to_wire(&self) -> Vec<u8> {
        self.data.to_wire()
    }

    pub fn name(&self) -> &Name {
        &self.data.name
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn public_key(&self) -> &Ed25519PublicKey {
        &self.public_key
    }

    pub fn validity(&self) -> &ValidityPeriod {
        &self.validity
    }

    /// `<identity>`
    pub fn identity(&self) -> Name {
        self.data.name.get_prefix(-4)
    }

    /// `<identity>/KEY/<key-id>`
    pub fn key_name(&self) -> Name {
        self.data.name.get_prefix(-2)
    }

    /// The issuer id component.
    pub fn issuer_id(&self) -> &Component {
        // Shape was checked in from_data.
        &self.data.name.components()[self.data.name.len() - 2]
    }

    /// The name the issuer's signature points at.
    pub fn key_locator(&self) -> Option<&Name> {
        self.data.sig_info.key_locator.as_ref()
    }

    /// Whether the certificate was signed by its own key.
    pub fn is_self_signed(&self) -> bool {
        self.key_locator()
            .and_then(naming::to_key_name)
            .is_some_and(|k| k == self.key_name())
    }

    /// A verifier for signatures made by this certificate's key.
    pub fn verifier(&self) -> NamedVerifier {
        NamedVerifier::new(self.public_key, self.key_name())
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("name", &self.data.name)
            .field("validity", &self.validity)
            .field("key_locator", &self.key_locator())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::security::NamedSigner;

    fn self_signed(identity: &str, seed: u8) -> Certificate {
        let keypair = Keypair::from_seed(&[seed; 32]);
        let identity: Name = identity.parse().unwrap();
        let key_name = naming::make_key_name(&identity, naming::random_key_id());
        let cert_name = naming::make_cert_name(&key_name, Component::generic(naming::SELF_ISSUER), 1);
        let signer = NamedSigner::new(keypair.clone(), key_name);
        Certificate::build(cert_name, keypair.public_key(), ValidityPeriod::new(0, u64::MAX), &signer)
            .unwrap()
    }

    #[test]
    fn test_name_structure() {
        let cert = self_signed("/ndn/weekly-call", 1);
        assert_eq!(cert.identity().to_string(), "/ndn/weekly-call");
        assert_eq!(cert.name().len(), 6);
        assert!(cert.issuer_id().is_generic_str("self"));
        assert!(cert.is_self_signed());
        assert!(cert.data().verify(&cert.verifier()));
    }

    #[test]
    fn test_naming_helpers() {
        let cert: Name = "/a/b/KEY/k/CA/v=3".parse().unwrap();
        assert!(naming::is_cert_name(&cert));
        assert!(!naming::is_key_name(&cert));
        assert_eq!(naming::to_key_name(&cert).unwrap().to_string(), "/a/b/KEY/k");
        assert_eq!(naming::to_identity_name(&cert).unwrap().to_string(), "/a/b");

        let key: Name = "/a/b/KEY/k".parse().unwrap();
        assert_eq!(naming::to_key_name(&key).unwrap(), key);

        let plain: Name = "/a/b".parse().unwrap();
        assert!(naming::to_key_name(&plain).is_none());
    }

    #[test]
    fn test_non_key_content_is_schema_mismatch() {
        let cert = self_signed("/x", 2);
        let mut data = cert.data().clone();
        data.content_type = ContentType::Blob;
        assert!(matches!(Certificate::from_data(data), Err(CodecError::SchemaMismatch(_))));
    }

    #[test]
    fn test_plain_data_is_schema_mismatch() {
        let data = Data::new("/x/y".parse().unwrap(), Bytes::from_static(b"doc"));
        assert!(matches!(Certificate::from_data(data), Err(CodecError::SchemaMismatch(_))));
    }

    #[test]
    fn test_wire_roundtrip_preserves_signature() {
        let cert = self_signed("/x", 3);
        let decoded = Certificate::from_wire(&cert.to_wire()).unwrap();
        assert_eq!(decoded, cert);
        assert!(decoded.data().verify(&cert.verifier()));
    }
}
