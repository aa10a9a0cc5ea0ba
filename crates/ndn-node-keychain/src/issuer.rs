//! Certificate Issuer.
//!
//! In delegated mode the node holds the CA key and mints its own per-session
//! identity: a fresh keypair plus a certificate the CA signs directly.

use std::time::Duration;

use ndn_node_core::certificate::naming;
use ndn_node_core::{now_millis, Certificate, Component, Keypair, Name, NamedSigner, Signer, ValidityPeriod};
use rand::Rng;

use crate::error::{KeychainError, Result};
use crate::safebag::PrivateKeyMaterial;

/// Lifetime of an issued node certificate.
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

/// [`DEFAULT_VALIDITY`] starting now.
pub fn default_validity() -> ValidityPeriod {
    ValidityPeriod::from_now(DEFAULT_VALIDITY)
}

/// A freshly minted identity.
#[derive(Debug)]
pub struct IssuedIdentity {
    /// Signs with the new key; its key locator is the certificate name.
    pub signer: NamedSigner,
    pub certificate: Certificate,
    /// The new private key, for callers that persist it.
    pub exported_key: PrivateKeyMaterial,
}

/// `<ca-identity>/node-<node-id>-<random>`
///
/// The random suffix keeps identities from successive sessions of the same
/// node distinct.
pub fn node_identity_name(ca_identity: &Name, node_id: u32) -> Name {
    let suffix: u32 = rand::thread_rng().gen();
    ca_identity.append(format!("node-{node_id}-{suffix}").as_str())
}

/// Mint a keypair for `identity` and have `issuer` certify it.
///
/// The certificate is named `<identity>/KEY/<key-id>/CA/<version>`, with the
/// version set to the current time in milliseconds.
pub fn issue(identity: &Name, issuer: &dyn Signer, validity: ValidityPeriod) -> Result<IssuedIdentity> {
    mint(identity, Some(issuer), validity)
}

/// Mint a keypair for `identity` with a self-signed certificate.
///
/// Used to create trust anchors and test CAs.
pub fn self_sign(identity: &Name, validity: ValidityPeriod) -> Result<IssuedIdentity> {
    mint(identity, None, validity)
}

fn mint(identity: &Name, issuer: Option<&dyn Signer>, validity: ValidityPeriod) -> Result<IssuedIdentity> {
    let keypair = Keypair::generate().map_err(|e| KeychainError::KeyGenerationFailure(e.to_string()))?;
    let exported_key = PrivateKeyMaterial::from_keypair(&keypair)?;

    let key_name = naming::make_key_name(identity, naming::random_key_id());
    let own = NamedSigner::new(keypair.clone(), key_name.clone());
    let (issuer_id, issuer): (&str, &dyn Signer) = match issuer {
        Some(ca) => (naming::CA_ISSUER, ca),
        None => (naming::SELF_ISSUER, &own),
    };
    let cert_name = naming::make_cert_name(&key_name, Component::generic(issuer_id), now_millis());

    let certificate = Certificate::build(cert_name, keypair.public_key(), validity, issuer)?;
    tracing::info!(cert = %certificate.name(), %validity, "issued certificate");

    Ok(IssuedIdentity {
        signer: own.with_key_locator(certificate.name().clone()),
        certificate,
        exported_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndn_node_core::Verifier;

    fn ca() -> IssuedIdentity {
        self_sign(&"/ndn/workspace".parse().unwrap(), ValidityPeriod::days_from_now(365)).unwrap()
    }

    #[test]
    fn test_issued_certificate_shape() {
        let ca = ca();
        let node = node_identity_name(&ca.certificate.identity(), 42);
        let issued = issue(&node, &ca.signer, default_validity()).unwrap();

        let cert = &issued.certificate;
        assert_eq!(cert.identity(), node);
        assert!(cert.issuer_id().is_generic_str("CA"));
        assert_eq!(cert.key_locator(), Some(ca.certificate.name()));
        assert!(!cert.is_self_signed());
        assert!(cert.data().verify(&ca.certificate.verifier()));
        assert_eq!(issued.signer.key_locator(), cert.name());
    }

    #[test]
    fn test_default_validity_is_one_day() {
        let ca = ca();
        let before = now_millis();
        let issued = issue(&"/n".parse().unwrap(), &ca.signer, default_validity()).unwrap();
        let validity = issued.certificate.validity();
        assert!(validity.not_before() >= before);
        assert_eq!(validity.not_after() - validity.not_before(), 86_400_000);
        assert!(validity.includes(now_millis()));
    }

    #[test]
    fn test_self_signed_anchor() {
        let ca = ca();
        assert!(ca.certificate.is_self_signed());
        assert!(ca.certificate.issuer_id().is_generic_str("self"));
        assert!(ca.certificate.data().verify(&ca.certificate.verifier()));
    }

    #[test]
    fn test_signer_matches_exported_key() {
        let issued = ca();
        let reloaded = issued.exported_key.keypair().unwrap();
        assert_eq!(reloaded.public_key(), *issued.certificate.public_key());

        let sig = issued.signer.sign(b"m");
        assert!(issued.certificate.verifier().verify(b"m", &sig));
    }

    #[test]
    fn test_node_names_are_distinct() {
        let ca: Name = "/ndn/workspace".parse().unwrap();
        let a = node_identity_name(&ca, 1);
        let b = node_identity_name(&ca, 1);
        assert_ne!(a, b);
        assert!(ca.is_prefix_of(&a));
        assert!(a.get(-1).unwrap().to_string().starts_with("node-1-"));
    }
}
