//! Trust-domain fixtures.

use std::time::Duration;

use ndn_node_core::{encode_certificate, encode_key_bundle, Name, ValidityPeriod};
use ndn_node_keychain::{issuer, safebag, IssuedIdentity, KdfCost};

/// Passphrase of every bundle sealed by the fixtures.
pub const PASSPHRASE: &str = "123456";

/// Argon2id cost low enough for tests.
pub fn test_kdf_cost() -> KdfCost {
    KdfCost {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }
}

/// A trust domain with a self-signed anchor.
pub struct TrustDomain {
    pub anchor: IssuedIdentity,
}

impl TrustDomain {
    /// Anchor for `identity`, valid for a year.
    pub fn new(identity: &str) -> Self {
        let identity: Name = identity.parse().expect("fixture identity");
        let anchor = issuer::self_sign(&identity, ValidityPeriod::days_from_now(365))
            .expect("fixture anchor");
        Self { anchor }
    }

    pub fn identity(&self) -> Name {
        self.anchor.certificate.identity()
    }

    /// The anchor certificate in base64.
    pub fn anchor_base64(&self) -> String {
        encode_certificate(&self.anchor.certificate)
    }

    /// The anchor's own key sealed under `passphrase`, the input of a
    /// delegated-identity session.
    pub fn anchor_bundle(&self, passphrase: &str) -> String {
        seal(&self.anchor, passphrase)
    }

    /// A certificate for `identity` signed by the anchor.
    pub fn issue(&self, identity: &str, validity: Duration) -> IssuedIdentity {
        let identity: Name = identity.parse().expect("fixture identity");
        issuer::issue(&identity, &self.anchor.signer, ValidityPeriod::from_now(validity))
            .expect("fixture issue")
    }

    /// [`issue`](Self::issue) sealed under `passphrase`, the input of a
    /// fixed-identity session.
    pub fn node_bundle(&self, identity: &str, passphrase: &str) -> (IssuedIdentity, String) {
        let issued = self.issue(identity, issuer::DEFAULT_VALIDITY);
        let bundle = seal(&issued, passphrase);
        (issued, bundle)
    }
}

/// Seal `identity` in base64.
pub fn seal(identity: &IssuedIdentity, passphrase: &str) -> String {
    let bundle = safebag::seal(
        identity.certificate.clone(),
        &identity.exported_key,
        passphrase,
        test_kdf_cost(),
    )
    .expect("fixture seal");
    encode_key_bundle(&bundle)
}
