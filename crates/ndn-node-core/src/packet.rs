//! Data and Interest packets.
//!
//! Packets travel as CBOR. A signature covers the canonical encoding of the
//! packet's signed portion (see [`crate::canonical`]), never the serde output.

use bytes::Bytes;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::canonical::{self, data_keys, interest_keys, Canon};
use crate::codec::{from_cbor, to_cbor};
use crate::error::CodecError;
use crate::name::{Component, Name};
use crate::security::{Signer, Verifier};

/// Default Interest lifetime.
pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_millis(4000);

/// How the content of a Data packet is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Blob,
    Link,
    Key,
    Nack,
}

impl ContentType {
    fn code(self) -> u64 {
        match self {
            ContentType::Blob => 0,
            ContentType::Link => 1,
            ContentType::Key => 2,
            ContentType::Nack => 3,
        }
    }
}

/// Signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureType {
    /// Integrity only: a Blake3 digest of the signed portion, no key.
    DigestBlake3,
    /// Ed25519 signature by a named key.
    Ed25519,
}

impl SignatureType {
    /// Numeric code used in the signed portion.
    pub fn code(self) -> u64 {
        match self {
            SignatureType::DigestBlake3 => 0,
            SignatureType::Ed25519 => 5,
        }
    }
}

/// A certificate validity window, in Unix milliseconds (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidityPeriod {
    not_before: u64,
    not_after: u64,
}

impl ValidityPeriod {
    /// Create a window from explicit bounds.
    pub const fn new(not_before: u64, not_after: u64) -> Self {
        Self {
            not_before,
            not_after,
        }
    }

    /// A window starting at `now` and lasting `duration`.
    pub fn starting_at(now: u64, duration: Duration) -> Self {
        Self::new(now, now.saturating_add(duration.as_millis() as u64))
    }

    /// A window starting now and lasting `duration`.
    pub fn from_now(duration: Duration) -> Self {
        Self::starting_at(crate::now_millis(), duration)
    }

    /// A window starting now and lasting `days` days.
    pub fn days_from_now(days: u64) -> Self {
        Self::from_now(Duration::from_secs(days * 86_400))
    }

    pub const fn not_before(&self) -> u64 {
        self.not_before
    }

    pub const fn not_after(&self) -> u64 {
        self.not_after
    }

    /// Whether `now` falls inside the window.
    pub fn includes(&self, now: u64) -> bool {
        self.not_before <= now && now <= self.not_after
    }
}

impl fmt::Display for ValidityPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stamp = |ms: u64| {
            chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ms as i64)
                .map(|t| t.format("%Y%m%dT%H%M%S").to_string())
                .unwrap_or_else(|| ms.to_string())
        };
        write!(f, "[{}, {}]", stamp(self.not_before), stamp(self.not_after))
    }
}

/// Signature metadata carried alongside the signature value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub sig_type: SignatureType,
    /// Name of the signing key or certificate.
    pub key_locator: Option<Name>,
    /// Present on certificates.
    pub validity: Option<ValidityPeriod>,
    /// Present on signed Interests.
    pub nonce: Option<u64>,
    /// Present on signed Interests, Unix ms.
    pub time: Option<u64>,
}

impl SignatureInfo {
    /// Info for a digest-only signature.
    pub fn digest() -> Self {
        Self {
            sig_type: SignatureType::DigestBlake3,
            key_locator: None,
            validity: None,
            nonce: None,
            time: None,
        }
    }

    /// Info for a named Ed25519 signature.
    pub fn ed25519(key_locator: Name) -> Self {
        Self {
            sig_type: SignatureType::Ed25519,
            key_locator: Some(key_locator),
            validity: None,
            nonce: None,
            time: None,
        }
    }
}

/// Raw signature bytes.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureValue(pub Bytes);

impl SignatureValue {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SignatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(&self.0);
        write!(f, "SignatureValue({}...)", &hex[..hex.len().min(16)])
    }
}

/// A named, signed piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    pub name: Name,
    pub content_type: ContentType,
    pub freshness_ms: Option<u64>,
    pub content: Bytes,
    pub sig_info: SignatureInfo,
    pub sig_value: SignatureValue,
}

impl Data {
    /// An unsigned Blob packet.
    pub fn new(name: Name, content: impl Into<Bytes>) -> Self {
        Self {
            name,
            content_type: ContentType::Blob,
            freshness_ms: None,
            content: content.into(),
            sig_info: SignatureInfo::digest(),
            sig_value: SignatureValue::default(),
        }
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness_ms = Some(freshness.as_millis() as u64);
        self
    }

    /// Attach a validity period; it survives [`Data::sign`].
    pub fn with_validity(mut self, validity: ValidityPeriod) -> Self {
        self.sig_info.validity = Some(validity);
        self
    }

    /// Sign the packet, replacing any previous signature.
    pub fn sign(mut self, signer: &dyn Signer) -> Self {
        let validity = self.sig_info.validity.take();
        self.sig_info = signer.signature_info();
        self.sig_info.validity = validity;
        self.sig_value = signer.sign(&self.signed_portion());
        self
    }

    /// Canonical bytes covered by the signature.
    pub fn signed_portion(&self) -> Vec<u8> {
        let freshness = match self.freshness_ms {
            Some(ms) => Canon::Uint(ms),
            None => Canon::Null,
        };
        canonical::encode(&Canon::Map(vec![
            (data_keys::NAME, canonical::name_value(&self.name)),
            (data_keys::CONTENT_TYPE, Canon::Uint(self.content_type.code())),
            (data_keys::FRESHNESS, freshness),
            (data_keys::CONTENT, Canon::Bytes(self.content.to_vec())),
            (data_keys::SIG_INFO, canonical::sig_info_value(&self.sig_info)),
        ]))
    }

    /// Check the signature with `verifier`.
    pub fn verify(&self, verifier: &dyn Verifier) -> bool {
        verifier.verify(&self.signed_portion(), &self.sig_value)
    }

    /// Whether this Data can answer `interest`.
    pub fn can_satisfy(&self, interest: &Interest) -> bool {
        if interest.can_be_prefix {
            interest.name.is_prefix_of(&self.name)
        } else {
            interest.name == self.name
        }
    }

    /// Encode to wire bytes.
    pub fn to_wire(&self) -> Vec<u8> {
        to_cbor(&PacketRef::Data(self))
    }

    /// Decode from wire bytes.
    pub fn from_wire(wire: &[u8]) -> Result<Self, CodecError> {
        match Packet::from_wire(wire)? {
            Packet::Data(data) => Ok(data),
            Packet::Interest(_) => Err(CodecError::SchemaMismatch(
                "expected Data, found Interest".into(),
            )),
        }
    }

    /// Name with the implicit digest of the whole packet appended.
    pub fn full_name(&self) -> Name {
        let digest = blake3::hash(&self.to_wire());
        self.name.append(Component::new(
            Component::IMPLICIT_DIGEST,
            digest.as_bytes().to_vec(),
        ))
    }
}

/// A request for named content, optionally signed (command Interests).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    pub name: Name,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
    pub nonce: u32,
    pub lifetime_ms: u64,
    pub app_parameters: Option<Bytes>,
    pub sig_info: Option<SignatureInfo>,
    pub sig_value: Option<SignatureValue>,
}

impl Interest {
    /// An unsigned Interest with a random nonce and the default lifetime.
    pub fn new(name: Name) -> Self {
        Self {
            name,
            can_be_prefix: false,
            must_be_fresh: false,
            nonce: rand::thread_rng().gen(),
            lifetime_ms: DEFAULT_INTEREST_LIFETIME.as_millis() as u64,
            app_parameters: None,
            sig_info: None,
            sig_value: None,
        }
    }

    pub fn with_can_be_prefix(mut self, can_be_prefix: bool) -> Self {
        self.can_be_prefix = can_be_prefix;
        self
    }

    pub fn with_must_be_fresh(mut self, must_be_fresh: bool) -> Self {
        self.must_be_fresh = must_be_fresh;
        self
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime_ms = lifetime.as_millis() as u64;
        self
    }

    pub fn with_app_parameters(mut self, params: impl Into<Bytes>) -> Self {
        self.app_parameters = Some(params.into());
        self
    }

    /// Lifetime as a [`Duration`].
    pub fn lifetime(&self) -> Duration {
        Duration::from_millis(self.lifetime_ms)
    }

    /// Sign as a command Interest: a fresh signature nonce and timestamp are
    /// included so the daemon can reject replays.
    pub fn sign(mut self, signer: &dyn Signer) -> Self {
        let mut info = signer.signature_info();
        info.nonce = Some(rand::thread_rng().gen());
        info.time = Some(crate::now_millis());
        self.sig_info = Some(info);
        self.sig_value = Some(signer.sign(&self.signed_portion()));
        self
    }

    /// Canonical bytes covered by the signature.
    pub fn signed_portion(&self) -> Vec<u8> {
        let params = match &self.app_parameters {
            Some(p) => Canon::Bytes(p.to_vec()),
            None => Canon::Null,
        };
        let info = match &self.sig_info {
            Some(info) => canonical::sig_info_value(info),
            None => Canon::Null,
        };
        canonical::encode(&Canon::Map(vec![
            (interest_keys::NAME, canonical::name_value(&self.name)),
            (interest_keys::APP_PARAMETERS, params),
            (interest_keys::SIG_INFO, info),
        ]))
    }

    /// Check the signature with `verifier`; unsigned Interests never verify.
    pub fn verify(&self, verifier: &dyn Verifier) -> bool {
        match &self.sig_value {
            Some(value) => verifier.verify(&self.signed_portion(), value),
            None => false,
        }
    }

    /// Encode to wire bytes.
    pub fn to_wire(&self) -> Vec<u8> {
        to_cbor(&PacketRef::Interest(self))
    }
}

/// Any packet that can travel over a face.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Packet {
    Interest(Interest),
    Data(Data),
}

impl Packet {
    /// Encode to wire bytes.
    pub fn to_wire(&self) -> Vec<u8> {
        to_cbor(self)
    }

    /// Decode from wire bytes; trailing bytes are rejected.
    pub fn from_wire(wire: &[u8]) -> Result<Self, CodecError> {
        from_cbor(wire)
    }

    /// The packet's name.
    pub fn name(&self) -> &Name {
        match self {
            Packet::Interest(i) => &i.name,
            Packet::Data(d) => &d.name,
        }
    }
}

/// Borrowed mirror of [`Packet`], so single packets encode without cloning.
#[derive(Serialize)]
enum PacketRef<'a> {
    Interest(&'a Interest),
    Data(&'a Data),
}
