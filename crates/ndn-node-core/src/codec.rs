//! Codec adapter: base64 text to typed objects.
//!
//! Every failure is either `MalformedEncoding` (not base64, not a well-formed
//! structure) or `SchemaMismatch` (well-formed, wrong kind). Decoding never
//! yields a partially populated object.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::bundle::EncryptedKeyBundle;
use crate::certificate::Certificate;
use crate::error::CodecError;

/// Decode base64, ignoring embedded whitespace (PEM-style line breaks).
pub fn decode_base64(text: &str) -> Result<Vec<u8>, CodecError> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(CodecError::MalformedEncoding("empty payload".into()));
    }
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| CodecError::MalformedEncoding(e.to_string()))
}

/// Encode bytes as standard base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a base64 certificate.
pub fn decode_certificate(b64: &str) -> Result<Certificate, CodecError> {
    Certificate::from_wire(&decode_base64(b64)?)
}

/// Encode a certificate as base64.
pub fn encode_certificate(cert: &Certificate) -> String {
    encode_base64(&cert.to_wire())
}

/// Decode a base64 encrypted key bundle.
pub fn decode_key_bundle(b64: &str) -> Result<EncryptedKeyBundle, CodecError> {
    EncryptedKeyBundle::from_wire(&decode_base64(b64)?)
}

/// Encode an encrypted key bundle as base64.
pub fn encode_key_bundle(bundle: &EncryptedKeyBundle) -> String {
    encode_base64(&bundle.to_wire())
}

/// Serialize to CBOR. Writing into a `Vec` cannot fail for the plain structs
/// this crate serializes.
pub fn to_cbor<T: Serialize>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).expect("CBOR serialization failed");
    buf
}

/// Deserialize exactly one CBOR item; trailing bytes are malformed.
pub fn from_cbor<T: DeserializeOwned>(wire: &[u8]) -> Result<T, CodecError> {
    let mut reader = wire;
    let value = ciborium::from_reader(&mut reader)
        .map_err(|e| CodecError::MalformedEncoding(e.to_string()))?;
    if !reader.is_empty() {
        return Err(CodecError::MalformedEncoding(format!(
            "{} trailing bytes",
            reader.len()
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::name::{Component, Name};
    use crate::packet::{Data, Interest, ValidityPeriod};
    use crate::security::NamedSigner;
    use crate::certificate::naming;
    use proptest::prelude::*;

    fn sample_cert() -> Certificate {
        let keypair = Keypair::from_seed(&[5; 32]);
        let identity: Name = "/ndn/weekly-call".parse().unwrap();
        let key_name = naming::make_key_name(&identity, Component::generic("k1"));
        let cert_name = naming::make_cert_name(&key_name, Component::generic("self"), 7);
        let signer = NamedSigner::new(keypair.clone(), key_name);
        Certificate::build(cert_name, keypair.public_key(), ValidityPeriod::new(0, 1000), &signer)
            .unwrap()
    }

    #[test]
    fn test_certificate_base64_roundtrip() {
        let cert = sample_cert();
        let b64 = encode_certificate(&cert);
        assert_eq!(decode_certificate(&b64).unwrap(), cert);
    }

    #[test]
    fn test_line_breaks_are_ignored() {
        let cert = sample_cert();
        let b64 = encode_certificate(&cert);
        let wrapped: String = b64
            .as_bytes()
            .chunks(64)
            .map(|c| format!("\n{}", std::str::from_utf8(c).unwrap()))
            .collect();
        assert_eq!(decode_certificate(&wrapped).unwrap(), cert);
    }

    #[test]
    fn test_not_base64_is_malformed() {
        assert!(matches!(decode_certificate("!!!not base64!!!"), Err(CodecError::MalformedEncoding(_))));
        assert!(matches!(decode_certificate(""), Err(CodecError::MalformedEncoding(_))));
    }

    #[test]
    fn test_random_bytes_are_malformed() {
        let b64 = encode_base64(b"definitely not cbor packet");
        assert!(matches!(decode_certificate(&b64), Err(CodecError::MalformedEncoding(_))));
    }

    #[test]
    fn test_interest_is_schema_mismatch() {
        let interest = Interest::new("/a".parse().unwrap());
        let b64 = encode_base64(&interest.to_wire());
        assert!(matches!(decode_certificate(&b64), Err(CodecError::SchemaMismatch(_))));
    }

    #[test]
    fn test_plain_data_is_schema_mismatch() {
        let data = Data::new("/a/b".parse().unwrap(), &b"x"[..]);
        let b64 = encode_base64(&data.to_wire());
        assert!(matches!(decode_certificate(&b64), Err(CodecError::SchemaMismatch(_))));
    }

    #[test]
    fn test_certificate_is_not_a_bundle() {
        let b64 = encode_certificate(&sample_cert());
        assert!(matches!(decode_key_bundle(&b64), Err(CodecError::MalformedEncoding(_))));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut wire = sample_cert().to_wire();
        wire.push(0x00);
        assert!(matches!(
            decode_certificate(&encode_base64(&wire)),
            Err(CodecError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn test_oversized_kdf_cost_is_schema_mismatch() {
        use crate::bundle::{EncryptedKey, EncryptedKeyBundle, KdfParams, CIPHER_CHACHA20_POLY1305, KDF_ARGON2ID};

        let bundle = EncryptedKeyBundle::new(
            sample_cert(),
            EncryptedKey {
                kdf: KdfParams {
                    algorithm: KDF_ARGON2ID.to_string(),
                    salt: bytes::Bytes::from_static(&[1; 16]),
                    memory_kib: u32::MAX,
                    iterations: 2,
                    parallelism: 1,
                },
                cipher: CIPHER_CHACHA20_POLY1305.to_string(),
                nonce: bytes::Bytes::from_static(&[0; 12]),
                ciphertext: bytes::Bytes::from_static(&[0; 48]),
            },
        );
        assert!(matches!(
            decode_key_bundle(&encode_key_bundle(&bundle)),
            Err(CodecError::SchemaMismatch(_))
        ));
    }

    proptest! {
        #[test]
        fn truncated_certificate_is_malformed(cut in 1usize..200) {
            let wire = sample_cert().to_wire();
            let cut = cut.min(wire.len() - 1);
            let b64 = encode_base64(&wire[..wire.len() - cut]);
            prop_assert!(matches!(decode_certificate(&b64), Err(CodecError::MalformedEncoding(_))));
        }

        #[test]
        fn truncated_base64_text_is_malformed(cut in 1usize..100) {
            let b64 = encode_certificate(&sample_cert());
            let cut = cut.min(b64.len() - 1);
            let result = decode_certificate(&b64[..b64.len() - cut]);
            prop_assert!(matches!(result, Err(CodecError::MalformedEncoding(_))));
        }

        #[test]
        fn arbitrary_text_never_panics(text in ".{0,256}") {
            match decode_certificate(&text) {
                Ok(_) | Err(CodecError::MalformedEncoding(_)) | Err(CodecError::SchemaMismatch(_)) => {}
            }
        }
    }
}
