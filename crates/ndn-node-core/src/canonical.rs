//! Canonical CBOR encoding of the signed portion of packets.
//!
//! Signatures never cover serde output directly. The fields a signature
//! protects are laid out as a map with small integer keys and encoded with
//! RFC 8949 core deterministic rules:
//! - Map keys in ascending order
//! - Integers use the smallest valid encoding
//! - Definite lengths only
//!
//! Two implementations that agree on the field values therefore agree on the
//! signed bytes.

use crate::name::Name;
use crate::packet::{SignatureInfo, ValidityPeriod};

/// The subset of CBOR the signed portions use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Canon {
    Uint(u64),
    Bool(bool),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Canon>),
    Map(Vec<(u64, Canon)>),
    Null,
}

/// Field keys of the Data signed portion.
pub mod data_keys {
    pub const NAME: u64 = 0;
    pub const CONTENT_TYPE: u64 = 1;
    pub const FRESHNESS: u64 = 2;
    pub const CONTENT: u64 = 3;
    pub const SIG_INFO: u64 = 4;
}

/// Field keys of the Interest signed portion.
pub mod interest_keys {
    pub const NAME: u64 = 0;
    pub const APP_PARAMETERS: u64 = 1;
    pub const SIG_INFO: u64 = 2;
}

mod sig_info_keys {
    pub const TYPE: u64 = 0;
    pub const KEY_LOCATOR: u64 = 1;
    pub const VALIDITY: u64 = 2;
    pub const NONCE: u64 = 3;
    pub const TIME: u64 = 4;
}

/// Encode a name as an array of `[type, value]` pairs.
pub fn name_value(name: &Name) -> Canon {
    Canon::Array(
        name.components()
            .iter()
            .map(|c| Canon::Array(vec![Canon::Uint(c.typ() as u64), Canon::Bytes(c.value().to_vec())]))
            .collect(),
    )
}

/// Encode a validity period as `[not_before, not_after]`.
pub fn validity_value(validity: &ValidityPeriod) -> Canon {
    Canon::Array(vec![
        Canon::Uint(validity.not_before()),
        Canon::Uint(validity.not_after()),
    ])
}

/// Encode signature info; absent optional fields are omitted from the map.
pub fn sig_info_value(info: &SignatureInfo) -> Canon {
    let mut entries = vec![(sig_info_keys::TYPE, Canon::Uint(info.sig_type.code()))];
    if let Some(locator) = &info.key_locator {
        entries.push((sig_info_keys::KEY_LOCATOR, name_value(locator)));
    }
    if let Some(validity) = &info.validity {
        entries.push((sig_info_keys::VALIDITY, validity_value(validity)));
    }
    if let Some(nonce) = info.nonce {
        entries.push((sig_info_keys::NONCE, Canon::Uint(nonce)));
    }
    if let Some(time) = info.time {
        entries.push((sig_info_keys::TIME, Canon::Uint(time)));
    }
    Canon::Map(entries)
}

/// Encode a value to canonical bytes.
pub fn encode(value: &Canon) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_to(&mut buf, value);
    buf
}

fn encode_to(buf: &mut Vec<u8>, value: &Canon) {
    match value {
        Canon::Uint(n) => encode_head(buf, 0, *n),
        Canon::Bytes(b) => {
            encode_head(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Canon::Text(s) => {
            encode_head(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Canon::Array(items) => {
            encode_head(buf, 4, items.len() as u64);
            for item in items {
                encode_to(buf, item);
            }
        }
        Canon::Map(entries) => {
            // Integer keys sort by value under the deterministic encoding rules.
            let mut sorted: Vec<&(u64, Canon)> = entries.iter().collect();
            sorted.sort_by_key(|(k, _)| *k);
            encode_head(buf, 5, sorted.len() as u64);
            for (k, v) in sorted {
                encode_head(buf, 0, *k);
                encode_to(buf, v);
            }
        }
        Canon::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Canon::Null => buf.push(0xf6),
    }
}

/// Encode a major type and argument in the shortest form.
fn encode_head(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smallest_integer_encoding() {
        assert_eq!(encode(&Canon::Uint(0)), vec![0x00]);
        assert_eq!(encode(&Canon::Uint(23)), vec![0x17]);
        assert_eq!(encode(&Canon::Uint(24)), vec![0x18, 24]);
        assert_eq!(encode(&Canon::Uint(256)), vec![0x19, 0x01, 0x00]);
        assert_eq!(encode(&Canon::Uint(65536)), vec![0x1a, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_map_keys_sorted() {
        let a = Canon::Map(vec![(2, Canon::Null), (0, Canon::Bool(true))]);
        let b = Canon::Map(vec![(0, Canon::Bool(true)), (2, Canon::Null)]);
        assert_eq!(encode(&a), encode(&b));
        assert_eq!(encode(&a), vec![0xa2, 0x00, 0xf5, 0x02, 0xf6]);
    }

    #[test]
    fn test_agrees_with_ciborium_for_simple_values() {
        let value = Canon::Array(vec![Canon::Text("KEY".into()), Canon::Bytes(vec![1, 2, 3])]);
        let mut expected = Vec::new();
        ciborium::into_writer(
            &ciborium::value::Value::Array(vec![
                ciborium::value::Value::Text("KEY".into()),
                ciborium::value::Value::Bytes(vec![1, 2, 3]),
            ]),
            &mut expected,
        )
        .unwrap();
        assert_eq!(encode(&value), expected);
    }
}
