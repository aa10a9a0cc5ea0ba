//! Hierarchical NDN names.
//!
//! A [`Name`] is an immutable sequence of typed, opaque [`Component`]s.
//! Derivations such as [`Name::append`] and [`Name::get_prefix`] return new
//! names rather than mutating in place.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A single name component: a TLV type number and an opaque value.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Component {
    typ: u16,
    value: Bytes,
}

impl Component {
    /// Implicit digest of a whole packet.
    pub const IMPLICIT_DIGEST: u16 = 1;
    /// Ordinary component.
    pub const GENERIC: u16 = 8;
    /// Version number (nonNegativeInteger).
    pub const VERSION: u16 = 54;

    /// Create a component with an explicit type.
    pub fn new(typ: u16, value: impl Into<Bytes>) -> Self {
        Self {
            typ,
            value: value.into(),
        }
    }

    /// Create a generic component.
    pub fn generic(value: impl AsRef<[u8]>) -> Self {
        Self::new(Self::GENERIC, Bytes::copy_from_slice(value.as_ref()))
    }

    /// Create a version component, encoded as the shortest of 1/2/4/8 bytes.
    pub fn version(v: u64) -> Self {
        Self::new(Self::VERSION, Bytes::from(encode_non_negative(v)))
    }

    /// The TLV type number.
    pub fn typ(&self) -> u16 {
        self.typ
    }

    /// The raw value bytes.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Interpret as a version number.
    pub fn as_version(&self) -> Option<u64> {
        if self.typ != Self::VERSION {
            return None;
        }
        decode_non_negative(&self.value)
    }

    /// Whether this is a generic component with the given text.
    pub fn is_generic_str(&self, s: &str) -> bool {
        self.typ == Self::GENERIC && self.value.as_ref() == s.as_bytes()
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.typ {
            Self::GENERIC => write!(f, "{}", escape(&self.value)),
            Self::VERSION => match self.as_version() {
                Some(v) => write!(f, "v={v}"),
                None => write!(f, "{}={}", self.typ, escape(&self.value)),
            },
            Self::IMPLICIT_DIGEST => write!(f, "digest={}", hex::encode(&self.value)),
            typ => write!(f, "{}={}", typ, escape(&self.value)),
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({self})")
    }
}

impl From<&str> for Component {
    fn from(s: &str) -> Self {
        Self::generic(s)
    }
}

impl FromStr for Component {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(v) = s.strip_prefix("v=") {
            let v = v
                .parse::<u64>()
                .map_err(|_| CoreError::InvalidName(format!("bad version component: {s}")))?;
            return Ok(Self::version(v));
        }
        if let Some(d) = s.strip_prefix("digest=") {
            let bytes = hex::decode(d)
                .map_err(|_| CoreError::InvalidName(format!("bad digest component: {s}")))?;
            return Ok(Self::new(Self::IMPLICIT_DIGEST, bytes));
        }
        if let Some((typ, value)) = s.split_once('=') {
            if let Ok(typ) = typ.parse::<u16>() {
                return Ok(Self::new(typ, unescape(value)?));
            }
        }
        Ok(Self::new(Self::GENERIC, unescape(s)?))
    }
}

/// An NDN name.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Name(Vec<Component>);

impl Name {
    /// The empty name `/`.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build from components.
    pub fn from_components(components: impl IntoIterator<Item = Component>) -> Self {
        Self(components.into_iter().collect())
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the name has no components.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All components.
    pub fn components(&self) -> &[Component] {
        &self.0
    }

    /// Component at index `i`; negative indices count from the end.
    pub fn get(&self, i: isize) -> Option<&Component> {
        let idx = if i < 0 {
            self.0.len().checked_sub(i.unsigned_abs())?
        } else {
            i as usize
        };
        self.0.get(idx)
    }

    /// The first `n` components; a negative `n` drops `|n|` components from the end.
    pub fn get_prefix(&self, n: isize) -> Name {
        let len = self.0.len();
        let end = if n < 0 {
            len.saturating_sub(n.unsigned_abs())
        } else {
            (n as usize).min(len)
        };
        Self(self.0[..end].to_vec())
    }

    /// A new name with `component` appended.
    pub fn append(&self, component: impl Into<Component>) -> Name {
        let mut components = self.0.clone();
        components.push(component.into());
        Self(components)
    }

    /// A new name with all of `suffix`'s components appended.
    pub fn append_name(&self, suffix: &Name) -> Name {
        let mut components = self.0.clone();
        components.extend(suffix.0.iter().cloned());
        Self(components)
    }

    /// Whether `self` is a (non-strict) prefix of `other`.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.0.len() <= other.0.len() && self.0.iter().zip(other.0.iter()).all(|(a, b)| a == b)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for c in &self.0 {
            write!(f, "/{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({self})")
    }
}

impl FromStr for Name {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("ndn:").unwrap_or(s);
        if !s.starts_with('/') {
            return Err(CoreError::InvalidName(format!("name must start with '/': {s}")));
        }
        s.split('/')
            .filter(|part| !part.is_empty())
            .map(Component::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Name)
    }
}

impl<'a> FromIterator<&'a str> for Name {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        Self(iter.into_iter().map(Component::generic).collect())
    }
}

fn escape(value: &[u8]) -> String {
    // A value made only of periods gets three extra periods so it never
    // collides with the relative path segments "." and "..".
    let mut out = String::with_capacity(value.len());
    if value.iter().all(|b| *b == b'.') {
        out.push_str("...");
    }
    for &b in value {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn unescape(s: &str) -> Result<Vec<u8>, CoreError> {
    let raw = s.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let hex = raw
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| CoreError::InvalidName(format!("bad percent escape in {s}")))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    if out.len() >= 3 && out.iter().all(|b| *b == b'.') {
        out.truncate(out.len() - 3);
    }
    Ok(out)
}

fn encode_non_negative(v: u64) -> Vec<u8> {
    if v <= u8::MAX as u64 {
        vec![v as u8]
    } else if v <= u16::MAX as u64 {
        (v as u16).to_be_bytes().to_vec()
    } else if v <= u32::MAX as u64 {
        (v as u32).to_be_bytes().to_vec()
    } else {
        v.to_be_bytes().to_vec()
    }
}

fn decode_non_negative(bytes: &[u8]) -> Option<u64> {
    match bytes.len() {
        1 => Some(bytes[0] as u64),
        2 => Some(u16::from_be_bytes([bytes[0], bytes[1]]) as u64),
        4 => Some(u32::from_be_bytes(bytes.try_into().ok()?) as u64),
        8 => Some(u64::from_be_bytes(bytes.try_into().ok()?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_uri_roundtrip() {
        let name: Name = "/ndn/weekly-call/node-7/v=1728695322".parse().unwrap();
        assert_eq!(name.len(), 4);
        assert_eq!(name.get(-1).unwrap().as_version(), Some(1728695322));
        assert_eq!(name.to_string(), "/ndn/weekly-call/node-7/v=1728695322");
    }

    #[test]
    fn test_get_prefix_negative() {
        let name: Name = "/a/b/KEY/k/CA/v=1".parse().unwrap();
        assert_eq!(name.get_prefix(-4).to_string(), "/a/b");
        assert_eq!(name.get_prefix(2).to_string(), "/a/b");
        assert_eq!(name.get_prefix(-10), Name::new());
        assert_eq!(name.get_prefix(100), name);
    }

    #[test]
    fn test_append_is_non_mutating() {
        let base: Name = "/domain".parse().unwrap();
        let child = base.append("node-7");
        assert_eq!(base.to_string(), "/domain");
        assert_eq!(child.to_string(), "/domain/node-7");
        assert!(base.is_prefix_of(&child));
        assert!(!child.is_prefix_of(&base));
    }

    #[test]
    fn test_escaping() {
        let name = Name::new().append(Component::generic([0x00u8, b'a', b'/']));
        assert_eq!(name.to_string(), "/%00a%2F");
        let parsed: Name = name.to_string().parse().unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn test_period_only_component() {
        let name = Name::new().append(Component::generic(".."));
        assert_eq!(name.to_string(), "/.....");
        let parsed: Name = "/.....".parse().unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn test_relative_name_rejected() {
        assert!("ndn/test".parse::<Name>().is_err());
        assert!("/bad%zz".parse::<Name>().is_err());
    }

    #[test]
    fn test_version_encoding_widths() {
        assert_eq!(Component::version(5).value().len(), 1);
        assert_eq!(Component::version(300).value().len(), 2);
        assert_eq!(Component::version(70_000).value().len(), 4);
        assert_eq!(Component::version(1 << 40).value().len(), 8);
        assert_eq!(Component::version(1 << 40).as_version(), Some(1 << 40));
    }
}
