//! Canonical byte encoding used for content fingerprints.
//!
//! The encoding is fixed and architecture-independent:
//! - every value is preceded by a one-byte tag naming its kind;
//! - integers are 8-byte little-endian;
//! - strings are an 8-byte little-endian length followed by UTF-8 bytes;
//! - floats are encoded by their IEEE-754 bit pattern after normalising
//!   `-0.0` to `0.0`;
//! - maps are encoded by the caller in ascending key order, preceded by
//!   their entry count.
//!
//! Changing any of these rules changes every model hash and must be treated
//! as a breaking change.

use std::fmt;

use blake3::Hasher;

/// A 256-bit content fingerprint rendered as lowercase hexadecimal.
///
/// # Examples
/// ```
/// use graphgen_core::ContentHash;
///
/// let hash = ContentHash::from_bytes([0xab; 32]);
/// assert_eq!(hash.to_string().len(), 64);
/// assert!(hash.to_string().starts_with("abab"));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Wraps raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

const TAG_U64: u8 = 0x01;
const TAG_F64: u8 = 0x02;
const TAG_STR: u8 = 0x03;
const TAG_BOOL: u8 = 0x04;
const TAG_I64: u8 = 0x05;
const TAG_SECTION: u8 = 0x10;

/// Streams canonical bytes into a BLAKE3 hasher.
pub(crate) struct CanonicalEncoder {
    hasher: Hasher,
}

impl CanonicalEncoder {
    pub(crate) fn new(domain: &str) -> Self {
        let mut encoder = Self {
            hasher: Hasher::new(),
        };
        encoder.str(domain);
        encoder
    }

    /// Marks the start of a named section so adjacent sections cannot alias.
    pub(crate) fn section(&mut self, name: &str) {
        self.hasher.update(&[TAG_SECTION]);
        self.raw_str(name);
    }

    pub(crate) fn u64(&mut self, value: u64) {
        self.hasher.update(&[TAG_U64]);
        self.hasher.update(&value.to_le_bytes());
    }

    pub(crate) fn i64(&mut self, value: i64) {
        self.hasher.update(&[TAG_I64]);
        self.hasher.update(&value.to_le_bytes());
    }

    pub(crate) fn count(&mut self, value: usize) {
        self.u64(value as u64);
    }

    pub(crate) fn f64(&mut self, value: f64) {
        let normalised = if value == 0.0 { 0.0_f64 } else { value };
        self.hasher.update(&[TAG_F64]);
        self.hasher.update(&normalised.to_bits().to_le_bytes());
    }

    pub(crate) fn bool(&mut self, value: bool) {
        self.hasher.update(&[TAG_BOOL, u8::from(value)]);
    }

    pub(crate) fn str(&mut self, value: &str) {
        self.hasher.update(&[TAG_STR]);
        self.raw_str(value);
    }

    fn raw_str(&mut self, value: &str) {
        self.hasher.update(&(value.len() as u64).to_le_bytes());
        self.hasher.update(value.as_bytes());
    }

    pub(crate) fn finish(self) -> ContentHash {
        ContentHash(*self.hasher.finalize().as_bytes())
    }
}

/// Types with a canonical encoding that participates in content hashes.
pub(crate) trait Canonical {
    fn encode(&self, encoder: &mut CanonicalEncoder);
}

impl Canonical for crate::QualifiedName {
    fn encode(&self, encoder: &mut CanonicalEncoder) {
        encoder.str(self.namespace());
        encoder.str(self.local_name());
    }
}

/// Derives a stable 64-bit key from a name, independent of process and platform.
pub(crate) fn stable_key(parts: &[&str]) -> u64 {
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    let mut prefix = [0_u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(prefix)
}
