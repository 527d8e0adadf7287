// src/types.rs
// Shared primitive types: byte strings at the serialization boundary,
// digests and canonical encoding.

use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Deref;

/// 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// Statement id of the genesis event. Parent of the first finalized block.
pub const GENESIS_HASH: &str = "4e17811011ec217ac84a9e037a82758a7de318342886a88a37ebabf90f52af73";

/// Owned byte string that serializes as lowercase hex.
///
/// Seeds, microblocks and encoded chains cross the wire and the disk as hex
/// strings. They are decoded exactly once into this type; internal APIs only
/// ever see raw bytes.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HexBytes(pub Vec<u8>);

impl HexBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        HexBytes(bytes.into())
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Ok(HexBytes(hex::decode(s.trim())?))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for HexBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for HexBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(v: Vec<u8>) -> Self {
        HexBytes(v)
    }
}

impl From<&[u8]> for HexBytes {
    fn from(v: &[u8]) -> Self {
        HexBytes(v.to_vec())
    }
}

impl fmt::Debug for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HexBytes({})", self.to_hex())
    }
}

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        HexBytes::from_hex(&s).map_err(D::Error::custom)
    }
}

pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Canonical JSON: object keys sorted, compact `,`/`:` separators.
///
/// `serde_json::Value` objects are backed by a sorted map, so a round trip
/// through `Value` fixes key order regardless of struct field order.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let v = serde_json::to_value(value)?;
    serde_json::to_vec(&v)
}

/// Wall clock in fractional unix seconds.
pub fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
