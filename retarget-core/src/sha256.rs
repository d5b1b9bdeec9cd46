use crate::error::HashParseError;
use sha2::{Digest, Sha256};
use std::{convert::TryFrom, fmt, str::FromStr};

/// A 32-byte chain hash kept in internal (wire) byte order.
///
/// Displayed and parsed as byte-reversed hex, which is how block hashes
/// and checkpoints are conventionally written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Hash([u8; 32]);

impl serde::Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = self.to_string();
        serializer.serialize_str(&s)
    }
}

impl<'de> serde::Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Hash::try_from(s.as_str()).map_err(|e| {
            serde::de::Error::custom(format!("Failed to deserialize Hash from hex string: {}", e))
        })
    }
}

impl Hash {
    /// Double SHA-256, the block identity hash.
    pub fn double_sha256(data: &[u8]) -> Self {
        let first = Sha256::digest(data);
        let second = Sha256::digest(first);
        Hash(second.into())
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    pub fn zero() -> Self {
        Hash([0u8; 32])
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parses a hard-coded hash. Only for compile-time-known good strings.
    pub(crate) fn from_static(hex_str: &str) -> Self {
        match Hash::from_str(hex_str) {
            Ok(hash) => hash,
            Err(e) => panic!("invalid hard-coded hash {}: {}", hex_str, e),
        }
    }
}

impl TryFrom<&str> for Hash {
    type Error = HashParseError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let bytes = hex::decode(s)?;

        if bytes.len() != 32 {
            return Err(HashParseError::Length(bytes.len()));
        }

        let mut array = [0u8; 32];
        for (dst, src) in array.iter_mut().zip(bytes.iter().rev()) {
            *dst = *src;
        }
        Ok(Hash(array))
    }
}

impl FromStr for Hash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::try_from(s)
    }
}

impl From<Hash> for String {
    fn from(hash: Hash) -> Self {
        hash.to_string()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        write!(f, "{}", hex::encode(reversed))
    }
}
