use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetargetError {
    #[error("failed to read header at offset {offset}: {source}")]
    Io {
        offset: i64,
        #[source]
        source: io::Error,
    },

    #[error("malformed header at offset {offset}: {reason}")]
    Deserialize { offset: i64, reason: String },

    #[error("network {network} cannot be retargeted: {reason}")]
    InvalidParams { network: String, reason: String },
}

impl RetargetError {
    pub fn io(offset: i64, source: io::Error) -> Self {
        RetargetError::Io { offset, source }
    }

    pub fn deserialize(offset: i64, reason: impl Into<String>) -> Self {
        RetargetError::Deserialize {
            offset,
            reason: reason.into(),
        }
    }

    /// Header offset the failed read was aimed at.
    pub fn offset(&self) -> Option<i64> {
        match self {
            RetargetError::Io { offset, .. } | RetargetError::Deserialize { offset, .. } => {
                Some(*offset)
            }
            RetargetError::InvalidParams { .. } => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate network: {name} (magic {net:#010x})")]
    DuplicateNetwork { name: String, net: u32 },

    #[error("invalid hd extended key version bytes")]
    InvalidKeyId,

    #[error("unknown hd private extended key bytes")]
    UnknownKeyId,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HashParseError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("invalid hash length: expected 64 hex chars (32 bytes), found {0} bytes")]
    Length(usize),
}
