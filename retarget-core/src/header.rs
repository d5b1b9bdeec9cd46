use std::io::{ErrorKind as IoErrorKind, Read, Seek, SeekFrom, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::RetargetError, sha256::Hash, HEADER_SIZE};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block: Hash,
    pub merkle_root: Hash,
    pub timestamp: DateTime<Utc>,
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(self.prev_block.as_bytes());
        out[36..68].copy_from_slice(self.merkle_root.as_bytes());
        out[68..72].copy_from_slice(&(self.timestamp.timestamp() as u32).to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.to_le_bytes());
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8], offset: i64) -> Result<Self, RetargetError> {
        if bytes.len() != HEADER_SIZE {
            return Err(RetargetError::deserialize(
                offset,
                format!("expected {} bytes, found {}", HEADER_SIZE, bytes.len()),
            ));
        }

        let word = |at: usize| [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]];
        let hash = |at: usize| {
            let mut h = [0u8; 32];
            h.copy_from_slice(&bytes[at..at + 32]);
            Hash::from_bytes(h)
        };

        let seconds = u32::from_le_bytes(word(68));
        let timestamp = DateTime::from_timestamp(i64::from(seconds), 0).ok_or_else(|| {
            RetargetError::deserialize(offset, format!("unrepresentable timestamp {}", seconds))
        })?;

        Ok(BlockHeader {
            version: i32::from_le_bytes(word(0)),
            prev_block: hash(4),
            merkle_root: hash(36),
            timestamp,
            bits: u32::from_le_bytes(word(72)),
            nonce: u32::from_le_bytes(word(76)),
        })
    }

    pub fn block_hash(&self) -> Hash {
        Hash::double_sha256(&self.to_bytes())
    }
}

/// Random access to stored headers by offset from the store's first header.
///
/// Implementations must not rely on a read position surviving between
/// calls; every read addresses its header explicitly.
pub trait HeaderAccessor {
    fn read_header(&mut self, offset: i64) -> Result<BlockHeader, RetargetError>;
}

impl HeaderAccessor for [BlockHeader] {
    fn read_header(&mut self, offset: i64) -> Result<BlockHeader, RetargetError> {
        usize::try_from(offset)
            .ok()
            .and_then(|index| self.get(index))
            .copied()
            .ok_or_else(|| {
                RetargetError::io(
                    offset,
                    std::io::Error::new(
                        IoErrorKind::UnexpectedEof,
                        format!("no header at offset {} (store holds {})", offset, self.len()),
                    ),
                )
            })
    }
}

impl HeaderAccessor for Vec<BlockHeader> {
    fn read_header(&mut self, offset: i64) -> Result<BlockHeader, RetargetError> {
        self.as_mut_slice().read_header(offset)
    }
}

pub struct HeaderReader<R> {
    inner: R,
}

impl<R: Read + Seek> HeaderReader<R> {
    pub fn new(inner: R) -> Self {
        HeaderReader { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn header_count(&mut self) -> std::io::Result<u64> {
        let end = self.inner.seek(SeekFrom::End(0))?;
        Ok(end / HEADER_SIZE as u64)
    }
}

impl<R: Read + Seek> HeaderAccessor for HeaderReader<R> {
    fn read_header(&mut self, offset: i64) -> Result<BlockHeader, RetargetError> {
        let position = u64::try_from(offset)
            .ok()
            .and_then(|o| o.checked_mul(HEADER_SIZE as u64))
            .ok_or_else(|| {
                RetargetError::io(
                    offset,
                    std::io::Error::new(IoErrorKind::InvalidInput, "negative header offset"),
                )
            })?;

        self.inner
            .seek(SeekFrom::Start(position))
            .map_err(|e| RetargetError::io(offset, e))?;

        let mut buf = [0u8; HEADER_SIZE];
        let mut filled = 0;
        while filled < HEADER_SIZE {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
                Err(e) => return Err(RetargetError::io(offset, e)),
            }
        }

        match filled {
            0 => Err(RetargetError::io(
                offset,
                std::io::Error::new(IoErrorKind::UnexpectedEof, "read past end of header store"),
            )),
            HEADER_SIZE => BlockHeader::from_bytes(&buf, offset),
            partial => Err(RetargetError::deserialize(
                offset,
                format!("truncated header: {} of {} bytes", partial, HEADER_SIZE),
            )),
        }
    }
}

pub fn write_headers<W: Write>(mut writer: W, headers: &[BlockHeader]) -> std::io::Result<()> {
    for header in headers {
        writer.write_all(&header.to_bytes())?;
    }
    writer.flush()
}
