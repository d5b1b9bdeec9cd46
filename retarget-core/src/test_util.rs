use chrono::DateTime;

use crate::{header::BlockHeader, sha256::Hash};

/// A chain of `len` headers spaced `spacing` seconds apart, all with `bits`.
pub(crate) fn chain(len: usize, start_time: i64, spacing: i64, bits: u32) -> Vec<BlockHeader> {
    (0..len)
        .map(|i| header_at(start_time + spacing * i as i64, bits, i as u32))
        .collect()
}

pub(crate) fn header_at(time: i64, bits: u32, nonce: u32) -> BlockHeader {
    BlockHeader {
        version: 1,
        prev_block: Hash::zero(),
        merkle_root: Hash::zero(),
        timestamp: DateTime::from_timestamp(time, 0).expect("test timestamp in range"),
        bits,
        nonce,
    }
}

pub(crate) fn set_time(header: &mut BlockHeader, time: i64) {
    header.timestamp = DateTime::from_timestamp(time, 0).expect("test timestamp in range");
}
