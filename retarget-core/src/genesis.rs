// Genesis headers of the built-in networks.
//
// Only the headers are kept; retargeting never looks at transactions.

use chrono::DateTime;

use crate::{header::BlockHeader, sha256::Hash};

const VTC_GENESIS_MERKLE_ROOT: &str =
    "4af38ca0e323c0a5226208a73b7589a52c030f234810cf51e13e3249fc0123e7";
const BTC_GENESIS_MERKLE_ROOT: &str =
    "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b";

fn genesis_header(merkle_root: &str, time: i64, bits: u32, nonce: u32) -> BlockHeader {
    let timestamp = match DateTime::from_timestamp(time, 0) {
        Some(t) => t,
        None => panic!("invalid hard-coded genesis timestamp {}", time),
    };
    BlockHeader {
        version: 1,
        prev_block: Hash::zero(),
        merkle_root: Hash::from_static(merkle_root),
        timestamp,
        bits,
        nonce,
    }
}

// 2014-01-09 23:49:31 UTC
pub fn mainnet_genesis() -> BlockHeader {
    genesis_header(VTC_GENESIS_MERKLE_ROOT, 1_389_311_371, 0x1e0ffff0, 5_749_262)
}

pub fn mainnet_genesis_hash() -> Hash {
    Hash::from_static("4d96a915f49d40b1e5c2844d1ee2dccb90013a990ccea12c492d22110489f0c4")
}

// 2016-12-09 13:47:30 UTC
pub fn testnet3_genesis() -> BlockHeader {
    genesis_header(VTC_GENESIS_MERKLE_ROOT, 1_481_291_250, 0x1e0ffff0, 915_027)
}

pub fn testnet3_genesis_hash() -> Hash {
    Hash::from_static("cee8f24feb7a64c8f07916976aa4855decac79b6741a8ec2e32e2747497ad2c9")
}

// 2011-02-02 23:16:42 UTC
pub fn regtest_genesis() -> BlockHeader {
    genesis_header(VTC_GENESIS_MERKLE_ROOT, 1_296_688_602, 0x207fffff, 2)
}

pub fn regtest_genesis_hash() -> Hash {
    Hash::from_static("2399c0b047ebbbd1650d66867206c97317027b1a1932bc6fc17ce833dc4a85ce")
}

// 2014-05-28 15:52:37 UTC
pub fn simnet_genesis() -> BlockHeader {
    genesis_header(BTC_GENESIS_MERKLE_ROOT, 1_401_292_357, 0x207fffff, 2)
}

pub fn simnet_genesis_hash() -> Hash {
    Hash::from_static("683e86bd5c6d110d91b94b97137ba6bfe02dbbdb8e3dff722a669b5d69d77af6")
}

// 2020-09-01 00:00:00 UTC
pub fn signet_genesis() -> BlockHeader {
    genesis_header(BTC_GENESIS_MERKLE_ROOT, 1_598_918_400, 0x1e0377ae, 52_613_770)
}

pub fn signet_genesis_hash() -> Hash {
    Hash::from_static("00000008819873e925422c1ff0f99f7cc9bbb232af63a077a480a3633bee1ef6")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_headers_hash_to_declared_hashes() {
        let cases = [
            (mainnet_genesis(), mainnet_genesis_hash()),
            (testnet3_genesis(), testnet3_genesis_hash()),
            (regtest_genesis(), regtest_genesis_hash()),
            (simnet_genesis(), simnet_genesis_hash()),
            (signet_genesis(), signet_genesis_hash()),
        ];
        for (header, expected) in cases {
            assert_eq!(header.block_hash(), expected);
        }
    }
}
