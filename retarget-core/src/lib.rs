pub mod compact;
pub mod config;
pub mod error;
pub mod genesis;
pub mod header;
pub mod params;
pub mod registry;
pub mod retarget;
pub mod sha256;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_util;

use serde::{Deserialize, Serialize};
use uint::construct_uint;

construct_uint! {
   #[derive(Serialize, Deserialize)]
   pub struct U256(4);
}

construct_uint! {
   pub struct U512(8);
}

impl From<U256> for U512 {
    fn from(value: U256) -> Self {
        let U256(ref words) = value;
        let mut wide = [0u64; 8];
        wide[..4].copy_from_slice(words);
        U512(wide)
    }
}

impl U512 {
    /// Narrows back to 256 bits, saturating at `U256::MAX`.
    pub fn saturating_low_u256(self) -> U256 {
        let U512(ref words) = self;
        if words[4..].iter().any(|w| *w != 0) {
            return U256::MAX;
        }
        let mut narrow = [0u64; 4];
        narrow.copy_from_slice(&words[..4]);
        U256(narrow)
    }
}

/// Size of one serialized block header on the wire and in header files.
pub const HEADER_SIZE: usize = 80;

// Kimoto Gravity Well scan window.
pub const KGW_MIN_BLOCKS: i32 = 144;
pub const KGW_MAX_BLOCKS: i32 = 4032;

// Hybrid testnet policy: Litecoin rules below this height, then a
// gravity-well retarget every TESTNET_RETARGET_INTERVAL blocks.
pub const TESTNET_KGW_ACTIVATION_HEIGHT: i32 = 2116;
pub const TESTNET_RETARGET_INTERVAL: i32 = 12;
