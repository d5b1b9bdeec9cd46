mod bitcoin;
mod kgw;
mod litecoin;
mod testnet;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::RetargetError, header::HeaderAccessor, params::NetworkParams};

pub use bitcoin::{bitcoin_next_bits, calc_diff_adjust_bitcoin};
pub use kgw::kimoto_gravity_well;
pub use litecoin::litecoin_next_bits;
pub use testnet::vertcoin_testnet_next_bits;

/// Computes the bits required at `height`.
///
/// `start_height` is the height of the header stored at offset 0 of
/// `headers`.
pub trait Retarget {
    fn next_bits<A: HeaderAccessor + ?Sized>(
        &self,
        headers: &mut A,
        height: i32,
        start_height: i32,
        params: &NetworkParams,
    ) -> Result<u32, RetargetError>;
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RetargetAlgorithm {
    Bitcoin,
    Litecoin,
    KimotoGravityWell,
    VertcoinTestnet,
}

impl RetargetAlgorithm {
    pub const ALL: [RetargetAlgorithm; 4] = [
        RetargetAlgorithm::Bitcoin,
        RetargetAlgorithm::Litecoin,
        RetargetAlgorithm::KimotoGravityWell,
        RetargetAlgorithm::VertcoinTestnet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RetargetAlgorithm::Bitcoin => "bitcoin",
            RetargetAlgorithm::Litecoin => "litecoin",
            RetargetAlgorithm::KimotoGravityWell => "kimoto_gravity_well",
            RetargetAlgorithm::VertcoinTestnet => "vertcoin_testnet",
        }
    }
}

impl Retarget for RetargetAlgorithm {
    fn next_bits<A: HeaderAccessor + ?Sized>(
        &self,
        headers: &mut A,
        height: i32,
        start_height: i32,
        params: &NetworkParams,
    ) -> Result<u32, RetargetError> {
        params.check_retarget_fields()?;
        match self {
            RetargetAlgorithm::Bitcoin => bitcoin_next_bits(headers, height, start_height, params),
            RetargetAlgorithm::Litecoin => {
                litecoin_next_bits(headers, height, start_height, params)
            }
            RetargetAlgorithm::KimotoGravityWell => {
                kimoto_gravity_well(headers, height, start_height, params)
            }
            RetargetAlgorithm::VertcoinTestnet => {
                vertcoin_testnet_next_bits(headers, height, start_height, params)
            }
        }
    }
}

impl fmt::Display for RetargetAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetargetAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RetargetAlgorithm::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown retarget algorithm: {}", s))
    }
}
