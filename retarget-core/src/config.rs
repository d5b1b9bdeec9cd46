//! TOML descriptions of custom networks.
//!
//! A config names one of the built-in networks as its `base` and overrides
//! any subset of its fields:
//!
//! ```toml
//! base = "regtest"
//! name = "devnet"
//! net = 0x1a2b3c4d
//! algorithm = "kimoto_gravity_well"
//! target_time_per_block = 150
//! target_timespan = 302400
//! pow_limit_bits = 0x1e0fffff
//! ```

use std::io::{Error as IoError, ErrorKind as IoErrorKind, Read, Result as IoResult, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, serde_as, DurationSeconds};

use crate::{
    compact::compact_to_target,
    params::{Checkpoint, DnsSeed, NetworkParams},
    retarget::RetargetAlgorithm,
    utils::Saveable,
};

#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    pub base: String,
    #[serde_as(as = "Option<Hex>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signet_challenge: Option<Vec<u8>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_seeds: Option<Vec<DnsSeed>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<RetargetAlgorithm>,
    #[serde_as(as = "Option<DurationSeconds<i64>>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_timespan: Option<Duration>,
    #[serde_as(as = "Option<DurationSeconds<i64>>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_time_per_block: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retarget_adjustment_factor: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce_min_difficulty: Option<bool>,
    #[serde_as(as = "Option<DurationSeconds<i64>>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_diff_reduction_time: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pow_limit_bits: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoints: Option<Vec<Checkpoint>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bech32_hrp_segwit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_key_hash_addr_id: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_hash_addr_id: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_id: Option<u8>,
    #[serde_as(as = "Option<Hex>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hd_private_key_id: Option<[u8; 4]>,
    #[serde_as(as = "Option<Hex>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hd_public_key_id: Option<[u8; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hd_coin_type: Option<u32>,
}

impl NetworkConfig {
    /// Applies the overrides to the base network and validates the result.
    pub fn into_params(self) -> Result<NetworkParams> {
        let mut params = match (self.base.as_str(), self.signet_challenge) {
            ("signet", Some(challenge)) => {
                let seeds = self.dns_seeds.clone().unwrap_or_default();
                NetworkParams::custom_signet_params(&challenge, seeds)
            }
            (base, Some(_)) => {
                return Err(anyhow!(
                    "signet_challenge requires base \"signet\", found \"{}\"",
                    base
                ))
            }
            (base, None) => NetworkParams::by_name(base)
                .ok_or_else(|| anyhow!("unknown base network \"{}\"", base))?,
        };

        if let Some(name) = self.name {
            params.name = name;
        }
        if let Some(net) = self.net {
            params.net = net;
        }
        if let Some(port) = self.default_port {
            params.default_port = port;
        }
        if let Some(seeds) = self.dns_seeds {
            params.dns_seeds = seeds;
        }
        if let Some(algorithm) = self.algorithm {
            params.algorithm = algorithm;
        }
        if let Some(timespan) = self.target_timespan {
            params.target_timespan = timespan;
        }
        if let Some(per_block) = self.target_time_per_block {
            params.target_time_per_block = per_block;
        }
        if let Some(factor) = self.retarget_adjustment_factor {
            params.retarget_adjustment_factor = factor;
        }
        if let Some(reduce) = self.reduce_min_difficulty {
            params.reduce_min_difficulty = reduce;
        }
        if let Some(time) = self.min_diff_reduction_time {
            params.min_diff_reduction_time = time;
        }
        if let Some(bits) = self.pow_limit_bits {
            params.pow_limit_bits = bits;
            params.pow_limit = compact_to_target(bits);
        }
        if let Some(mut checkpoints) = self.checkpoints {
            checkpoints.sort_by_key(|c| c.height);
            params.checkpoints = checkpoints;
        }
        if let Some(hrp) = self.bech32_hrp_segwit {
            params.bech32_hrp_segwit = hrp;
        }
        if let Some(id) = self.pub_key_hash_addr_id {
            params.pub_key_hash_addr_id = id;
        }
        if let Some(id) = self.script_hash_addr_id {
            params.script_hash_addr_id = id;
        }
        if let Some(id) = self.private_key_id {
            params.private_key_id = id;
        }
        if let Some(id) = self.hd_private_key_id {
            params.hd_private_key_id = id;
        }
        if let Some(id) = self.hd_public_key_id {
            params.hd_public_key_id = id;
        }
        if let Some(coin_type) = self.hd_coin_type {
            params.hd_coin_type = coin_type;
        }

        params.validate()?;
        debug!(
            "configured network {} on {} (epoch length {})",
            params.name,
            params.algorithm,
            params.epoch_length()
        );
        Ok(params)
    }

    pub fn load_params<P: AsRef<Path>>(path: P) -> Result<NetworkParams> {
        let path = path.as_ref();
        let config = Self::load_from_file(path)
            .with_context(|| format!("Failed to load network config {}", path.display()))?;
        config
            .into_params()
            .with_context(|| format!("Invalid network config {}", path.display()))
    }
}

impl Saveable for NetworkConfig {
    fn load<I: Read>(mut reader: I) -> IoResult<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        toml::from_str(&content).map_err(|e| {
            IoError::new(
                IoErrorKind::InvalidData,
                format!("Failed to deserialize NetworkConfig: {}", e),
            )
        })
    }

    fn save<O: Write>(&self, mut writer: O) -> IoResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            IoError::new(
                IoErrorKind::InvalidData,
                format!("Failed to serialize NetworkConfig: {}", e),
            )
        })?;
        writer.write_all(content.as_bytes())
    }
}
