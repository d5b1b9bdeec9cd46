use anyhow::{anyhow, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    compact::compact_to_target,
    error::RetargetError,
    genesis,
    header::{BlockHeader, HeaderAccessor},
    retarget::{Retarget, RetargetAlgorithm},
    sha256::Hash,
    U256,
};

// Network magic values, little-endian on the wire.
pub const MAIN_NET: u32 = 0xd9b4_bef9;
pub const TEST_NET: u32 = 0xdab5_bffa;
pub const TEST_NET3: u32 = 0x0709_110b;
pub const SIM_NET: u32 = 0x1214_1c16;

/// Script `1 <key> <key> 2 OP_CHECKMULTISIG` guarding the public signet.
const DEFAULT_SIGNET_CHALLENGE: &str = "512103ad5e0edad18cb1f0fc0d28a3d4f1f3e445640337489abb\
     10404f2d1e086be430210359ef5021964fe22d6f8e05b2463c9540ce96883fe3b278760f04\
     8f5189f2e6c452ae";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    pub height: i32,
    pub hash: Hash,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DnsSeed {
    pub host: String,
    pub has_filtering: bool,
}

impl DnsSeed {
    fn new(host: &str, has_filtering: bool) -> Self {
        DnsSeed {
            host: host.to_string(),
            has_filtering,
        }
    }
}

impl std::fmt::Display for DnsSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.host)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConsensusDeployment {
    pub bit_number: u8,
    pub start_time: u64,
    pub expire_time: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deployment {
    TestDummy = 0,
    Csv = 1,
    Segwit = 2,
    Taproot = 3,
}

pub const DEFINED_DEPLOYMENTS: usize = 4;

const NEVER_EXPIRES: u64 = i64::MAX as u64;

#[derive(Clone, Debug)]
pub struct NetworkParams {
    pub name: String,
    pub net: u32,
    pub default_port: String,
    pub dns_seeds: Vec<DnsSeed>,

    pub genesis_header: BlockHeader,
    pub genesis_hash: Hash,

    pub pow_limit: U256,
    pub pow_limit_bits: u32,

    pub bip0034_height: i32,
    pub bip0065_height: i32,
    pub bip0066_height: i32,

    pub coinbase_maturity: u16,
    pub subsidy_reduction_interval: i32,

    pub target_timespan: Duration,
    pub target_time_per_block: Duration,
    /// Bounds a single retarget to `[1/factor, factor]` of the previous target.
    pub retarget_adjustment_factor: i64,
    pub reduce_min_difficulty: bool,
    pub min_diff_reduction_time: Duration,
    pub algorithm: RetargetAlgorithm,

    pub generate_supported: bool,

    pub checkpoints: Vec<Checkpoint>,

    pub rule_change_activation_threshold: u32,
    pub miner_confirmation_window: u32,
    pub deployments: [ConsensusDeployment; DEFINED_DEPLOYMENTS],

    pub relay_non_std_txs: bool,

    pub bech32_hrp_segwit: String,

    pub pub_key_hash_addr_id: u8,
    pub script_hash_addr_id: u8,
    pub private_key_id: u8,
    pub witness_pub_key_hash_addr_id: u8,
    pub witness_script_hash_addr_id: u8,

    pub hd_private_key_id: [u8; 4],
    pub hd_public_key_id: [u8; 4],
    pub hd_coin_type: u32,
}

fn checkpoint(height: i32, hash: &str) -> Checkpoint {
    Checkpoint {
        height,
        hash: Hash::from_static(hash),
    }
}

fn max_pow_limit(bits: usize) -> U256 {
    (U256::one() << bits) - U256::one()
}

impl NetworkParams {
    pub fn mainnet() -> Self {
        NetworkParams {
            name: "mainnet".to_string(),
            net: MAIN_NET,
            default_port: "5889".to_string(),
            dns_seeds: vec![
                DnsSeed::new("useast1.vtconline.org", true),
                DnsSeed::new("vtc.gertjaap.org", true),
                DnsSeed::new("vert.idzstad.pl", false),
                DnsSeed::new("dnsseed.vertcoin.cc", true),
            ],
            genesis_header: genesis::mainnet_genesis(),
            genesis_hash: genesis::mainnet_genesis_hash(),
            pow_limit: max_pow_limit(224),
            pow_limit_bits: 0x1e0fffff,
            bip0034_height: 691_488,
            bip0065_height: 691_488,
            bip0066_height: 691_488,
            coinbase_maturity: 100,
            subsidy_reduction_interval: 840_000,
            target_timespan: Duration::hours(84),
            target_time_per_block: Duration::seconds(150),
            retarget_adjustment_factor: 4,
            reduce_min_difficulty: false,
            min_diff_reduction_time: Duration::zero(),
            algorithm: RetargetAlgorithm::KimotoGravityWell,
            generate_supported: false,
            checkpoints: vec![
                checkpoint(0, "4d96a915f49d40b1e5c2844d1ee2dccb90013a990ccea12c492d22110489f0c4"),
                checkpoint(24_200, "d7ed819858011474c8b0cae4ad0b9bdbb745becc4c386bc22d1220cc5a4d1787"),
                checkpoint(65_000, "9e673a69c35a423f736ab66f9a195d7c42f979847a729c0f3cef2c0b8b9d0289"),
                checkpoint(84_065, "a904170a5a98109b2909379d9bc03ef97a6b44d5dafbc9084b8699b0cba5aa98"),
                checkpoint(228_023, "15c94667a9e941359d2ee6527e2876db1b5e7510a5ded3885ca02e7e0f516b51"),
                checkpoint(346_992, "f1714fa4c7990f4b3d472eb22132891ccd3c7ad7208e2d1ab15bde68854fb0ee"),
                checkpoint(347_269, "fa1e592b7ea2aa97c5f20ccd7c40f3aaaeb31d1232c978847a79f28f83b6c22a"),
                checkpoint(430_000, "2f5703cf7b6f956b84fd49948cbf49dc164cfcb5a7b55903b1c4f53bc7851611"),
                checkpoint(516_999, "572ed47da461743bcae526542053e7bc532de299345e4f51d77786f2870b7b28"),
                checkpoint(627_610, "6000a787f2d8bb77d4f491a423241a4cc8439d862ca6cec6851aba4c79ccfedc"),
                checkpoint(1_172_000, "13311f001ad833853d714d1b0425f76004373cb2286a4e5094a811b8a4246147"),
                checkpoint(1_474_747, "edf23a98cc196888635a01ba4672680df0b7c16eb48146e706b6f2e669974934"),
            ],
            rule_change_activation_threshold: 1512,
            miner_confirmation_window: 2016,
            deployments: [
                // January 1 2008 to December 31 2008
                ConsensusDeployment {
                    bit_number: 28,
                    start_time: 1_199_145_601,
                    expire_time: 1_230_767_999,
                },
                // March 1 2017 to March 1 2018
                ConsensusDeployment {
                    bit_number: 1,
                    start_time: 1_488_326_400,
                    expire_time: 1_519_862_400,
                },
                ConsensusDeployment {
                    bit_number: 2,
                    start_time: 1_488_326_400,
                    expire_time: 1_519_862_400,
                },
                ConsensusDeployment::default(),
            ],
            relay_non_std_txs: true,
            bech32_hrp_segwit: "vtc".to_string(),
            pub_key_hash_addr_id: 0x47,
            script_hash_addr_id: 0x05,
            private_key_id: 0x80,
            witness_pub_key_hash_addr_id: 0x06,
            witness_script_hash_addr_id: 0x0a,
            hd_private_key_id: [0x04, 0x88, 0xad, 0xe4],
            hd_public_key_id: [0x04, 0x88, 0xb2, 0x1e],
            hd_coin_type: 28,
        }
    }

    pub fn testnet3() -> Self {
        NetworkParams {
            name: "testnet3".to_string(),
            net: TEST_NET3,
            default_port: "15889".to_string(),
            dns_seeds: vec![
                DnsSeed::new("jlovejoy.mit.edu", true),
                DnsSeed::new("gertjaap.ddns.net", true),
                DnsSeed::new("fr1.vtconline.org", true),
                DnsSeed::new("tvtc.vertcoin.org", true),
            ],
            genesis_header: genesis::testnet3_genesis(),
            genesis_hash: genesis::testnet3_genesis_hash(),
            pow_limit: max_pow_limit(224),
            pow_limit_bits: 0x1e0fffff,
            bip0034_height: 300,
            bip0065_height: 300,
            bip0066_height: 300,
            coinbase_maturity: 100,
            subsidy_reduction_interval: 840_000,
            target_timespan: Duration::hours(84),
            target_time_per_block: Duration::seconds(150),
            retarget_adjustment_factor: 4,
            reduce_min_difficulty: true,
            min_diff_reduction_time: Duration::minutes(20),
            algorithm: RetargetAlgorithm::VertcoinTestnet,
            generate_supported: false,
            checkpoints: vec![checkpoint(
                0,
                "cee8f24feb7a64c8f07916976aa4855decac79b6741a8ec2e32e2747497ad2c9",
            )],
            rule_change_activation_threshold: 26,
            miner_confirmation_window: 50,
            deployments: [
                ConsensusDeployment {
                    bit_number: 28,
                    start_time: 1_199_145_601,
                    expire_time: 1_230_767_999,
                },
                ConsensusDeployment {
                    bit_number: 1,
                    start_time: 1_488_326_400,
                    expire_time: 1_519_862_400,
                },
                ConsensusDeployment {
                    bit_number: 2,
                    start_time: 1_488_326_400,
                    expire_time: 1_519_862_400,
                },
                ConsensusDeployment::default(),
            ],
            relay_non_std_txs: true,
            bech32_hrp_segwit: "tvtc".to_string(),
            pub_key_hash_addr_id: 0x4a,
            script_hash_addr_id: 0xc4,
            private_key_id: 0xef,
            witness_pub_key_hash_addr_id: 0x03,
            witness_script_hash_addr_id: 0x28,
            hd_private_key_id: [0x04, 0x35, 0x83, 0x94],
            hd_public_key_id: [0x04, 0x35, 0x87, 0xcf],
            hd_coin_type: 28,
        }
    }

    pub fn regtest() -> Self {
        NetworkParams {
            name: "regtest".to_string(),
            net: TEST_NET,
            default_port: "18444".to_string(),
            dns_seeds: Vec::new(),
            genesis_header: genesis::regtest_genesis(),
            genesis_hash: genesis::regtest_genesis_hash(),
            pow_limit: max_pow_limit(255),
            pow_limit_bits: 0x207fffff,
            bip0034_height: 100,
            bip0065_height: 100,
            bip0066_height: 100,
            coinbase_maturity: 100,
            subsidy_reduction_interval: 150,
            target_timespan: Duration::days(14),
            target_time_per_block: Duration::minutes(10),
            retarget_adjustment_factor: 4,
            reduce_min_difficulty: true,
            min_diff_reduction_time: Duration::minutes(20),
            algorithm: RetargetAlgorithm::Litecoin,
            generate_supported: true,
            checkpoints: vec![checkpoint(
                0,
                "2399c0b047ebbbd1650d66867206c97317027b1a1932bc6fc17ce833dc4a85ce",
            )],
            rule_change_activation_threshold: 108,
            miner_confirmation_window: 144,
            deployments: always_active_deployments(28, 0, 1, None),
            relay_non_std_txs: true,
            bech32_hrp_segwit: "rvtc".to_string(),
            pub_key_hash_addr_id: 0x4a,
            script_hash_addr_id: 0xc4,
            private_key_id: 0xef,
            witness_pub_key_hash_addr_id: 0x00,
            witness_script_hash_addr_id: 0x00,
            hd_private_key_id: [0x04, 0x35, 0x83, 0x94],
            hd_public_key_id: [0x04, 0x35, 0x87, 0xcf],
            hd_coin_type: 28,
        }
    }

    pub fn simnet() -> Self {
        NetworkParams {
            name: "simnet".to_string(),
            net: SIM_NET,
            default_port: "18555".to_string(),
            // Simnet must never discover peers on its own.
            dns_seeds: Vec::new(),
            genesis_header: genesis::simnet_genesis(),
            genesis_hash: genesis::simnet_genesis_hash(),
            pow_limit: max_pow_limit(255),
            pow_limit_bits: 0x207fffff,
            bip0034_height: 0,
            bip0065_height: 0,
            bip0066_height: 0,
            coinbase_maturity: 100,
            subsidy_reduction_interval: 210_000,
            target_timespan: Duration::days(14),
            target_time_per_block: Duration::minutes(10),
            retarget_adjustment_factor: 4,
            reduce_min_difficulty: true,
            min_diff_reduction_time: Duration::minutes(20),
            algorithm: RetargetAlgorithm::Bitcoin,
            generate_supported: true,
            checkpoints: Vec::new(),
            rule_change_activation_threshold: 75,
            miner_confirmation_window: 100,
            deployments: always_active_deployments(28, 0, 1, None),
            relay_non_std_txs: true,
            bech32_hrp_segwit: "sb".to_string(),
            pub_key_hash_addr_id: 0x3f,
            script_hash_addr_id: 0x7b,
            private_key_id: 0x64,
            witness_pub_key_hash_addr_id: 0x19,
            witness_script_hash_addr_id: 0x28,
            hd_private_key_id: [0x04, 0x20, 0xb9, 0x00],
            hd_public_key_id: [0x04, 0x20, 0xbd, 0x3a],
            hd_coin_type: 115,
        }
    }

    /// The default public signet.
    pub fn signet() -> Self {
        let challenge = match hex::decode(DEFAULT_SIGNET_CHALLENGE) {
            Ok(bytes) => bytes,
            Err(e) => panic!("invalid hard-coded signet challenge: {}", e),
        };
        Self::custom_signet_params(
            &challenge,
            vec![
                DnsSeed::new("178.128.221.177", false),
                DnsSeed::new("2a01:7c8:d005:390::5", false),
                DnsSeed::new(
                    "v7ajjeirttkbnt32wpy3c6w3emwnfr3fkla7hpxcfokr3ysd3kqtzmqd.onion:38333",
                    false,
                ),
            ],
        )
    }

    /// A signet guarded by `challenge`, the compiled block challenge script.
    ///
    /// The magic is the first four bytes of the double SHA-256 of the
    /// challenge pushed as a single script element, read little-endian.
    pub fn custom_signet_params(challenge: &[u8], dns_seeds: Vec<DnsSeed>) -> Self {
        let mut pushed = Vec::with_capacity(challenge.len() + 1);
        pushed.push(challenge.len() as u8);
        pushed.extend_from_slice(challenge);
        let digest = Hash::double_sha256(&pushed);
        let d = digest.as_bytes();
        let net = u32::from_le_bytes([d[0], d[1], d[2], d[3]]);

        NetworkParams {
            name: "signet".to_string(),
            net,
            default_port: "38333".to_string(),
            dns_seeds,
            genesis_header: genesis::signet_genesis(),
            genesis_hash: genesis::signet_genesis_hash(),
            pow_limit: U256::from(0x0377aeu64) << 216,
            pow_limit_bits: 0x1e0377ae,
            bip0034_height: 1,
            bip0065_height: 1,
            bip0066_height: 1,
            coinbase_maturity: 100,
            subsidy_reduction_interval: 210_000,
            target_timespan: Duration::days(14),
            target_time_per_block: Duration::minutes(10),
            retarget_adjustment_factor: 4,
            reduce_min_difficulty: false,
            min_diff_reduction_time: Duration::minutes(20),
            algorithm: RetargetAlgorithm::Bitcoin,
            generate_supported: false,
            checkpoints: Vec::new(),
            rule_change_activation_threshold: 1916,
            miner_confirmation_window: 2016,
            deployments: {
                let mut deployments = always_active_deployments(28, 29, 29, Some(29));
                deployments[Deployment::TestDummy as usize] = ConsensusDeployment {
                    bit_number: 28,
                    start_time: 1_199_145_601,
                    expire_time: 1_230_767_999,
                };
                deployments
            },
            relay_non_std_txs: false,
            bech32_hrp_segwit: "tb".to_string(),
            pub_key_hash_addr_id: 0x6f,
            script_hash_addr_id: 0xc4,
            private_key_id: 0xef,
            witness_pub_key_hash_addr_id: 0x03,
            witness_script_hash_addr_id: 0x28,
            hd_private_key_id: [0x04, 0x35, 0x83, 0x94],
            hd_public_key_id: [0x04, 0x35, 0x87, 0xcf],
            hd_coin_type: 1,
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "mainnet" => Some(Self::mainnet()),
            "testnet3" => Some(Self::testnet3()),
            "regtest" => Some(Self::regtest()),
            "simnet" => Some(Self::simnet()),
            "signet" => Some(Self::signet()),
            _ => None,
        }
    }

    pub fn epoch_length(&self) -> i64 {
        self.target_timespan
            .num_seconds()
            .checked_div(self.target_time_per_block.num_seconds())
            .unwrap_or(0)
    }

    pub fn next_bits<A: HeaderAccessor + ?Sized>(
        &self,
        headers: &mut A,
        height: i32,
        start_height: i32,
    ) -> Result<u32, RetargetError> {
        self.algorithm.next_bits(headers, height, start_height, self)
    }

    pub fn deployment(&self, deployment: Deployment) -> &ConsensusDeployment {
        &self.deployments[deployment as usize]
    }

    pub fn latest_checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoints.last()
    }

    pub fn checkpoint(&self, height: i32) -> Option<&Checkpoint> {
        self.checkpoints
            .binary_search_by_key(&height, |c| c.height)
            .ok()
            .map(|i| &self.checkpoints[i])
    }

    /// Rejects the timing fields the algorithms divide by.
    pub fn check_retarget_fields(&self) -> Result<(), RetargetError> {
        let invalid = |reason: String| RetargetError::InvalidParams {
            network: self.name.clone(),
            reason,
        };
        let timespan = self.target_timespan.num_seconds();
        let per_block = self.target_time_per_block.num_seconds();
        if per_block <= 0 {
            return Err(invalid("target time per block must be positive".to_string()));
        }
        if timespan < per_block {
            return Err(invalid(format!(
                "target timespan ({}s) must cover at least one block ({}s)",
                timespan, per_block
            )));
        }
        if self.retarget_adjustment_factor < 1 || timespan / self.retarget_adjustment_factor == 0 {
            return Err(invalid(format!(
                "invalid retarget adjustment factor {}",
                self.retarget_adjustment_factor
            )));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.check_retarget_fields()?;
        if compact_to_target(self.pow_limit_bits).is_zero() || self.pow_limit.is_zero() {
            return Err(anyhow!(
                "{}: pow limit {:#010x} does not describe a positive target",
                self.name,
                self.pow_limit_bits
            ));
        }
        Ok(())
    }
}

/// Deployments that are always available for voting and never expire.
fn always_active_deployments(
    dummy_bit: u8,
    csv_bit: u8,
    segwit_bit: u8,
    taproot_bit: Option<u8>,
) -> [ConsensusDeployment; DEFINED_DEPLOYMENTS] {
    let open = |bit_number| ConsensusDeployment {
        bit_number,
        start_time: 0,
        expire_time: NEVER_EXPIRES,
    };
    [
        open(dummy_bit),
        open(csv_bit),
        open(segwit_bit),
        taproot_bit.map(open).unwrap_or_default(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_lengths() {
        assert_eq!(NetworkParams::mainnet().epoch_length(), 2016);
        assert_eq!(NetworkParams::testnet3().epoch_length(), 2016);
        assert_eq!(NetworkParams::regtest().epoch_length(), 2016);
        assert_eq!(NetworkParams::simnet().epoch_length(), 2016);
    }

    #[test]
    fn test_builtin_networks_validate() {
        for name in ["mainnet", "testnet3", "regtest", "simnet", "signet"] {
            let params = NetworkParams::by_name(name).unwrap();
            assert_eq!(params.name, name);
            params.validate().unwrap();
        }
        assert!(NetworkParams::by_name("litecoin").is_none());
    }

    #[test]
    fn test_genesis_matches_first_checkpoint() {
        for params in [
            NetworkParams::mainnet(),
            NetworkParams::testnet3(),
            NetworkParams::regtest(),
        ] {
            assert_eq!(params.checkpoint(0).unwrap().hash, params.genesis_hash);
            assert_eq!(params.genesis_header.block_hash(), params.genesis_hash);
        }
    }

    #[test]
    fn test_checkpoint_lookup() {
        let params = NetworkParams::mainnet();
        assert_eq!(params.latest_checkpoint().unwrap().height, 1_474_747);
        assert_eq!(
            params.checkpoint(430_000).unwrap().hash.to_string(),
            "2f5703cf7b6f956b84fd49948cbf49dc164cfcb5a7b55903b1c4f53bc7851611"
        );
        assert!(params.checkpoint(430_001).is_none());
        assert!(NetworkParams::simnet().latest_checkpoint().is_none());
    }

    #[test]
    fn test_default_signet_magic() {
        let params = NetworkParams::signet();
        assert_eq!(params.net, 0x40cf_030a);
        assert_eq!(params.genesis_header.block_hash(), params.genesis_hash);
        assert_eq!(params.deployment(Deployment::Taproot).bit_number, 29);
    }

    #[test]
    fn test_custom_signet_magic_depends_on_challenge() {
        let a = NetworkParams::custom_signet_params(&[0x51], Vec::new());
        let b = NetworkParams::custom_signet_params(&[0x52], Vec::new());
        assert_ne!(a.net, b.net);
        assert_ne!(a.net, NetworkParams::signet().net);
    }

    #[test]
    fn test_deployments() {
        let mainnet = NetworkParams::mainnet();
        assert_eq!(mainnet.deployment(Deployment::Segwit).bit_number, 2);
        assert_eq!(mainnet.deployment(Deployment::Taproot), &ConsensusDeployment::default());
        let regtest = NetworkParams::regtest();
        assert_eq!(regtest.deployment(Deployment::Csv).expire_time, i64::MAX as u64);
    }

    #[test]
    fn test_next_bits_rejects_degenerate_params_without_panicking() {
        let mut headers = crate::test_util::chain(30, 1_401_292_357, 600, 0x1d00ffff);
        for params in [
            NetworkParams {
                target_time_per_block: Duration::zero(),
                ..NetworkParams::simnet()
            },
            NetworkParams {
                target_timespan: Duration::zero(),
                ..NetworkParams::simnet()
            },
            NetworkParams {
                retarget_adjustment_factor: 0,
                ..NetworkParams::regtest()
            },
        ] {
            assert!(matches!(
                params.next_bits(&mut headers, 20, 0),
                Err(RetargetError::InvalidParams { .. })
            ));
        }

        let zero_block_time = NetworkParams {
            target_time_per_block: Duration::zero(),
            ..NetworkParams::mainnet()
        };
        assert_eq!(zero_block_time.epoch_length(), 0);
        assert!(zero_block_time.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_degenerate_retarget_fields() {
        let zero_block_time = NetworkParams {
            target_time_per_block: Duration::zero(),
            ..NetworkParams::simnet()
        };
        assert!(zero_block_time.validate().is_err());

        let short_timespan = NetworkParams {
            target_timespan: Duration::seconds(60),
            ..NetworkParams::simnet()
        };
        assert!(short_timespan.validate().is_err());

        let zero_factor = NetworkParams {
            retarget_adjustment_factor: 0,
            ..NetworkParams::simnet()
        };
        assert!(zero_factor.validate().is_err());

        let negative_limit = NetworkParams {
            pow_limit_bits: 0x04923456,
            ..NetworkParams::simnet()
        };
        assert!(negative_limit.validate().is_err());
    }

    #[test]
    fn test_pow_limit_bits_decode_within_type() {
        // Mainnet's compact limit is looser than its integer limit.
        let mainnet = NetworkParams::mainnet();
        assert!(compact_to_target(mainnet.pow_limit_bits) > mainnet.pow_limit);
        let regtest = NetworkParams::regtest();
        assert!(compact_to_target(regtest.pow_limit_bits) <= regtest.pow_limit);
    }
}
