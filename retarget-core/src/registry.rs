use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use lazy_static::lazy_static;
use log::info;

use crate::{error::RegistryError, params::NetworkParams};

#[derive(Default)]
pub struct Registry {
    nets: BTreeMap<u32, Arc<NetworkParams>>,
    pub_key_hash_addr_ids: HashSet<u8>,
    script_hash_addr_ids: HashSet<u8>,
    bech32_segwit_prefixes: HashSet<String>,
    hd_priv_to_pub: HashMap<[u8; 4], [u8; 4]>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_networks() -> Self {
        let mut registry = Self::new();
        for params in [
            NetworkParams::mainnet(),
            NetworkParams::regtest(),
            NetworkParams::testnet3(),
            NetworkParams::simnet(),
        ] {
            registry
                .register(params)
                .expect("built-in networks have distinct magics");
        }
        registry
    }

    pub fn register(&mut self, params: NetworkParams) -> Result<(), RegistryError> {
        if self.nets.contains_key(&params.net) {
            return Err(RegistryError::DuplicateNetwork {
                name: params.name.clone(),
                net: params.net,
            });
        }

        self.register_hd_key_id(&params.hd_public_key_id, &params.hd_private_key_id)?;
        self.pub_key_hash_addr_ids.insert(params.pub_key_hash_addr_id);
        self.script_hash_addr_ids.insert(params.script_hash_addr_id);
        self.bech32_segwit_prefixes
            .insert(format!("{}1", params.bech32_hrp_segwit.to_lowercase()));

        info!(
            "registered network {} (magic {:#010x}, {})",
            params.name, params.net, params.algorithm
        );
        self.nets.insert(params.net, Arc::new(params));
        Ok(())
    }

    pub fn is_registered(&self, net: u32) -> bool {
        self.nets.contains_key(&net)
    }

    pub fn lookup_by_magic(&self, net: u32) -> Option<Arc<NetworkParams>> {
        self.nets.get(&net).cloned()
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<Arc<NetworkParams>> {
        self.nets.values().find(|p| p.name == name).cloned()
    }

    pub fn networks(&self) -> Vec<Arc<NetworkParams>> {
        self.nets.values().cloned().collect()
    }

    pub fn is_pub_key_hash_addr_id(&self, id: u8) -> bool {
        self.pub_key_hash_addr_ids.contains(&id)
    }

    pub fn is_script_hash_addr_id(&self, id: u8) -> bool {
        self.script_hash_addr_ids.contains(&id)
    }

    /// Whether `prefix` (HRP plus the `1` separator) belongs to a
    /// registered network. Case-insensitive.
    pub fn is_bech32_segwit_prefix(&self, prefix: &str) -> bool {
        self.bech32_segwit_prefixes.contains(&prefix.to_lowercase())
    }

    pub fn register_hd_key_id(
        &mut self,
        hd_public_key_id: &[u8],
        hd_private_key_id: &[u8],
    ) -> Result<(), RegistryError> {
        let public: [u8; 4] = hd_public_key_id
            .try_into()
            .map_err(|_| RegistryError::InvalidKeyId)?;
        let private: [u8; 4] = hd_private_key_id
            .try_into()
            .map_err(|_| RegistryError::InvalidKeyId)?;
        self.hd_priv_to_pub.insert(private, public);
        Ok(())
    }

    pub fn hd_private_key_to_public_key_id(&self, id: &[u8]) -> Result<[u8; 4], RegistryError> {
        let private: [u8; 4] = id.try_into().map_err(|_| RegistryError::UnknownKeyId)?;
        self.hd_priv_to_pub
            .get(&private)
            .copied()
            .ok_or(RegistryError::UnknownKeyId)
    }
}

lazy_static! {
    static ref REGISTRY: RwLock<Registry> = RwLock::new(Registry::with_default_networks());
}

fn with_registry<T>(f: impl FnOnce(&Registry) -> T) -> T {
    let registry = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    f(&registry)
}

fn with_registry_mut<T>(f: impl FnOnce(&mut Registry) -> T) -> T {
    let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    f(&mut registry)
}

pub fn register(params: NetworkParams) -> Result<(), RegistryError> {
    with_registry_mut(|r| r.register(params))
}

pub fn is_registered(net: u32) -> bool {
    with_registry(|r| r.is_registered(net))
}

pub fn lookup_by_magic(net: u32) -> Option<Arc<NetworkParams>> {
    with_registry(|r| r.lookup_by_magic(net))
}

pub fn lookup_by_name(name: &str) -> Option<Arc<NetworkParams>> {
    with_registry(|r| r.lookup_by_name(name))
}

pub fn networks() -> Vec<Arc<NetworkParams>> {
    with_registry(Registry::networks)
}

pub fn is_pub_key_hash_addr_id(id: u8) -> bool {
    with_registry(|r| r.is_pub_key_hash_addr_id(id))
}

pub fn is_script_hash_addr_id(id: u8) -> bool {
    with_registry(|r| r.is_script_hash_addr_id(id))
}

pub fn is_bech32_segwit_prefix(prefix: &str) -> bool {
    with_registry(|r| r.is_bech32_segwit_prefix(prefix))
}

pub fn register_hd_key_id(
    hd_public_key_id: &[u8],
    hd_private_key_id: &[u8],
) -> Result<(), RegistryError> {
    with_registry_mut(|r| r.register_hd_key_id(hd_public_key_id, hd_private_key_id))
}

pub fn hd_private_key_to_public_key_id(id: &[u8]) -> Result<[u8; 4], RegistryError> {
    with_registry(|r| r.hd_private_key_to_public_key_id(id))
}
