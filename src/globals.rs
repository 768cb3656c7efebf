use alloy::primitives::{Address, FixedBytes};
use eyre::{Result, eyre};
use log::*;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::{
    config::CliArgs,
    logger::Logger,
    macros::{global, global_set, parse_address},
};

pub struct GlobalData {
    pub logger: Mutex<Logger>,
    pub config: Mutex<CliArgs>,
    pub network: Mutex<&'static NetworkData>,
}

#[derive(Debug, Clone)]
pub struct NetworkData {
    pub chain_id: u64,
    pub name: &'static str,
    /// Genesis fork version deposits are signed for
    pub fork_version: FixedBytes<4>,
    pub deposit_contract: Address,
    pub stake_token: Address,
    /// Balance below which a validator is not viable (gwei)
    pub min_balance: u64,
    /// Max effective balance of a compounding validator (gwei)
    pub max_balance: u64,
}

pub static G: Lazy<GlobalData> = Lazy::new(|| GlobalData {
    logger: Mutex::new(Logger::default()),
    config: Mutex::new(CliArgs::default()),
    network: Mutex::new(&*NETWORK_GNOSIS),
});

pub fn set_network(name: &str) -> Result<()> {
    global_set!(network) = network_by_name(name)?;
    trace!("{:#?}", global!(network));
    Ok(())
}

pub fn network_by_name(name: &str) -> Result<&'static NetworkData> {
    NETWORKS
        .values()
        .find(|n| n.name.eq_ignore_ascii_case(name))
        .copied()
        .ok_or_else(|| eyre!("Unknown network '{}'", name))
}

pub fn network_by_chain_id(chain_id: u64) -> Option<&'static NetworkData> {
    NETWORKS.get(&chain_id).copied()
}

pub static NETWORKS: Lazy<HashMap<u64, &'static NetworkData>> = Lazy::new(|| {
    let mut m: HashMap<u64, &'static NetworkData> = HashMap::new();
    m.insert(100, &*NETWORK_GNOSIS);
    m.insert(10200, &*NETWORK_CHIADO);
    m
});

// One GNO is credited as 32 "eth" on the beacon chain, so the gwei
// constants below are the mainnet presets expressed in GNO terms
pub static NETWORK_GNOSIS: Lazy<NetworkData> = Lazy::new(|| NetworkData {
    chain_id: 100,
    name: "gnosis",
    fork_version: FixedBytes::new([0x00, 0x00, 0x00, 0x64]),
    deposit_contract: parse_address!("0x0B98057eA310F4d31F2a452B414647007d1645d9"),
    stake_token: parse_address!("0x9C58BAcC331c9aa871AFD802DB6379a98e80CEdb"),
    min_balance: 32_000_000_000,
    max_balance: 2_048_000_000_000,
});

pub static NETWORK_CHIADO: Lazy<NetworkData> = Lazy::new(|| NetworkData {
    chain_id: 10200,
    name: "chiado",
    fork_version: FixedBytes::new([0x00, 0x00, 0x00, 0x6f]),
    deposit_contract: parse_address!("0xb97036A26259B7147018913bD58a774cf91acf25"),
    stake_token: parse_address!("0x19C653Da7c37c66208fbfbE8908A5051B57b4C70"),
    min_balance: 32_000_000_000,
    max_balance: 2_048_000_000_000,
});
