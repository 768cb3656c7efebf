pub mod datetime;
pub mod depositdata;
pub mod json;

use alloy::primitives::{
    U256,
    utils::{ParseUnits, format_units, parse_ether},
};
use eyre::{Result, WrapErr};
use std::path::PathBuf;

use crate::deposit_root::{gwei_to_stake, stake_to_gwei};

pub fn format_unit<T>(amount: &T, decimals: u8) -> String
where
    T: Into<ParseUnits> + Copy,
{
    let eth_str = format_units(*amount, decimals).unwrap_or_default();
    let v: Vec<&str> = eth_str.split('.').collect();
    match v.get(1) {
        Some(fractional) => {
            let mut fractional = fractional.to_string();
            fractional.truncate(10);
            format!("{}.{}", v[0], fractional)
        }
        None => eth_str,
    }
}

/// Gwei as GNO, 1 GNO == 32e9 gwei on the beacon chain
pub fn format_gno(gwei: u64) -> String {
    format_unit(&gwei_to_stake(gwei), 18)
}

/// Fractional GNO amount into beacon chain gwei
pub fn parse_gno(amount: &str) -> Result<u64> {
    let stake: U256 = parse_ether(amount).wrap_err_with(|| format!("invalid amount '{}'", amount))?;
    Ok(stake_to_gwei(stake)?)
}

/// Expands "~/..." and env vars in user supplied paths
pub fn expand_path(path: &PathBuf) -> Result<PathBuf> {
    Ok(shellexpand::full(&path.to_string_lossy())?.to_string().into())
}
