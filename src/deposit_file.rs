use alloy::primitives::{B256, FixedBytes, U256, hex};
use colored::*;
use eyre::WrapErr;
use log::*;
use serde_derive::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::{
    deposit_root::{deposit_data_root_gwei, deposit_message_root, gwei_to_stake},
    error::{Error, LookupError, Result},
    globals::NetworkData,
    helpers::depositdata::DepositData,
    snapshot::{CredentialType, PublicKey, Signature},
    validator::DepositBatchPayload,
};

/// Existing deposit query, answers which of `pubkeys` were already deposited
pub trait DepositLookup {
    fn deposited(
        &self,
        pubkeys: &[PublicKey],
        chain_id: u64,
    ) -> std::result::Result<HashSet<PublicKey>, LookupError>;
}

impl DepositLookup for HashSet<PublicKey> {
    fn deposited(
        &self,
        pubkeys: &[PublicKey],
        _chain_id: u64,
    ) -> std::result::Result<HashSet<PublicKey>, LookupError> {
        Ok(pubkeys.iter().filter(|k| self.contains(*k)).copied().collect())
    }
}

/// Pubkeys known to be deposited on one chain, read from a JSON array
#[derive(Debug, Clone, Default)]
pub struct KnownDeposits {
    pub chain_id: u64,
    pub pubkeys: HashSet<PublicKey>,
}

impl KnownDeposits {
    pub fn load<P: AsRef<Path> + std::fmt::Debug>(path: P, chain_id: u64) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(&path).wrap_err_with(|| format!("{:?}", path))?;
        let pubkeys: Vec<PublicKey> =
            serde_json::from_str(&content).wrap_err_with(|| format!("{:?}", path))?;
        debug!("Loaded {} known deposits from {:?}", pubkeys.len(), path);
        Ok(KnownDeposits {
            chain_id,
            pubkeys: pubkeys.into_iter().collect(),
        })
    }
}

impl DepositLookup for KnownDeposits {
    fn deposited(
        &self,
        pubkeys: &[PublicKey],
        chain_id: u64,
    ) -> std::result::Result<HashSet<PublicKey>, LookupError> {
        if chain_id != self.chain_id {
            return Err(LookupError(format!(
                "known deposits are for chain {}, not {}",
                self.chain_id, chain_id
            )));
        }
        self.pubkeys.deposited(pubkeys, chain_id)
    }
}

/// Amount is a decimal string in deposit-cli output, accept plain numbers too
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(u64),
    Text(String),
}

/// Deposit file entry as uploaded, nothing checked yet
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDepositRecord {
    pub pubkey: Option<String>,
    pub withdrawal_credentials: Option<String>,
    pub amount: Option<RawAmount>,
    pub signature: Option<String>,
    pub deposit_message_root: Option<String>,
    pub deposit_data_root: Option<String>,
    pub fork_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositRecord {
    pub pubkey: PublicKey,
    pub withdrawal_credentials: B256,
    /// Gwei
    pub amount: u64,
    pub signature: Signature,
    pub deposit_message_root: B256,
    pub deposit_data_root: B256,
    pub fork_version: FixedBytes<4>,
}

impl DepositRecord {
    /// Checks the file's roots against recomputed ones
    pub fn verify_roots(&self) -> Result<()> {
        let message_root = deposit_message_root(
            &self.pubkey,
            &self.withdrawal_credentials,
            self.amount,
        );
        if message_root != self.deposit_message_root {
            return Err(Error::RootMismatch {
                pubkey: self.pubkey,
                root: "deposit_message_root",
            });
        }
        let data_root = deposit_data_root_gwei(
            self.pubkey.as_slice(),
            self.withdrawal_credentials.as_slice(),
            self.signature.as_slice(),
            self.amount,
        );
        if data_root != self.deposit_data_root {
            return Err(Error::RootMismatch {
                pubkey: self.pubkey,
                root: "deposit_data_root",
            });
        }
        Ok(())
    }

    pub fn deposit_data(&self) -> DepositData {
        DepositData {
            pubkey: self.pubkey,
            withdrawal_credentials: self.withdrawal_credentials,
            amount: self.amount,
            signature: self.signature,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositMode {
    /// Fresh validators, none may have been deposited before
    NewValidators,
    /// Single top-up of an existing validator, optionally the one the caller selected
    TopUp { expected: Option<PublicKey> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDeposits {
    pub records: Vec<DepositRecord>,
    pub credential_type: CredentialType,
    /// Gwei
    pub total_amount: u64,
}

impl ValidatedDeposits {
    pub fn payload(&self) -> DepositBatchPayload {
        let pubkeys: Vec<PublicKey> = self.records.iter().map(|r| r.pubkey).collect();
        let signatures: Vec<Signature> = self.records.iter().map(|r| r.signature).collect();
        DepositBatchPayload::new(
            &pubkeys,
            self.records[0].withdrawal_credentials,
            &signatures,
            self.records.iter().map(|r| r.deposit_data_root).collect(),
            self.records.iter().map(|r| gwei_to_stake(r.amount)).collect(),
        )
    }

    pub fn total_stake(&self) -> U256 {
        gwei_to_stake(self.total_amount)
    }
}

pub fn parse_file(json: &str) -> Result<Vec<RawDepositRecord>> {
    serde_json::from_str(json).map_err(|e| Error::InvalidFormat(e.to_string()))
}

pub fn load_file<P: AsRef<Path> + std::fmt::Debug>(path: P) -> eyre::Result<Vec<RawDepositRecord>> {
    let content = std::fs::read_to_string(&path).wrap_err_with(|| format!("{:?}", path))?;
    Ok(parse_file(&content)?)
}

fn decode_fixed<const N: usize>(index: usize, field: &str, value: &Option<String>) -> Result<FixedBytes<N>> {
    let value = value
        .as_ref()
        .ok_or_else(|| Error::InvalidFormat(format!("deposit {index}: missing {field}")))?;
    let bytes = hex::decode(value.trim())
        .map_err(|e| Error::InvalidFormat(format!("deposit {index}: {field}: {e}")))?;
    match bytes.len() == N {
        true => Ok(FixedBytes::from_slice(&bytes)),
        false => Err(Error::InvalidFormat(format!(
            "deposit {index}: {field} must be {} bytes, got {}",
            N,
            bytes.len()
        ))),
    }
}

fn decode_amount(index: usize, amount: &Option<RawAmount>) -> Result<u64> {
    match amount {
        Some(RawAmount::Number(n)) => Ok(*n),
        Some(RawAmount::Text(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| Error::InvalidFormat(format!("deposit {index}: amount: {e}"))),
        None => Err(Error::InvalidFormat(format!("deposit {index}: missing amount"))),
    }
}

impl RawDepositRecord {
    /// Field presence, encoding and lengths
    pub fn to_record(&self, index: usize) -> Result<DepositRecord> {
        Ok(DepositRecord {
            pubkey: decode_fixed(index, "pubkey", &self.pubkey)?,
            withdrawal_credentials: decode_fixed(
                index,
                "withdrawal_credentials",
                &self.withdrawal_credentials,
            )?,
            amount: decode_amount(index, &self.amount)?,
            signature: decode_fixed(index, "signature", &self.signature)?,
            deposit_message_root: decode_fixed(
                index,
                "deposit_message_root",
                &self.deposit_message_root,
            )?,
            deposit_data_root: decode_fixed(index, "deposit_data_root", &self.deposit_data_root)?,
            fork_version: decode_fixed(index, "fork_version", &self.fork_version)?,
        })
    }
}

/// Validates an uploaded deposit batch. `available_balance` is in gwei.
pub fn validate<L: DepositLookup + ?Sized>(
    records: &[RawDepositRecord],
    available_balance: u64,
    network: &NetworkData,
    lookup: &L,
    mode: DepositMode,
) -> Result<ValidatedDeposits> {
    if records.is_empty() {
        return Err(Error::InvalidFormat("deposit file is empty".to_string()));
    }
    let records = records
        .iter()
        .enumerate()
        .map(|(i, r)| r.to_record(i))
        .collect::<Result<Vec<_>>>()?;
    for record in &records {
        record.verify_roots()?;
    }

    if let Some(r) = records
        .iter()
        .find(|r| r.fork_version != network.fork_version)
    {
        return Err(Error::WrongNetwork {
            pubkey: r.pubkey,
            expected: network.fork_version,
            found: r.fork_version,
        });
    }

    let pubkeys: Vec<PublicKey> = records.iter().map(|r| r.pubkey).collect();
    match mode {
        DepositMode::TopUp { expected } => {
            if records.len() != 1 {
                return Err(Error::InvalidFormat(format!(
                    "a top-up takes exactly one deposit, file has {}",
                    records.len()
                )));
            }
            let pubkey = pubkeys[0];
            if !lookup.deposited(&pubkeys, network.chain_id)?.contains(&pubkey) {
                return Err(Error::NotFound(pubkey));
            }
            if let Some(expected) = expected {
                if expected != pubkey {
                    return Err(Error::Mismatch {
                        expected,
                        found: pubkey,
                    });
                }
            }
        }
        DepositMode::NewValidators => {
            let existing = lookup.deposited(&pubkeys, network.chain_id)?;
            if !existing.is_empty() {
                // Keep file order for the report
                let already: Vec<PublicKey> = pubkeys
                    .iter()
                    .filter(|k| existing.contains(*k))
                    .copied()
                    .collect();
                warn!(
                    "{} of {} deposits already exist, rejecting batch",
                    already.len(),
                    pubkeys.len()
                );
                return Err(Error::AlreadyDeposited { pubkeys: already });
            }
        }
    }

    let mut seen = HashSet::new();
    if let Some(dup) = pubkeys.iter().find(|k| !seen.insert(**k)) {
        return Err(Error::DuplicateKey(*dup));
    }

    let credentials = records[0].withdrawal_credentials;
    if records
        .iter()
        .any(|r| r.withdrawal_credentials != credentials)
    {
        return Err(Error::InconsistentCredentials);
    }

    let required: u128 = records.iter().map(|r| r.amount as u128).sum();
    if required > available_balance as u128 {
        let required = u64::try_from(required).unwrap_or(u64::MAX);
        return Err(Error::InsufficientBalance {
            required,
            available: available_balance,
            shortfall: required - available_balance,
        });
    }

    let credential_type = CredentialType::from_credentials(&credentials).ok_or_else(|| {
        Error::InvalidFormat(format!(
            "unknown withdrawal credentials prefix 0x{:02x}",
            credentials[0]
        ))
    })?;

    debug!(
        "Validated {} deposits ({} credentials) totalling {} gwei",
        records.len().to_string().magenta(),
        credential_type.to_string().blue(),
        required.to_string().yellow()
    );
    Ok(ValidatedDeposits {
        records,
        credential_type,
        total_amount: required as u64,
    })
}
