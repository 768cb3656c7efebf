use alloy::primitives::{B256, FixedBytes};
use eyre::{Result, WrapErr};
use log::*;
use serde_derive::{Deserialize, Serialize};
use std::path::Path;

pub type PublicKey = FixedBytes<48>;
pub type Signature = FixedBytes<96>;

/// Withdrawal credential scheme, taken from the first credentials byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialType {
    /// 0x00
    Bls,
    /// 0x01, can be upgraded to compounding in place
    Eth1,
    /// 0x02
    Compounding,
}

impl CredentialType {
    pub fn from_prefix(prefix: u8) -> Option<Self> {
        match prefix {
            0x00 => Some(CredentialType::Bls),
            0x01 => Some(CredentialType::Eth1),
            0x02 => Some(CredentialType::Compounding),
            _ => None,
        }
    }

    pub fn from_credentials(credentials: &B256) -> Option<Self> {
        Self::from_prefix(credentials[0])
    }

    pub fn prefix(&self) -> u8 {
        match self {
            CredentialType::Bls => 0x00,
            CredentialType::Eth1 => 0x01,
            CredentialType::Compounding => 0x02,
        }
    }
}

impl std::fmt::Display for CredentialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02x}", self.prefix())
    }
}

/// Coarse lifecycle filter over the beacon API validator statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Pending,
    Active,
    Exited,
}

impl Status {
    // https://github.com/ethereum/beacon-APIs/blob/master/validator-flow.md
    pub fn from_beacon(status: &str) -> Option<Self> {
        match status {
            "pending_initialized" | "pending_queued" | "pending" => Some(Status::Pending),
            "active_ongoing" | "active_exiting" | "active_slashed" | "active" => {
                Some(Status::Active)
            }
            "exited_unslashed" | "exited_slashed" | "withdrawal_possible" | "withdrawal_done"
            | "exited" | "withdrawal" => Some(Status::Exited),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorSnapshot {
    pub index: u64,
    pub pubkey: PublicKey,
    /// Actual balance in gwei
    pub balance: u64,
    /// Effective balance in gwei
    pub effective_balance: u64,
    pub credential_type: CredentialType,
    pub status: Status,
}

impl ValidatorSnapshot {
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }
}

/// Index and pubkey of a validator referenced by a plan entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ValidatorRef {
    pub index: u64,
    pub pubkey: PublicKey,
}

impl From<&ValidatorSnapshot> for ValidatorRef {
    fn from(v: &ValidatorSnapshot) -> Self {
        ValidatorRef {
            index: v.index,
            pubkey: v.pubkey,
        }
    }
}

pub fn total_balance(validators: &[ValidatorSnapshot]) -> u64 {
    validators.iter().map(|v| v.balance).sum()
}

// Beacon API `/eth/v1/beacon/states/{state_id}/validators` entries
#[derive(Debug, Deserialize)]
struct BeaconValidator {
    #[serde(with = "serde_utils::quoted_u64")]
    index: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    balance: u64,
    status: String,
    validator: BeaconValidatorData,
}

#[derive(Debug, Deserialize)]
struct BeaconValidatorData {
    pubkey: PublicKey,
    withdrawal_credentials: B256,
    #[serde(with = "serde_utils::quoted_u64")]
    effective_balance: u64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BeaconResponse {
    Wrapped { data: Vec<BeaconValidator> },
    Bare(Vec<BeaconValidator>),
}

impl TryFrom<BeaconValidator> for ValidatorSnapshot {
    type Error = eyre::Report;

    fn try_from(v: BeaconValidator) -> Result<Self> {
        let credential_type = CredentialType::from_credentials(&v.validator.withdrawal_credentials)
            .ok_or_else(|| {
                eyre::eyre!(
                    "validator {} has unknown credentials prefix 0x{:02x}",
                    v.index,
                    v.validator.withdrawal_credentials[0]
                )
            })?;
        let status = Status::from_beacon(&v.status)
            .ok_or_else(|| eyre::eyre!("validator {} has unknown status {}", v.index, v.status))?;
        Ok(ValidatorSnapshot {
            index: v.index,
            pubkey: v.validator.pubkey,
            balance: v.balance,
            effective_balance: v.validator.effective_balance,
            credential_type,
            status,
        })
    }
}

pub fn parse_validators(json: &str) -> Result<Vec<ValidatorSnapshot>> {
    let entries = match serde_json::from_str::<BeaconResponse>(json)? {
        BeaconResponse::Wrapped { data } => data,
        BeaconResponse::Bare(data) => data,
    };
    entries.into_iter().map(ValidatorSnapshot::try_from).collect()
}

pub fn load_validators<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<Vec<ValidatorSnapshot>> {
    let content = std::fs::read_to_string(&path).wrap_err_with(|| format!("{:?}", path))?;
    let validators = parse_validators(&content).wrap_err_with(|| format!("{:?}", path))?;
    debug!("Loaded {} validators from {:?}", validators.len(), path);
    Ok(validators)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn validator(index: u64, balance: u64, credential_type: CredentialType) -> ValidatorSnapshot {
        let mut pubkey = PublicKey::ZERO;
        pubkey[40..48].copy_from_slice(&index.to_be_bytes());
        ValidatorSnapshot {
            index,
            pubkey,
            balance,
            effective_balance: balance,
            credential_type,
            status: Status::Active,
        }
    }

    #[test]
    fn parse_beacon_response() {
        let json = r#"{
            "execution_optimistic": false,
            "data": [
                {
                    "index": "42",
                    "balance": "32000123456",
                    "status": "active_ongoing",
                    "validator": {
                        "pubkey": "0x0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f202122232425262728292a2b2c2d2e2f30",
                        "withdrawal_credentials": "0x010000000000000000000000a0a1a2a3a4a5a6a7a8a9aaabacadaeafb0b1b2b3",
                        "effective_balance": "32000000000",
                        "slashed": false,
                        "activation_eligibility_epoch": "0",
                        "activation_epoch": "0",
                        "exit_epoch": "18446744073709551615",
                        "withdrawable_epoch": "18446744073709551615"
                    }
                },
                {
                    "index": "43",
                    "balance": "0",
                    "status": "withdrawal_done",
                    "validator": {
                        "pubkey": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                        "withdrawal_credentials": "0x020000000000000000000000a0a1a2a3a4a5a6a7a8a9aaabacadaeafb0b1b2b3",
                        "effective_balance": "0"
                    }
                }
            ]
        }"#;
        let validators = parse_validators(json).unwrap();
        assert_eq!(validators.len(), 2);
        assert_eq!(validators[0].index, 42);
        assert_eq!(validators[0].balance, 32_000_123_456);
        assert_eq!(validators[0].effective_balance, 32_000_000_000);
        assert_eq!(validators[0].credential_type, CredentialType::Eth1);
        assert!(validators[0].is_active());
        assert_eq!(validators[1].credential_type, CredentialType::Compounding);
        assert_eq!(validators[1].status, Status::Exited);
    }

    #[test]
    fn bare_array_and_bad_prefix() {
        let json = r#"[{
            "index": "1",
            "balance": "1",
            "status": "active_ongoing",
            "validator": {
                "pubkey": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                "withdrawal_credentials": "0x030000000000000000000000a0a1a2a3a4a5a6a7a8a9aaabacadaeafb0b1b2b3",
                "effective_balance": "1"
            }
        }]"#;
        assert!(parse_validators(json).is_err());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(Status::from_beacon("pending_queued"), Some(Status::Pending));
        assert_eq!(Status::from_beacon("active_exiting"), Some(Status::Active));
        assert_eq!(Status::from_beacon("exited_slashed"), Some(Status::Exited));
        assert_eq!(Status::from_beacon("bogus"), None);
    }
}
