use alloy::primitives::{FixedBytes, hex};
use thiserror::Error;

use crate::snapshot::PublicKey;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure reported by an existing-deposit lookup backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("deposit lookup failed: {0}")]
pub struct LookupError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid deposit file format: {0}")]
    InvalidFormat(String),

    #[error("{field} must be {expected} bytes, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("deposit amount {0} does not fit in a gwei u64")]
    AmountOverflow(String),

    #[error("{root} of {} does not match the deposit data", fmt_key(.pubkey))]
    RootMismatch {
        pubkey: PublicKey,
        root: &'static str,
    },

    #[error(
        "deposit for {} targets fork version {}, expected {}",
        fmt_key(.pubkey),
        hex::encode(.found),
        hex::encode(.expected)
    )]
    WrongNetwork {
        pubkey: PublicKey,
        expected: FixedBytes<4>,
        found: FixedBytes<4>,
    },

    #[error("no prior deposit found for {}", fmt_key(.0))]
    NotFound(PublicKey),

    #[error(
        "deposit file pubkey {} does not match the selected validator {}",
        fmt_key(.found),
        fmt_key(.expected)
    )]
    Mismatch {
        expected: PublicKey,
        found: PublicKey,
    },

    #[error("{} of the validators were already deposited: {}", .pubkeys.len(), fmt_keys(.pubkeys))]
    AlreadyDeposited { pubkeys: Vec<PublicKey> },

    #[error("duplicate pubkey {} in deposit batch", fmt_key(.0))]
    DuplicateKey(PublicKey),

    #[error("all deposits in a batch must share the same withdrawal credentials")]
    InconsistentCredentials,

    #[error(
        "insufficient balance: required {required} gwei, available {available} gwei (short {shortfall} gwei)"
    )]
    InsufficientBalance {
        required: u64,
        available: u64,
        shortfall: u64,
    },

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

fn fmt_key(pubkey: &PublicKey) -> String {
    format!("0x{}", hex::encode(pubkey))
}

fn fmt_keys(pubkeys: &[PublicKey]) -> String {
    pubkeys.iter().map(fmt_key).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortfall_is_rendered() {
        let err = Error::InsufficientBalance {
            required: 64,
            available: 40,
            shortfall: 24,
        };
        assert_eq!(
            err.to_string(),
            "insufficient balance: required 64 gwei, available 40 gwei (short 24 gwei)"
        );
    }

    #[test]
    fn offending_key_is_rendered() {
        let key = PublicKey::repeat_byte(0xab);
        let msg = Error::DuplicateKey(key).to_string();
        assert!(msg.contains(&hex::encode(key)), "{msg}");
    }
}
