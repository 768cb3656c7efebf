//! Deposit data root as computed by the consensus layer
//!
//! `DepositData` is a fixed-shape SSZ container of four fields, so its
//! `hash_tree_root` unrolls to a handful of SHA-256 calls:
//!
//! ```text
//!                         root
//!               /                    \
//!       H(pk_root || wc)     H(amount || sig_root)
//!        /          \           /           \
//!  H(pk || 0^16)    wc     amount_le64    H(H(sig[..64]) || H(sig[64..] || 0^32))
//! ```

use alloy::primitives::{B256, U256};
use sha2::{Digest, Sha256};
use tree_hash::TreeHash;

use crate::{
    error::{Error, Result},
    helpers::depositdata::DepositMessage,
    snapshot::PublicKey,
};

pub const PUBKEY_LEN: usize = 48;
pub const CREDENTIALS_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 96;

/// Gwei credited per 10^9 stake token base units (1 GNO == 32 "eth")
pub const DEPOSIT_AMOUNT_RATIO: u64 = 32;
pub const GWEI_DIVISOR: u64 = 1_000_000_000;

fn hash(left: &[u8], right: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

fn check_len(field: &'static str, bytes: &[u8], expected: usize) -> Result<()> {
    match bytes.len() == expected {
        true => Ok(()),
        false => Err(Error::InvalidLength {
            field,
            expected,
            actual: bytes.len(),
        }),
    }
}

/// Converts stake token base units into consensus layer gwei
pub fn stake_to_gwei(stake_value: U256) -> Result<u64> {
    let overflow = || Error::AmountOverflow(stake_value.to_string());
    let gwei = stake_value
        .checked_mul(U256::from(DEPOSIT_AMOUNT_RATIO))
        .ok_or_else(overflow)?
        / U256::from(GWEI_DIVISOR);
    u64::try_from(gwei).map_err(|_| overflow())
}

/// Converts consensus layer gwei into stake token base units, exact for any gwei value
pub fn gwei_to_stake(gwei: u64) -> U256 {
    U256::from(gwei) * U256::from(GWEI_DIVISOR / DEPOSIT_AMOUNT_RATIO)
}

/// Deposit data root for a deposit of `stake_value` token base units
pub fn build_deposit_root(
    pubkey: &[u8],
    credentials: &[u8],
    signature: &[u8],
    stake_value: U256,
) -> Result<B256> {
    check_len("pubkey", pubkey, PUBKEY_LEN)?;
    check_len("withdrawal_credentials", credentials, CREDENTIALS_LEN)?;
    check_len("signature", signature, SIGNATURE_LEN)?;
    Ok(deposit_data_root_gwei(
        pubkey,
        credentials,
        signature,
        stake_to_gwei(stake_value)?,
    ))
}

// Callers guarantee the lengths
pub(crate) fn deposit_data_root_gwei(
    pubkey: &[u8],
    credentials: &[u8],
    signature: &[u8],
    amount_gwei: u64,
) -> B256 {
    let mut amount = [0u8; 32];
    amount[..8].copy_from_slice(&amount_gwei.to_le_bytes());

    let pubkey_root = hash(pubkey, &[0u8; 16]);
    let signature_root = hash(
        &hash(&signature[..64], &[]),
        &hash(&signature[64..], &[0u8; 32]),
    );
    let left = hash(&pubkey_root, credentials);
    let right = hash(&amount, &signature_root);
    B256::from(hash(&left, &right))
}

/// Signing message root, `deposit_message_root` in deposit-cli files
pub fn deposit_message_root(pubkey: &PublicKey, credentials: &B256, amount_gwei: u64) -> B256 {
    DepositMessage {
        pubkey: *pubkey,
        withdrawal_credentials: *credentials,
        amount: amount_gwei,
    }
    .tree_hash_root()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::helpers::depositdata::DepositData;
    use alloy::primitives::{b256, hex};

    pub(crate) const PUBKEY: &str = "0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f202122232425262728292a2b2c2d2e2f30";
    pub(crate) const CREDENTIALS: &str =
        "010000000000000000000000a0a1a2a3a4a5a6a7a8a9aaabacadaeafb0b1b2b3";
    pub(crate) const SIGNATURE: &str = "00070e151c232a31383f464d545b626970777e858c939aa1a8afb6bdc4cbd2d9e0e7eef5fc030a11181f262d343b424950575e656c737a81888f969da4abb2b9c0c7ced5dce3eaf1f8ff060d141b222930373e454c535a61686f767d848b9299";
    const ONE_GNO: u128 = 1_000_000_000_000_000_000;

    fn inputs() -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        (
            hex::decode(PUBKEY).unwrap(),
            hex::decode(CREDENTIALS).unwrap(),
            hex::decode(SIGNATURE).unwrap(),
        )
    }

    #[test]
    fn known_vectors() {
        let (pubkey, credentials, signature) = inputs();
        assert_eq!(
            build_deposit_root(&pubkey, &credentials, &signature, U256::from(ONE_GNO)).unwrap(),
            b256!("b36f1f4ba72bcfc6be75b4c8f4581a26fc4ee92dc4be27e93481bd8a5448d55b")
        );

        let pubkey = [0xaau8; 48];
        assert_eq!(
            build_deposit_root(&pubkey, &credentials, &signature, U256::from(ONE_GNO)).unwrap(),
            b256!("cc12593c03f46546fad9aa8709c790c858381bc8f49e75153ef51e050684a438")
        );
        assert_eq!(
            deposit_message_root(
                &PublicKey::from(pubkey),
                &B256::from_slice(&credentials),
                32_000_000_000
            ),
            b256!("71c9016453fdc35f5bec5d42c9f9d0fed54abe30c50b9f08dee9166064633081")
        );
    }

    #[test]
    fn zeroed_topup_vector() {
        let (pubkey, _, _) = inputs();
        assert_eq!(
            build_deposit_root(&pubkey, &[0u8; 32], &[0u8; 96], U256::from(ONE_GNO / 2)).unwrap(),
            b256!("a803937d9c0bf5507e7b6b786fb5da6022aa552f3de5e891b85db3558e461340")
        );
    }

    #[test]
    fn matches_tree_hash_container() {
        let (pubkey, credentials, signature) = inputs();
        let deposit = DepositData {
            pubkey: PublicKey::from_slice(&pubkey),
            withdrawal_credentials: B256::from_slice(&credentials),
            amount: 64_000_000_000,
            signature: crate::snapshot::Signature::from_slice(&signature),
        };
        assert_eq!(
            build_deposit_root(&pubkey, &credentials, &signature, U256::from(2 * ONE_GNO)).unwrap(),
            deposit.tree_hash_root()
        );
    }

    #[test]
    fn every_byte_matters() {
        let (pubkey, credentials, signature) = inputs();
        let stake = U256::from(ONE_GNO);
        let root = build_deposit_root(&pubkey, &credentials, &signature, stake).unwrap();

        for i in 0..pubkey.len() {
            let mut p = pubkey.clone();
            p[i] ^= 1;
            assert_ne!(root, build_deposit_root(&p, &credentials, &signature, stake).unwrap());
        }
        for i in 0..credentials.len() {
            let mut c = credentials.clone();
            c[i] ^= 1;
            assert_ne!(root, build_deposit_root(&pubkey, &c, &signature, stake).unwrap());
        }
        for i in 0..signature.len() {
            let mut s = signature.clone();
            s[i] ^= 1;
            assert_ne!(root, build_deposit_root(&pubkey, &credentials, &s, stake).unwrap());
        }
        let other = stake + U256::from(GWEI_DIVISOR);
        assert_ne!(root, build_deposit_root(&pubkey, &credentials, &signature, other).unwrap());
    }

    #[test]
    fn rejects_bad_lengths() {
        let (pubkey, credentials, signature) = inputs();
        let stake = U256::from(ONE_GNO);
        assert_eq!(
            build_deposit_root(&pubkey[1..], &credentials, &signature, stake),
            Err(Error::InvalidLength {
                field: "pubkey",
                expected: 48,
                actual: 47
            })
        );
        assert!(matches!(
            build_deposit_root(&pubkey, &[0u8; 33], &signature, stake),
            Err(Error::InvalidLength { field: "withdrawal_credentials", .. })
        ));
        assert!(matches!(
            build_deposit_root(&pubkey, &credentials, &signature[..95], stake),
            Err(Error::InvalidLength { field: "signature", .. })
        ));
    }

    #[test]
    fn unit_conversion() {
        assert_eq!(stake_to_gwei(U256::from(ONE_GNO)).unwrap(), 32_000_000_000);
        assert_eq!(gwei_to_stake(32_000_000_000), U256::from(ONE_GNO));
        assert!(stake_to_gwei(U256::MAX).is_err());
    }
}
