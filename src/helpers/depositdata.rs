use alloy::primitives::{B256, FixedBytes};
use serde_derive::Serialize;

#[derive(Debug, Clone, PartialEq, tree_hash_derive::TreeHash, Serialize)]
pub struct DepositData {
    /// Validator public key
    pub pubkey: FixedBytes<48>,
    /// Withdrawal credentials
    pub withdrawal_credentials: B256,
    /// Amount deposited in gwei
    #[serde(with = "serde_utils::quoted_u64")]
    pub amount: u64,
    /// Deposit signature
    pub signature: FixedBytes<96>,
}

/// The part of `DepositData` covered by the deposit signature
#[derive(Debug, Clone, PartialEq, tree_hash_derive::TreeHash, Serialize)]
pub struct DepositMessage {
    pub pubkey: FixedBytes<48>,
    pub withdrawal_credentials: B256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub amount: u64,
}
