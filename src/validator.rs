use log::*;
use once_cell::sync::Lazy;

use alloy::{
    primitives::{Address, B256, Bytes, U256, hex},
    sol_types::SolCall,
};
use serde_derive::Serialize;

use crate::{
    consolidation::{ConsolidationPlan, ConsolidationRecord},
    parse_address,
    snapshot::{PublicKey, Signature},
    withdrawal::{WithdrawalInstruction, WithdrawalPlan},
};

// https://eips.ethereum.org/EIPS/eip-7251
pub static CONSOLIDATION_CONTRACT_ADDR: Lazy<Address> =
    Lazy::new(|| parse_address!("0x0000BBdDc7CE488642fb579F8B00f3a590007251"));

// https://eips.ethereum.org/EIPS/eip-7002
pub static WITHDRAWAL_CONTRACT_ADDR: Lazy<Address> =
    Lazy::new(|| parse_address!("0x00000961Ef480Eb55e80D19ad83579A64c007002"));

alloy::sol! {
    #[derive(Debug, PartialEq)]
    interface IDepositContract {
        /// @notice Submit multiple DepositData objects in one call.
        /// @param pubkeys Concatenated BLS12-381 public keys.
        /// @param withdrawal_credentials Commitment shared by every deposit.
        /// @param signatures Concatenated BLS12-381 signatures.
        /// @param deposit_data_roots SHA-256 hashes of the SSZ-encoded DepositData objects.
        /// @param amounts Stake token amounts, one per deposit.
        function batchDeposit(
            bytes calldata pubkeys,
            bytes calldata withdrawal_credentials,
            bytes calldata signatures,
            bytes32[] calldata deposit_data_roots,
            uint256[] calldata amounts
        ) external;
    }
}

/// Arguments of a single `batchDeposit` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositBatchPayload {
    pub pubkeys: Bytes,
    pub withdrawal_credentials: B256,
    pub signatures: Bytes,
    pub deposit_data_roots: Vec<B256>,
    /// Stake token base units
    pub amounts: Vec<U256>,
}

impl DepositBatchPayload {
    pub fn new(
        pubkeys: &[PublicKey],
        withdrawal_credentials: B256,
        signatures: &[Signature],
        deposit_data_roots: Vec<B256>,
        amounts: Vec<U256>,
    ) -> Self {
        DepositBatchPayload {
            pubkeys: pubkeys.iter().flat_map(|k| k.0).collect::<Vec<u8>>().into(),
            withdrawal_credentials,
            signatures: signatures.iter().flat_map(|s| s.0).collect::<Vec<u8>>().into(),
            deposit_data_roots,
            amounts,
        }
    }

    pub fn len(&self) -> usize {
        self.deposit_data_roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deposit_data_roots.is_empty()
    }

    pub fn total_amount(&self) -> U256 {
        self.amounts.iter().fold(U256::ZERO, |acc, a| acc + a)
    }

    /// ABI encoded `batchDeposit` calldata
    pub fn calldata(&self) -> Bytes {
        IDepositContract::batchDepositCall {
            pubkeys: self.pubkeys.clone(),
            withdrawal_credentials: self.withdrawal_credentials.0.to_vec().into(),
            signatures: self.signatures.clone(),
            deposit_data_roots: self.deposit_data_roots.clone(),
            amounts: self.amounts.clone(),
        }
        .abi_encode()
        .into()
    }
}

/// Raw input for a system contract request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestInput {
    pub to: Address,
    pub input: Bytes,
}

// Compound is a consolidation request where both source and target
// public keys are equal (in place validator upgrade, 0x1 -> 0x2)
pub fn consolidation_input(record: &ConsolidationRecord) -> RequestInput {
    let mut input: Vec<u8> = record.source.pubkey.to_vec();
    input.extend(record.target.pubkey.0);
    trace!("consolidation input: {}", hex::encode(&input));
    RequestInput {
        to: *CONSOLIDATION_CONTRACT_ADDR,
        input: input.into(),
    }
}

// Withdrawal contract requires gwei encoded as 8 byte big-endian slice,
// an amount of zero requests a full exit
pub fn withdrawal_input(instruction: &WithdrawalInstruction) -> RequestInput {
    let mut input: Vec<u8> = instruction.pubkey.to_vec();
    input.extend(instruction.amount.to_be_bytes());
    trace!("withdrawal input: {}", hex::encode(&input));
    RequestInput {
        to: *WITHDRAWAL_CONTRACT_ADDR,
        input: input.into(),
    }
}

pub fn consolidation_requests(plan: &ConsolidationPlan) -> Vec<RequestInput> {
    plan.consolidations.iter().map(consolidation_input).collect()
}

pub fn withdrawal_requests(plan: &WithdrawalPlan) -> Vec<RequestInput> {
    plan.withdrawals.iter().map(withdrawal_input).collect()
}
