use colored::*;
use log::*;
use serde_derive::Serialize;

use crate::snapshot::{PublicKey, ValidatorRef, ValidatorSnapshot};

/// Amount value telling the withdrawal contract to fully exit the validator
pub const EXIT_SENTINEL: u64 = 0;

/// EIP-7002 withdrawal request, `amount` in gwei
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WithdrawalInstruction {
    pub pubkey: PublicKey,
    pub amount: u64,
}

impl WithdrawalInstruction {
    pub fn is_exit(&self) -> bool {
        self.amount == EXIT_SENTINEL
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WithdrawalPlan {
    pub withdrawals: Vec<WithdrawalInstruction>,
    pub exits: Vec<ValidatorRef>,
    /// Gwei actually leaving the validators, exits counted at full balance
    pub total_allocated: u64,
}

/// Splits `requested` gwei across `validators` in proportion to their balance.
///
/// With `preserve_minimum` every validator keeps at least `min_balance`, so no
/// validator exits. Otherwise a withdrawal that would leave a dust balance below
/// `min_balance` is rounded up into a full exit.
pub fn compute_withdrawals(
    validators: &[ValidatorSnapshot],
    requested: u64,
    total_balance: u64,
    preserve_minimum: bool,
    min_balance: u64,
) -> WithdrawalPlan {
    let mut plan = WithdrawalPlan::default();
    if total_balance == 0 || requested == 0 {
        return plan;
    }

    let exit_buffer = match preserve_minimum {
        true => min_balance,
        false => 0,
    };

    for validator in validators.iter().filter(|v| v.balance > exit_buffer) {
        let balance = validator.balance;
        let share = balance as u128 * requested as u128 / total_balance as u128;
        let mut amount = share.min((balance - exit_buffer) as u128) as u64;

        let leftover = balance - amount;
        if !preserve_minimum && leftover > 0 && leftover < min_balance {
            trace!(
                "Validator {} would keep {} gwei, exiting instead",
                validator.index,
                leftover
            );
            amount = balance;
        }

        if amount == balance {
            plan.withdrawals.push(WithdrawalInstruction {
                pubkey: validator.pubkey,
                amount: EXIT_SENTINEL,
            });
            plan.exits.push(ValidatorRef::from(validator));
            plan.total_allocated += balance;
        } else if amount > 0 {
            plan.withdrawals.push(WithdrawalInstruction {
                pubkey: validator.pubkey,
                amount,
            });
            plan.total_allocated += amount;
        }
    }

    debug!(
        "Withdrawal plan: {} requests, {} exits, {} gwei",
        plan.withdrawals.len().to_string().magenta(),
        plan.exits.len().to_string().red(),
        plan.total_allocated.to_string().yellow()
    );
    plan
}
