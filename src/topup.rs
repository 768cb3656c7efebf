use colored::*;
use log::*;

use crate::{
    deposit_root::{deposit_data_root_gwei, gwei_to_stake},
    snapshot::{PublicKey, Signature, ValidatorSnapshot},
    validator::DepositBatchPayload,
};

/// Splits `total_amount` across `validators`, result aligned with the input.
///
/// `target_balance == 0` splits evenly, the first `total_amount % n` validators
/// get one extra unit. Otherwise each validator is topped up towards the target;
/// when the budget cannot cover every need it is shared proportionally to need,
/// and the rounding residual is not redistributed.
pub fn allocate(total_amount: u64, validators: &[ValidatorSnapshot], target_balance: u64) -> Vec<u64> {
    let n = validators.len() as u64;
    if n == 0 {
        return Vec::new();
    }

    if target_balance == 0 {
        let base = total_amount / n;
        let remainder = total_amount % n;
        return (0..n)
            .map(|i| match i < remainder {
                true => base + 1,
                false => base,
            })
            .collect();
    }

    let needs: Vec<u64> = validators
        .iter()
        .map(|v| target_balance.saturating_sub(v.balance))
        .collect();
    let total_need: u128 = needs.iter().map(|n| *n as u128).sum();

    match total_need > total_amount as u128 {
        true => {
            debug!(
                "Top-up budget {} short of total need {}, scaling down",
                total_amount.to_string().yellow(),
                total_need.to_string().red()
            );
            needs
                .iter()
                .map(|need| (*need as u128 * total_amount as u128 / total_need) as u64)
                .collect()
        }
        false => needs,
    }
}

/// Deposit contract payload topping up existing validators with `amounts` gwei.
///
/// The contract ignores credentials and signature for an already known pubkey,
/// so both are zeroed and the roots are computed over the zeroed fields. Zero
/// amounts are dropped.
pub fn topup_payload(validators: &[ValidatorSnapshot], amounts: &[u64]) -> DepositBatchPayload {
    let credentials = [0u8; 32];
    let signature = Signature::ZERO;
    let mut pubkeys: Vec<PublicKey> = Vec::new();
    let mut roots = Vec::new();
    let mut stakes = Vec::new();

    for (validator, amount) in validators.iter().zip(amounts).filter(|(_, a)| **a > 0) {
        pubkeys.push(validator.pubkey);
        roots.push(deposit_data_root_gwei(
            validator.pubkey.as_slice(),
            &credentials,
            signature.as_slice(),
            *amount,
        ));
        stakes.push(gwei_to_stake(*amount));
    }
    DepositBatchPayload::new(
        &pubkeys,
        credentials.into(),
        &vec![signature; pubkeys.len()],
        roots,
        stakes,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deposit_root::build_deposit_root;
    use crate::snapshot::{CredentialType::Compounding, tests::validator};

    fn balances(balances: &[u64]) -> Vec<ValidatorSnapshot> {
        balances
            .iter()
            .enumerate()
            .map(|(i, b)| validator(i as u64, *b, Compounding))
            .collect()
    }

    #[test]
    fn equal_split_with_remainder() {
        let amounts = allocate(100, &balances(&[0, 0, 0]), 0);
        assert_eq!(amounts, vec![34, 33, 33]);
        assert_eq!(amounts.iter().sum::<u64>(), 100);

        let amounts = allocate(5, &balances(&[0, 0, 0, 0]), 0);
        assert_eq!(amounts, vec![2, 1, 1, 1]);
    }

    #[test]
    fn target_fully_covered() {
        let amounts = allocate(1000, &balances(&[10, 40, 60]), 50);
        assert_eq!(amounts, vec![40, 10, 0]);
    }

    #[test]
    fn target_shortfall_is_proportional() {
        let validators = balances(&[0, 50, 75]);
        // needs: 100, 50, 25 -> total 175
        let amounts = allocate(70, &validators, 100);
        assert_eq!(amounts, vec![40, 20, 10]);

        let amounts = allocate(100, &validators, 100);
        let needs = [100u64, 50, 25];
        for (a, n) in amounts.iter().zip(needs) {
            assert!(*a <= n);
        }
        // 57.14, 28.57, 14.28 floored, residual stays unallocated
        assert_eq!(amounts, vec![57, 28, 14]);
        assert!(amounts.iter().sum::<u64>() <= 100);
    }

    #[test]
    fn empty_validators() {
        assert!(allocate(100, &[], 0).is_empty());
        assert!(allocate(100, &[], 32).is_empty());
    }

    #[test]
    fn payload_skips_zero_amounts() {
        let validators = balances(&[0, 0, 0]);
        let payload = topup_payload(&validators, &[16_000_000_000, 0, 32_000_000_000]);
        assert_eq!(payload.deposit_data_roots.len(), 2);
        assert_eq!(payload.pubkeys.len(), 96);
        assert_eq!(payload.signatures.len(), 192);
        assert_eq!(payload.amounts[0], gwei_to_stake(16_000_000_000));
        assert_eq!(
            payload.deposit_data_roots[1],
            build_deposit_root(
                validators[2].pubkey.as_slice(),
                &[0u8; 32],
                &[0u8; 96],
                gwei_to_stake(32_000_000_000)
            )
            .unwrap()
        );
    }
}
