use colored::*;
use log::*;
use serde_derive::Serialize;

use crate::snapshot::{CredentialType, ValidatorRef, ValidatorSnapshot};

/// One EIP-7251 consolidation request. Source and target are equal for an
/// in place 0x01 -> 0x02 upgrade, in which case nothing is transferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidationRecord {
    pub source: ValidatorRef,
    /// Source balance moved by this request
    pub source_balance: u64,
    pub target: ValidatorRef,
    /// Target's accumulated balance right before this request
    pub target_balance: u64,
}

impl ConsolidationRecord {
    pub fn is_upgrade(&self) -> bool {
        self.source == self.target
    }
}

/// Resulting group after all merges into a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidationTarget {
    pub target: ValidatorRef,
    pub sources: Vec<ValidatorRef>,
    pub final_balance: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationPlan {
    pub consolidations: Vec<ConsolidationRecord>,
    pub targets: Vec<ConsolidationTarget>,
    /// Validators already at or above capacity
    pub skipped: Vec<ValidatorRef>,
    pub resulting_group_count: usize,
}

/// First-fit grouping of compounding and 0x01 validators under `capacity`.
///
/// The queue holds compounding validators followed by 0x01 validators, each in
/// input order. Each head becomes a target and absorbs every later queued
/// validator that still fits, in a single pass. Validators that overflow stay
/// queued for later targets. BLS (0x00) validators cannot consolidate and are
/// left out.
pub fn plan(validators: &[ValidatorSnapshot], capacity: u64) -> ConsolidationPlan {
    let queue: Vec<&ValidatorSnapshot> = validators
        .iter()
        .filter(|v| v.credential_type == CredentialType::Compounding)
        .chain(
            validators
                .iter()
                .filter(|v| v.credential_type == CredentialType::Eth1),
        )
        .collect();
    let mut consumed = vec![false; queue.len()];
    let mut plan = ConsolidationPlan::default();

    for head in 0..queue.len() {
        if consumed[head] {
            continue;
        }
        consumed[head] = true;
        let target = queue[head];
        let target_ref = ValidatorRef::from(target);

        if target.balance >= capacity {
            trace!("Validator {} at capacity ({} gwei)", target.index, target.balance);
            plan.skipped.push(target_ref);
            continue;
        }

        if target.credential_type == CredentialType::Eth1 {
            plan.consolidations.push(ConsolidationRecord {
                source: target_ref,
                source_balance: 0,
                target: target_ref,
                target_balance: target.balance,
            });
        }

        let mut running = target.balance;
        let mut sources = Vec::new();
        for candidate in head + 1..queue.len() {
            if consumed[candidate] {
                continue;
            }
            let source = queue[candidate];
            // Landing exactly on capacity is allowed
            match running.checked_add(source.balance) {
                Some(merged) if merged <= capacity => {
                    consumed[candidate] = true;
                    let source_ref = ValidatorRef::from(source);
                    plan.consolidations.push(ConsolidationRecord {
                        source: source_ref,
                        source_balance: source.balance,
                        target: target_ref,
                        target_balance: running,
                    });
                    sources.push(source_ref);
                    running = merged;
                }
                _ => {}
            }
        }

        debug!(
            "Target {} absorbs {} validators -> {} gwei",
            target.index.to_string().blue(),
            sources.len().to_string().magenta(),
            running.to_string().yellow()
        );
        plan.targets.push(ConsolidationTarget {
            target: target_ref,
            sources,
            final_balance: running,
        });
    }

    plan.resulting_group_count = plan.targets.len() + plan.skipped.len();
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{CredentialType::*, tests::validator};
    use std::collections::HashMap;

    const CAP: u64 = 2048;

    fn check_invariants(validators: &[ValidatorSnapshot], plan: &ConsolidationPlan, capacity: u64) {
        let mut seen: HashMap<u64, usize> = HashMap::new();
        for t in &plan.targets {
            assert!(t.final_balance <= capacity, "target {:?} over capacity", t.target);
            *seen.entry(t.target.index).or_default() += 1;
            for s in &t.sources {
                *seen.entry(s.index).or_default() += 1;
            }
        }
        for s in &plan.skipped {
            *seen.entry(s.index).or_default() += 1;
        }
        for r in &plan.consolidations {
            assert!(r.target_balance + r.source_balance <= capacity);
        }
        for v in validators.iter().filter(|v| v.credential_type != Bls) {
            assert_eq!(seen.get(&v.index), Some(&1), "validator {} coverage", v.index);
        }
        assert_eq!(
            plan.resulting_group_count,
            plan.targets.len() + plan.skipped.len()
        );
    }

    #[test]
    fn compounding_first_then_eth1() {
        let validators = vec![
            validator(0, 500, Eth1),
            validator(1, 1000, Compounding),
            validator(2, 600, Eth1),
            validator(3, 1000, Compounding),
        ];
        let plan = plan(&validators, CAP);
        check_invariants(&validators, &plan, CAP);

        // 1 + 3 = 2000, neither eth1 fits afterwards
        assert_eq!(plan.targets[0].target.index, 1);
        assert_eq!(plan.targets[0].final_balance, 2000);
        // 0 becomes a target, gets upgraded and absorbs 2
        assert_eq!(plan.targets[1].target.index, 0);
        assert_eq!(plan.targets[1].final_balance, 1100);
        assert_eq!(plan.resulting_group_count, 2);

        let upgrade = &plan.consolidations[1];
        assert!(upgrade.is_upgrade());
        assert_eq!(upgrade.source.index, 0);
        assert_eq!(upgrade.source_balance, 0);
        assert_eq!(plan.consolidations[2].source.index, 2);
        assert_eq!(plan.consolidations[2].target_balance, 500);
    }

    #[test]
    fn skips_validators_at_capacity() {
        let validators = vec![
            validator(0, 2048, Compounding),
            validator(1, 3000, Eth1),
            validator(2, 10, Eth1),
        ];
        let plan = plan(&validators, CAP);
        check_invariants(&validators, &plan, CAP);
        assert_eq!(
            plan.skipped.iter().map(|v| v.index).collect::<Vec<_>>(),
            vec![0, 1]
        );
        // A skipped validator never gets upgraded
        assert!(plan.consolidations.iter().all(|r| r.source.index == 2));
        assert_eq!(plan.resulting_group_count, 3);
    }

    #[test]
    fn exact_capacity_merge_allowed() {
        let validators = vec![validator(0, 1024, Compounding), validator(1, 1024, Compounding)];
        let plan = plan(&validators, CAP);
        assert_eq!(plan.targets.len(), 1);
        assert_eq!(plan.targets[0].final_balance, CAP);
        assert_eq!(plan.resulting_group_count, 1);
    }

    #[test]
    fn first_fit_without_restart() {
        // 1200 overflows the first target, 800 still fits after it
        let validators = vec![
            validator(0, 1000, Compounding),
            validator(1, 1200, Compounding),
            validator(2, 800, Compounding),
            validator(3, 800, Compounding),
        ];
        let plan = plan(&validators, CAP);
        check_invariants(&validators, &plan, CAP);
        assert_eq!(
            plan.targets[0].sources.iter().map(|v| v.index).collect::<Vec<_>>(),
            vec![2]
        );
        assert_eq!(
            plan.targets[1].sources.iter().map(|v| v.index).collect::<Vec<_>>(),
            vec![3]
        );
        assert_eq!(plan.resulting_group_count, 2);
    }

    #[test]
    fn bls_validators_ignored() {
        let validators = vec![validator(0, 10, Bls), validator(1, 10, Eth1)];
        let plan = plan(&validators, CAP);
        check_invariants(&validators, &plan, CAP);
        assert_eq!(plan.resulting_group_count, 1);
        assert_eq!(plan.consolidations.len(), 1);
        assert!(plan.consolidations[0].is_upgrade());
    }

    #[test]
    fn capacity_invariant_on_mixed_set() {
        let validators: Vec<_> = (0..40u64)
            .map(|i| {
                let balance = (i * 7919) % 2500;
                let kind = if i % 3 == 0 { Compounding } else { Eth1 };
                validator(i, balance, kind)
            })
            .collect();
        let plan = plan(&validators, CAP);
        check_invariants(&validators, &plan, CAP);
    }

    #[test]
    fn empty_input() {
        let plan = plan(&[], CAP);
        assert_eq!(plan, ConsolidationPlan::default());
    }
}
