//! Stake and bond economics (§4.4 "Economics").

use crate::record::{Amount, AuditRecord};

/// Protocol constants (§6), expressed in the smallest on-chain unit.
#[derive(Clone, Copy, Debug)]
pub struct ProtocolConstants {
    pub coordinator_stake: Amount,
    pub proof_cost_estimate: Amount,
    pub challenge_period_secs: u64,
    pub challenge_response_deadline_secs: u64,
    pub block_hash_delay: u64,
    pub confidence_x1000: u64,
    pub sample_submission_window_secs: u64,
}

impl Default for ProtocolConstants {
    fn default() -> Self {
        // 0.1 / 0.001 "ETH" in wei-equivalent smallest units.
        Self {
            coordinator_stake: 100_000_000_000_000_000,
            proof_cost_estimate: 1_000_000_000_000_000,
            challenge_period_secs: 7 * 24 * 3600,
            challenge_response_deadline_secs: 3 * 24 * 3600,
            block_hash_delay: 1,
            confidence_x1000: 2996,
            sample_submission_window_secs: 24 * 3600,
        }
    }
}

/// `challengeBond(auditId) = PROOF_COST_ESTIMATE × (unverified_PM +
/// unverified_TV)` at challenge time, where unverified excludes
/// already-sampled-verified batches. If the product is zero the bond is
/// `PROOF_COST_ESTIMATE` (minimum-bond rule).
pub fn challenge_bond(record: &AuditRecord, constants: &ProtocolConstants) -> Amount {
    let unverified = record.unverified_pm_count() + record.unverified_tv_count();
    let bond = constants.proof_cost_estimate * unverified as u128;
    if bond == 0 {
        constants.proof_cost_estimate
    } else {
        bond
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Phase;

    fn base_record() -> AuditRecord {
        AuditRecord {
            audit_id: 1,
            coordinator: "coordinator".to_string(),
            poll: "poll".to_string(),
            stake_amount: 0,
            pm_commitments: vec![],
            tv_commitments: vec![],
            yes_votes: 0,
            no_votes: 0,
            pm_batch_count: 2,
            tv_batch_count: 2,
            pm_batch_size: 5,
            tv_batch_size: 5,
            commit_hash: rla_field::FieldElement::zero(),
            commit_block: 0,
            pm_sample_count: 2,
            tv_sample_count: 1,
            pm_selected_indices: vec![1, 2],
            tv_selected_indices: vec![1],
            pm_batch_verified: vec![true, true],
            tv_batch_verified: vec![true, false],
            pm_proofs_verified: 2,
            tv_proofs_verified: 1,
            full_pm_proofs_verified: 0,
            full_tv_proofs_verified: 0,
            phase: Phase::Tentative,
            proof_deadline: 0,
            tentative_timestamp: Some(0),
            challenge_deadline: None,
            challenger: None,
            challenge_bond: None,
        }
    }

    #[test]
    fn bond_scales_with_unverified_batches() {
        let constants = ProtocolConstants::default();
        let record = base_record();
        // unverified: PM 0, TV 1 -> bond = cost_estimate * 1
        assert_eq!(challenge_bond(&record, &constants), constants.proof_cost_estimate);
    }

    #[test]
    fn minimum_bond_rule_applies_when_everything_is_verified() {
        let constants = ProtocolConstants::default();
        let mut record = base_record();
        record.tv_batch_verified = vec![true, true];
        assert_eq!(challenge_bond(&record, &constants), constants.proof_cost_estimate);
    }
}
