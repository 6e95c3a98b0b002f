//! The on-chain audit record and its phase graph (§3, §4.4).

use rla_field::FieldElement;
use serde::{Deserialize, Serialize};

pub type AuditId = u64;
pub type AccountId = String;
pub type PollHandle = String;
pub type Timestamp = u64;
pub type BlockHeight = u64;
pub type Amount = u128;

/// `{None, Committed, SampleRevealed, Audited, Tentative, Challenged,
/// Finalized, Rejected}` (§3). The spec names two divergent on-chain
/// interfaces and adopts the richer one with a separate challenge phase
/// (§9 "Open questions"); `Audited` belongs to the simpler variant this
/// implementation rejects and is kept only so the enum matches the data
/// model's named phase set — no operation transitions into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    None,
    Committed,
    SampleRevealed,
    Audited,
    Tentative,
    Challenged,
    Finalized,
    Rejected,
}

/// The full audit record (§3), keyed by a monotonic `auditId`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_id: AuditId,
    pub coordinator: AccountId,
    pub poll: PollHandle,
    pub stake_amount: Amount,

    pub pm_commitments: Vec<FieldElement>,
    pub tv_commitments: Vec<FieldElement>,
    pub yes_votes: u128,
    pub no_votes: u128,
    pub pm_batch_count: u64,
    pub tv_batch_count: u64,
    pub pm_batch_size: u64,
    pub tv_batch_size: u64,

    pub commit_hash: FieldElement,
    pub commit_block: BlockHeight,

    pub pm_sample_count: u64,
    pub tv_sample_count: u64,
    pub pm_selected_indices: Vec<u64>,
    pub tv_selected_indices: Vec<u64>,

    pub pm_batch_verified: Vec<bool>,
    pub tv_batch_verified: Vec<bool>,
    pub pm_proofs_verified: u64,
    pub tv_proofs_verified: u64,
    pub full_pm_proofs_verified: u64,
    pub full_tv_proofs_verified: u64,

    pub phase: Phase,
    pub proof_deadline: Timestamp,
    pub tentative_timestamp: Option<Timestamp>,
    pub challenge_deadline: Option<Timestamp>,
    pub challenger: Option<AccountId>,
    pub challenge_bond: Option<Amount>,
}

impl AuditRecord {
    /// `pmBatchVerified[i]` is 1-based in the spec's prose; this indexes
    /// the 0-based backing vec directly, so callers pass `i - 1`.
    pub fn pm_batch_verified_count(&self) -> usize {
        self.pm_batch_verified.iter().filter(|v| **v).count()
    }

    pub fn tv_batch_verified_count(&self) -> usize {
        self.tv_batch_verified.iter().filter(|v| **v).count()
    }

    pub fn all_pm_verified(&self) -> bool {
        !self.pm_batch_verified.is_empty() && self.pm_batch_verified.iter().all(|v| *v)
    }

    pub fn all_tv_verified(&self) -> bool {
        self.tv_batch_verified.iter().all(|v| *v)
    }

    pub fn all_sampled_pm_verified(&self) -> bool {
        self.pm_selected_indices
            .iter()
            .all(|&i| self.pm_batch_verified.get(i as usize - 1).copied().unwrap_or(false))
    }

    pub fn all_sampled_tv_verified(&self) -> bool {
        self.tv_selected_indices
            .iter()
            .all(|&i| self.tv_batch_verified.get(i as usize - 1).copied().unwrap_or(false))
    }

    pub fn unverified_pm_count(&self) -> u64 {
        self.pm_batch_verified.iter().filter(|v| !**v).count() as u64
    }

    pub fn unverified_tv_count(&self) -> u64 {
        self.tv_batch_verified.iter().filter(|v| !**v).count() as u64
    }
}
