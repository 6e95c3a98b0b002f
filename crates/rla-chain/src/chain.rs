//! The chain contract surface the core consumes (§6).
//!
//! The real implementation of this trait talks to the deployed contract
//! over RPC; that transport and the contract bytecode are out of scope
//! (§1 "Out of scope"). This trait is the observable interface the
//! orchestrator is written against, so a test double can stand in for it.

use async_trait::async_trait;
use rla_field::FieldElement;
use rla_proof::ProofWire;

use crate::error::AuditError;
use crate::record::{AccountId, Amount, AuditId, AuditRecord, BlockHeight, PollHandle, Timestamp};

#[async_trait]
pub trait AuditChain: Send + Sync {
    /// `commitResult(poll, pmC, tvC, yes, no) + stake` (§4.4, §6). `caller`
    /// becomes the audit's coordinator.
    #[allow(clippy::too_many_arguments)]
    async fn commit_result(
        &self,
        caller: AccountId,
        poll: PollHandle,
        pm_commitments: Vec<FieldElement>,
        tv_commitments: Vec<FieldElement>,
        yes_votes: u128,
        no_votes: u128,
        pm_batch_size: u64,
        tv_batch_size: u64,
        stake_paid: Amount,
    ) -> Result<AuditId, AuditError>;

    /// `revealSample(auditId)`.
    async fn reveal_sample(&self, audit_id: AuditId) -> Result<(Vec<u64>, Vec<u64>), AuditError>;

    /// `submitPmProof(auditId, sampleSlot, proof)`.
    async fn submit_pm_proof(
        &self,
        audit_id: AuditId,
        sample_slot: usize,
        proof: ProofWire,
    ) -> Result<(), AuditError>;

    /// `submitTvProof(auditId, sampleSlot, proof)`.
    async fn submit_tv_proof(
        &self,
        audit_id: AuditId,
        sample_slot: usize,
        proof: ProofWire,
    ) -> Result<(), AuditError>;

    /// `finalizeSampling(auditId)`.
    async fn finalize_sampling(&self, audit_id: AuditId) -> Result<Timestamp, AuditError>;

    /// `finalize(auditId)`.
    async fn finalize(&self, audit_id: AuditId) -> Result<(), AuditError>;

    /// `challenge(auditId) + bond`.
    async fn challenge(
        &self,
        audit_id: AuditId,
        challenger: AccountId,
        bond_paid: Amount,
    ) -> Result<Timestamp, AuditError>;

    /// `submitPmProofForChallenge(auditId, batchIndex_1based, proof)`.
    async fn submit_pm_proof_for_challenge(
        &self,
        audit_id: AuditId,
        batch_index: u64,
        proof: ProofWire,
    ) -> Result<(), AuditError>;

    /// `submitTvProofForChallenge(auditId, batchIndex_1based, proof)`.
    async fn submit_tv_proof_for_challenge(
        &self,
        audit_id: AuditId,
        batch_index: u64,
        proof: ProofWire,
    ) -> Result<(), AuditError>;

    /// `finalizeChallengeResponse(auditId)`.
    async fn finalize_challenge_response(&self, audit_id: AuditId) -> Result<(), AuditError>;

    /// `claimChallengeTimeout(auditId)`.
    async fn claim_challenge_timeout(&self, audit_id: AuditId) -> Result<(), AuditError>;

    /// `pollAudits(auditId) → record`.
    async fn get_record(&self, audit_id: AuditId) -> Result<AuditRecord, AuditError>;

    /// `getChallengeBondAmount(auditId)`.
    async fn challenge_bond_amount(&self, audit_id: AuditId) -> Result<Amount, AuditError>;

    /// Current chain block height, used by the orchestrator to wait for
    /// `Δ` confirmations before revealing.
    async fn current_block(&self) -> BlockHeight;

    /// `blockhash(height)`, `None` if not yet mined.
    async fn block_hash(&self, height: BlockHeight) -> Option<[u8; 32]>;

    /// Current chain time, the basis the orchestrator compares
    /// `tentativeTimestamp`/`challengeDeadline` against (§4.4 "Timers").
    async fn now(&self) -> Timestamp;

    /// An account's accumulated balance from stake/bond payouts (§4.4
    /// "Economics"). Zero for an account that never received a payout.
    async fn balance_of(&self, account: AccountId) -> Amount;
}
