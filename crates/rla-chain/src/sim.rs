//! In-memory reference implementation of [`AuditChain`] (§6, §4.4).
//!
//! Stands in for the real contract: the orchestrator and its tests run
//! against this exactly as they would against on-chain RPC, with the same
//! precondition failures and phase graph, but with the block clock and
//! block-hash randomness under direct test control instead of real mining.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rla_field::FieldElement;
use rla_proof::ProofWire;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::chain::AuditChain;
use crate::economics::{challenge_bond, ProtocolConstants};
use crate::error::AuditError;
use crate::record::{AccountId, Amount, AuditId, AuditRecord, BlockHeight, Phase, PollHandle, Timestamp};

/// A submitted proof "verifies" iff it is not the all-zero wire tuple —
/// the reference verifier's one rule, matching the all-zero "intentionally
/// invalid" proof used in the boundary scenarios.
fn proof_is_valid(proof: &ProofWire) -> bool {
    proof.iter().any(|f| !f.is_zero())
}

/// Stake plus bond, the amount that changes hands at every terminal
/// transition out of `Challenged` (§4.4 "Economics").
fn bonded_amount(record: &AuditRecord) -> Amount {
    record.stake_amount + record.challenge_bond.unwrap_or(0)
}

struct Inner {
    records: HashMap<AuditId, AuditRecord>,
    active_polls: HashSet<PollHandle>,
    balances: HashMap<AccountId, Amount>,
    now: Timestamp,
    current_block: BlockHeight,
    block_hashes: HashMap<BlockHeight, [u8; 32]>,
}

impl Inner {
    /// Credits `account`'s balance (§4.4 "Economics" payout rules).
    fn credit(&mut self, account: &AccountId, amount: Amount) {
        *self.balances.entry(account.clone()).or_insert(0) += amount;
    }
}

pub struct SimAuditChain {
    inner: Mutex<Inner>,
    constants: ProtocolConstants,
    next_id: AtomicU64,
}

impl SimAuditChain {
    pub fn new(constants: ProtocolConstants) -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: HashMap::new(),
                active_polls: HashSet::new(),
                balances: HashMap::new(),
                now: 0,
                current_block: 0,
                block_hashes: HashMap::new(),
            }),
            constants,
            next_id: AtomicU64::new(1),
        }
    }

    /// Advances the virtual clock, the only way time passes in this
    /// simulator (§9: timers drive the state machine, there is no
    /// built-in cancellation).
    pub async fn advance_time(&self, secs: u64) {
        let mut inner = self.inner.lock().await;
        inner.now += secs;
    }

    /// Mines one block, recording its hash for later `blockhash(height)`
    /// reads (§4.6 step 1).
    pub async fn mine_block(&self, hash: [u8; 32]) -> BlockHeight {
        let mut inner = self.inner.lock().await;
        inner.current_block += 1;
        let height = inner.current_block;
        inner.block_hashes.insert(height, hash);
        height
    }

    fn precondition(ok: bool, msg: impl Into<String>) -> Result<(), AuditError> {
        if ok {
            Ok(())
        } else {
            Err(AuditError::PreconditionViolated(msg.into()))
        }
    }
}

#[async_trait]
impl AuditChain for SimAuditChain {
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
    ) -> Result<AuditId, AuditError> {
        Self::precondition(stake_paid == self.constants.coordinator_stake, "stake must equal COORDINATOR_STAKE")?;
        Self::precondition(pm_commitments.len() >= 2, "pmCommitments length must be >= 2")?;
        Self::precondition(tv_commitments.len() >= 2, "tvCommitments length must be >= 2")?;

        let mut inner = self.inner.lock().await;
        Self::precondition(!inner.active_polls.contains(&poll), "audit already active for this poll")?;

        let audit_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let pm_batch_count = (pm_commitments.len() - 1) as u64;
        let tv_batch_count = (tv_commitments.len() - 1) as u64;

        let mut hasher_input = Vec::new();
        for c in pm_commitments.iter().chain(tv_commitments.iter()) {
            hasher_input.extend_from_slice(&c.to_bytes_be());
        }
        let commit_hash = FieldElement::domain_hash(&hasher_input, b"commit", audit_id);

        let record = AuditRecord {
            audit_id,
            coordinator: caller,
            poll: poll.clone(),
            stake_amount: stake_paid,
            pm_commitments,
            tv_commitments,
            yes_votes,
            no_votes,
            pm_batch_count,
            tv_batch_count,
            pm_batch_size,
            tv_batch_size,
            commit_hash,
            commit_block: inner.current_block,
            pm_sample_count: 0,
            tv_sample_count: 0,
            pm_selected_indices: Vec::new(),
            tv_selected_indices: Vec::new(),
            pm_batch_verified: vec![false; pm_batch_count as usize],
            tv_batch_verified: vec![false; tv_batch_count as usize],
            pm_proofs_verified: 0,
            tv_proofs_verified: 0,
            full_pm_proofs_verified: 0,
            full_tv_proofs_verified: 0,
            phase: Phase::Committed,
            proof_deadline: inner.now + self.constants.sample_submission_window_secs,
            tentative_timestamp: None,
            challenge_deadline: None,
            challenger: None,
            challenge_bond: None,
        };

        info!(audit_id, poll = %poll, "committed audit result");
        inner.active_polls.insert(poll);
        inner.records.insert(audit_id, record);
        Ok(audit_id)
    }

    async fn reveal_sample(&self, audit_id: AuditId) -> Result<(Vec<u64>, Vec<u64>), AuditError> {
        let mut inner = self.inner.lock().await;
        let reveal_height = {
            let record = inner.records.get(&audit_id).ok_or(AuditError::NotFound(audit_id))?;
            Self::precondition(record.phase == Phase::Committed, "audit must be in Committed phase")?;
            record.commit_block + self.constants.block_hash_delay
        };

        let block_hash = inner
            .block_hashes
            .get(&reveal_height)
            .copied()
            .ok_or_else(|| AuditError::PreconditionViolated("blockhash(commitBlock + delta) not yet available".to_string()))?;

        let record = inner.records.get_mut(&audit_id).ok_or(AuditError::NotFound(audit_id))?;

        let selection = rla_sampler::sample(
            &block_hash,
            self.constants.confidence_x1000,
            record.pm_batch_count,
            record.tv_batch_count,
            record.yes_votes,
            record.no_votes,
            record.tv_batch_size,
        )
        .map_err(|e| AuditError::PreconditionViolated(e.to_string()))?;

        record.pm_sample_count = selection.pm_indices.len() as u64;
        record.tv_sample_count = selection.tv_indices.len() as u64;
        record.pm_selected_indices = selection.pm_indices.clone();
        record.tv_selected_indices = selection.tv_indices.clone();
        record.phase = Phase::SampleRevealed;

        Ok((selection.pm_indices, selection.tv_indices))
    }

    async fn submit_pm_proof(
        &self,
        audit_id: AuditId,
        sample_slot: usize,
        proof: ProofWire,
    ) -> Result<(), AuditError> {
        let mut inner = self.inner.lock().await;
        let now = inner.now;
        let record = inner.records.get_mut(&audit_id).ok_or(AuditError::NotFound(audit_id))?;
        Self::precondition(record.phase == Phase::SampleRevealed, "audit must be in SampleRevealed phase")?;
        Self::precondition(now <= record.proof_deadline, "proofDeadline has passed")?;
        let batch_index = *record
            .pm_selected_indices
            .get(sample_slot)
            .ok_or_else(|| AuditError::PreconditionViolated("sample slot out of range".to_string()))?;

        if !proof_is_valid(&proof) {
            return Err(AuditError::ProofInvalid { audit_id, batch_index });
        }
        record.pm_batch_verified[batch_index as usize - 1] = true;
        record.pm_proofs_verified += 1;
        Ok(())
    }

    async fn submit_tv_proof(
        &self,
        audit_id: AuditId,
        sample_slot: usize,
        proof: ProofWire,
    ) -> Result<(), AuditError> {
        let mut inner = self.inner.lock().await;
        let now = inner.now;
        let record = inner.records.get_mut(&audit_id).ok_or(AuditError::NotFound(audit_id))?;
        Self::precondition(record.phase == Phase::SampleRevealed, "audit must be in SampleRevealed phase")?;
        Self::precondition(now <= record.proof_deadline, "proofDeadline has passed")?;
        let batch_index = *record
            .tv_selected_indices
            .get(sample_slot)
            .ok_or_else(|| AuditError::PreconditionViolated("sample slot out of range".to_string()))?;

        if !proof_is_valid(&proof) {
            return Err(AuditError::ProofInvalid { audit_id, batch_index });
        }
        record.tv_batch_verified[batch_index as usize - 1] = true;
        record.tv_proofs_verified += 1;
        Ok(())
    }

    async fn finalize_sampling(&self, audit_id: AuditId) -> Result<Timestamp, AuditError> {
        let mut inner = self.inner.lock().await;
        let now = inner.now;
        let record = inner.records.get_mut(&audit_id).ok_or(AuditError::NotFound(audit_id))?;
        Self::precondition(record.phase == Phase::SampleRevealed, "audit must be in SampleRevealed phase")?;
        Self::precondition(record.all_sampled_pm_verified() && record.all_sampled_tv_verified(), "not all sampled batches are verified")?;
        Self::precondition(now <= record.proof_deadline, "proofDeadline has passed")?;

        record.phase = Phase::Tentative;
        record.tentative_timestamp = Some(now);
        Ok(now)
    }

    async fn finalize(&self, audit_id: AuditId) -> Result<(), AuditError> {
        let mut inner = self.inner.lock().await;
        let now = inner.now;
        let (poll, coordinator, stake) = {
            let record = inner.records.get_mut(&audit_id).ok_or(AuditError::NotFound(audit_id))?;
            Self::precondition(record.phase == Phase::Tentative, "audit must be in Tentative phase")?;
            let tentative = record.tentative_timestamp.expect("Tentative phase always sets tentative_timestamp");
            Self::precondition(
                now >= tentative + self.constants.challenge_period_secs,
                "challenge period has not elapsed",
            )?;
            record.phase = Phase::Finalized;
            (record.poll.clone(), record.coordinator.clone(), record.stake_amount)
        };
        inner.active_polls.remove(&poll);
        inner.credit(&coordinator, stake);
        info!(audit_id, coordinator = %coordinator, amount = stake, "economics: stake returned to coordinator");
        Ok(())
    }

    async fn challenge(
        &self,
        audit_id: AuditId,
        challenger: AccountId,
        bond_paid: Amount,
    ) -> Result<Timestamp, AuditError> {
        let mut inner = self.inner.lock().await;
        let now = inner.now;
        let constants = self.constants;
        let record = inner.records.get_mut(&audit_id).ok_or(AuditError::NotFound(audit_id))?;
        Self::precondition(record.phase == Phase::Tentative, "audit must be in Tentative phase")?;
        Self::precondition(challenger != record.coordinator, "challenger cannot be the coordinator")?;
        let tentative = record.tentative_timestamp.expect("Tentative phase always sets tentative_timestamp");
        Self::precondition(
            now < tentative + constants.challenge_period_secs,
            "challenge period has already elapsed",
        )?;

        let expected_bond = challenge_bond(record, &constants);
        Self::precondition(bond_paid == expected_bond, "challenge bond amount incorrect")?;

        let deadline = now + constants.challenge_response_deadline_secs;
        record.phase = Phase::Challenged;
        record.challenge_deadline = Some(deadline);
        record.challenger = Some(challenger);
        record.challenge_bond = Some(bond_paid);
        warn!(audit_id, "audit challenged");
        Ok(deadline)
    }

    async fn submit_pm_proof_for_challenge(
        &self,
        audit_id: AuditId,
        batch_index: u64,
        proof: ProofWire,
    ) -> Result<(), AuditError> {
        let mut inner = self.inner.lock().await;
        let record = inner.records.get_mut(&audit_id).ok_or(AuditError::NotFound(audit_id))?;
        Self::precondition(record.phase == Phase::Challenged, "audit must be in Challenged phase")?;

        if !proof_is_valid(&proof) {
            record.phase = Phase::Rejected;
            let challenger = record.challenger.clone().expect("Challenged phase always sets challenger");
            let amount = bonded_amount(record);
            inner.credit(&challenger, amount);
            info!(audit_id, challenger = %challenger, amount, "economics: stake and bond paid to challenger");
            return Err(AuditError::ProofInvalid { audit_id, batch_index });
        }
        record.pm_batch_verified[batch_index as usize - 1] = true;
        record.full_pm_proofs_verified += 1;
        Ok(())
    }

    async fn submit_tv_proof_for_challenge(
        &self,
        audit_id: AuditId,
        batch_index: u64,
        proof: ProofWire,
    ) -> Result<(), AuditError> {
        let mut inner = self.inner.lock().await;
        let record = inner.records.get_mut(&audit_id).ok_or(AuditError::NotFound(audit_id))?;
        Self::precondition(record.phase == Phase::Challenged, "audit must be in Challenged phase")?;

        if !proof_is_valid(&proof) {
            record.phase = Phase::Rejected;
            let challenger = record.challenger.clone().expect("Challenged phase always sets challenger");
            let amount = bonded_amount(record);
            inner.credit(&challenger, amount);
            info!(audit_id, challenger = %challenger, amount, "economics: stake and bond paid to challenger");
            return Err(AuditError::ProofInvalid { audit_id, batch_index });
        }
        record.tv_batch_verified[batch_index as usize - 1] = true;
        record.full_tv_proofs_verified += 1;
        Ok(())
    }

    async fn finalize_challenge_response(&self, audit_id: AuditId) -> Result<(), AuditError> {
        let mut inner = self.inner.lock().await;
        let (poll, coordinator, amount) = {
            let record = inner.records.get_mut(&audit_id).ok_or(AuditError::NotFound(audit_id))?;
            Self::precondition(record.phase == Phase::Challenged, "audit must be in Challenged phase")?;
            Self::precondition(record.all_pm_verified() && record.all_tv_verified(), "not every batch is verified")?;
            record.phase = Phase::Finalized;
            (record.poll.clone(), record.coordinator.clone(), bonded_amount(record))
        };
        inner.active_polls.remove(&poll);
        // The coordinator's proofs held up under challenge: stake and the
        // challenger's forfeited bond both go to the coordinator.
        inner.credit(&coordinator, amount);
        info!(audit_id, coordinator = %coordinator, amount, "economics: stake and forfeited bond paid to coordinator");
        Ok(())
    }

    async fn claim_challenge_timeout(&self, audit_id: AuditId) -> Result<(), AuditError> {
        let mut inner = self.inner.lock().await;
        let now = inner.now;
        let (poll, challenger, amount) = {
            let record = inner.records.get_mut(&audit_id).ok_or(AuditError::NotFound(audit_id))?;
            Self::precondition(record.phase == Phase::Challenged, "audit must be in Challenged phase")?;
            let deadline = record.challenge_deadline.expect("Challenged phase always sets challenge_deadline");
            Self::precondition(now > deadline, "challengeDeadline has not yet strictly passed")?;
            Self::precondition(!(record.all_pm_verified() && record.all_tv_verified()), "all batches already verified")?;
            record.phase = Phase::Rejected;
            let challenger = record.challenger.clone().expect("Challenged phase always sets challenger");
            (record.poll.clone(), challenger, bonded_amount(record))
        };
        inner.active_polls.remove(&poll);
        inner.credit(&challenger, amount);
        info!(audit_id, challenger = %challenger, amount, "economics: stake and bond paid to challenger on coordinator timeout");
        Ok(())
    }

    async fn get_record(&self, audit_id: AuditId) -> Result<AuditRecord, AuditError> {
        let inner = self.inner.lock().await;
        inner.records.get(&audit_id).cloned().ok_or(AuditError::NotFound(audit_id))
    }

    async fn challenge_bond_amount(&self, audit_id: AuditId) -> Result<Amount, AuditError> {
        let inner = self.inner.lock().await;
        let record = inner.records.get(&audit_id).ok_or(AuditError::NotFound(audit_id))?;
        Ok(challenge_bond(record, &self.constants))
    }

    async fn current_block(&self) -> BlockHeight {
        self.inner.lock().await.current_block
    }

    async fn block_hash(&self, height: BlockHeight) -> Option<[u8; 32]> {
        self.inner.lock().await.block_hashes.get(&height).copied()
    }

    async fn now(&self) -> Timestamp {
        self.inner.lock().await.now
    }

    async fn balance_of(&self, account: AccountId) -> Amount {
        self.inner.lock().await.balances.get(&account).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rla_field::FieldElement;

    fn field(n: u64) -> FieldElement {
        FieldElement::from_decimal(&n.to_string()).unwrap()
    }

    fn zero_proof() -> ProofWire {
        [FieldElement::zero(); 8]
    }

    fn nonzero_proof() -> ProofWire {
        [field(1); 8]
    }

    async fn commit_s1(chain: &SimAuditChain) -> AuditId {
        chain
            .commit_result(
                "coordinator".to_string(),
                "poll-1".to_string(),
                vec![field(1), field(2), field(3)],
                vec![field(10), field(11)],
                7,
                3,
                5,
                2,
                chain.constants.coordinator_stake,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn happy_path_reaches_finalized() {
        let chain = SimAuditChain::new(ProtocolConstants::default());
        let audit_id = commit_s1(&chain).await;

        chain.mine_block([0u8; 32]).await;
        chain.mine_block([0xab; 32]).await;
        let (pm_indices, tv_indices) = chain.reveal_sample(audit_id).await.unwrap();

        for slot in 0..pm_indices.len() {
            chain.submit_pm_proof(audit_id, slot, nonzero_proof()).await.unwrap();
        }
        for slot in 0..tv_indices.len() {
            chain.submit_tv_proof(audit_id, slot, nonzero_proof()).await.unwrap();
        }

        chain.finalize_sampling(audit_id).await.unwrap();
        chain.advance_time(chain.constants.challenge_period_secs).await;
        chain.finalize(audit_id).await.unwrap();

        let record = chain.get_record(audit_id).await.unwrap();
        assert_eq!(record.phase, Phase::Finalized);
        // S1: coordinator gets their stake back, nothing more.
        assert_eq!(chain.balance_of("coordinator".to_string()).await, chain.constants.coordinator_stake);
    }

    #[tokio::test]
    async fn successful_challenge_response_pays_coordinator_stake_plus_bond() {
        let chain = SimAuditChain::new(ProtocolConstants::default());
        let audit_id = commit_s1(&chain).await;
        chain.mine_block([0u8; 32]).await;
        chain.mine_block([0xcd; 32]).await;
        let (pm_indices, tv_indices) = chain.reveal_sample(audit_id).await.unwrap();
        for slot in 0..pm_indices.len() {
            chain.submit_pm_proof(audit_id, slot, nonzero_proof()).await.unwrap();
        }
        for slot in 0..tv_indices.len() {
            chain.submit_tv_proof(audit_id, slot, nonzero_proof()).await.unwrap();
        }
        chain.finalize_sampling(audit_id).await.unwrap();

        let bond = chain.challenge_bond_amount(audit_id).await.unwrap();
        chain.challenge(audit_id, "challenger".to_string(), bond).await.unwrap();

        let record = chain.get_record(audit_id).await.unwrap();
        for batch_index in 1..=record.pm_batch_size {
            chain.submit_pm_proof_for_challenge(audit_id, batch_index, nonzero_proof()).await.unwrap();
        }
        for batch_index in 1..=record.tv_batch_size {
            chain.submit_tv_proof_for_challenge(audit_id, batch_index, nonzero_proof()).await.unwrap();
        }
        chain.finalize_challenge_response(audit_id).await.unwrap();

        let record = chain.get_record(audit_id).await.unwrap();
        assert_eq!(record.phase, Phase::Finalized);
        // S2: coordinator keeps their stake and also receives the challenger's
        // forfeited bond; the challenger receives nothing.
        assert_eq!(
            chain.balance_of("coordinator".to_string()).await,
            chain.constants.coordinator_stake + bond
        );
        assert_eq!(chain.balance_of("challenger".to_string()).await, 0);
    }

    #[tokio::test]
    async fn challenge_before_deadline_then_timeout_rejects() {
        let chain = SimAuditChain::new(ProtocolConstants::default());
        let audit_id = commit_s1(&chain).await;
        chain.mine_block([0u8; 32]).await;
        chain.mine_block([0xcd; 32]).await;
        let (pm_indices, tv_indices) = chain.reveal_sample(audit_id).await.unwrap();
        for slot in 0..pm_indices.len() {
            chain.submit_pm_proof(audit_id, slot, nonzero_proof()).await.unwrap();
        }
        for slot in 0..tv_indices.len() {
            chain.submit_tv_proof(audit_id, slot, nonzero_proof()).await.unwrap();
        }
        chain.finalize_sampling(audit_id).await.unwrap();

        let bond = chain.challenge_bond_amount(audit_id).await.unwrap();
        chain.challenge(audit_id, "challenger".to_string(), bond).await.unwrap();

        chain.advance_time(chain.constants.challenge_response_deadline_secs + 1).await;
        chain.claim_challenge_timeout(audit_id).await.unwrap();

        let record = chain.get_record(audit_id).await.unwrap();
        assert_eq!(record.phase, Phase::Rejected);
        // S3: challenger recovers their bond plus the coordinator's stake;
        // the coordinator gets nothing back.
        assert_eq!(chain.balance_of("challenger".to_string()).await, chain.constants.coordinator_stake + bond);
        assert_eq!(chain.balance_of("coordinator".to_string()).await, 0);
    }

    #[tokio::test]
    async fn challenge_timeout_at_exact_deadline_is_rejected_operation() {
        let chain = SimAuditChain::new(ProtocolConstants::default());
        let audit_id = commit_s1(&chain).await;
        chain.mine_block([0u8; 32]).await;
        chain.mine_block([0xcd; 32]).await;
        let (pm_indices, tv_indices) = chain.reveal_sample(audit_id).await.unwrap();
        for slot in 0..pm_indices.len() {
            chain.submit_pm_proof(audit_id, slot, nonzero_proof()).await.unwrap();
        }
        for slot in 0..tv_indices.len() {
            chain.submit_tv_proof(audit_id, slot, nonzero_proof()).await.unwrap();
        }
        chain.finalize_sampling(audit_id).await.unwrap();
        let bond = chain.challenge_bond_amount(audit_id).await.unwrap();
        chain.challenge(audit_id, "challenger".to_string(), bond).await.unwrap();

        chain.advance_time(chain.constants.challenge_response_deadline_secs).await;
        let err = chain.claim_challenge_timeout(audit_id).await.unwrap_err();
        assert!(matches!(err, AuditError::PreconditionViolated(_)));
    }

    #[tokio::test]
    async fn invalid_proof_during_challenge_rejects_immediately() {
        let chain = SimAuditChain::new(ProtocolConstants::default());
        let audit_id = commit_s1(&chain).await;
        chain.mine_block([0u8; 32]).await;
        chain.mine_block([0xcd; 32]).await;
        let (pm_indices, tv_indices) = chain.reveal_sample(audit_id).await.unwrap();
        for slot in 0..pm_indices.len() {
            chain.submit_pm_proof(audit_id, slot, nonzero_proof()).await.unwrap();
        }
        for slot in 0..tv_indices.len() {
            chain.submit_tv_proof(audit_id, slot, nonzero_proof()).await.unwrap();
        }
        chain.finalize_sampling(audit_id).await.unwrap();
        let bond = chain.challenge_bond_amount(audit_id).await.unwrap();
        chain.challenge(audit_id, "challenger".to_string(), bond).await.unwrap();

        let err = chain
            .submit_pm_proof_for_challenge(audit_id, 1, zero_proof())
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::ProofInvalid { .. }));

        let record = chain.get_record(audit_id).await.unwrap();
        assert_eq!(record.phase, Phase::Rejected);
        // S4: an invalid proof mid-challenge pays out exactly like a timeout.
        assert_eq!(chain.balance_of("challenger".to_string()).await, chain.constants.coordinator_stake + bond);
        assert_eq!(chain.balance_of("coordinator".to_string()).await, 0);
    }

    #[tokio::test]
    async fn challenge_at_exact_period_boundary_is_rejected() {
        let chain = SimAuditChain::new(ProtocolConstants::default());
        let audit_id = commit_s1(&chain).await;
        chain.mine_block([0u8; 32]).await;
        chain.mine_block([0xcd; 32]).await;
        let (pm_indices, tv_indices) = chain.reveal_sample(audit_id).await.unwrap();
        for slot in 0..pm_indices.len() {
            chain.submit_pm_proof(audit_id, slot, nonzero_proof()).await.unwrap();
        }
        for slot in 0..tv_indices.len() {
            chain.submit_tv_proof(audit_id, slot, nonzero_proof()).await.unwrap();
        }
        chain.finalize_sampling(audit_id).await.unwrap();

        chain.advance_time(chain.constants.challenge_period_secs).await;
        let bond = chain.challenge_bond_amount(audit_id).await.unwrap();
        let err = chain.challenge(audit_id, "challenger".to_string(), bond).await.unwrap_err();
        assert!(matches!(err, AuditError::PreconditionViolated(_)));
    }

    #[tokio::test]
    async fn duplicate_commit_for_same_poll_is_rejected() {
        let chain = SimAuditChain::new(ProtocolConstants::default());
        commit_s1(&chain).await;
        let err = chain
            .commit_result(
                "coordinator".to_string(),
                "poll-1".to_string(),
                vec![field(1), field(2)],
                vec![field(10), field(11)],
                1,
                0,
                5,
                2,
                chain.constants.coordinator_stake,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::PreconditionViolated(_)));
    }
}
