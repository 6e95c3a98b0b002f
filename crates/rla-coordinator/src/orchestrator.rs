//! Coordinator orchestrator (component F, §4.6).
//!
//! Sequences commit -> wait-for-revealable -> reveal -> prove & submit the
//! sampled batches -> finalize sampling -> wait out the challenge period,
//! responding to a challenge if one lands. Every suspension point (§5) is
//! an `.await`; the orchestrator itself holds no state across calls beyond
//! what it reads back from the chain, so it can always resume from
//! `get_record` after a restart.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rla_chain::{AuditChain, AuditId, Phase, ProtocolConstants};
use rla_field::FieldElement;
use rla_maci::{Commitments, PmBatchInput, TallyResults, TvBatchInput};
use rla_proof::{
    bind_pm_public_signals, bind_tv_public_signals,
    files::{self, BatchKind, CircuitInputs, ProveStatus, StatusFile},
    prove_batches_concurrently, BindingError, PendingBatch,
};
use tracing::{info, warn};

use crate::error::OrchestratorError;

/// The two circuit-input-to-proof backends the marshaller can drive, and
/// the concurrent-proving entry point that drives either one across a
/// slice of batches; re-exported here so callers keep importing it from
/// `orchestrator` rather than reaching into `rla_proof` directly.
pub use rla_proof::ProverBackend;

/// Builds one `CircuitInputs` record per process-messages batch, carrying
/// the commitment transition and message root the circuit would witness
/// over (§3 "BatchInputs" — full witness construction is circuit-internal
/// and out of scope).
pub fn pm_circuit_inputs(batches: &[PmBatchInput]) -> Vec<CircuitInputs> {
    batches
        .iter()
        .map(|b| {
            let mut inputs = CircuitInputs::new();
            inputs
                .insert("currentSbCommitment", b.current_sb_commitment)
                .insert("newSbCommitment", b.new_sb_commitment)
                .insert("messageRoot", b.message_root);
            inputs
        })
        .collect()
}

pub fn tv_circuit_inputs(batches: &[TvBatchInput]) -> Vec<CircuitInputs> {
    batches
        .iter()
        .map(|b| {
            let mut inputs = CircuitInputs::new();
            inputs
                .insert("currentTallyCommitment", b.current_tally_commitment)
                .insert("newTallyCommitment", b.new_tally_commitment);
            inputs
        })
        .collect()
}

pub struct Orchestrator<C: AuditChain> {
    pub chain: Arc<C>,
    pub prover: ProverBackend,
    pub output_dir: PathBuf,
    pub int_state_tree_depth: u32,
    pub vote_option_tree_depth: u32,
    pub poll_interval: Duration,
}

impl<C: AuditChain> Orchestrator<C> {
    async fn write_status(&self, status: &str, prove_status: ProveStatus, proved: usize, total_to_prove: usize, error: Option<String>) {
        let file = StatusFile {
            status: status.to_string(),
            prove_status,
            proved,
            total_to_prove,
            updated_at: 0,
            prove_updated_at: 0,
            error,
        };
        if let Err(err) = files::write_status(&self.output_dir, &file).await {
            warn!(?err, "failed to persist status.json");
        }
    }

    /// `commitResult(poll, pmC, tvC, yes, no) + stake` (§4.6 step 0, ahead
    /// of the `drive` sequence proper).
    #[allow(clippy::too_many_arguments)]
    pub async fn commit(
        &self,
        caller: String,
        poll: String,
        commitments: &Commitments,
        tally: &TallyResults,
        pm_batch_size: u64,
        tv_batch_size: u64,
        stake: u128,
    ) -> Result<AuditId, OrchestratorError> {
        files::write_commitments(
            &self.output_dir,
            &files::CommitmentsFile {
                pm_commitments: commitments.pm_commitments.clone(),
                tv_commitments: commitments.tv_commitments.clone(),
                pm_batch_count: commitments.pm_commitments.len().saturating_sub(1),
                tv_batch_count: commitments.tv_commitments.len().saturating_sub(1),
                yes_votes: tally.yes_votes,
                no_votes: tally.no_votes,
            },
        )
        .await?;

        files::write_tally(
            &self.output_dir,
            &files::TallyFile {
                results: files::SaltedValue {
                    tally: vec![tally.no_votes, tally.yes_votes],
                    salt: tally.results_salt.clone(),
                },
                total_spent_voice_credits: files::SpentVoiceCredits {
                    spent: tally.spent_voice_credits,
                    salt: tally.spent_voice_credits_salt.clone(),
                },
                per_vo_spent_voice_credits: files::SaltedValue {
                    tally: tally.per_vo_spent_voice_credits.to_vec(),
                    salt: tally.per_vo_spent_voice_credits_salt.clone(),
                },
            },
        )
        .await?;

        let audit_id = self
            .chain
            .commit_result(
                caller,
                poll,
                commitments.pm_commitments.clone(),
                commitments.tv_commitments.clone(),
                tally.yes_votes,
                tally.no_votes,
                pm_batch_size,
                tv_batch_size,
                stake,
            )
            .await?;

        info!(audit_id, "committed audit result");
        self.write_status("committed", ProveStatus::Idle, 0, 0, None).await;
        Ok(audit_id)
    }

    /// §4.6 step 1: wait until `blockhash(commitBlock + delta)` is stable.
    pub async fn wait_until_revealable(
        &self,
        audit_id: AuditId,
        block_hash_delay: u64,
        max_polls: u32,
    ) -> Result<(), OrchestratorError> {
        let record = self.chain.get_record(audit_id).await?;
        let reveal_height = record.commit_block + block_hash_delay;

        for _ in 0..max_polls {
            if self.chain.block_hash(reveal_height).await.is_some() {
                return Ok(());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Err(OrchestratorError::DeadlineExceeded { remaining: 1 })
    }

    /// §4.6 steps 2-3: reveal the sample, then prove and submit every
    /// sampled batch. Proving every sampled process-message batch (and,
    /// separately, every sampled tally-vote batch) is independent work, so
    /// each group is proved concurrently (§9 "Concurrent provers"); only
    /// the on-chain submissions stay serialized, in slot order, since the
    /// chain side cares about nonces and challenge-window bookkeeping that
    /// proving itself does not.
    pub async fn reveal_and_submit_sampled(
        &self,
        audit_id: AuditId,
        commitments: &Commitments,
        message_chain_root: FieldElement,
        pm_inputs: &[CircuitInputs],
        tv_inputs: &[CircuitInputs],
    ) -> Result<(), OrchestratorError> {
        let (pm_indices, tv_indices) = self.chain.reveal_sample(audit_id).await?;
        info!(audit_id, pm = ?pm_indices, tv = ?tv_indices, "sample revealed");

        let total = pm_indices.len() + tv_indices.len();
        let mut proved = 0usize;

        let pm_pending = pm_indices
            .iter()
            .map(|&batch_index| pm_pending_batch(commitments, message_chain_root, pm_inputs, batch_index))
            .collect::<Result<Vec<_>, BindingError>>()?;
        let pm_proofs = prove_batches_concurrently(&self.prover, &self.output_dir, BatchKind::Process, pm_pending).await?;
        for (slot, (_, bundle)) in pm_proofs.into_iter().enumerate() {
            self.chain.submit_pm_proof(audit_id, slot, bundle.proof).await?;
            proved += 1;
            self.write_status("sampling", ProveStatus::Proving, proved, total, None).await;
        }

        let tv_pending = tv_indices
            .iter()
            .map(|&batch_index| {
                tv_pending_batch(commitments, self.int_state_tree_depth, self.vote_option_tree_depth, tv_inputs, batch_index)
            })
            .collect::<Result<Vec<_>, BindingError>>()?;
        let tv_proofs = prove_batches_concurrently(&self.prover, &self.output_dir, BatchKind::Tally, tv_pending).await?;
        for (slot, (_, bundle)) in tv_proofs.into_iter().enumerate() {
            self.chain.submit_tv_proof(audit_id, slot, bundle.proof).await?;
            proved += 1;
            self.write_status("sampling", ProveStatus::Proving, proved, total, None).await;
        }

        self.write_status("sampled", ProveStatus::Done, proved, total, None).await;
        Ok(())
    }

    /// §4.6 step 4.
    pub async fn finalize_sampling(&self, audit_id: AuditId) -> Result<u64, OrchestratorError> {
        let ts = self.chain.finalize_sampling(audit_id).await?;
        self.write_status("tentative", ProveStatus::Done, 0, 0, None).await;
        Ok(ts)
    }

    /// §4.6 step 6: prove and submit every batch the sample left
    /// unverified, then ask the chain to finalize the challenge response.
    /// A proof that fails verification drives the audit to `Rejected`
    /// (§4.4) — that is the documented outcome, not an orchestrator bug,
    /// so it is surfaced as [`OrchestratorError::RejectedDuringChallenge`]
    /// rather than retried.
    pub async fn respond_to_challenge(
        &self,
        audit_id: AuditId,
        commitments: &Commitments,
        message_chain_root: FieldElement,
        pm_inputs: &[CircuitInputs],
        tv_inputs: &[CircuitInputs],
    ) -> Result<(), OrchestratorError> {
        let record = self.chain.get_record(audit_id).await?;
        warn!(audit_id, "audit challenged, proving every remaining batch");

        let pm_pending = record
            .pm_batch_verified
            .iter()
            .enumerate()
            .filter(|(_, verified)| !**verified)
            .map(|(i, _)| pm_pending_batch(commitments, message_chain_root, pm_inputs, (i + 1) as u64))
            .collect::<Result<Vec<_>, BindingError>>()?;
        let pm_proofs = prove_batches_concurrently(&self.prover, &self.output_dir, BatchKind::Process, pm_pending).await?;
        for (batch_index, bundle) in pm_proofs {
            if let Err(err) = self.chain.submit_pm_proof_for_challenge(audit_id, batch_index as u64 + 1, bundle.proof).await {
                return Err(challenge_submit_err(audit_id, err));
            }
        }

        let tv_pending = record
            .tv_batch_verified
            .iter()
            .enumerate()
            .filter(|(_, verified)| !**verified)
            .map(|(i, _)| {
                tv_pending_batch(commitments, self.int_state_tree_depth, self.vote_option_tree_depth, tv_inputs, (i + 1) as u64)
            })
            .collect::<Result<Vec<_>, BindingError>>()?;
        let tv_proofs = prove_batches_concurrently(&self.prover, &self.output_dir, BatchKind::Tally, tv_pending).await?;
        for (batch_index, bundle) in tv_proofs {
            if let Err(err) = self.chain.submit_tv_proof_for_challenge(audit_id, batch_index as u64 + 1, bundle.proof).await {
                return Err(challenge_submit_err(audit_id, err));
            }
        }

        self.chain.finalize_challenge_response(audit_id).await?;
        self.write_status("finalized", ProveStatus::Done, 0, 0, None).await;
        Ok(())
    }

    /// §4.6 step 5/overall loop: poll `get_record` until the audit leaves
    /// `Tentative`, calling `finalize` once the challenge period has
    /// elapsed or responding immediately if a challenge lands. Bounded by
    /// `max_polls` so a misbehaving chain can't hang the orchestrator
    /// forever (§7 "RpcTransient ... capped").
    pub async fn drive_past_challenge_period(
        &self,
        audit_id: AuditId,
        constants: &ProtocolConstants,
        commitments: &Commitments,
        message_chain_root: FieldElement,
        pm_inputs: &[CircuitInputs],
        tv_inputs: &[CircuitInputs],
        max_polls: u32,
    ) -> Result<Phase, OrchestratorError> {
        for _ in 0..max_polls {
            let record = self.chain.get_record(audit_id).await?;
            match record.phase {
                Phase::Finalized | Phase::Rejected => return Ok(record.phase),
                Phase::Challenged => {
                    self.respond_to_challenge(audit_id, commitments, message_chain_root, pm_inputs, tv_inputs)
                        .await?;
                    return Ok(self.chain.get_record(audit_id).await?.phase);
                }
                Phase::Tentative => {
                    let tentative = record.tentative_timestamp.unwrap_or(0);
                    let now = self.chain.now().await;
                    if now >= tentative + constants.challenge_period_secs {
                        self.chain.finalize(audit_id).await?;
                        self.write_status("finalized", ProveStatus::Done, 0, 0, None).await;
                        return Ok(Phase::Finalized);
                    }
                }
                _ => {}
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Err(OrchestratorError::DeadlineExceeded { remaining: 1 })
    }
}

fn challenge_submit_err(audit_id: AuditId, err: rla_chain::AuditError) -> OrchestratorError {
    match err {
        rla_chain::AuditError::ProofInvalid { .. } => OrchestratorError::RejectedDuringChallenge { audit_id },
        other => OrchestratorError::Audit(other),
    }
}

/// Binds a process-messages batch's public signals and packages it for
/// [`prove_batches_concurrently`]. `batch_index` is 1-based, matching the
/// chain's own `submitPmProofForChallenge` indexing.
fn pm_pending_batch(
    commitments: &Commitments,
    message_chain_root: FieldElement,
    pm_inputs: &[CircuitInputs],
    batch_index: u64,
) -> Result<PendingBatch, BindingError> {
    let signals = bind_pm_public_signals(&commitments.pm_commitments, batch_index as usize, message_chain_root)?;
    Ok(PendingBatch {
        batch_index: batch_index as usize - 1,
        inputs: pm_inputs[batch_index as usize - 1].clone(),
        public_signals: signals.to_field_vec(),
    })
}

/// Tally-vote counterpart of [`pm_pending_batch`].
fn tv_pending_batch(
    commitments: &Commitments,
    int_state_tree_depth: u32,
    vote_option_tree_depth: u32,
    tv_inputs: &[CircuitInputs],
    batch_index: u64,
) -> Result<PendingBatch, BindingError> {
    let signals = bind_tv_public_signals(&commitments.tv_commitments, batch_index as usize, int_state_tree_depth, vote_option_tree_depth)?;
    Ok(PendingBatch {
        batch_index: batch_index as usize - 1,
        inputs: tv_inputs[batch_index as usize - 1].clone(),
        public_signals: signals.to_field_vec(),
    })
}
