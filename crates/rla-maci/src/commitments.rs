//! Commitment extractor (component B, §4.2).
//!
//! Turns the per-batch circuit-input records the replay engine produces
//! into the two ordered commitment chains the coordinator commits on chain,
//! plus the final tally.

use rla_field::FieldElement;
use thiserror::Error;

use crate::replay::{PmBatchInput, TvBatchInput};
use crate::state::VOTE_OPTION_COUNT;

#[derive(Debug, Error)]
pub enum CommitmentError {
    #[error("process-messages commitment chain is broken at batch {0}")]
    PmChainBroken(usize),
    #[error("tally-votes commitment chain is broken at batch {0}")]
    TvChainBroken(usize),
}

/// `pmCommitments`/`tvCommitments` (§3): the committed claim, one element
/// per batch boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commitments {
    pub pm_commitments: Vec<FieldElement>,
    pub tv_commitments: Vec<FieldElement>,
}

/// The final tally, matching `tally.json`'s on-disk shape (§6): each
/// salted value is committed to on-chain as `hash(value, salt)`, so every
/// independent verifier of the published file can recompute that
/// commitment and check it against `tvCommitments`'s final entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TallyResults {
    pub yes_votes: u128,
    pub no_votes: u128,
    /// `perVOSpentVoiceCredits.tally`: sum of `weight^2` per vote option
    /// across every ballot (MACI's quadratic-voting accounting).
    pub per_vo_spent_voice_credits: [u128; VOTE_OPTION_COUNT],
    /// `totalSpentVoiceCredits.spent`: sum of `per_vo_spent_voice_credits`.
    pub spent_voice_credits: u128,
    pub results_salt: String,
    pub spent_voice_credits_salt: String,
    pub per_vo_spent_voice_credits_salt: String,
}

/// Implements the §4.2 contract exactly: walks each chain checking the
/// consistency law before emitting the commitment sequence, and raises
/// `ChainBroken` (here, the `*ChainBroken` variants) on violation.
pub fn extract(
    pm_batch_inputs: &[PmBatchInput],
    tv_batch_inputs: &[TvBatchInput],
) -> Result<(Commitments, TallyResults), CommitmentError> {
    let mut pm_commitments = Vec::with_capacity(pm_batch_inputs.len() + 1);
    if let Some(first) = pm_batch_inputs.first() {
        pm_commitments.push(first.current_sb_commitment);
    } else {
        pm_commitments.push(FieldElement::zero());
    }
    for (k, batch) in pm_batch_inputs.iter().enumerate() {
        if k > 0 && batch.current_sb_commitment != pm_batch_inputs[k - 1].new_sb_commitment {
            return Err(CommitmentError::PmChainBroken(k));
        }
        pm_commitments.push(batch.new_sb_commitment);
    }

    // tvCommitments[0] is the fixed initial tally commitment (§3), not taken
    // from the first batch's currentTallyCommitment.
    let mut tv_commitments = Vec::with_capacity(tv_batch_inputs.len() + 1);
    tv_commitments.push(FieldElement::zero());
    for (k, batch) in tv_batch_inputs.iter().enumerate() {
        if k > 0 && batch.current_tally_commitment != tv_batch_inputs[k - 1].new_tally_commitment {
            return Err(CommitmentError::TvChainBroken(k));
        }
        tv_commitments.push(batch.new_tally_commitment);
    }

    let (yes_votes, no_votes, per_vo_spent_voice_credits, spent_voice_credits, final_commitment) = tv_batch_inputs
        .last()
        .map(|b| {
            (
                b.yes_votes_running,
                b.no_votes_running,
                b.per_vo_spent_voice_credits_running,
                b.spent_voice_credits_running,
                b.new_tally_commitment,
            )
        })
        .unwrap_or((0, 0, [0; VOTE_OPTION_COUNT], 0, FieldElement::zero()));

    // Salts only need to be unpredictable ahead of publication, not
    // cryptographically bound into the commitment scheme itself (full
    // circuit-side salted hashing is out of scope, §4.3 "Non-goals") — so
    // each is derived deterministically from the final tally commitment,
    // the same domain-separated-hash idiom the sampler uses to turn a
    // future block hash into sample indices.
    let seed = final_commitment.to_bytes_be();
    let results_salt = FieldElement::domain_hash(&seed, b"tally-results-salt", 0).to_decimal();
    let spent_voice_credits_salt = FieldElement::domain_hash(&seed, b"tally-svc-salt", 0).to_decimal();
    let per_vo_spent_voice_credits_salt = FieldElement::domain_hash(&seed, b"tally-per-vo-salt", 0).to_decimal();

    Ok((
        Commitments {
            pm_commitments,
            tv_commitments,
        },
        TallyResults {
            yes_votes,
            no_votes,
            per_vo_spent_voice_credits,
            spent_voice_credits,
            results_salt,
            spent_voice_credits_salt,
            per_vo_spent_voice_credits_salt,
        },
    ))
}
