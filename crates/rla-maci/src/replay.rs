//! Ballot state replay engine (component A, §4.1).
//!
//! Rebuilds the signup and message trees from the on-chain event logs, then
//! replays `processMessages` and `tallyVotes` over fixed-size batches,
//! emitting one circuit-input record per batch. Both loops are
//! deterministic given identical inputs, so two runs over the same
//! `PollState` produce bit-identical `pmBatchInputs`/`tvBatchInputs`.

use ed25519_dalek::VerifyingKey;
use rla_field::FieldElement;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::crypto;
use crate::state::{PollState, VOTE_OPTION_COUNT};
use crate::tree::FixedDepthTree;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("poll has not ended")]
    PollNotEnded,
    #[error("accumulator merge mismatch: {0}")]
    AccumulatorMismatch(String),
}

/// Circuit-input record for one process-messages batch.
#[derive(Clone, Debug)]
pub struct PmBatchInput {
    pub batch_index: usize,
    pub current_sb_commitment: FieldElement,
    pub new_sb_commitment: FieldElement,
    pub message_root: FieldElement,
    pub messages_in_batch: usize,
    pub messages_applied: usize,
}

/// Circuit-input record for one tally-votes batch.
#[derive(Clone, Debug)]
pub struct TvBatchInput {
    pub batch_index: usize,
    pub current_tally_commitment: FieldElement,
    pub new_tally_commitment: FieldElement,
    pub leaves_in_batch: usize,
    pub yes_votes_running: u128,
    pub no_votes_running: u128,
    /// Running per-vote-option sum of `weight^2` (MACI's quadratic-voting
    /// "spent voice credits"), index-aligned with `Ballot::vote_weights`.
    pub per_vo_spent_voice_credits_running: [u128; VOTE_OPTION_COUNT],
    /// Running total of `per_vo_spent_voice_credits_running`.
    pub spent_voice_credits_running: u128,
}

#[derive(Clone, Debug)]
struct Ballot {
    verifying_key: VerifyingKey,
    nonce: u64,
    vote_weights: [u64; VOTE_OPTION_COUNT],
}

impl Ballot {
    fn new(verifying_key: VerifyingKey) -> Self {
        Self {
            verifying_key,
            nonce: 0,
            vote_weights: [0; VOTE_OPTION_COUNT],
        }
    }
}

fn digest_to_field(hasher: Sha256) -> FieldElement {
    let digest = hasher.finalize();
    rla_field::bytes_to_field(&digest)
}

fn ballots_digest(ballots: &[Ballot]) -> FieldElement {
    let mut hasher = Sha256::new();
    for ballot in ballots {
        hasher.update(ballot.verifying_key.as_bytes());
        hasher.update(ballot.nonce.to_be_bytes());
        for weight in &ballot.vote_weights {
            hasher.update(weight.to_be_bytes());
        }
    }
    digest_to_field(hasher)
}

fn sb_commitment(ballots_digest: FieldElement, message_root: FieldElement, batch_index: u64) -> FieldElement {
    let mut hasher = Sha256::new();
    hasher.update(b"sb");
    hasher.update(ballots_digest.to_bytes_be());
    hasher.update(message_root.to_bytes_be());
    hasher.update(batch_index.to_be_bytes());
    digest_to_field(hasher)
}

fn tally_commitment(yes: u128, no: u128, processed: u64) -> FieldElement {
    let mut hasher = Sha256::new();
    hasher.update(b"tv");
    hasher.update(yes.to_be_bytes());
    hasher.update(no.to_be_bytes());
    hasher.update(processed.to_be_bytes());
    digest_to_field(hasher)
}

/// Reconstructed MACI state: the signup tree and the live ballot set, kept
/// in memory only for the duration of one replay (§9 "replay vs. streaming
/// state" — batches are emitted incrementally, not accumulated).
struct MaciState {
    ballots: Vec<Ballot>,
}

impl MaciState {
    fn process_messages(
        &mut self,
        poll: &PollState,
        message_root: FieldElement,
    ) -> Vec<PmBatchInput> {
        let batch_size = poll.params.msg_batch_size();
        let mut batches = Vec::new();
        let mut batch_index = 0usize;

        // MACI processes messages newest-to-oldest (§4.1 step 4).
        let ordered: Vec<&_> = poll.messages.iter().rev().collect();

        for chunk in ordered.chunks(batch_size) {
            let before = ballots_digest(&self.ballots);
            let current = sb_commitment(before, message_root, batch_index as u64);

            let mut applied = 0usize;
            for message in chunk {
                if self.apply_message(poll, message) {
                    applied += 1;
                }
            }

            let after = ballots_digest(&self.ballots);
            let new = sb_commitment(after, message_root, batch_index as u64);

            batches.push(PmBatchInput {
                batch_index,
                current_sb_commitment: current,
                new_sb_commitment: new,
                message_root,
                messages_in_batch: chunk.len(),
                messages_applied: applied,
            });
            batch_index += 1;
        }

        batches
    }

    /// Decrypts and applies one message. Returns `false` (and leaves state
    /// untouched) on any of the drop conditions in §4.1 "Failure": bad
    /// decryption, bad signature, out-of-range state index, or a nonce that
    /// does not strictly exceed the ballot's currently accepted nonce.
    ///
    /// Messages are scanned newest-to-oldest (§4.1), so "strictly exceed"
    /// rather than "extends by exactly one" is what gives the highest
    /// nonce for a given ballot priority: the first (newest) message seen
    /// for a ballot sets its nonce, and every older, lower-nonce message
    /// for the same ballot is then rejected by this same check — the
    /// voter's latest revision wins.
    fn apply_message(
        &mut self,
        poll: &PollState,
        message: &crate::state::PublishMessageEvent,
    ) -> bool {
        let signed = match crypto::decrypt(
            &message.ciphertext,
            &poll.coordinator_secret,
            &message.ephemeral_pub,
        ) {
            Ok(signed) => signed,
            Err(err) => {
                debug!(?err, "dropping message: decryption failed");
                return false;
            }
        };

        let state_index = signed.command.state_index as usize;
        let Some(ballot) = self.ballots.get(state_index) else {
            debug!(state_index, "dropping message: state index out of range");
            return false;
        };

        if !signed.verify(&ballot.verifying_key) {
            debug!(state_index, "dropping message: signature invalid");
            return false;
        }

        if signed.command.nonce <= ballot.nonce {
            debug!(
                state_index,
                ballot_nonce = ballot.nonce,
                got = signed.command.nonce,
                "dropping message: nonce does not exceed the highest nonce already accepted for this ballot"
            );
            return false;
        }

        if signed.command.vote_option_index as usize >= VOTE_OPTION_COUNT {
            debug!(state_index, "dropping message: vote option out of range");
            return false;
        }

        let Ok(new_verifying_key) = VerifyingKey::from_bytes(&signed.command.new_pub_key) else {
            debug!(state_index, "dropping message: malformed replacement key");
            return false;
        };

        let ballot = &mut self.ballots[state_index];
        ballot.nonce = signed.command.nonce;
        ballot.vote_weights[signed.command.vote_option_index as usize] = signed.command.new_vote_weight;
        ballot.verifying_key = new_verifying_key;
        true
    }

    fn tally_votes(&self, poll: &PollState) -> Vec<TvBatchInput> {
        let batch_size = poll.params.tally_batch_size().max(1);
        let mut batches = Vec::new();
        let mut yes: u128 = 0;
        let mut no: u128 = 0;
        let mut per_vo_spent: [u128; VOTE_OPTION_COUNT] = [0; VOTE_OPTION_COUNT];
        let mut spent: u128 = 0;
        let mut idx = 0usize;
        let mut batch_index = 0usize;

        while idx < self.ballots.len() {
            let end = (idx + batch_size).min(self.ballots.len());
            let current = tally_commitment(yes, no, idx as u64);

            for ballot in &self.ballots[idx..end] {
                no += ballot.vote_weights[0] as u128;
                yes += ballot.vote_weights[1] as u128;
                for (option, &weight) in ballot.vote_weights.iter().enumerate() {
                    let squared = (weight as u128) * (weight as u128);
                    per_vo_spent[option] += squared;
                    spent += squared;
                }
            }

            let new = tally_commitment(yes, no, end as u64);
            batches.push(TvBatchInput {
                batch_index,
                current_tally_commitment: current,
                new_tally_commitment: new,
                leaves_in_batch: end - idx,
                yes_votes_running: yes,
                no_votes_running: no,
                per_vo_spent_voice_credits_running: per_vo_spent,
                spent_voice_credits_running: spent,
            });

            idx = end;
            batch_index += 1;
        }

        batches
    }
}

/// Runs the full replay algorithm of §4.1 and returns the ordered
/// `pmBatchInputs`/`tvBatchInputs` sequences.
///
/// `suppress_duration_check` lets test chains skip the "poll has ended"
/// precondition (§4.1 step 1, "unless caller chose to suppress the duration
/// check for test chains").
pub fn replay_poll(
    poll: &PollState,
    suppress_duration_check: bool,
) -> Result<(Vec<PmBatchInput>, Vec<TvBatchInput>), ReplayError> {
    if !poll.poll_ended && !suppress_duration_check {
        return Err(ReplayError::PollNotEnded);
    }

    let mut state_tree = FixedDepthTree::new(poll.params.state_tree_depth);
    let mut ballots = Vec::with_capacity(poll.signups.len());
    for signup in &poll.signups {
        if state_tree.len() >= state_tree.capacity() {
            return Err(ReplayError::AccumulatorMismatch(
                "signup accumulator exceeds stateTreeDepth capacity".to_string(),
            ));
        }
        state_tree.push(signup.leaf());
        ballots.push(Ballot::new(signup.pub_key));
    }

    let mut msg_tree = FixedDepthTree::new(poll.params.msg_tree_depth);
    for message in &poll.messages {
        if msg_tree.len() >= msg_tree.capacity() {
            return Err(ReplayError::AccumulatorMismatch(
                "message accumulator exceeds msgTreeDepth capacity".to_string(),
            ));
        }
        msg_tree.push(message.leaf());
    }
    let message_root = msg_tree.root();

    warn!(
        poll_id = poll.poll_id,
        signups = ballots.len(),
        messages = poll.messages.len(),
        "replaying poll state"
    );

    let mut state = MaciState { ballots };
    let pm_batch_inputs = state.process_messages(poll, message_root);
    let tv_batch_inputs = state.tally_votes(poll);

    Ok((pm_batch_inputs, tv_batch_inputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Command, SignedCommand};
    use crate::state::{PollParams, PublishMessageEvent, SignUpEvent};
    use ed25519_dalek::SigningKey;
    use rand_core::OsRng;
    use x25519_dalek::{PublicKey as XPublicKey, StaticSecret};

    fn params() -> PollParams {
        PollParams {
            state_tree_depth: 4,
            int_state_tree_depth: 1,
            msg_tree_depth: 4,
            msg_tree_sub_depth: 1,
            vote_option_tree_depth: 2,
        }
    }

    fn signed_message(
        coordinator_pub: &XPublicKey,
        signing_key: &SigningKey,
        command: Command,
    ) -> PublishMessageEvent {
        let ephemeral_secret = StaticSecret::random_from_rng(OsRng);
        let ephemeral_pub = XPublicKey::from(&ephemeral_secret);
        let signed = SignedCommand::sign(command, signing_key);
        let ciphertext = crypto::encrypt_command(&signed, &ephemeral_secret, coordinator_pub);
        PublishMessageEvent {
            ephemeral_pub,
            ciphertext,
            timestamp: 0,
        }
    }

    #[test]
    fn replay_rejects_unfinished_poll_by_default() {
        let coordinator_secret = StaticSecret::random_from_rng(OsRng);
        let poll = PollState::new(1, params(), coordinator_secret);
        let err = replay_poll(&poll, false).unwrap_err();
        assert!(matches!(err, ReplayError::PollNotEnded));
    }

    #[test]
    fn replay_produces_chained_commitments_and_applies_valid_votes() {
        let coordinator_secret = StaticSecret::random_from_rng(OsRng);
        let coordinator_pub = XPublicKey::from(&coordinator_secret);
        let mut poll = PollState::new(1, params(), coordinator_secret);
        poll.poll_ended = true;

        let signing_key = SigningKey::generate(&mut OsRng);
        poll.record_signup(SignUpEvent {
            pub_key: signing_key.verifying_key(),
            voice_credit_balance: 100,
            timestamp: 0,
        });

        let command = Command {
            state_index: 0,
            new_pub_key: signing_key.verifying_key().to_bytes(),
            vote_option_index: 1,
            new_vote_weight: 9,
            nonce: 1,
            poll_id: 1,
            salt: 7,
        };
        poll.record_message(signed_message(&coordinator_pub, &signing_key, command));

        let (pm_batches, tv_batches) = replay_poll(&poll, false).unwrap();
        assert_eq!(pm_batches.len(), 1);
        assert_eq!(pm_batches[0].messages_applied, 1);

        for window in pm_batches.windows(2) {
            assert_eq!(window[0].new_sb_commitment, window[1].current_sb_commitment);
        }

        assert_eq!(tv_batches.len(), 1);
        assert_eq!(tv_batches[0].yes_votes_running, 9);
        assert_eq!(tv_batches[0].no_votes_running, 0);
    }

    #[test]
    fn bad_signature_drops_message_without_applying_it() {
        let coordinator_secret = StaticSecret::random_from_rng(OsRng);
        let coordinator_pub = XPublicKey::from(&coordinator_secret);
        let mut poll = PollState::new(1, params(), coordinator_secret);
        poll.poll_ended = true;

        let signing_key = SigningKey::generate(&mut OsRng);
        let other_key = SigningKey::generate(&mut OsRng);
        poll.record_signup(SignUpEvent {
            pub_key: signing_key.verifying_key(),
            voice_credit_balance: 100,
            timestamp: 0,
        });

        let command = Command {
            state_index: 0,
            new_pub_key: signing_key.verifying_key().to_bytes(),
            vote_option_index: 1,
            new_vote_weight: 9,
            nonce: 1,
            poll_id: 1,
            salt: 7,
        };
        // Signed by a key that never signed up under this state index.
        poll.record_message(signed_message(&coordinator_pub, &other_key, command));

        let (pm_batches, tv_batches) = replay_poll(&poll, false).unwrap();
        assert_eq!(pm_batches[0].messages_applied, 0);
        assert_eq!(tv_batches[0].yes_votes_running, 0);
    }

    #[test]
    fn a_later_higher_nonce_vote_revision_wins_over_the_earlier_one() {
        let coordinator_secret = StaticSecret::random_from_rng(OsRng);
        let coordinator_pub = XPublicKey::from(&coordinator_secret);
        let mut poll = PollState::new(1, params(), coordinator_secret);
        poll.poll_ended = true;

        let signing_key = SigningKey::generate(&mut OsRng);
        poll.record_signup(SignUpEvent {
            pub_key: signing_key.verifying_key(),
            voice_credit_balance: 100,
            timestamp: 0,
        });

        // First vote: option 0 ("no"), nonce 1.
        let first = Command {
            state_index: 0,
            new_pub_key: signing_key.verifying_key().to_bytes(),
            vote_option_index: 0,
            new_vote_weight: 5,
            nonce: 1,
            poll_id: 1,
            salt: 1,
        };
        poll.record_message(signed_message(&coordinator_pub, &signing_key, first));

        // Revised vote, sent later: option 1 ("yes"), nonce 2.
        let second = Command {
            state_index: 0,
            new_pub_key: signing_key.verifying_key().to_bytes(),
            vote_option_index: 1,
            new_vote_weight: 9,
            nonce: 2,
            poll_id: 1,
            salt: 2,
        };
        poll.record_message(signed_message(&coordinator_pub, &signing_key, second));

        let (pm_batches, tv_batches) = replay_poll(&poll, false).unwrap();
        // Only the higher-nonce revision is ever applied; the superseded
        // first message is dropped once the ballot's nonce advances past it.
        assert_eq!(pm_batches[0].messages_applied, 1);
        assert_eq!(tv_batches[0].yes_votes_running, 9);
        assert_eq!(tv_batches[0].no_votes_running, 0);
    }

    #[test]
    fn accumulator_overflow_is_fatal() {
        let coordinator_secret = StaticSecret::random_from_rng(OsRng);
        let mut tiny_params = params();
        tiny_params.state_tree_depth = 0; // capacity 1
        let mut poll = PollState::new(1, tiny_params, coordinator_secret);
        poll.poll_ended = true;

        for _ in 0..2 {
            let signing_key = SigningKey::generate(&mut OsRng);
            poll.record_signup(SignUpEvent {
                pub_key: signing_key.verifying_key(),
                voice_credit_balance: 0,
                timestamp: 0,
            });
        }

        let err = replay_poll(&poll, false).unwrap_err();
        assert!(matches!(err, ReplayError::AccumulatorMismatch(_)));
    }
}
