//! Builds a synthetic, fully-replayable poll for the CLI's default run and
//! for integration tests, playing the role of the on-chain event reader
//! §4.1 step 3 assumes (real chain RPC is out of scope; see `spec.md` §1).

use ed25519_dalek::SigningKey;
use rand_core::OsRng;
use rla_maci::{Command, PollParams, PollState, PublishMessageEvent, SignUpEvent, SignedCommand};
use x25519_dalek::{PublicKey as XPublicKey, StaticSecret};

/// `stateTreeDepth=10, intStateTreeDepth=1, msgTreeDepth=2, msgTreeSubDepth=1,
/// voteOptionTreeDepth=2` — the example circuit parameters (§6).
pub fn default_poll_params() -> PollParams {
    PollParams {
        state_tree_depth: 10,
        int_state_tree_depth: 1,
        msg_tree_depth: 2,
        msg_tree_sub_depth: 1,
        vote_option_tree_depth: 2,
    }
}

/// A poll with `voter_count` signups, each voting once: the first
/// `yes_votes` for option 1 ("yes"), the rest for option 0 ("no").
pub fn synthetic_poll(poll_id: u64, voter_count: usize, yes_votes: usize) -> PollState {
    let coordinator_secret = StaticSecret::random_from_rng(OsRng);
    let coordinator_pub = XPublicKey::from(&coordinator_secret);
    let mut poll = PollState::new(poll_id, default_poll_params(), coordinator_secret);
    poll.poll_ended = true;

    for i in 0..voter_count {
        let signing_key = SigningKey::generate(&mut OsRng);
        poll.record_signup(SignUpEvent {
            pub_key: signing_key.verifying_key(),
            voice_credit_balance: 100,
            timestamp: 0,
        });

        let vote_option_index = if i < yes_votes { 1 } else { 0 };
        let command = Command {
            state_index: i as u32,
            new_pub_key: signing_key.verifying_key().to_bytes(),
            vote_option_index,
            new_vote_weight: 1,
            nonce: 1,
            poll_id,
            salt: i as u128,
        };

        let ephemeral_secret = StaticSecret::random_from_rng(OsRng);
        let ephemeral_pub = XPublicKey::from(&ephemeral_secret);
        let signed = SignedCommand::sign(command, &signing_key);
        let ciphertext = rla_maci::crypto::encrypt_command(&signed, &ephemeral_secret, &coordinator_pub);
        poll.record_message(PublishMessageEvent {
            ephemeral_pub,
            ciphertext,
            timestamp: 0,
        });
    }

    poll
}

#[cfg(test)]
mod tests {
    use super::*;
    use rla_maci::replay_poll;

    #[test]
    fn synthetic_poll_replays_to_the_requested_tally() {
        let poll = synthetic_poll(1, 10, 7);
        let (pm_batches, tv_batches) = replay_poll(&poll, false).unwrap();
        let (_, tally) = rla_maci::extract(&pm_batches, &tv_batches).unwrap();
        assert_eq!(tally.yes_votes, 7);
        assert_eq!(tally.no_votes, 3);
    }
}
