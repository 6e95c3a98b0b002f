//! On-chain MACI state the replay engine reconstructs: poll parameters,
//! signups, and submitted messages (§3 "PollState").

use ed25519_dalek::VerifyingKey;
use rla_field::FieldElement;
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey as XPublicKey, StaticSecret};

/// Tree-size parameters fixed at poll deploy.
#[derive(Clone, Copy, Debug)]
pub struct PollParams {
    pub state_tree_depth: usize,
    pub int_state_tree_depth: usize,
    pub msg_tree_depth: usize,
    pub msg_tree_sub_depth: usize,
    pub vote_option_tree_depth: usize,
}

impl PollParams {
    pub fn msg_batch_size(&self) -> usize {
        5usize.pow(self.msg_tree_sub_depth as u32)
    }

    pub fn tally_batch_size(&self) -> usize {
        5usize.pow(self.int_state_tree_depth as u32)
    }
}

/// Number of tallied vote options this engine supports: 0 = no, 1 = yes,
/// fixed by the shape of `TallyResults` (§3).
pub const VOTE_OPTION_COUNT: usize = 2;

#[derive(Clone, Debug)]
pub struct SignUpEvent {
    pub pub_key: VerifyingKey,
    pub voice_credit_balance: u64,
    pub timestamp: u64,
}

impl SignUpEvent {
    pub(crate) fn leaf(&self) -> FieldElement {
        let mut hasher = Sha256::new();
        hasher.update(self.pub_key.as_bytes());
        hasher.update(self.voice_credit_balance.to_be_bytes());
        rla_field::bytes_to_field(&hasher.finalize())
    }
}

#[derive(Clone, Debug)]
pub struct PublishMessageEvent {
    pub ephemeral_pub: XPublicKey,
    pub ciphertext: Vec<u8>,
    pub timestamp: u64,
}

impl PublishMessageEvent {
    pub(crate) fn leaf(&self) -> FieldElement {
        let mut hasher = Sha256::new();
        hasher.update(self.ephemeral_pub.as_bytes());
        hasher.update(&self.ciphertext);
        rla_field::bytes_to_field(&hasher.finalize())
    }
}

/// The poll as observed on chain: parameters plus the append-only event logs
/// the replay engine folds into state (§4.1 step 3).
pub struct PollState {
    pub poll_id: u64,
    pub params: PollParams,
    pub coordinator_secret: StaticSecret,
    pub signups: Vec<SignUpEvent>,
    pub messages: Vec<PublishMessageEvent>,
    pub poll_ended: bool,
}

impl PollState {
    pub fn new(poll_id: u64, params: PollParams, coordinator_secret: StaticSecret) -> Self {
        Self {
            poll_id,
            params,
            coordinator_secret,
            signups: Vec::new(),
            messages: Vec::new(),
            poll_ended: false,
        }
    }

    pub fn record_signup(&mut self, event: SignUpEvent) {
        self.signups.push(event);
    }

    pub fn record_message(&mut self, event: PublishMessageEvent) {
        self.messages.push(event);
    }
}
