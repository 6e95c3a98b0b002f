//! MACI ballot-state replay engine and commitment extractor.
//!
//! Given a poll's on-chain event logs this crate reconstructs the full
//! MACI state machine off chain, iterates `processMessages`/`tallyVotes`
//! over fixed-size batches, and folds the resulting circuit inputs into the
//! two commitment chains the coordinator commits on chain.

pub mod commitments;
pub mod crypto;
pub mod replay;
pub mod state;
mod tree;

pub use commitments::{extract, CommitmentError, Commitments, TallyResults};
pub use crypto::{Command, CryptoError, SignedCommand};
pub use replay::{replay_poll, PmBatchInput, ReplayError, TvBatchInput};
pub use state::{PollParams, PollState, PublishMessageEvent, SignUpEvent};
pub use tree::FixedDepthTree;
