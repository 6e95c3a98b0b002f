//! On-chain audit record, phase transitions, and economics (component D).

pub mod chain;
pub mod economics;
pub mod error;
pub mod record;
pub mod sim;

pub use chain::AuditChain;
pub use economics::{challenge_bond, ProtocolConstants};
pub use error::AuditError;
pub use record::{AccountId, Amount, AuditId, AuditRecord, BlockHeight, Phase, PollHandle, Timestamp};
pub use sim::SimAuditChain;
