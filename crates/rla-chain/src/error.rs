//! Chain-facing error kinds (§7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    /// Wrong phase, wrong caller, wrong value, timer not elapsed. The
    /// operation reverts without state change.
    #[error("precondition violated: {0}")]
    PreconditionViolated(String),

    /// On-chain verification rejected a proof submitted in the sampled
    /// phase. Outside a challenge, the submission simply reverts and may
    /// be retried with a re-proved proof.
    #[error("proof invalid for audit {audit_id}, batch {batch_index}")]
    ProofInvalid { audit_id: u64, batch_index: u64 },

    /// The coordinator failed to submit all sampled proofs before
    /// `proofDeadline`, or failed to respond in challenge. Terminal.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Network/RPC error. Retryable with exponential backoff, capped.
    #[error("transient RPC error: {0}")]
    RpcTransient(String),

    #[error("no such audit: {0}")]
    NotFound(u64),
}
