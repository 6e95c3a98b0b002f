//! Orchestrator-level errors (§7), aggregating every component's failure
//! kind the way `solana_client::SolanaClientError` wraps its dependencies.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Replay(#[from] rla_maci::ReplayError),

    #[error(transparent)]
    Commitment(#[from] rla_maci::CommitmentError),

    #[error(transparent)]
    Binding(#[from] rla_proof::BindingError),

    #[error(transparent)]
    Proof(#[from] rla_proof::ProofError),

    #[error(transparent)]
    Backend(#[from] rla_proof::BackendError),

    #[error(transparent)]
    File(#[from] rla_proof::FileError),

    #[error(transparent)]
    Sampler(#[from] rla_sampler::SamplerError),

    #[error(transparent)]
    Audit(#[from] rla_chain::AuditError),

    /// The sampled-proof submission window (`proofDeadline`, §4.4) closed
    /// before every sampled batch was submitted.
    #[error("proof deadline exceeded with {remaining} batch(es) still unverified")]
    DeadlineExceeded { remaining: usize },

    /// A challenge-phase proof failed verification and the on-chain state
    /// dropped to `Rejected` — not a bug, just the documented outcome of
    /// §4.4's "fails verification -> Rejected" transition.
    #[error("audit {audit_id} was rejected during challenge response")]
    RejectedDuringChallenge { audit_id: u64 },

    #[error("transient RPC error after {attempts} attempt(s): {source}")]
    RpcExhausted {
        attempts: u32,
        #[source]
        source: rla_chain::AuditError,
    },
}
