//! Groth16 proof wire marshalling, public-signals binding, external prover
//! invocation, and the per-audit persistent file formats (component C).

pub mod backend;
pub mod binding;
pub mod files;
pub mod proof;
pub mod prover;

pub use backend::{prove_batches_concurrently, BackendError, PendingBatch, ProverBackend};
pub use binding::{bind_pm_public_signals, bind_tv_public_signals, BindingError, PmPublicSignals, TvPublicSignals};
pub use files::{
    BatchKind, CircuitInputs, CommitmentsFile, FileError, ProofBundle, ProveBatches, ProveStatus,
    StatusFile, TallyFile,
};
pub use proof::{AffinePoint, ExtensionPoint, Proof, ProofError, ProofWire};
pub use prover::{ExternalProver, MockProver, ProverError};
