//! Prover backend selection and concurrent batch proving (§9 "Concurrent
//! provers").
//!
//! Proving a batch is CPU/IO-bound and independent of every other batch;
//! submitting its proof on-chain is not (nonces, challenge-window
//! bookkeeping). This module proves a slice of batches concurrently with
//! `tokio::spawn` + `futures::future::join_all`, grounded on the teacher's
//! `Dispatcher::dispatch_batch` (fan a batch out into chunks, spawn one
//! task per chunk, collect). Submission stays the caller's job so it can
//! serialize that part.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use thiserror::Error;

use rla_field::FieldElement;

use crate::files::{self, BatchKind, CircuitInputs, FileError, ProofBundle};
use crate::prover::{ExternalProver, MockProver, ProverError};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Prover(#[from] ProverError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error("proving task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// The two circuit-input-to-proof backends the marshaller can drive; the
/// orchestrator is agnostic to which one is wired in (mirrors
/// `mock_settlement`/`MockSettler` vs. the live `Settler`).
#[derive(Clone)]
pub enum ProverBackend {
    Mock(MockProver),
    External(ExternalProver),
}

impl ProverBackend {
    pub async fn prove(
        &self,
        output_dir: &Path,
        kind: BatchKind,
        batch_index: usize,
        inputs: &CircuitInputs,
        public_signals: Vec<FieldElement>,
    ) -> Result<ProofBundle, BackendError> {
        let mut bundle = match self {
            ProverBackend::Mock(p) => p.prove_batch(inputs, public_signals.clone()).await,
            ProverBackend::External(p) => p.prove_batch(output_dir, kind, batch_index, inputs).await?,
        };
        // The marshaller binds public signals itself from the committed
        // claim (§4.3); never trust whatever the prover backend wrote.
        bundle.public_signals = public_signals;
        files::write_proof_bundle(output_dir, kind, batch_index, &bundle).await?;
        Ok(bundle)
    }
}

/// One batch queued for concurrent proving: its 0-based position among
/// the batches of its kind, the circuit inputs, and the already-bound
/// public signals.
pub struct PendingBatch {
    pub batch_index: usize,
    pub inputs: CircuitInputs,
    pub public_signals: Vec<FieldElement>,
}

/// Proves every batch in `pending` concurrently, one spawned task each,
/// then returns the results in the same order `pending` was given in
/// (`join_all` preserves input order regardless of completion order, so
/// callers can zip the result back against e.g. a sample's slot list).
/// There is no partial-failure retry policy here, unlike the teacher's
/// per-worker chunk dispatch: every task runs the same in-process backend,
/// so the first error encountered is returned and the rest are dropped.
pub async fn prove_batches_concurrently(
    backend: &ProverBackend,
    output_dir: &Path,
    kind: BatchKind,
    pending: Vec<PendingBatch>,
) -> Result<Vec<(usize, ProofBundle)>, BackendError> {
    let total = pending.len();
    let tasks = pending.into_iter().map(|batch| {
        let backend = backend.clone();
        let output_dir: PathBuf = output_dir.to_path_buf();
        tokio::spawn(async move {
            let bundle = backend
                .prove(&output_dir, kind, batch.batch_index, &batch.inputs, batch.public_signals)
                .await?;
            Ok::<_, BackendError>((batch.batch_index, bundle))
        })
    });

    let mut results = Vec::with_capacity(total);
    for handle in join_all(tasks).await {
        results.push(handle??);
    }
    Ok(results)
}
