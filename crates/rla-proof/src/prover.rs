//! External prover invocation (§9 "Prover as external process").
//!
//! The Groth16 prover is a black box: `prove(inputs, zkey, wasm) → (proof,
//! publicSignals)` (§1). This crate treats it as a command-line worker
//! that consumes a circuit-inputs file and emits a proof-bundle file; the
//! orchestrator invokes it per batch and is agnostic to what's inside.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info};

use rla_field::FieldElement;

use crate::files::{self, BatchKind, CircuitInputs, ProofBundle};
use crate::proof::{AffinePoint, ExtensionPoint, Proof};

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("failed to spawn prover command: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("prover exited with failure: {0}")]
    NonZeroExit(String),
    #[error("prover timed out after {0:?}")]
    Timeout(Duration),
    #[error("prover did not produce an output file: {0}")]
    OutputMissing(PathBuf),
    #[error(transparent)]
    File(#[from] files::FileError),
}

/// Invokes a real external prover binary: writes the circuit inputs to
/// `<output_dir>/<kind>_<k>_inputs.json`, runs the configured command with
/// that path and an expected output path as arguments, then reads back the
/// proof bundle the prover wrote.
#[derive(Clone)]
pub struct ExternalProver {
    command: String,
    args_template: Vec<String>,
    timeout: Duration,
}

impl ExternalProver {
    /// `args_template` entries containing the literal tokens `{inputs}` and
    /// `{output}` are substituted with the circuit-inputs path and the
    /// expected proof-bundle path before the command runs.
    pub fn new(command: String, args_template: Vec<String>, timeout: Duration) -> Self {
        Self {
            command,
            args_template,
            timeout,
        }
    }

    pub async fn prove_batch(
        &self,
        output_dir: &Path,
        kind: BatchKind,
        batch_index: usize,
        inputs: &CircuitInputs,
    ) -> Result<ProofBundle, ProverError> {
        files::write_circuit_inputs(output_dir, kind, batch_index, inputs).await?;

        let stem = match kind {
            BatchKind::Process => "process",
            BatchKind::Tally => "tally",
        };
        let inputs_path = output_dir.join(format!("{stem}_{batch_index}_inputs.json"));
        let output_path = output_dir.join(format!("{stem}_{batch_index}.json"));

        let args: Vec<String> = self
            .args_template
            .iter()
            .map(|arg| {
                arg.replace("{inputs}", &inputs_path.to_string_lossy())
                    .replace("{output}", &output_path.to_string_lossy())
            })
            .collect();

        info!(command = %self.command, batch_index, ?kind, "invoking external prover");

        let run = Command::new(&self.command)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| ProverError::Timeout(self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            error!(batch_index, %stderr, "prover process failed");
            return Err(ProverError::NonZeroExit(stderr));
        }
        debug!(stdout = %String::from_utf8_lossy(&output.stdout), "prover stdout");

        if !output_path.exists() {
            return Err(ProverError::OutputMissing(output_path));
        }

        Ok(files::read_proof_bundle(output_dir, kind, batch_index).await?)
    }
}

/// Deterministic mock prover used in tests and dry runs: derives a proof
/// from a hash of the circuit inputs rather than running a real backend,
/// mirroring how the coordinator's worker crates test proving without the
/// real toolchain installed.
#[derive(Clone)]
pub struct MockProver {
    delay: Duration,
}

impl MockProver {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub async fn prove_batch(
        &self,
        inputs: &CircuitInputs,
        public_signals: Vec<FieldElement>,
    ) -> ProofBundle {
        tokio::time::sleep(self.delay).await;

        let mut hasher = Sha256::new();
        for (key, value) in &inputs.fields {
            hasher.update(key.as_bytes());
            hasher.update(value.to_bytes_be());
        }
        let digest = hasher.finalize();
        let base = rla_field::bytes_to_field(&digest);

        let proof = Proof {
            a: AffinePoint { x: base, y: base },
            b: [
                ExtensionPoint { c0: base, c1: base },
                ExtensionPoint { c0: base, c1: base },
            ],
            c: AffinePoint { x: base, y: base },
        };

        ProofBundle {
            proof: proof.to_wire(),
            public_signals,
            circuit_inputs: inputs.clone(),
        }
    }
}
