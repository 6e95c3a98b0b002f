//! Persistent per-audit file formats (§6 "Persistent files").
//!
//! Every audit owns an output directory for the lifetime of the audit (§5
//! "Resources"). This module is the sole place that knows the on-disk
//! layout, so the orchestrator never hand-rolls a path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rla_field::FieldElement;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::proof::ProofWire;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A batch kind, used to name per-batch files (`process_<k>` / `tally_<k>`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchKind {
    Process,
    Tally,
}

impl BatchKind {
    fn file_stem(&self) -> &'static str {
        match self {
            BatchKind::Process => "process",
            BatchKind::Tally => "tally",
        }
    }
}

/// Arbitrary circuit witness fields, serialized as decimal strings per §6.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CircuitInputs {
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldElement>,
}

impl CircuitInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldElement) -> &mut Self {
        self.fields.insert(key.into(), value);
        self
    }
}

/// `{ proof, publicSignals, circuitInputs }` — the bundle format shared
/// with the external prover.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofBundle {
    pub proof: ProofWire,
    #[serde(rename = "publicSignals")]
    pub public_signals: Vec<FieldElement>,
    #[serde(rename = "circuitInputs")]
    pub circuit_inputs: CircuitInputs,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitmentsFile {
    #[serde(rename = "pmCommitments")]
    pub pm_commitments: Vec<FieldElement>,
    #[serde(rename = "tvCommitments")]
    pub tv_commitments: Vec<FieldElement>,
    #[serde(rename = "pmBatchCount")]
    pub pm_batch_count: usize,
    #[serde(rename = "tvBatchCount")]
    pub tv_batch_count: usize,
    #[serde(rename = "yesVotes")]
    pub yes_votes: u128,
    #[serde(rename = "noVotes")]
    pub no_votes: u128,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaltedValue {
    pub tally: Vec<u128>,
    pub salt: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpentVoiceCredits {
    pub spent: u128,
    pub salt: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TallyFile {
    pub results: SaltedValue,
    #[serde(rename = "totalSpentVoiceCredits")]
    pub total_spent_voice_credits: SpentVoiceCredits,
    #[serde(rename = "perVOSpentVoiceCredits")]
    pub per_vo_spent_voice_credits: SaltedValue,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProveStatus {
    Idle,
    Proving,
    Done,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusFile {
    pub status: String,
    pub prove_status: ProveStatus,
    pub proved: usize,
    pub total_to_prove: usize,
    pub updated_at: u64,
    pub prove_updated_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProveBatches {
    pub pm: Vec<usize>,
    pub tv: Vec<usize>,
}

fn join(dir: &Path, name: impl AsRef<str>) -> PathBuf {
    dir.join(name.as_ref())
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), FileError> {
    let body = serde_json::to_vec_pretty(value).map_err(|source| FileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tokio::fs::write(path, body)
        .await
        .map_err(|source| FileError::Io {
            path: path.to_path_buf(),
            source,
        })
}

async fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, FileError> {
    let body = tokio::fs::read(path)
        .await
        .map_err(|source| FileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_slice(&body).map_err(|source| FileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub async fn write_circuit_inputs(
    output_dir: &Path,
    kind: BatchKind,
    batch_index: usize,
    inputs: &CircuitInputs,
) -> Result<(), FileError> {
    let path = join(output_dir, format!("{}_{}_inputs.json", kind.file_stem(), batch_index));
    write_json(&path, inputs).await
}

pub async fn read_circuit_inputs(
    output_dir: &Path,
    kind: BatchKind,
    batch_index: usize,
) -> Result<CircuitInputs, FileError> {
    let path = join(output_dir, format!("{}_{}_inputs.json", kind.file_stem(), batch_index));
    read_json(&path).await
}

pub async fn write_proof_bundle(
    output_dir: &Path,
    kind: BatchKind,
    batch_index: usize,
    bundle: &ProofBundle,
) -> Result<(), FileError> {
    let path = join(output_dir, format!("{}_{}.json", kind.file_stem(), batch_index));
    write_json(&path, bundle).await
}

pub async fn read_proof_bundle(
    output_dir: &Path,
    kind: BatchKind,
    batch_index: usize,
) -> Result<ProofBundle, FileError> {
    let path = join(output_dir, format!("{}_{}.json", kind.file_stem(), batch_index));
    read_json(&path).await
}

pub fn proof_bundle_exists(output_dir: &Path, kind: BatchKind, batch_index: usize) -> bool {
    join(output_dir, format!("{}_{}.json", kind.file_stem(), batch_index)).exists()
}

pub async fn write_commitments(output_dir: &Path, file: &CommitmentsFile) -> Result<(), FileError> {
    write_json(&join(output_dir, "commitments.json"), file).await
}

pub async fn read_commitments(output_dir: &Path) -> Result<CommitmentsFile, FileError> {
    read_json(&join(output_dir, "commitments.json")).await
}

pub async fn write_tally(output_dir: &Path, file: &TallyFile) -> Result<(), FileError> {
    write_json(&join(output_dir, "tally.json"), file).await
}

pub async fn read_tally(output_dir: &Path) -> Result<TallyFile, FileError> {
    read_json(&join(output_dir, "tally.json")).await
}

pub async fn write_status(output_dir: &Path, file: &StatusFile) -> Result<(), FileError> {
    write_json(&join(output_dir, "status.json"), file).await
}

pub async fn read_status(output_dir: &Path) -> Result<StatusFile, FileError> {
    read_json(&join(output_dir, "status.json")).await
}

pub async fn write_prove_batches(output_dir: &Path, batches: &ProveBatches) -> Result<(), FileError> {
    write_json(&join(output_dir, "prove-batches.json"), batches).await
}

pub async fn read_prove_batches(output_dir: &Path) -> Result<ProveBatches, FileError> {
    read_json(&join(output_dir, "prove-batches.json")).await
}
