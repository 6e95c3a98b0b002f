//! Coordinator orchestrator library: sequences the commit -> reveal ->
//! sample -> submit -> finalize/challenge state machine (component F)
//! over the commitment-extraction and proof-marshalling crates.
//!
//! ## Modules
//!
//! - `orchestrator` - drives one audit record through its full lifecycle
//! - `error` - aggregates every component's failure kind
//! - `status` - the `/health` and `/audits/:id/status` HTTP surface
//! - `demo` - synthetic, fully-replayable poll data for the CLI and tests

pub mod demo;
pub mod error;
pub mod orchestrator;
pub mod status;

pub use error::OrchestratorError;
pub use orchestrator::{pm_circuit_inputs, tv_circuit_inputs, Orchestrator, ProverBackend};
