//! Coordinator orchestrator binary: runs one audit end to end against the
//! in-memory reference chain (real chain RPC is out of scope, §1 "Out of
//! scope" — only its observable interface, §6, is modeled) while serving
//! the `/health` and `/audits/:id/status` HTTP surface alongside it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rand_core::{OsRng, RngCore};
use rla_chain::{ProtocolConstants, SimAuditChain};
use rla_coordinator::orchestrator::{pm_circuit_inputs, tv_circuit_inputs, Orchestrator, ProverBackend};
use rla_coordinator::{demo, status};
use rla_maci::{extract, replay_poll};
use rla_proof::{files, ExternalProver, MockProver};
use tracing::{error, info};

#[derive(Parser, Debug, Clone)]
#[command(name = "rla-coordinator")]
#[command(about = "MACI risk-limiting-audit coordinator", long_about = None)]
struct Args {
    /// HTTP status server bind host.
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    host: String,

    /// HTTP status server bind port.
    #[arg(long, default_value = "8090", env = "PORT")]
    port: u16,

    /// Directory circuit inputs, proofs, and status files are written
    /// under for the lifetime of the audit (§5 "Resources").
    #[arg(long, default_value = "./rla-output", env = "OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Synthetic poll handle to audit.
    #[arg(long, default_value = "demo-poll", env = "POLL_HANDLE")]
    poll: String,

    /// Account identifier this process commits and finalizes as.
    #[arg(long, default_value = "coordinator", env = "COORDINATOR_ACCOUNT")]
    coordinator_account: String,

    /// Number of synthetic voters (demo poll, see `demo::synthetic_poll`).
    #[arg(long, default_value = "10", env = "VOTER_COUNT")]
    voter_count: usize,

    /// Of those voters, how many vote "yes".
    #[arg(long, default_value = "7", env = "YES_VOTES")]
    yes_votes: usize,

    /// Use the deterministic mock prover instead of an external command.
    #[arg(long, default_value = "true", env = "MOCK_PROVER", action = clap::ArgAction::Set)]
    mock_prover: bool,

    /// External prover command (ignored when `--mock-prover=true`).
    #[arg(long, default_value = "prove", env = "PROVER_COMMAND")]
    prover_command: String,

    /// External prover arguments; `{inputs}`/`{output}` are substituted.
    #[arg(long, value_delimiter = ',', default_value = "{inputs},{output}", env = "PROVER_ARGS")]
    prover_args: Vec<String>,

    /// Mock prover per-batch delay in milliseconds.
    #[arg(long, default_value = "50", env = "MOCK_PROVER_DELAY_MS")]
    mock_prover_delay_ms: u64,

    /// Prover subprocess timeout in milliseconds.
    #[arg(long, default_value = "300000", env = "PROOF_TIMEOUT_MS")]
    proof_timeout_ms: u64,

    /// Protocol constant: coordinator stake (smallest unit).
    #[arg(long, default_value = "100000000000000000", env = "COORDINATOR_STAKE")]
    coordinator_stake: u128,

    /// Protocol constant: per-batch proof cost estimate (smallest unit).
    #[arg(long, default_value = "1000000000000000", env = "PROOF_COST_ESTIMATE")]
    proof_cost_estimate: u128,

    /// Protocol constant: challenge period, seconds.
    #[arg(long, default_value = "604800", env = "CHALLENGE_PERIOD_SECS")]
    challenge_period_secs: u64,

    /// Protocol constant: challenge response deadline, seconds.
    #[arg(long, default_value = "259200", env = "CHALLENGE_RESPONSE_DEADLINE_SECS")]
    challenge_response_deadline_secs: u64,

    /// Protocol constant: block-hash delay, blocks.
    #[arg(long, default_value = "1", env = "BLOCK_HASH_DELAY")]
    block_hash_delay: u64,

    /// Protocol constant: sample confidence, parts-per-thousand.
    #[arg(long, default_value = "2996", env = "CONFIDENCE_X1000")]
    confidence_x1000: u64,

    /// Protocol constant: sample submission window, seconds.
    #[arg(long, default_value = "86400", env = "SAMPLE_SUBMISSION_WINDOW_SECS")]
    sample_submission_window_secs: u64,

    /// How frequently the in-process block miner mints a block, in
    /// milliseconds. Substitutes for block production on a real chain,
    /// which is out of scope (§1).
    #[arg(long, default_value = "200", env = "BLOCK_INTERVAL_MS")]
    block_interval_ms: u64,

    /// How many virtual seconds the in-process clock advances per tick.
    /// Substitutes for real chain time; raise this to drive the demo
    /// through a multi-day challenge period in seconds of wall time.
    #[arg(long, default_value = "3600", env = "CLOCK_TICK_SECS")]
    clock_tick_secs: u64,

    /// Clock tick interval in milliseconds.
    #[arg(long, default_value = "200", env = "CLOCK_INTERVAL_MS")]
    clock_interval_ms: u64,

    /// Bounded polling attempts for each suspension point before the
    /// orchestrator gives up (§7 "RpcTransient ... capped").
    #[arg(long, default_value = "600", env = "MAX_POLLS")]
    max_polls: u32,
}

impl Args {
    fn constants(&self) -> ProtocolConstants {
        ProtocolConstants {
            coordinator_stake: self.coordinator_stake,
            proof_cost_estimate: self.proof_cost_estimate,
            challenge_period_secs: self.challenge_period_secs,
            challenge_response_deadline_secs: self.challenge_response_deadline_secs,
            block_hash_delay: self.block_hash_delay,
            confidence_x1000: self.confidence_x1000,
            sample_submission_window_secs: self.sample_submission_window_secs,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rla_coordinator=debug,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();
    tokio::fs::create_dir_all(&args.output_dir).await?;

    let constants = args.constants();
    let chain = Arc::new(SimAuditChain::new(constants));

    // Real block production and wall-clock time are out of scope (§1); this
    // process stands in for both so the demo audit can actually progress.
    {
        let chain = chain.clone();
        let interval = Duration::from_millis(args.block_interval_ms);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let mut hash = [0u8; 32];
                OsRng.fill_bytes(&mut hash);
                chain.mine_block(hash).await;
            }
        });
    }
    {
        let chain = chain.clone();
        let interval = Duration::from_millis(args.clock_interval_ms);
        let tick_secs = args.clock_tick_secs;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                chain.advance_time(tick_secs).await;
            }
        });
    }

    let status_router = status::router(chain.clone());
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("status server listening on {}", addr);
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, status_router).await {
            error!(?err, "status server exited");
        }
    });

    let prover = if args.mock_prover {
        ProverBackend::Mock(MockProver::new(Duration::from_millis(args.mock_prover_delay_ms)))
    } else {
        ProverBackend::External(ExternalProver::new(
            args.prover_command.clone(),
            args.prover_args.clone(),
            Duration::from_millis(args.proof_timeout_ms),
        ))
    };

    let orchestrator = Orchestrator {
        chain: chain.clone(),
        prover,
        output_dir: args.output_dir.clone(),
        int_state_tree_depth: demo::default_poll_params().int_state_tree_depth as u32,
        vote_option_tree_depth: demo::default_poll_params().vote_option_tree_depth as u32,
        poll_interval: Duration::from_millis(200),
    };

    let poll = demo::synthetic_poll(1, args.voter_count, args.yes_votes);
    let (pm_batch_inputs, tv_batch_inputs) = replay_poll(&poll, false)?;
    let (commitments, tally) = extract(&pm_batch_inputs, &tv_batch_inputs)?;
    let message_chain_root = pm_batch_inputs.first().map(|b| b.message_root).unwrap_or_else(rla_field::FieldElement::zero);
    let pm_inputs = pm_circuit_inputs(&pm_batch_inputs);
    let tv_inputs = tv_circuit_inputs(&tv_batch_inputs);

    let pm_batch_size = poll.params.msg_batch_size() as u64;
    let tv_batch_size = poll.params.tally_batch_size() as u64;

    info!(yes = tally.yes_votes, no = tally.no_votes, "replayed poll, committing audit");

    let audit_id = orchestrator
        .commit(
            args.coordinator_account.clone(),
            args.poll.clone(),
            &commitments,
            &tally,
            pm_batch_size,
            tv_batch_size,
            args.coordinator_stake,
        )
        .await?;

    files::write_prove_batches(
        &args.output_dir,
        &files::ProveBatches {
            pm: (0..pm_batch_inputs.len()).collect(),
            tv: (0..tv_batch_inputs.len()).collect(),
        },
    )
    .await?;

    orchestrator
        .wait_until_revealable(audit_id, args.block_hash_delay, args.max_polls)
        .await?;

    orchestrator
        .reveal_and_submit_sampled(audit_id, &commitments, message_chain_root, &pm_inputs, &tv_inputs)
        .await?;

    orchestrator.finalize_sampling(audit_id).await?;

    let final_phase = orchestrator
        .drive_past_challenge_period(
            audit_id,
            &constants,
            &commitments,
            message_chain_root,
            &pm_inputs,
            &tv_inputs,
            args.max_polls,
        )
        .await?;

    info!(audit_id, ?final_phase, "audit lifecycle complete");
    Ok(())
}
