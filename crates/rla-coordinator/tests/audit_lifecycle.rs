//! Integration tests driving a full audit lifecycle against the in-memory
//! reference chain through the orchestrator's public methods, interleaved
//! with direct `advance_time`/`mine_block` calls so multi-day timers pass
//! in test time rather than wall time (§8 scenarios).

use std::sync::Arc;
use std::time::Duration;

use rand_core::{OsRng, RngCore};
use rla_chain::{AuditChain, Phase, ProtocolConstants, SimAuditChain};
use rla_coordinator::orchestrator::{pm_circuit_inputs, tv_circuit_inputs, Orchestrator, ProverBackend};
use rla_coordinator::{demo, OrchestratorError};
use rla_maci::{extract, replay_poll};
use rla_proof::MockProver;

fn fast_constants() -> ProtocolConstants {
    ProtocolConstants {
        coordinator_stake: 100,
        proof_cost_estimate: 10,
        challenge_period_secs: 100,
        challenge_response_deadline_secs: 50,
        block_hash_delay: 1,
        confidence_x1000: 2996,
        sample_submission_window_secs: 1_000,
    }
}

struct Harness {
    chain: Arc<SimAuditChain>,
    orchestrator: Orchestrator<SimAuditChain>,
    constants: ProtocolConstants,
    commitments: rla_maci::Commitments,
    tally: rla_maci::TallyResults,
    message_chain_root: rla_field::FieldElement,
    pm_inputs: Vec<rla_proof::files::CircuitInputs>,
    tv_inputs: Vec<rla_proof::files::CircuitInputs>,
    pm_batch_size: u64,
    tv_batch_size: u64,
}

async fn build_harness(voter_count: usize, yes_votes: usize) -> Harness {
    let constants = fast_constants();
    let chain = Arc::new(SimAuditChain::new(constants));
    let dir = tempfile::tempdir().unwrap();

    let poll = demo::synthetic_poll(1, voter_count, yes_votes);
    let (pm_batches, tv_batches) = replay_poll(&poll, false).unwrap();
    let (commitments, tally) = extract(&pm_batches, &tv_batches).unwrap();
    let message_chain_root = pm_batches[0].message_root;
    let pm_inputs = pm_circuit_inputs(&pm_batches);
    let tv_inputs = tv_circuit_inputs(&tv_batches);

    let orchestrator = Orchestrator {
        chain: chain.clone(),
        prover: ProverBackend::Mock(MockProver::new(Duration::from_millis(1))),
        output_dir: dir.into_path(),
        int_state_tree_depth: poll.params.int_state_tree_depth as u32,
        vote_option_tree_depth: poll.params.vote_option_tree_depth as u32,
        poll_interval: Duration::from_millis(1),
    };

    Harness {
        chain,
        orchestrator,
        constants,
        commitments,
        tally,
        message_chain_root,
        pm_inputs,
        tv_inputs,
        pm_batch_size: poll.params.msg_batch_size() as u64,
        tv_batch_size: poll.params.tally_batch_size() as u64,
    }
}

fn random_hash() -> [u8; 32] {
    let mut hash = [0u8; 32];
    OsRng.fill_bytes(&mut hash);
    hash
}

#[tokio::test]
async fn happy_path_finalizes_without_challenge() {
    let h = build_harness(10, 7).await;

    let audit_id = h
        .orchestrator
        .commit(
            "coordinator".to_string(),
            "poll-1".to_string(),
            &h.commitments,
            &h.tally,
            h.pm_batch_size,
            h.tv_batch_size,
            h.constants.coordinator_stake,
        )
        .await
        .unwrap();

    h.chain.mine_block(random_hash()).await;
    h.orchestrator.wait_until_revealable(audit_id, h.constants.block_hash_delay, 100).await.unwrap();

    h.orchestrator
        .reveal_and_submit_sampled(audit_id, &h.commitments, h.message_chain_root, &h.pm_inputs, &h.tv_inputs)
        .await
        .unwrap();

    h.orchestrator.finalize_sampling(audit_id).await.unwrap();

    h.chain.advance_time(h.constants.challenge_period_secs + 1).await;

    let phase = h
        .orchestrator
        .drive_past_challenge_period(
            audit_id,
            &h.constants,
            &h.commitments,
            h.message_chain_root,
            &h.pm_inputs,
            &h.tv_inputs,
            10,
        )
        .await
        .unwrap();

    assert_eq!(phase, Phase::Finalized);
}

#[tokio::test]
async fn challenge_before_deadline_is_answered_and_finalizes() {
    let h = build_harness(10, 7).await;

    let audit_id = h
        .orchestrator
        .commit(
            "coordinator".to_string(),
            "poll-2".to_string(),
            &h.commitments,
            &h.tally,
            h.pm_batch_size,
            h.tv_batch_size,
            h.constants.coordinator_stake,
        )
        .await
        .unwrap();

    h.chain.mine_block(random_hash()).await;
    h.orchestrator.wait_until_revealable(audit_id, h.constants.block_hash_delay, 100).await.unwrap();
    h.orchestrator
        .reveal_and_submit_sampled(audit_id, &h.commitments, h.message_chain_root, &h.pm_inputs, &h.tv_inputs)
        .await
        .unwrap();
    h.orchestrator.finalize_sampling(audit_id).await.unwrap();

    let bond = h.chain.challenge_bond_amount(audit_id).await.unwrap();
    h.chain.challenge(audit_id, "challenger".to_string(), bond).await.unwrap();

    let record = h.chain.get_record(audit_id).await.unwrap();
    assert_eq!(record.phase, Phase::Challenged);

    let phase = h
        .orchestrator
        .drive_past_challenge_period(
            audit_id,
            &h.constants,
            &h.commitments,
            h.message_chain_root,
            &h.pm_inputs,
            &h.tv_inputs,
            10,
        )
        .await
        .unwrap();

    assert_eq!(phase, Phase::Finalized);
    let record = h.chain.get_record(audit_id).await.unwrap();
    assert!(record.all_pm_verified());
    assert!(record.all_tv_verified());
}

#[tokio::test]
async fn challenge_timeout_with_no_response_rejects_the_audit() {
    let h = build_harness(10, 7).await;

    let audit_id = h
        .orchestrator
        .commit(
            "coordinator".to_string(),
            "poll-3".to_string(),
            &h.commitments,
            &h.tally,
            h.pm_batch_size,
            h.tv_batch_size,
            h.constants.coordinator_stake,
        )
        .await
        .unwrap();

    h.chain.mine_block(random_hash()).await;
    h.orchestrator.wait_until_revealable(audit_id, h.constants.block_hash_delay, 100).await.unwrap();
    h.orchestrator
        .reveal_and_submit_sampled(audit_id, &h.commitments, h.message_chain_root, &h.pm_inputs, &h.tv_inputs)
        .await
        .unwrap();
    h.orchestrator.finalize_sampling(audit_id).await.unwrap();

    let bond = h.chain.challenge_bond_amount(audit_id).await.unwrap();
    h.chain.challenge(audit_id, "challenger".to_string(), bond).await.unwrap();

    h.chain.advance_time(h.constants.challenge_response_deadline_secs + 1).await;
    h.chain.claim_challenge_timeout(audit_id).await.unwrap();

    let record = h.chain.get_record(audit_id).await.unwrap();
    assert_eq!(record.phase, Phase::Rejected);
}

#[tokio::test]
async fn commit_fails_when_stake_does_not_match_the_protocol_constant() {
    let h = build_harness(6, 3).await;

    let err = h
        .orchestrator
        .commit(
            "coordinator".to_string(),
            "poll-4".to_string(),
            &h.commitments,
            &h.tally,
            h.pm_batch_size,
            h.tv_batch_size,
            h.constants.coordinator_stake + 1,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::Audit(_)));
}

#[tokio::test]
async fn wait_until_revealable_times_out_without_a_mined_block() {
    let h = build_harness(4, 2).await;

    let audit_id = h
        .orchestrator
        .commit(
            "coordinator".to_string(),
            "poll-5".to_string(),
            &h.commitments,
            &h.tally,
            h.pm_batch_size,
            h.tv_batch_size,
            h.constants.coordinator_stake,
        )
        .await
        .unwrap();

    // No block is mined past the commit block, so the delta confirmation
    // never becomes available and the bounded poll loop must give up.
    let err = h
        .orchestrator
        .wait_until_revealable(audit_id, h.constants.block_hash_delay, 3)
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::DeadlineExceeded { .. }));
}

#[tokio::test]
async fn commit_persists_commitments_file_to_the_output_directory() {
    let h = build_harness(5, 1).await;
    let output_dir = h.orchestrator.output_dir.clone();

    h.orchestrator
        .commit(
            "coordinator".to_string(),
            "poll-6".to_string(),
            &h.commitments,
            &h.tally,
            h.pm_batch_size,
            h.tv_batch_size,
            h.constants.coordinator_stake,
        )
        .await
        .unwrap();

    let file = rla_proof::files::read_commitments(&output_dir).await.unwrap();
    assert_eq!(file.yes_votes, h.tally.yes_votes);
    assert_eq!(file.no_votes, h.tally.no_votes);

    let tally_file = rla_proof::files::read_tally(&output_dir).await.unwrap();
    assert_eq!(tally_file.results.tally, vec![h.tally.no_votes, h.tally.yes_votes]);
    assert_eq!(tally_file.results.salt, h.tally.results_salt);
    assert_eq!(tally_file.total_spent_voice_credits.spent, h.tally.spent_voice_credits);
    assert_eq!(tally_file.per_vo_spent_voice_credits.tally, h.tally.per_vo_spent_voice_credits.to_vec());
}
