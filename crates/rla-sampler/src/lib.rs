//! Deterministic sampled-batch selection (component E, §4.5).
//!
//! Given the block hash committed to at commit time, derives how many PM
//! and TV batches must be proved and which ones, using a counter-PRNG seeded
//! by that hash so any two runs over the same inputs agree bit-for-bit.

use std::collections::BTreeSet;

use rla_field::FieldElement;
use thiserror::Error;
use tracing::debug;

/// Risk-limit confidence constant, expressed as parts-per-thousand
/// (`CONFIDENCE_X1000`, §6). `2996` corresponds to a risk limit of
/// roughly `e^{-2996/1000} ≈ 5%`.
pub const DEFAULT_CONFIDENCE_X1000: u64 = 2996;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SamplerError {
    #[error("no votes were cast, audit cannot proceed")]
    NoVotes,
}

/// Selected batch indices for one side of the audit, 1-based, sorted
/// ascending, with no duplicates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleSelection {
    pub pm_indices: Vec<u64>,
    pub tv_indices: Vec<u64>,
}

fn div_ceil(numerator: u64, denominator: u64) -> u64 {
    (numerator + denominator - 1) / denominator
}

/// Computes `(pmSamples, tvSamples)` per the §4.5 sample-count rule.
pub fn sample_counts(
    confidence_x1000: u64,
    pm_batch_count: u64,
    tv_batch_count: u64,
    yes_votes: u128,
    no_votes: u128,
    tv_batch_size: u64,
) -> Result<(u64, u64), SamplerError> {
    let total_votes = yes_votes + no_votes;
    if total_votes == 0 {
        return Err(SamplerError::NoVotes);
    }

    let margin = yes_votes.abs_diff(no_votes);
    if margin == 0 {
        return Ok((pm_batch_count, tv_batch_count));
    }

    let pm_samples = pm_batch_count;

    if tv_batch_count == 0 {
        return Ok((pm_samples, 0));
    }

    let votes_to_flip = (margin / 2) + 1;
    let tv_corrupt = div_ceil(votes_to_flip as u64, tv_batch_size.max(1)).min(tv_batch_count).max(1);
    let raw = div_ceil(confidence_x1000 * tv_batch_count, tv_corrupt * 1000);
    let cap = tv_batch_count.saturating_sub(1).max(1);
    let tv_samples = raw.min(cap);

    Ok((pm_samples, tv_samples))
}

/// Runs the counter-PRNG of §4.5: successive `domain_hash(H, tag, counter)`
/// values, reduced into `[1, count]`, re-hashing on collision until
/// `needed` distinct indices are drawn.
fn select_indices(seed: &[u8], tag: &[u8], count: u64, needed: u64) -> Vec<u64> {
    if count == 0 || needed == 0 {
        return Vec::new();
    }
    let needed = needed.min(count);

    let mut chosen = BTreeSet::new();
    let mut counter = 0u64;
    while (chosen.len() as u64) < needed {
        let digest = FieldElement::domain_hash(seed, tag, counter);
        let bytes = digest.to_bytes_be();
        let tail = u64::from_be_bytes(bytes[24..32].try_into().unwrap());
        let index = 1 + (tail % count);
        if !chosen.insert(index) {
            debug!(counter, index, "sampler hash collision, re-hashing");
        }
        counter += 1;
    }
    chosen.into_iter().collect()
}

/// Implements the full §4.5 contract: `sample(H, C1000, pmBatchCount,
/// tvBatchCount, yes, no, pmBatchSize, tvBatchSize) → (pmIndices, tvIndices)`.
#[allow(clippy::too_many_arguments)]
pub fn sample(
    block_hash: &[u8],
    confidence_x1000: u64,
    pm_batch_count: u64,
    tv_batch_count: u64,
    yes_votes: u128,
    no_votes: u128,
    tv_batch_size: u64,
) -> Result<SampleSelection, SamplerError> {
    let (pm_samples, tv_samples) = sample_counts(
        confidence_x1000,
        pm_batch_count,
        tv_batch_count,
        yes_votes,
        no_votes,
        tv_batch_size,
    )?;

    Ok(SampleSelection {
        pm_indices: select_indices(block_hash, b"pm", pm_batch_count, pm_samples),
        tv_indices: select_indices(block_hash, b"tv", tv_batch_count, tv_samples),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_votes_halts_the_sampler() {
        let err = sample_counts(DEFAULT_CONFIDENCE_X1000, 2, 6, 0, 0, 5).unwrap_err();
        assert_eq!(err, SamplerError::NoVotes);
    }

    #[test]
    fn zero_margin_samples_every_batch() {
        let (pm, tv) = sample_counts(DEFAULT_CONFIDENCE_X1000, 2, 6, 5, 5, 5).unwrap();
        assert_eq!(pm, 2);
        assert_eq!(tv, 6);
    }

    #[test]
    fn s1_scenario_sample_counts_match_spec_example() {
        // 10 voters, yes=7, no=3, pmBatchCount=2, tvBatchCount=6, tvBatchSize=2:
        // votesToFlip=3, tvCorrupt=ceil(3/2)=2, tvSamples=ceil(2996*6/2000)=9, capped at 5.
        let (pm, tv) = sample_counts(DEFAULT_CONFIDENCE_X1000, 2, 6, 7, 3, 2).unwrap();
        assert_eq!(pm, 2);
        assert_eq!(tv, 5);
    }

    #[test]
    fn pm_sample_count_is_always_full_batch_count() {
        let (pm, _) = sample_counts(DEFAULT_CONFIDENCE_X1000, 9, 6, 7, 3, 5).unwrap();
        assert_eq!(pm, 9);
    }

    #[test]
    fn sampler_is_deterministic_given_identical_inputs() {
        let seed = [0xab; 32];
        let a = sample(&seed, DEFAULT_CONFIDENCE_X1000, 2, 6, 7, 3, 5).unwrap();
        let b = sample(&seed, DEFAULT_CONFIDENCE_X1000, 2, 6, 7, 3, 5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn selected_indices_are_sorted_distinct_and_in_range() {
        let seed = [0x42; 32];
        let selection = sample(&seed, DEFAULT_CONFIDENCE_X1000, 2, 6, 7, 3, 5).unwrap();

        let mut sorted_pm = selection.pm_indices.clone();
        sorted_pm.sort_unstable();
        assert_eq!(sorted_pm, selection.pm_indices);
        assert!(selection.pm_indices.iter().all(|&i| (1..=2).contains(&i)));

        let mut sorted_tv = selection.tv_indices.clone();
        sorted_tv.sort_unstable();
        assert_eq!(sorted_tv, selection.tv_indices);
        assert!(selection.tv_indices.iter().all(|&i| (1..=6).contains(&i)));

        let unique_tv: BTreeSet<_> = selection.tv_indices.iter().collect();
        assert_eq!(unique_tv.len(), selection.tv_indices.len());
    }

    #[test]
    fn different_seeds_usually_produce_different_samples() {
        let a = sample(&[1u8; 32], DEFAULT_CONFIDENCE_X1000, 2, 6, 7, 3, 5).unwrap();
        let b = sample(&[2u8; 32], DEFAULT_CONFIDENCE_X1000, 2, 6, 7, 3, 5).unwrap();
        assert_ne!(a.tv_indices, b.tv_indices);
    }
}
