//! Public-signals binding (§4.3 "Public-signals binding").
//!
//! The marshaller assembles the public inputs a verifier checks a proof
//! against from the audit record's committed claim, never from the proof
//! file itself — otherwise a proof could bind itself to different
//! commitments than the ones on chain.

use rla_field::FieldElement;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("batch index {index} out of range for {count} commitments")]
    BatchIndexOutOfRange { index: usize, count: usize },
}

/// Public inputs a process-messages proof for batch `k` (1-based) is bound
/// to: the commitment transition plus the circuit-specific batch index and
/// chain-of-hashes root of the encrypted message block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PmPublicSignals {
    pub current_commitment: FieldElement,
    pub new_commitment: FieldElement,
    pub batch_index: u64,
    pub message_chain_root: FieldElement,
}

impl PmPublicSignals {
    pub fn to_field_vec(&self) -> Vec<FieldElement> {
        vec![
            self.current_commitment,
            self.new_commitment,
            FieldElement::from_decimal(&self.batch_index.to_string()).expect("u64 is valid decimal"),
            self.message_chain_root,
        ]
    }
}

/// Public inputs a tally-votes proof for batch `k` (1-based) is bound to:
/// the commitment transition, the batch index, and the tally's tree
/// depths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TvPublicSignals {
    pub current_commitment: FieldElement,
    pub new_commitment: FieldElement,
    pub batch_index: u64,
    pub int_state_tree_depth: u32,
    pub vote_option_tree_depth: u32,
}

impl TvPublicSignals {
    pub fn to_field_vec(&self) -> Vec<FieldElement> {
        vec![
            self.current_commitment,
            self.new_commitment,
            FieldElement::from_decimal(&self.batch_index.to_string()).expect("u64 is valid decimal"),
            FieldElement::from_decimal(&self.int_state_tree_depth.to_string())
                .expect("u32 is valid decimal"),
            FieldElement::from_decimal(&self.vote_option_tree_depth.to_string())
                .expect("u32 is valid decimal"),
        ]
    }
}

/// Binds the `(currentCommitment, newCommitment)` pair for 1-based PM batch
/// `batch_index` out of the committed `pmCommitments` chain.
pub fn bind_pm_public_signals(
    pm_commitments: &[FieldElement],
    batch_index: usize,
    message_chain_root: FieldElement,
) -> Result<PmPublicSignals, BindingError> {
    if batch_index == 0 || batch_index >= pm_commitments.len() {
        return Err(BindingError::BatchIndexOutOfRange {
            index: batch_index,
            count: pm_commitments.len(),
        });
    }
    Ok(PmPublicSignals {
        current_commitment: pm_commitments[batch_index - 1],
        new_commitment: pm_commitments[batch_index],
        batch_index: batch_index as u64,
        message_chain_root,
    })
}

pub fn bind_tv_public_signals(
    tv_commitments: &[FieldElement],
    batch_index: usize,
    int_state_tree_depth: u32,
    vote_option_tree_depth: u32,
) -> Result<TvPublicSignals, BindingError> {
    if batch_index == 0 || batch_index >= tv_commitments.len() {
        return Err(BindingError::BatchIndexOutOfRange {
            index: batch_index,
            count: tv_commitments.len(),
        });
    }
    Ok(TvPublicSignals {
        current_commitment: tv_commitments[batch_index - 1],
        new_commitment: tv_commitments[batch_index],
        batch_index: batch_index as u64,
        int_state_tree_depth,
        vote_option_tree_depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(n: u64) -> FieldElement {
        FieldElement::from_decimal(&n.to_string()).unwrap()
    }

    #[test]
    fn binds_consecutive_commitment_pair() {
        let chain = vec![field(1), field(2), field(3)];
        let bound = bind_pm_public_signals(&chain, 2, field(0)).unwrap();
        assert_eq!(bound.current_commitment, field(1));
        assert_eq!(bound.new_commitment, field(2));
        assert_eq!(bound.batch_index, 2);
    }

    #[test]
    fn rejects_batch_index_zero() {
        let chain = vec![field(1), field(2)];
        assert!(matches!(
            bind_pm_public_signals(&chain, 0, field(0)),
            Err(BindingError::BatchIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_batch_index_past_chain_end() {
        let chain = vec![field(1), field(2)];
        assert!(matches!(
            bind_tv_public_signals(&chain, 2, 1, 2),
            Err(BindingError::BatchIndexOutOfRange { .. })
        ));
    }
}
