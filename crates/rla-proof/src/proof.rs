//! Groth16 proof wire form (§4.3).
//!
//! The on-chain pairing library expects a fixed 8-field-element tuple with
//! the two coordinates of `B[0]` and `B[1]` swapped relative to the natural
//! `(x, y)` ordering. `toWire`/`fromWire` perform that swap exactly once in
//! each direction so the transformation is its own inverse when composed.

use rla_field::FieldElement;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProofError {
    #[error("malformed proof wire tuple: expected 8 elements, got {0}")]
    BadWireLength(usize),
}

/// A single affine point on the curve, `(x, y)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinePoint {
    pub x: FieldElement,
    pub y: FieldElement,
}

/// A point in the quadratic extension field, as the two `Fp` coordinates
/// `[c0, c1]` the pairing library represents `B` with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionPoint {
    pub c0: FieldElement,
    pub c1: FieldElement,
}

/// A Groth16 proof `(A, B, C)` in its natural (non-wire) representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub a: AffinePoint,
    pub b: [ExtensionPoint; 2],
    pub c: AffinePoint,
}

/// The fixed 8-field-element wire form of a proof.
pub type ProofWire = [FieldElement; 8];

impl Proof {
    /// `[A.x, A.y, B[0][1], B[0][0], B[1][1], B[1][0], C.x, C.y]` — note the
    /// `c1`-before-`c0` ordering within each `B` coordinate.
    pub fn to_wire(&self) -> ProofWire {
        [
            self.a.x,
            self.a.y,
            self.b[0].c1,
            self.b[0].c0,
            self.b[1].c1,
            self.b[1].c0,
            self.c.x,
            self.c.y,
        ]
    }

    pub fn from_wire(wire: &ProofWire) -> Self {
        Proof {
            a: AffinePoint {
                x: wire[0],
                y: wire[1],
            },
            b: [
                ExtensionPoint {
                    c1: wire[2],
                    c0: wire[3],
                },
                ExtensionPoint {
                    c1: wire[4],
                    c0: wire[5],
                },
            ],
            c: AffinePoint {
                x: wire[6],
                y: wire[7],
            },
        }
    }

    /// Same as [`from_wire`](Self::from_wire) but accepts a slice, the shape
    /// proof files deserialize into before a fixed-size array conversion.
    pub fn from_wire_slice(wire: &[FieldElement]) -> Result<Self, ProofError> {
        let array: ProofWire = wire
            .try_into()
            .map_err(|_| ProofError::BadWireLength(wire.len()))?;
        Ok(Self::from_wire(&array))
    }
}
