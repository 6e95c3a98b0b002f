//! Field element type shared by the commitment chains and the proof wire format.
//!
//! All commitments and proof coordinates are elements of the 254-bit BN254
//! scalar field — the pairing-friendly curve the Groth16 circuits are defined
//! over. Values are carried as unsigned 256-bit integers and compared modulo
//! the field order, the same convention `prover-worker::prover` uses when it
//! reduces hex witness values mod the BN254 Fr modulus before handing them to
//! the circuit.

use std::fmt;

use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// BN254 scalar field modulus (Fr), decimal.
pub const BN254_FR_MODULUS: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("invalid decimal field element: {0}")]
    InvalidDecimal(String),
    #[error("invalid hex field element: {0}")]
    InvalidHex(String),
    #[error("expected 32 bytes, got {0}")]
    BadLength(usize),
}

/// An element of the BN254 scalar field, reduced modulo the field order.
///
/// Equality and ordering are defined on the canonical (reduced) residue, so
/// two `FieldElement`s built from different representations of the same
/// residue compare equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldElement(ark_bn254::Fr);

impl FieldElement {
    /// The additive identity.
    pub fn zero() -> Self {
        FieldElement(ark_bn254::Fr::from(0u64))
    }

    pub fn is_zero(&self) -> bool {
        *self == FieldElement::zero()
    }

    /// Parses a decimal string (the format circuit-input / commitment files use).
    pub fn from_decimal(s: &str) -> Result<Self, FieldError> {
        let s = s.trim();
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(FieldError::InvalidDecimal(s.to_string()));
        }
        let big = BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or_else(|| FieldError::InvalidDecimal(s.to_string()))?;
        Ok(Self::from_biguint(&big))
    }

    pub fn to_decimal(&self) -> String {
        self.to_biguint().to_str_radix(10)
    }

    /// Parses a hex string (with or without `0x`), reducing modulo the field
    /// order the way `prover-worker`'s `hex_to_decimal_field` does for Noir
    /// witness values.
    pub fn from_hex(s: &str) -> Result<Self, FieldError> {
        let hex_str = s.strip_prefix("0x").unwrap_or(s);
        let bytes =
            hex::decode(hex_str).map_err(|e| FieldError::InvalidHex(format!("{s}: {e}")))?;
        Ok(Self::from_biguint(&BigUint::from_bytes_be(&bytes)))
    }

    pub fn from_bytes_be(bytes: &[u8; 32]) -> Self {
        Self::from_biguint(&BigUint::from_bytes_be(bytes))
    }

    /// 32-byte big-endian encoding — the on-chain wire encoding for a `u256`.
    pub fn to_bytes_be(&self) -> [u8; 32] {
        let be = self.0.into_bigint().to_bytes_be();
        let mut out = [0u8; 32];
        let start = 32 - be.len();
        out[start..].copy_from_slice(&be);
        out
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes_be()))
    }

    fn from_biguint(big: &BigUint) -> Self {
        let modulus = BigUint::parse_bytes(BN254_FR_MODULUS.as_bytes(), 10)
            .expect("BN254_FR_MODULUS is a valid constant");
        let reduced = big % modulus;
        let mut be = reduced.to_bytes_be();
        if be.len() < 32 {
            let mut padded = vec![0u8; 32 - be.len()];
            padded.extend_from_slice(&be);
            be = padded;
        }
        FieldElement(ark_bn254::Fr::from_be_bytes_mod_order(&be))
    }

    fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0.into_bigint().to_bytes_be())
    }

    /// Builds a domain-separated digest `sha256(tag || counter_be || seed)`,
    /// used by the sampler's counter-PRNG (§4.5) and folded into a
    /// `FieldElement` via modular reduction so the result is a valid field
    /// coordinate wherever one is needed.
    pub fn domain_hash(seed: &[u8], tag: &[u8], counter: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(tag);
        hasher.update(counter.to_be_bytes());
        hasher.update(seed);
        let digest = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self::from_bytes_be(&bytes)
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_decimal())
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        FieldElement::from_decimal(&s).map_err(serde::de::Error::custom)
    }
}

/// Hashes an arbitrary byte digest (e.g. a sha256 of a larger message) into a
/// field element via reduction modulo the BN254 scalar field order, the same
/// reduction `hex_to_decimal_field` applies to 32-byte witness values.
pub fn bytes_to_field(bytes: &[u8]) -> FieldElement {
    FieldElement::from_biguint(&BigUint::from_bytes_be(bytes))
}
