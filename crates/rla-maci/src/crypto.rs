//! Ballot decryption and signature verification.
//!
//! Voters encrypt their commands to the coordinator with an ephemeral X25519
//! key (ECDH shared secret, §4.1 step 3) and sign them with a separate
//! Ed25519 signing key. The real MACI circuits use a single Babyjubjub key
//! and a Poseidon-based symmetric cipher for both roles; that construction
//! is circuit-specific and out of scope (Non-goals: "full MACI circuit
//! definitions"). This module keeps the two real cryptographic operations
//! the spec calls out by name — ECDH decryption and signature
//! verification — using off-the-shelf primitives from the same dependency
//! family the coordinator's sibling crates already pull in.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use x25519_dalek::{PublicKey as XPublicKey, StaticSecret};

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("command payload malformed: {0}")]
    Malformed(String),
    #[error("signature verification failed")]
    SignatureInvalid,
}

/// A decrypted, signed vote command (§3 "PublishMessage events").
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Command {
    pub state_index: u32,
    pub new_pub_key: [u8; 32],
    pub vote_option_index: u32,
    pub new_vote_weight: u64,
    pub nonce: u64,
    pub poll_id: u64,
    pub salt: u128,
}

impl Command {
    fn to_signing_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&self.state_index.to_be_bytes());
        buf.extend_from_slice(&self.new_pub_key);
        buf.extend_from_slice(&self.vote_option_index.to_be_bytes());
        buf.extend_from_slice(&self.new_vote_weight.to_be_bytes());
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        buf.extend_from_slice(&self.poll_id.to_be_bytes());
        buf.extend_from_slice(&self.salt.to_be_bytes());
        buf
    }
}

/// A signed command plus the detached signature, as the voter submits it.
#[derive(Clone, Debug)]
pub struct SignedCommand {
    pub command: Command,
    pub signature: Signature,
}

impl SignedCommand {
    pub fn sign(command: Command, signing_key: &SigningKey) -> Self {
        let signature = signing_key.sign(&command.to_signing_bytes());
        Self {
            command,
            signature,
        }
    }

    pub fn verify(&self, verifying_key: &VerifyingKey) -> bool {
        verifying_key
            .verify(&self.command.to_signing_bytes(), &self.signature)
            .is_ok()
    }
}

/// Derives the ECDH shared key between the coordinator's static secret and a
/// message's ephemeral public key, and uses it to key a ChaCha20-Poly1305
/// AEAD cipher over the command's wire encoding.
pub fn encrypt_command(
    signed: &SignedCommand,
    ephemeral_secret: &StaticSecret,
    coordinator_pub: &XPublicKey,
) -> Vec<u8> {
    let shared = ephemeral_secret.diffie_hellman(coordinator_pub);
    let cipher = ChaCha20Poly1305::new(shared.as_bytes().into());
    let nonce = Nonce::default();
    let mut plaintext = Vec::new();
    plaintext.extend_from_slice(&bincode_command(signed));
    cipher
        .encrypt(&nonce, plaintext.as_ref())
        .expect("encryption over a fixed-size plaintext cannot fail")
}

/// Derives the shared key from the coordinator's private key and the
/// message's ephemeral public key and decrypts, without checking the
/// signature. The replay engine needs the decrypted `state_index` to look
/// up which ballot's signing key the command claims to spend *before* it
/// can verify — see [`verify`](SignedCommand::verify) for the second step.
pub fn decrypt(
    ciphertext: &[u8],
    coordinator_secret: &StaticSecret,
    ephemeral_pub: &XPublicKey,
) -> Result<SignedCommand, CryptoError> {
    let shared = coordinator_secret.diffie_hellman(ephemeral_pub);
    let cipher = ChaCha20Poly1305::new(shared.as_bytes().into());
    let nonce = Nonce::default();
    let plaintext = cipher
        .decrypt(&nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)?;

    let (command, signature) =
        unbincode_command(&plaintext).map_err(CryptoError::Malformed)?;
    Ok(SignedCommand { command, signature })
}

/// Convenience wrapper combining [`decrypt`] with a signature check against
/// an already-known verifying key. Returns `None` (caller drops the ballot
/// silently, per §4.1) on either decryption or signature failure.
pub fn decrypt_and_verify(
    ciphertext: &[u8],
    coordinator_secret: &StaticSecret,
    ephemeral_pub: &XPublicKey,
    verifying_key: &VerifyingKey,
) -> Result<Command, CryptoError> {
    let signed = decrypt(ciphertext, coordinator_secret, ephemeral_pub)?;
    if !signed.verify(verifying_key) {
        return Err(CryptoError::SignatureInvalid);
    }
    Ok(signed.command)
}

fn bincode_command(signed: &SignedCommand) -> Vec<u8> {
    let payload = serde_json::to_vec(&signed.command).expect("Command serializes");
    let mut out = Vec::with_capacity(payload.len() + 64 + 8);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&signed.signature.to_bytes());
    out
}

fn unbincode_command(bytes: &[u8]) -> Result<(Command, Signature), String> {
    if bytes.len() < 4 {
        return Err("truncated payload".to_string());
    }
    let len = u32::from_be_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let payload_start = 4;
    let payload_end = payload_start + len;
    if bytes.len() < payload_end + 64 {
        return Err("truncated payload".to_string());
    }
    let command: Command = serde_json::from_slice(&bytes[payload_start..payload_end])
        .map_err(|e| e.to_string())?;
    let sig_bytes: [u8; 64] = bytes[payload_end..payload_end + 64]
        .try_into()
        .map_err(|_| "bad signature length".to_string())?;
    let signature = Signature::from_bytes(&sig_bytes);
    Ok((command, signature))
}
