//! Opaque token material shared by the store implementations and the gate.
//!
//! Tokens are 32 random bytes, base64url without padding. Raw tokens are
//! only ever handed to the client; the store keeps a SHA-256 hash, so a
//! database leak does not leak usable credentials.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

pub const TOKEN_BYTES: usize = 32;

/// Generate a new opaque token (session or reset).
pub fn generate_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate token")?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a token for storage and lookup.
#[must_use]
pub fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Check that a presented token has the shape this service issues. Anything
/// else is rejected before the store is consulted.
#[must_use]
pub fn well_formed(token: &str) -> bool {
    URL_SAFE_NO_PAD
        .decode(token.as_bytes())
        .is_ok_and(|bytes| bytes.len() == TOKEN_BYTES)
}
