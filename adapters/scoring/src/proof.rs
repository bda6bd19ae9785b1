//! Keyed hash binding a submitted result to the run that issued the nonce.

use std::fmt::Write as _;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::ScoringError;

type HmacSha256 = Hmac<Sha256>;

/// Message signed for a result: `"{score}:{wave}:{duration_ms}"`.
#[must_use]
pub fn proof_message(score: u32, wave: u32, duration_ms: u64) -> String {
    format!("{score}:{wave}:{duration_ms}")
}

/// Lowercase hex HMAC-SHA256 of the result message keyed by `nonce`.
pub fn compute_proof(
    nonce: &str,
    score: u32,
    wave: u32,
    duration_ms: u64,
) -> Result<String, ScoringError> {
    let mut mac =
        HmacSha256::new_from_slice(nonce.as_bytes()).map_err(|_| ScoringError::InvalidKey)?;
    mac.update(proof_message(score, wave, duration_ms).as_bytes());
    let digest = mac.finalize().into_bytes();

    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    Ok(hex)
}
