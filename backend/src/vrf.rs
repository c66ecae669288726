//! Deterministic randomness computation for the in-process oracle.
//!
//! Uses HMAC-SHA256 keyed by the oracle's secret to produce a 32-byte
//! pseudo-random output that is deterministic (same inputs = same output)
//! but unpredictable without the secret key.

use atla_nft::{RandomValue, RandomnessRequested};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the 256-bit random value answering `request`.
///
/// ```text
/// output = HMAC-SHA256(secret, request_id_le || requester || created_at_le)
/// ```
///
/// `request_id` ensures uniqueness across requests and `created_at` binds
/// the output to the commit at which the request was recorded.
pub fn compute_randomness(hmac_secret: &[u8], request: &RandomnessRequested) -> RandomValue {
    let mut mac =
        HmacSha256::new_from_slice(hmac_secret).expect("HMAC accepts keys of any size");

    mac.update(&request.request_id.get().to_le_bytes());
    mac.update(request.requester.as_str().as_bytes());
    mac.update(&request.created_at.to_le_bytes());

    let bytes = mac.finalize().into_bytes();

    let mut output = [0u8; 32];
    output.copy_from_slice(&bytes);
    RandomValue::from_bytes(output)
}
