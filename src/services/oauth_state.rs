// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed OAuth `state` values.
//!
//! Format before encoding: `payload|timestamp_hex|signature_hex`, where the
//! signature is HMAC-SHA256 over `payload|timestamp_hex`. The whole string is
//! URL-safe base64 without padding.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a state value stays valid.
pub const MAX_STATE_AGE: Duration = Duration::from_secs(15 * 60);

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

fn signature(payload: &str, key: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(payload.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Sign `payload` with the current time.
pub fn sign(payload: &str, key: &[u8]) -> anyhow::Result<String> {
    sign_at(payload, key, now_millis())
}

/// Sign `payload` as if issued at `issued_at_ms`.
pub fn sign_at(payload: &str, key: &[u8], issued_at_ms: u128) -> anyhow::Result<String> {
    let signed_part = format!("{}|{:x}", payload, issued_at_ms);
    let sig = signature(&signed_part, key)
        .ok_or_else(|| anyhow::anyhow!("HMAC init failed"))?;
    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", signed_part, sig)))
}

/// Verify a state value and return its payload.
///
/// Returns `None` for malformed, tampered or expired values.
pub fn verify(state: &str, key: &[u8]) -> Option<String> {
    verify_at(state, key, now_millis())
}

pub fn verify_at(state: &str, key: &[u8], now_ms: u128) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let decoded = String::from_utf8(bytes).ok()?;

    // Split from the right so the payload itself may contain '|'.
    let mut parts = decoded.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let payload = parts.next()?;

    let expected = signature(&format!("{}|{}", payload, timestamp_hex), key)?;
    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_at = u128::from_str_radix(timestamp_hex, 16).ok()?;
    if now_ms.saturating_sub(issued_at) > MAX_STATE_AGE.as_millis() {
        tracing::warn!("OAuth state expired");
        return None;
    }

    Some(payload.to_string())
}
