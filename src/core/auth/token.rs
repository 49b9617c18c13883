//! Unverified token payload decoding.
//!
//! The expiry read here only drives proactive UX (warnings, early logout).
//! Signatures are never checked on the client; the backend must verify every
//! authenticated request on its own.

use crate::domain::error::{WalletGuardError, WalletGuardResult};
use base64::{
    engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD},
    Engine as _,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Claims the client cares about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Expiration, seconds since the Unix epoch
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

// 2038-01-19, representable on every platform clock
const FAR_FUTURE_SECS: u64 = i32::MAX as u64;

impl TokenClaims {
    /// Expiration as a wall-clock instant
    ///
    /// An `exp` past what the platform clock can represent saturates to a
    /// far-future instant.
    pub fn expires_at(&self) -> SystemTime {
        if self.exp <= 0 {
            return UNIX_EPOCH;
        }
        UNIX_EPOCH
            .checked_add(Duration::from_secs(self.exp as u64))
            .or_else(|| UNIX_EPOCH.checked_add(Duration::from_secs(FAR_FUTURE_SECS)))
            .unwrap_or(UNIX_EPOCH)
    }

    /// Time left before expiry, `None` once expired
    pub fn time_left(&self, now: SystemTime) -> Option<Duration> {
        match self.expires_at().duration_since(now) {
            Ok(left) if !left.is_zero() => Some(left),
            _ => None,
        }
    }

    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.time_left(now).is_none()
    }
}

/// Decode the payload segment of a `header.payload.signature` token
pub fn decode_claims(token: &str) -> WalletGuardResult<TokenClaims> {
    let mut parts = token.trim().split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(_), None) if !header.is_empty() && !payload.is_empty() => {
            payload
        }
        _ => {
            return Err(WalletGuardError::InvalidToken(
                "expected three dot-separated segments".to_string(),
            ))
        }
    };

    let bytes = if payload.ends_with('=') {
        URL_SAFE.decode(payload)
    } else {
        URL_SAFE_NO_PAD.decode(payload)
    }
    .map_err(|e| WalletGuardError::InvalidToken(format!("payload is not base64url: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| WalletGuardError::InvalidToken(format!("payload is not valid claims JSON: {}", e)))
}

/// Build an unsigned token carrying the given claims
///
/// Used by the simulator and tests; the signature segment is a fixed
/// placeholder.
pub fn encode_unsigned(claims: &TokenClaims) -> WalletGuardResult<String> {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    Ok(format!("{}.{}.unsigned", header, payload))
}
