//! Token Minting
//!
//! Access tokens come in two shapes: opaque `tk_` strings issued by the
//! store-backed provider and base64 JSON envelopes issued by the mock
//! provider. Both are unique per call and carry their own expiry.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::error::{PaymentError, Result};
use crate::model::PaymentToken;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Random lowercase base36 string
pub fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

/// Random lowercase hex string
pub fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len.div_ceil(2)];
    rand::thread_rng().fill(bytes.as_mut_slice());
    let mut encoded = hex::encode(bytes);
    encoded.truncate(len);
    encoded
}

/// `issued_at + ttl`, failing when the sum leaves chrono's date range
pub fn expiry_after(issued_at: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>> {
    issued_at
        .checked_add_signed(ttl)
        .ok_or_else(|| PaymentError::ExpiryOverflow(format!("{issued_at} + {ttl}")))
}

impl PaymentToken {
    /// Mint an opaque token: `tk_<millis>_<16 base36 chars>`
    pub fn opaque(
        resource_id: &str,
        user_id: Option<&str>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self> {
        let expires_at = expiry_after(issued_at, ttl)?;
        Ok(Self {
            token: format!("tk_{}_{}", issued_at.timestamp_millis(), random_base36(16)),
            resource_id: resource_id.to_string(),
            user_id: user_id.map(str::to_string),
            issued_at,
            expires_at,
        })
    }

    /// Mint a self-describing token: base64 of a small JSON envelope
    pub fn encoded(
        resource_id: &str,
        user_id: Option<&str>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self> {
        let expires_at = expiry_after(issued_at, ttl)?;
        let envelope = serde_json::json!({
            "resourceId": resource_id,
            "userId": user_id,
            "timestamp": issued_at.timestamp_millis(),
            "random": random_base36(9),
        });

        Ok(Self {
            token: STANDARD.encode(envelope.to_string()),
            resource_id: resource_id.to_string(),
            user_id: user_id.map(str::to_string),
            issued_at,
            expires_at,
        })
    }
}
