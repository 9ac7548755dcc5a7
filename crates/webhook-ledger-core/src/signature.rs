//! # Signature Verification
//!
//! Validates that a webhook payload was produced by the holder of a shared
//! secret, using the `X-Hub-Signature-256` scheme:
//! `sha256=` followed by the lowercase hex HMAC-SHA256 of the raw body.
//!
//! The HMAC input is always the raw request body exactly as received. Parsing
//! and re-encoding the JSON would change its byte layout and break
//! verification.
//!
//! When no secret is configured verification is skipped and every request is
//! treated as trusted. This is a permissive posture intended for local
//! development; the service warns about it at startup.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, instrument, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Prefix of every signature header value
pub const SIGNATURE_PREFIX: &str = "sha256=";

// ============================================================================
// WebhookSecret
// ============================================================================

/// Shared secret used to key webhook signatures
///
/// The bytes are zeroized when the secret is dropped and never appear in
/// `Debug` or serialized output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct WebhookSecret(Vec<u8>);

impl WebhookSecret {
    /// Create a secret from raw bytes or a string
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self(value.into())
    }

    /// Get secret bytes (only for immediate use)
    pub fn expose_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check if secret is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get secret length without exposing content
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSecret")
            .field("length", &self.len())
            .field("value", &"<REDACTED>")
            .finish()
    }
}

impl Serialize for WebhookSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("<REDACTED>")
    }
}

impl<'de> Deserialize<'de> for WebhookSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

// ============================================================================
// Verification
// ============================================================================

/// Successful verification outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// No secret is configured; the request is trusted without checking
    Skipped,

    /// The presented signature matched the expected digest
    Verified,
}

/// Reasons a webhook is rejected during signature verification
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// A secret is configured but the request carried no signature header
    #[error("Signature missing")]
    Missing,

    /// The presented signature does not match the expected digest
    #[error("Invalid signature")]
    Mismatch,

    /// The `hmac` key constructor rejected the secret
    ///
    /// HMAC accepts keys of any length, so current `hmac` releases never
    /// return this. Mapped to a 500, never a 403.
    #[error("Webhook secret cannot be used as an HMAC key")]
    InvalidKey,
}

impl SignatureError {
    /// True when the request itself is at fault (as opposed to configuration)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Missing | Self::Mismatch)
    }
}

/// Compute the signature header value for `body` under `secret`
///
/// # Errors
///
/// Returns [`SignatureError::InvalidKey`] if the secret cannot be used as an
/// HMAC key.
pub fn sign(secret: &WebhookSecret, body: &[u8]) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_bytes())
        .map_err(|_| SignatureError::InvalidKey)?;
    mac.update(body);
    Ok(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Verify a webhook signature against the raw request body
///
/// - No secret: [`Verification::Skipped`].
/// - Secret but no header: [`SignatureError::Missing`].
/// - Otherwise the header must equal `sha256=<hex digest>` exactly; the
///   comparison runs in constant time.
#[instrument(skip_all, fields(body_len = raw_body.len(), has_signature = signature_header.is_some()))]
pub fn verify(
    secret: Option<&WebhookSecret>,
    raw_body: &[u8],
    signature_header: Option<&str>,
) -> Result<Verification, SignatureError> {
    let Some(secret) = secret else {
        debug!("Signature verification skipped - no webhook secret configured");
        return Ok(Verification::Skipped);
    };

    let Some(presented) = signature_header else {
        warn!("Webhook received without signature. Rejecting.");
        return Err(SignatureError::Missing);
    };

    let expected = sign(secret, raw_body)?;

    if bool::from(expected.as_bytes().ct_eq(presented.as_bytes())) {
        debug!("Webhook signature verified successfully");
        Ok(Verification::Verified)
    } else {
        warn!("Webhook signature mismatch. Rejecting.");
        Err(SignatureError::Mismatch)
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
