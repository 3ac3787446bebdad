//! Stripe webhook signature verification.
//!
//! Each account verifies inbound events with its own signing secret. There is
//! no cross-account attempt: the caller picks the verifier by endpoint.
//!
//! # Security
//!
//! - HMAC-SHA256 over `"{timestamp}.{payload}"` with constant-time comparison
//! - Timestamp validation (5-minute window) for replay attack prevention
//! - Secrets handled via `secrecy::SecretString`

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::domain::billing::{PaymentError, StripeAccount};
use crate::ports::WebhookEvent;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age for webhook events (5 minutes).
pub const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps (60 seconds).
pub const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

// ════════════════════════════════════════════════════════════════════════════════
// Signature Parsing
// ════════════════════════════════════════════════════════════════════════════════

/// Error parsing the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureParseError {
    #[error("Missing Stripe-Signature header")]
    MissingHeader,
    #[error("Missing timestamp (t=) in signature")]
    MissingTimestamp,
    #[error("Missing v1 signature in header")]
    MissingV1Signature,
    #[error("Invalid timestamp format")]
    InvalidTimestamp,
    #[error("Invalid signature format (not valid hex)")]
    InvalidSignatureFormat,
}

/// Parsed Stripe-Signature header components.
///
/// The header format is `t=timestamp,v1=signature[,v1=signature...]`. Stripe
/// sends more than one `v1` while a signing secret is being rolled.
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    /// Unix timestamp when Stripe generated the event.
    pub timestamp: i64,

    /// Candidate v1 signatures (HMAC-SHA256, hex-decoded).
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureParseError> {
        if header.trim().is_empty() {
            return Err(SignatureParseError::MissingHeader);
        }

        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };

            match key.trim() {
                "t" => {
                    timestamp = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|_| SignatureParseError::InvalidTimestamp)?,
                    );
                }
                "v1" => {
                    let bytes = hex::decode(value.trim())
                        .map_err(|_| SignatureParseError::InvalidSignatureFormat)?;
                    v1_signatures.push(bytes);
                }
                // v0 and unknown schemes are ignored
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureParseError::MissingTimestamp)?;
        if v1_signatures.is_empty() {
            return Err(SignatureParseError::MissingV1Signature);
        }

        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

/// Computes the hex `v1` signature Stripe would send for this payload.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, PaymentError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::invalid_webhook(format!("Invalid signing secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Builds a complete `Stripe-Signature` header value.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, PaymentError> {
    Ok(format!("t={},v1={}", timestamp, compute_signature(secret, timestamp, payload)?))
}

// ════════════════════════════════════════════════════════════════════════════════
// Verification
// ════════════════════════════════════════════════════════════════════════════════

/// Verifies and decodes webhooks for one account.
#[derive(Clone)]
pub struct WebhookVerifier {
    account: StripeAccount,
    secret: SecretString,
    require_livemode: bool,
}

impl WebhookVerifier {
    pub fn new(account: StripeAccount, secret: SecretString) -> Self {
        Self {
            account,
            secret,
            require_livemode: false,
        }
    }

    /// Reject test mode events.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }

    pub fn verify(&self, payload: &[u8], header: &str) -> Result<WebhookEvent, PaymentError> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    /// Verifies against an explicit clock reading.
    pub fn verify_at(
        &self,
        payload: &[u8],
        header: &str,
        now: i64,
    ) -> Result<WebhookEvent, PaymentError> {
        if self.secret.expose_secret().is_empty() {
            return Err(PaymentError::invalid_webhook("No webhook secret configured"));
        }

        let header = SignatureHeader::parse(header)
            .map_err(|e| PaymentError::invalid_webhook(e.to_string()))?;

        let age = now
            .checked_sub(header.timestamp)
            .ok_or_else(|| PaymentError::invalid_webhook("Invalid timestamp"))?;
        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(
                account = %self.account,
                event_timestamp = header.timestamp,
                age_secs = age,
                "Webhook event too old - possible replay attack"
            );
            return Err(PaymentError::invalid_webhook(format!(
                "Event too old ({} seconds)",
                age
            )));
        }
        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(
                account = %self.account,
                event_timestamp = header.timestamp,
                "Webhook event from future - clock skew or manipulation"
            );
            return Err(PaymentError::invalid_webhook("Event timestamp in future"));
        }

        let expected = hex::decode(compute_signature(
            self.secret.expose_secret(),
            header.timestamp,
            payload,
        )?)
        .map_err(|e| PaymentError::invalid_webhook(e.to_string()))?;

        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| expected.as_slice().ct_eq(candidate.as_slice()).unwrap_u8() == 1);
        if !matched {
            tracing::warn!(account = %self.account, "Invalid webhook signature");
            return Err(PaymentError::invalid_webhook("Invalid signature"));
        }

        let event: WebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(account = %self.account, error = %e, "Failed to parse webhook payload");
            PaymentError::invalid_webhook(format!("Invalid JSON: {}", e))
        })?;

        if self.require_livemode && !event.livemode {
            tracing::warn!(
                account = %self.account,
                event_id = %event.id,
                "Rejected test mode event"
            );
            return Err(PaymentError::invalid_webhook(
                "Test mode events not allowed",
            ));
        }

        Ok(event)
    }
}
