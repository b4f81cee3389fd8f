//! Slack request signing (v0 scheme).
//!
//! The base string is `v0:{timestamp}:{body}`; Slack sends
//! `v0=<hex(HMAC-SHA256(signing_secret, base_string))>` in `X-Slack-Signature`.
//! Requests whose timestamp is more than five minutes away from now are
//! rejected before the digest is checked.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

const SIGNATURE_VERSION: &str = "v0";
const MAX_TIMESTAMP_SKEW_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectionClass {
    BadRequest,
    Unauthorized,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing `{0}` header")]
    MissingHeader(&'static str),
    #[error("request timestamp `{0}` is not a unix timestamp")]
    MalformedTimestamp(String),
    #[error("request timestamp is {skew_secs}s away from server time")]
    ExpiredTimestamp { skew_secs: i64 },
    #[error("signature is not in `v0=<hex>` form")]
    MalformedSignature,
    #[error("signature does not match request body")]
    Mismatch,
}

impl SignatureError {
    /// Header and clock problems are the caller's request being malformed;
    /// anything about the digest itself is an authentication failure.
    pub fn rejection_class(&self) -> RejectionClass {
        match self {
            Self::MissingHeader(_)
            | Self::MalformedTimestamp(_)
            | Self::ExpiredTimestamp { .. } => RejectionClass::BadRequest,
            Self::MalformedSignature | Self::Mismatch => RejectionClass::Unauthorized,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SignatureVerifier {
    signing_secret: SecretString,
}

impl SignatureVerifier {
    pub fn new(signing_secret: SecretString) -> Self {
        Self { signing_secret }
    }

    pub fn verify(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<(), SignatureError> {
        self.verify_at(timestamp, signature, body, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
        now: i64,
    ) -> Result<(), SignatureError> {
        let timestamp = timestamp.ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?;
        let signature = signature.ok_or(SignatureError::MissingHeader(SIGNATURE_HEADER))?;

        let sent_at = timestamp
            .trim()
            .parse::<i64>()
            .map_err(|_| SignatureError::MalformedTimestamp(timestamp.to_owned()))?;
        let skew_secs = now.saturating_sub(sent_at);
        if skew_secs.abs() > MAX_TIMESTAMP_SKEW_SECS {
            return Err(SignatureError::ExpiredTimestamp { skew_secs });
        }

        let digest_hex = signature
            .strip_prefix(SIGNATURE_VERSION)
            .and_then(|rest| rest.strip_prefix('='))
            .ok_or(SignatureError::MalformedSignature)?;
        let digest = hex::decode(digest_hex).map_err(|_| SignatureError::MalformedSignature)?;

        self.mac_for(timestamp, body).verify_slice(&digest).map_err(|_| SignatureError::Mismatch)
    }

    /// Produces the `X-Slack-Signature` value Slack would send for `body`.
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> String {
        let digest = self.mac_for(timestamp, body).finalize().into_bytes();
        format!("{SIGNATURE_VERSION}={}", hex::encode(digest))
    }

    fn mac_for(&self, timestamp: &str, body: &[u8]) -> HmacSha256 {
        // HMAC accepts keys of any length.
        let mut mac = <HmacSha256 as Mac>::new_from_slice(
            self.signing_secret.expose_secret().as_bytes(),
        )
        .unwrap_or_else(|_| unreachable!("hmac keys of any length are valid"));
        mac.update(SIGNATURE_VERSION.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        mac
    }
}
