//! Webhook signature verification.
//!
//! Providers sign the raw request body with a shared secret and send the
//! hex-encoded MAC in a header. The body must be verified exactly as it was
//! received, before any JSON parsing.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use tracing::warn;

use crate::domain::Provider;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Keyed-hash scheme a provider signs its webhooks with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    HmacSha256Hex,
    HmacSha1Hex,
}

impl SignatureScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureScheme::HmacSha256Hex => "hmac-sha256-hex",
            SignatureScheme::HmacSha1Hex => "hmac-sha1-hex",
        }
    }

    /// Optional algorithm prefix some providers put in front of the hex digest
    fn header_prefix(&self) -> &'static str {
        match self {
            SignatureScheme::HmacSha256Hex => "sha256=",
            SignatureScheme::HmacSha1Hex => "sha1=",
        }
    }

    /// Compute the raw MAC bytes of `payload`
    pub fn sign(&self, payload: &[u8], secret: &[u8]) -> Vec<u8> {
        match self {
            SignatureScheme::HmacSha256Hex => {
                let mut mac = <HmacSha256 as Mac>::new_from_slice(secret)
                    .expect("HMAC accepts keys of any length");
                mac.update(payload);
                mac.finalize().into_bytes().to_vec()
            }
            SignatureScheme::HmacSha1Hex => {
                let mut mac = <HmacSha1 as Mac>::new_from_slice(secret)
                    .expect("HMAC accepts keys of any length");
                mac.update(payload);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }

    /// Header value a provider would send for `payload`
    pub fn sign_hex(&self, payload: &[u8], secret: &[u8]) -> String {
        hex::encode(self.sign(payload, secret))
    }

    /// Constant-time check of `expected` against the MAC of `payload`
    fn verify_bytes(&self, payload: &[u8], secret: &[u8], expected: &[u8]) -> bool {
        match self {
            SignatureScheme::HmacSha256Hex => match <HmacSha256 as Mac>::new_from_slice(secret) {
                Ok(mut mac) => {
                    mac.update(payload);
                    mac.verify_slice(expected).is_ok()
                }
                Err(_) => false,
            },
            SignatureScheme::HmacSha1Hex => match <HmacSha1 as Mac>::new_from_slice(secret) {
                Ok(mut mac) => {
                    mac.update(payload);
                    mac.verify_slice(expected).is_ok()
                }
                Err(_) => false,
            },
        }
    }

    fn decode_header(&self, header: &str) -> Option<Vec<u8>> {
        let trimmed = header.trim();
        let digest = trimmed.strip_prefix(self.header_prefix()).unwrap_or(trimmed);
        if digest.is_empty() {
            return None;
        }
        hex::decode(digest).ok()
    }
}

/// Whether signatures are enforced. `AcceptAll` exists for local development only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMode {
    Enforce,
    AcceptAll,
}

#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    mode: VerificationMode,
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self::new(VerificationMode::Enforce)
    }
}

impl SignatureVerifier {
    pub fn new(mode: VerificationMode) -> Self {
        if mode == VerificationMode::AcceptAll {
            warn!("Webhook signature verification is DISABLED; every webhook will be accepted unsigned");
        }
        Self { mode }
    }

    pub fn mode(&self) -> VerificationMode {
        self.mode
    }

    /// Verify a webhook body. Any missing input or malformed signature yields `false`.
    pub fn verify(
        &self,
        provider: Provider,
        scheme: SignatureScheme,
        raw_body: &[u8],
        signature_header: Option<&str>,
        secret: Option<&str>,
    ) -> bool {
        if self.mode == VerificationMode::AcceptAll {
            warn!(provider = %provider, "Accepting {} webhook without signature check", provider);
            return true;
        }

        let secret = match secret {
            Some(s) if !s.is_empty() => s,
            _ => {
                warn!(provider = %provider, "No webhook secret configured; rejecting");
                return false;
            }
        };
        let expected = match signature_header.and_then(|h| scheme.decode_header(h)) {
            Some(bytes) => bytes,
            None => return false,
        };

        scheme.verify_bytes(raw_body, secret.as_bytes(), &expected)
    }
}
