//! Webhook signature verification.
//!
//! Events are authenticated against the endpoint's signing secret before
//! the body is parsed; an unverified body is never treated as trusted
//! input. Running without a secret is an explicit development-only
//! relaxation.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::WebhookError;
use crate::events::StripeEvent;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the provider's signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Clone)]
pub struct EventVerifier {
    secret: Option<String>,
}

impl EventVerifier {
    pub fn new(secret: Option<String>) -> Self {
        if secret.is_none() {
            tracing::warn!(
                "[EventVerifier::new] No webhook signing secret configured; events will be parsed WITHOUT signature verification. Unsafe outside development."
            );
        }
        Self { secret }
    }

    /// Authenticates a raw webhook request and parses it into a typed
    /// event envelope. The signature header is required even in the
    /// unverified development mode.
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<StripeEvent, WebhookError> {
        let header = signature_header.ok_or(WebhookError::MissingSignature)?;
        if let Some(secret) = &self.secret {
            verify_signature(payload, header, secret)?;
        }
        StripeEvent::from_bytes(payload)
    }
}

/// Verify a Stripe webhook signature.
///
/// Stripe-Signature header format: `t=<timestamp>,v1=<signature>`
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    webhook_secret: &str,
) -> Result<(), WebhookError> {
    let parts: std::collections::HashMap<&str, &str> = signature_header
        .split(',')
        .filter_map(|part| {
            let mut kv = part.splitn(2, '=');
            Some((kv.next()?.trim(), kv.next()?))
        })
        .collect();

    let timestamp = parts.get("t").ok_or(WebhookError::InvalidSignature)?;
    let signature = parts.get("v1").ok_or(WebhookError::InvalidSignature)?;

    // The signed payload is `timestamp.payload`.
    let signed_payload = format!(
        "{}.{}",
        timestamp,
        std::str::from_utf8(payload).map_err(|_| WebhookError::InvalidSignature)?
    );

    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(signed_payload.as_bytes());

    let expected = hex::encode(mac.finalize().into_bytes());

    // Constant-time comparison
    if subtle::ConstantTimeEq::ct_eq(expected.as_bytes(), signature.as_bytes()).into() {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"foo.bar.baz","created":1714556800,"livemode":false,"data":{"object":{}}}"#;

    fn sign(payload: &[u8], timestamp: &str, secret: &str) -> String {
        let signed_payload = format!("{}.{}", timestamp, std::str::from_utf8(payload).unwrap());
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_a_valid_signature() {
        let secret = "whsec_test_secret";
        let header = sign(PAYLOAD, "1714556800", secret);
        assert!(verify_signature(PAYLOAD, &header, secret).is_ok());
    }

    #[test]
    fn rejects_a_bad_signature() {
        let result = verify_signature(PAYLOAD, "t=123,v1=deadbeef", "whsec_test_secret");
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn rejects_a_malformed_header() {
        let result = verify_signature(PAYLOAD, "not-a-signature-header", "whsec_test_secret");
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn verifier_requires_the_header() {
        let verifier = EventVerifier::new(Some("whsec_test_secret".into()));
        assert!(matches!(
            verifier.verify(PAYLOAD, None),
            Err(WebhookError::MissingSignature)
        ));
    }

    #[test]
    fn verifier_parses_after_a_valid_signature() {
        let secret = "whsec_test_secret";
        let verifier = EventVerifier::new(Some(secret.into()));
        let header = sign(PAYLOAD, "1714556800", secret);
        let event = verifier.verify(PAYLOAD, Some(&header)).unwrap();
        assert_eq!(event.id, "evt_1");
    }

    #[test]
    fn verifier_rejects_a_tampered_body() {
        let secret = "whsec_test_secret";
        let verifier = EventVerifier::new(Some(secret.into()));
        let header = sign(PAYLOAD, "1714556800", secret);
        let tampered = PAYLOAD.to_vec().into_iter().chain(*b" ").collect::<Vec<_>>();
        assert!(matches!(
            verifier.verify(&tampered, Some(&header)),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn development_mode_parses_without_a_secret() {
        let verifier = EventVerifier::new(None);
        let event = verifier.verify(PAYLOAD, Some("t=1,v1=unchecked")).unwrap();
        assert_eq!(event.event_type, "foo.bar.baz");
    }
}
