//! Razorpay signature verification.
//!
//! Checkout callbacks and webhooks are signed with HMAC-SHA256 and sent as
//! lowercase hex. Checkout uses the key secret; webhooks use the webhook
//! secret configured in the dashboard.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::RazorpayError;

/// Verify the signature returned by checkout for a one-time order.
///
/// # Errors
///
/// Returns `RazorpayError::InvalidSignature` on mismatch.
pub fn verify_order_payment(
    key_secret: &SecretString,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), RazorpayError> {
    verify(key_secret, format!("{order_id}|{payment_id}").as_bytes(), signature)
}

/// Verify the signature returned by checkout for a subscription's first payment.
///
/// # Errors
///
/// Returns `RazorpayError::InvalidSignature` on mismatch.
pub fn verify_subscription_payment(
    key_secret: &SecretString,
    payment_id: &str,
    subscription_id: &str,
    signature: &str,
) -> Result<(), RazorpayError> {
    verify(
        key_secret,
        format!("{payment_id}|{subscription_id}").as_bytes(),
        signature,
    )
}

/// Verify the `X-Razorpay-Signature` header of a webhook against the raw body.
///
/// # Errors
///
/// Returns `RazorpayError::InvalidSignature` on mismatch.
pub fn verify_webhook(
    webhook_secret: &SecretString,
    body: &[u8],
    signature: &str,
) -> Result<(), RazorpayError> {
    verify(webhook_secret, body, signature)
}

fn verify(secret: &SecretString, message: &[u8], signature: &str) -> Result<(), RazorpayError> {
    let expected = sign(secret, message)?;
    if !constant_time_compare(&expected, signature.trim()) {
        return Err(RazorpayError::InvalidSignature(
            "Signature mismatch".to_string(),
        ));
    }
    Ok(())
}

fn sign(secret: &SecretString, message: &[u8]) -> Result<String, RazorpayError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| RazorpayError::InvalidSignature(e.to_string()))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_known_hmac_vector() {
        let sig = sign(
            &secret("key"),
            b"The quick brown fox jumps over the lazy dog",
        )
        .unwrap();
        assert_eq!(
            sig,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_order_payment_signature() {
        let key = secret("rzp_test_secret");
        let good = sign(&key, b"order_A|pay_B").unwrap();
        assert!(verify_order_payment(&key, "order_A", "pay_B", &good).is_ok());
        assert!(verify_order_payment(&key, "order_A", "pay_C", &good).is_err());
    }

    #[test]
    fn test_subscription_payment_signature_order_matters() {
        let key = secret("rzp_test_secret");
        let good = sign(&key, b"pay_B|sub_A").unwrap();
        assert!(verify_subscription_payment(&key, "pay_B", "sub_A", &good).is_ok());
        let swapped = sign(&key, b"sub_A|pay_B").unwrap();
        assert!(matches!(
            verify_subscription_payment(&key, "pay_B", "sub_A", &swapped),
            Err(RazorpayError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_webhook_signature_covers_whole_body() {
        let key = secret("whsec_test");
        let body = br#"{"event":"subscription.paused"}"#;
        let good = sign(&key, body).unwrap();
        assert!(verify_webhook(&key, body, &good).is_ok());
        assert!(verify_webhook(&key, br#"{"event":"subscription.resumed"}"#, &good).is_err());
        assert!(verify_webhook(&secret("other"), body, &good).is_err());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
    }
}
