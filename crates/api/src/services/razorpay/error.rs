//! Razorpay-related errors.

use thiserror::Error;

/// Errors that can occur when talking to Razorpay or checking its signatures.
#[derive(Debug, Error)]
pub enum RazorpayError {
    /// HTTP request failed.
    #[error("Razorpay request failed: {0}")]
    Request(String),

    /// Failed to parse response.
    #[error("Razorpay response error: {0}")]
    Response(String),

    /// Razorpay returned an error status.
    #[error("Razorpay API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Checkout or webhook signature did not match.
    #[error("Invalid Razorpay signature: {0}")]
    InvalidSignature(String),

    /// Payload is missing something the caller relies on.
    #[error("Invalid Razorpay payload: {0}")]
    InvalidPayload(String),
}
