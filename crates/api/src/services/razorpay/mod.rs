//! Razorpay payment gateway integration.
//!
//! Recurring plans are Razorpay subscriptions; the lifetime plan is a single
//! order. Every callback is authenticated by an HMAC signature before any
//! subscription state changes.

mod client;
mod error;
pub mod signature;
pub mod types;

pub use client::RazorpayClient;
pub use error::RazorpayError;
pub use types::{Notes, WebhookEvent};
