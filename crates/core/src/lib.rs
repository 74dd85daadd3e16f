//! BizShop Core - entitlement and commission engine.
//!
//! This crate holds the rules every BizShop component shares:
//! - `api` - HTTP service for sellers, storefront customers and staff
//! - `cli` - Command-line tools for migrations, roles and the expiry sweep
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. The `postgres` feature adds sqlx encode/decode
//! impls for the shared enums and newtypes.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, caps and statuses
//! - [`plans`] - The static plan catalog
//! - [`entitlements`] - Plan-derived capabilities and feature gates
//! - [`fees`] - Platform commission on orders
//! - [`subscription`] - Subscription state machine
//! - [`authz`] - Store and platform authorization
//! - [`discount`] - Discount code validation and application

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod authz;
pub mod discount;
pub mod entitlements;
pub mod fees;
pub mod plans;
pub mod subscription;
pub mod types;

pub use plans::PlanTier;
pub use types::*;
